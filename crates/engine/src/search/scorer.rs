//! BM25 term scoring
//!
//! For each query term t:
//! score += IDF(t) * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * dl/avgdl))
//!
//! Where:
//! - tf = term frequency in document
//! - dl = document length
//! - avgdl = average document length
//! - IDF(t) = ln((N - df + 0.5) / (df + 0.5) + 1)

/// BM25 parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25 {
    /// Term frequency saturation
    pub k1: f32,
    /// Length normalization
    pub b: f32,
}

impl Default for Bm25 {
    fn default() -> Self {
        Bm25 { k1: 1.2, b: 0.75 }
    }
}

impl Bm25 {
    /// Smoothed inverse document frequency
    pub fn idf(total_docs: usize, doc_freq: usize) -> f32 {
        let n = total_docs as f32;
        let df = doc_freq as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Contribution of one term to one document
    pub fn term_score(&self, idf: f32, tf: u32, doc_len: u32, avg_doc_len: f32) -> f32 {
        let tf = tf as f32;
        let dl = doc_len as f32;
        let avgdl = if avg_doc_len > 0.0 { avg_doc_len } else { 1.0 };
        idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * dl / avgdl))
    }
}
