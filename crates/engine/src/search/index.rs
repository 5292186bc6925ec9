//! Inverted index for full-text search
//!
//! Posting lists are keyed by term and hold row ids with term frequency and
//! token positions. Positions make exact phrase matching possible.
//!
//! # Query syntax
//!
//! - `cats dogs`: rows containing any term, scored by BM25 over the terms
//! - `"cats and dogs"`: rows holding the terms at the same relative word
//!   positions
//!
//! Positions are word positions before stopwords are dropped, so a dropped
//! word in a phrase must be matched by some dropped word in the row.

use super::scorer::Bm25;
use super::tokenizer::{analyze, tokenize_unique};
use dashmap::DashMap;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// PostingEntry / PostingList
// ============================================================================

/// Entry in a posting list
#[derive(Debug, Clone)]
pub struct PostingEntry {
    /// Row containing the term
    pub row_id: u64,
    /// Term frequency in this row
    pub tf: u32,
    /// Row length in tokens
    pub doc_len: u32,
    /// Token positions of the term, ascending
    pub positions: Vec<u32>,
}

/// List of rows containing a term
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    /// Row entries
    pub entries: Vec<PostingEntry>,
}

impl PostingList {
    /// Remove the entry for a row
    pub fn remove(&mut self, row_id: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.row_id != row_id);
        before - self.entries.len()
    }

    /// Number of rows containing this term
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if posting list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// InvertedIndex
// ============================================================================

/// Inverted index over the text columns of a table
///
/// Uses DashMap for concurrent access; searches run while rows are added.
pub struct InvertedIndex {
    /// Indexed text columns
    columns: Vec<String>,

    /// Term -> PostingList mapping
    postings: DashMap<String, PostingList>,

    /// Row id -> row length, for removal and re-indexing
    doc_lengths: DashMap<u64, u32>,

    /// Total rows indexed
    total_docs: AtomicUsize,

    /// Sum of all row lengths (for average calculation)
    total_doc_len: AtomicUsize,

    scorer: Bm25,
}

impl InvertedIndex {
    /// Create an empty index over `columns`
    pub fn new(columns: Vec<String>) -> Self {
        InvertedIndex {
            columns,
            postings: DashMap::new(),
            doc_lengths: DashMap::new(),
            total_docs: AtomicUsize::new(0),
            total_doc_len: AtomicUsize::new(0),
            scorer: Bm25::default(),
        }
    }

    /// Indexed text columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Total number of indexed rows
    pub fn total_docs(&self) -> usize {
        self.total_docs.load(Ordering::Acquire)
    }

    /// Number of rows containing a term
    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map(|p| p.len()).unwrap_or(0)
    }

    /// Average row length in tokens
    pub fn avg_doc_len(&self) -> f32 {
        let total = self.total_docs.load(Ordering::Acquire);
        if total == 0 {
            return 0.0;
        }
        self.total_doc_len.load(Ordering::Acquire) as f32 / total as f32
    }

    /// Index a row; a row indexed before is replaced
    pub fn index_document(&self, row_id: u64, text: &str) {
        if self.doc_lengths.contains_key(&row_id) {
            self.remove_document(row_id);
        }

        let tokens = analyze(text);
        let doc_len = tokens.len() as u32;

        let mut positions: HashMap<String, Vec<u32>> = HashMap::new();
        for token in tokens {
            positions.entry(token.term).or_default().push(token.position);
        }

        for (term, positions) in positions {
            let entry = PostingEntry {
                row_id,
                tf: positions.len() as u32,
                doc_len,
                positions,
            };
            self.postings.entry(term).or_default().entries.push(entry);
        }

        self.doc_lengths.insert(row_id, doc_len);
        self.total_docs.fetch_add(1, Ordering::Relaxed);
        self.total_doc_len
            .fetch_add(doc_len as usize, Ordering::Relaxed);
    }

    /// Remove a row from the index
    pub fn remove_document(&self, row_id: u64) {
        let Some((_, doc_len)) = self.doc_lengths.remove(&row_id) else {
            return;
        };
        for mut entry in self.postings.iter_mut() {
            entry.remove(row_id);
        }
        self.postings.retain(|_, list| !list.is_empty());
        self.total_docs.fetch_sub(1, Ordering::Relaxed);
        self.total_doc_len
            .fetch_sub(doc_len as usize, Ordering::Relaxed);
    }

    fn posting_list(&self, term: &str) -> Option<PostingList> {
        self.postings.get(term).map(|p| p.clone())
    }

    /// Run a query; `(row_id, score)` by descending score, ties by row id
    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<(u64, f32)> {
        let trimmed = query.trim();
        let scores = match trimmed
            .strip_prefix('"')
            .and_then(|q| q.strip_suffix('"'))
        {
            Some(phrase) if trimmed.len() >= 2 => self.phrase_scores(phrase),
            _ => self.term_scores(trimmed),
        };

        let mut hits: Vec<(u64, f32)> = scores.into_iter().collect();
        hits.sort_by(|(id_a, s_a), (id_b, s_b)| {
            s_b.partial_cmp(s_a)
                .unwrap_or(CmpOrdering::Equal)
                .then_with(|| id_a.cmp(id_b))
        });
        if let Some(limit) = limit {
            hits.truncate(limit);
        }
        hits
    }

    fn term_scores(&self, query: &str) -> HashMap<u64, f32> {
        let total_docs = self.total_docs();
        let avg_doc_len = self.avg_doc_len();
        let mut scores: HashMap<u64, f32> = HashMap::new();

        for term in tokenize_unique(query) {
            let Some(list) = self.posting_list(&term) else {
                continue;
            };
            let idf = Bm25::idf(total_docs, list.len());
            for e in &list.entries {
                *scores.entry(e.row_id).or_insert(0.0) +=
                    self.scorer.term_score(idf, e.tf, e.doc_len, avg_doc_len);
            }
        }
        scores
    }

    fn phrase_scores(&self, phrase: &str) -> HashMap<u64, f32> {
        let terms = analyze(phrase);
        let Some(anchor) = terms.first().map(|t| t.position) else {
            return HashMap::new();
        };
        // gaps left by dropped words must line up in the row as well
        let offsets: Vec<u32> = terms.iter().map(|t| t.position - anchor).collect();
        let mut lists = Vec::with_capacity(terms.len());
        for token in &terms {
            match self.posting_list(&token.term) {
                Some(list) => lists.push(list),
                None => return HashMap::new(),
            }
        }
        let by_row: Vec<HashMap<u64, &PostingEntry>> = lists
            .iter()
            .map(|l| l.entries.iter().map(|e| (e.row_id, e)).collect())
            .collect();

        let total_docs = self.total_docs();
        let avg_doc_len = self.avg_doc_len();
        let mut scores = HashMap::new();

        for first in &lists[0].entries {
            let entries: Option<Vec<&PostingEntry>> =
                by_row.iter().map(|m| m.get(&first.row_id).copied()).collect();
            let Some(entries) = entries else {
                continue;
            };
            let later: Vec<HashSet<u32>> = entries
                .iter()
                .map(|e| e.positions.iter().copied().collect())
                .collect();
            let matched = first.positions.iter().any(|&start| {
                later
                    .iter()
                    .zip(&offsets)
                    .all(|(set, offset)| set.contains(&(start + offset)))
            });
            if !matched {
                continue;
            }
            let score: f32 = entries
                .iter()
                .zip(&lists)
                .map(|(e, list)| {
                    let idf = Bm25::idf(total_docs, list.len());
                    self.scorer.term_score(idf, e.tf, e.doc_len, avg_doc_len)
                })
                .sum();
            scores.insert(first.row_id, score);
        }
        scores
    }
}
