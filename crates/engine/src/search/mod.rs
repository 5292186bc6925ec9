//! Full-text search engine
//!
//! - `tokenizer`: text to terms
//! - `scorer`: BM25 term scoring
//! - `index`: inverted index keyed by row id, with term positions for
//!   phrase queries

pub mod index;
pub mod scorer;
pub mod tokenizer;

pub use index::InvertedIndex;
pub use scorer::Bm25;
