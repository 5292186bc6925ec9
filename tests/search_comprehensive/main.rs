//! Search Comprehensive Test Suite
//!
//! End-to-end tests for query planning, retrieval and hybrid fusion.
//!
//! ## Test Tier Structure
//!
//! - **Tier 1: Vector Search** (ranking, metrics, filters, batches)
//! - **Tier 2: Full-Text Search** (fetch order, empty results, filter backends)
//! - **Tier 3: Hybrid Search** (row-id join, fusion, failures)
//! - **Tier 4: Query Planning** (mode resolution, embedding, column inference)
//! - **Tier 5: Builder Surface** (limits, projections, typed records, config)
//! - **Tier 6: Normalization Properties** (range, rank stability)
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test search_comprehensive
//!
//! # Run one tier
//! cargo test --test search_comprehensive tier3
//! ```

mod test_utils;

// Tier 1: Vector Search
mod tier1_vector_search;

// Tier 2: Full-Text Search
mod tier2_fts_search;

// Tier 3: Hybrid Search
mod tier3_hybrid_search;

// Tier 4: Query Planning
mod tier4_planner;

// Tier 5: Builder Surface
mod tier5_builder;
