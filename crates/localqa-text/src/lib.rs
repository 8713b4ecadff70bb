//! localqa-text
//!
//! Lexical layer of the retrieval engine: tantivy-backed normalization,
//! per-request BM25 statistics, and the pure signal scorers that the ranker
//! combines. Nothing here is persisted; every structure is rebuilt per
//! question.

pub mod analyzer;
pub mod features;
pub mod index;
pub mod query;
pub mod signals;
pub mod tokenize;

pub use features::LexicalFeatures;
pub use index::LexicalIndex;
pub use query::{Anchor, ExactToken, QueryProfile};
pub use tokenize::{alnum_padded, tokenize, trigrams};
