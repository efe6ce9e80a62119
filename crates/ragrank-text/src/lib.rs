//! ragrank-text
//!
//! Lexical retrieval. `Bm25Index` is the in-memory inverted index with the
//! engine's own BM25 scoring; `TantivyKeywordIndex` offers the same
//! `Retriever` contract on top of an in-RAM Tantivy index.

pub mod index;
pub mod search;
pub mod tantivy_index;
pub mod tantivy_utils;
pub mod tokenize;

pub use index::{Bm25Index, IndexStats};
pub use tantivy_index::TantivyKeywordIndex;
pub use tokenize::tokenize;
