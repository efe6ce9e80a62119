use serde::{Deserialize, Serialize};

use crate::types::{Candidate, Chunk, Meta, SearchFilter, SourceKind};

/// A retrieval source producing scored candidates for a query string.
///
/// Implementations must only return candidates with a positive relevance
/// signal, sorted by descending `raw_score`, at most `k` of them.
///
/// Calls run on the blocking pool under `source_timeout_ms`. On timeout the
/// engine stops waiting but cannot cancel the call, which keeps its thread
/// until it returns; a backend that can hang must enforce its own deadline.
pub trait Retriever: Send + Sync {
    fn kind(&self) -> SourceKind;
    fn retrieve(&self, query: &str, k: usize, filter: Option<&SearchFilter>) -> anyhow::Result<Vec<Candidate>>;
}

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Returns one L2-normalized vector of `dim()` floats per input text.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// A single nearest-neighbour hit from a vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub payload: Meta,
}

/// Read-only ANN search over stored chunk embeddings.
pub trait VectorStore: Send + Sync {
    fn search(&self, vector: &[f32], k: usize, filter: Option<&SearchFilter>) -> anyhow::Result<Vec<VectorMatch>>;
}

/// Jointly scores `(query, passage)` pairs, one relevance logit per pair.
///
/// Bounded by `rerank_timeout_ms` the same way a `Retriever` is bounded by
/// `source_timeout_ms`: a timed-out call keeps running on its blocking
/// thread, so implementations need their own deadline.
pub trait CrossEncoder: Send + Sync {
    fn score_pairs(&self, pairs: &[(String, String)]) -> anyhow::Result<Vec<f32>>;
}

/// Output of a query expander: alternative phrasings (not including the
/// original) and an optional search intent label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub variants: Vec<String>,
    pub intent: Option<String>,
}

/// Bounded by `source_timeout_ms`; like `Retriever`, a timed-out call is
/// abandoned, not cancelled.
pub trait QueryExpander: Send + Sync {
    fn expand(&self, query: &str, max_expansions: usize) -> anyhow::Result<Expansion>;
}

/// Text generation collaborator used by prompt-driven expanders.
pub trait CompletionModel: Send + Sync {
    fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Read access to the chunk corpus.
pub trait ChunkCorpus: Send + Sync {
    fn get(&self, id: &str) -> Option<&Chunk>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool { self.len() == 0 }
}
