//! Domain types shared by the lexical, vector and ranking engines.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

pub type ChunkId = String;
pub type Meta = HashMap<String, Value>;

/// Kind of content a chunk was extracted from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    #[default]
    Text,
    Table,
    Image,
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChunkType::Text => "text",
            ChunkType::Table => "table",
            ChunkType::Image => "image",
        };
        f.write_str(s)
    }
}

/// A retrievable unit of a source document.
///
/// - `id`: unique within a retrieval session
/// - `content`: the text payload (table rendering or image description for
///   non-text chunks)
/// - `chunk_type`/`page`: used by filters and the diversity selector
/// - `metadata`: free-form attributes carried through to callers
///
/// Chunks are created at ingest time and never mutated during retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: ChunkId,
    pub content: String,
    #[serde(rename = "type", default)]
    pub chunk_type: ChunkType,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub metadata: Meta,
}

impl Chunk {
    pub fn new(id: impl Into<String>, content: impl Into<String>, chunk_type: ChunkType, page: u32) -> Self {
        Self { id: id.into(), content: content.into(), chunk_type, page, metadata: Meta::new() }
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A request's query text together with its expansions.
///
/// `variants` always starts with the original text and holds at most the
/// configured number of variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub variants: Vec<String>,
    pub intent: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self { variants: vec![text.clone()], text, intent: None }
    }
}

/// Indicates which engine produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Lexical,
    Vector,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Lexical => f.write_str("lexical"),
            SourceKind::Vector => f.write_str("vector"),
        }
    }
}

/// Which sources a request is answered from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    Vector,
    Keyword,
    #[default]
    Hybrid,
}

impl RetrievalMethod {
    pub fn sources(self) -> &'static [SourceKind] {
        match self {
            RetrievalMethod::Vector => &[SourceKind::Vector],
            RetrievalMethod::Keyword => &[SourceKind::Lexical],
            RetrievalMethod::Hybrid => &[SourceKind::Vector, SourceKind::Lexical],
        }
    }
}

/// One hit from a single retrieval call. `raw_score` is engine-specific but
/// higher is always better; `source_rank` is the 0-based position in the
/// source's own ordering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub chunk_id: ChunkId,
    pub raw_score: f32,
    pub source: SourceKind,
    pub source_rank: usize,
}

impl Candidate {
    pub fn new(chunk_id: impl Into<String>, raw_score: f32, source: SourceKind, source_rank: usize) -> Self {
        Self { chunk_id: chunk_id.into(), raw_score, source, source_rank }
    }
}

/// A fused or reranked hit. `coverage` counts the result lists the chunk
/// appeared in and is the first tie-breaker after `score`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredResult {
    pub chunk_id: ChunkId,
    pub score: f32,
    pub coverage: usize,
    pub final_rank: usize,
}

/// What callers of the engine receive, ordered by descending relevance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub chunk_id: ChunkId,
    pub content: String,
    pub score: f32,
    pub page: u32,
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    pub metadata: Meta,
    pub rank: usize,
}

impl RetrievedChunk {
    pub fn from_chunk(chunk: &Chunk, score: f32, rank: usize) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            content: chunk.content.clone(),
            score,
            page: chunk.page,
            chunk_type: chunk.chunk_type,
            metadata: chunk.metadata.clone(),
            rank,
        }
    }
}

/// Restricts which chunks a source may return. Every set field must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchFilter {
    #[serde(default, rename = "type")]
    pub chunk_type: Option<ChunkType>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub metadata: Meta,
}

impl SearchFilter {
    pub fn by_type(chunk_type: ChunkType) -> Self {
        Self { chunk_type: Some(chunk_type), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_type.is_none() && self.page.is_none() && self.metadata.is_empty()
    }

    pub fn matches(&self, chunk: &Chunk) -> bool {
        if self.chunk_type.is_some_and(|t| t != chunk.chunk_type) {
            return false;
        }
        if self.page.is_some_and(|p| p != chunk.page) {
            return false;
        }
        self.metadata.iter().all(|(k, v)| chunk.metadata.get(k) == Some(v))
    }
}

/// Sort key shared by every ranked list in the engine: score descending, then
/// coverage descending, then chunk id ascending.
pub fn rank_order(a: (f32, usize, &str), b: (f32, usize, &str)) -> std::cmp::Ordering {
    b.0.total_cmp(&a.0).then_with(|| b.1.cmp(&a.1)).then_with(|| a.2.cmp(b.2))
}
