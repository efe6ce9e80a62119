use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use ragrank_core::settings::RetrievalConfig;
use ragrank_core::types::{Candidate, Query, RetrievedChunk, ScoredResult, SearchFilter, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Init,
    Expand,
    Retrieve,
    Merge,
    Fuse,
    Rerank,
    Select,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Expand => "expand",
            Stage::Retrieve => "retrieve",
            Stage::Merge => "merge",
            Stage::Fuse => "fuse",
            Stage::Rerank => "rerank",
            Stage::Select => "select",
        };
        f.write_str(s)
    }
}

/// Stages after `Init`, in execution order.
pub const PIPELINE: [Stage; 6] = [Stage::Expand, Stage::Retrieve, Stage::Merge, Stage::Fuse, Stage::Rerank, Stage::Select];

/// Everything a request has produced so far. Each stage reads the previous
/// state and returns a new one; a failed stage leaves it untouched.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub query: Query,
    pub filter: Option<SearchFilter>,
    pub config: RetrievalConfig,
    pub top_k: usize,
    /// Fused candidates kept for reranking; `top_k` unless a reranker will run.
    pub pool_k: usize,
    /// One entry per query variant, each holding per-source candidate lists.
    pub per_variant: Vec<Vec<(SourceKind, Vec<Candidate>)>>,
    pub merged: Vec<(SourceKind, Vec<Candidate>)>,
    pub fused: Vec<ScoredResult>,
    pub results: Vec<RetrievedChunk>,
    pub source_failures: Vec<(SourceKind, String)>,
}

impl PipelineState {
    pub fn new(query: Query, filter: Option<SearchFilter>, config: RetrievalConfig, top_k: usize, pool_k: usize) -> Self {
        Self {
            query,
            filter,
            config,
            top_k,
            pool_k,
            per_variant: Vec::new(),
            merged: Vec::new(),
            fused: Vec::new(),
            results: Vec::new(),
            source_failures: Vec::new(),
        }
    }
}

/// What happened to a request, stage by stage.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub completed: Vec<Stage>,
    pub skipped: Vec<Stage>,
    pub degraded: Vec<(Stage, String)>,
    pub variants: Vec<String>,
    pub intent: Option<String>,
    pub source_failures: Vec<(SourceKind, String)>,
    pub elapsed_ms: u64,
}

impl Default for PipelineReport {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            completed: Vec::new(),
            skipped: Vec::new(),
            degraded: Vec::new(),
            variants: Vec::new(),
            intent: None,
            source_failures: Vec::new(),
            elapsed_ms: 0,
        }
    }
}

impl PipelineReport {
    pub fn is_degraded(&self) -> bool { !self.degraded.is_empty() || !self.source_failures.is_empty() }

    pub fn was_degraded(&self, stage: Stage) -> bool { self.degraded.iter().any(|(s, _)| *s == stage) }
}
