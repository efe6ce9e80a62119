//! Retrieval options and their defaults.
//!
//! Every numeric default here (fusion weights, diversity thresholds, caps)
//! is a tunable, not an invariant. `RetrievalConfig::validate` is the single
//! gate: an engine is never built from an unvalidated config.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, RetrievalError};
use crate::types::{RetrievalMethod, SourceKind};

const WEIGHT_TOLERANCE: f32 = 1e-4;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FusionStrategy {
    #[default]
    Weighted,
    Rrf,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LexicalBackend {
    #[default]
    Bm25,
    Tantivy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceWeights {
    pub vector: f32,
    pub keyword: f32,
}

impl Default for SourceWeights {
    fn default() -> Self { Self { vector: 0.7, keyword: 0.3 } }
}

impl SourceWeights {
    pub fn for_source(&self, kind: SourceKind) -> f32 {
        match kind {
            SourceKind::Vector => self.vector,
            SourceKind::Lexical => self.keyword,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.5, b: 0.75 } }
}

/// Soft page/type diversity applied in the final selection pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiversityConfig {
    /// Number of selected items after which repeated pages need `page_min_score`.
    pub page_after: usize,
    pub page_min_score: f32,
    /// Number of selected items after which repeated types need `type_min_score`.
    pub type_after: usize,
    pub type_min_score: f32,
    pub max_results: usize,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self { page_after: 3, page_min_score: 0.8, type_after: 5, type_min_score: 0.9, max_results: 8 }
    }
}

/// How ranked lists from several sources are combined.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionPolicy {
    pub strategy: FusionStrategy,
    pub weights: Vec<f32>,
    pub rrf_k: u32,
}

impl FusionPolicy {
    pub const DEFAULT_RRF_K: u32 = 60;

    /// Weighted fusion; one weight per input list, summing to 1.
    pub fn weighted(weights: Vec<f32>) -> Result<Self> {
        validate_weights(&weights)?;
        Ok(Self { strategy: FusionStrategy::Weighted, weights, rrf_k: Self::DEFAULT_RRF_K })
    }

    pub fn rrf(k: u32) -> Self {
        Self { strategy: FusionStrategy::Rrf, weights: Vec::new(), rrf_k: k }
    }
}

fn validate_weights(weights: &[f32]) -> Result<()> {
    if weights.is_empty() {
        return Err(RetrievalError::FusionConfig("weighted fusion needs at least one weight".into()));
    }
    if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(RetrievalError::FusionConfig(format!("weight {w} is not a finite non-negative number")));
    }
    let sum: f32 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(RetrievalError::FusionConfig(format!("weights must sum to 1, got {sum}")));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub method: RetrievalMethod,
    pub fusion_strategy: FusionStrategy,
    pub weights: SourceWeights,
    pub rrf_k: u32,
    pub rerank: bool,
    pub score_threshold: Option<f32>,
    pub top_k: usize,
    /// Upper bound on candidates requested from any single source.
    pub candidate_cap: usize,
    /// Query variants per request, original included.
    pub max_variants: usize,
    pub expand: bool,
    pub lexical_backend: LexicalBackend,
    pub bm25: Bm25Params,
    /// Passage length (chars) sent to the cross-encoder.
    pub rerank_max_chars: usize,
    pub source_timeout_ms: u64,
    pub rerank_timeout_ms: u64,
    pub diversity: DiversityConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            method: RetrievalMethod::Hybrid,
            fusion_strategy: FusionStrategy::Weighted,
            weights: SourceWeights::default(),
            rrf_k: FusionPolicy::DEFAULT_RRF_K,
            rerank: true,
            score_threshold: None,
            top_k: 5,
            candidate_cap: 20,
            max_variants: 4,
            expand: true,
            lexical_backend: LexicalBackend::Bm25,
            bm25: Bm25Params::default(),
            rerank_max_chars: 400,
            source_timeout_ms: 5_000,
            rerank_timeout_ms: 10_000,
            diversity: DiversityConfig::default(),
        }
    }
}

impl RetrievalConfig {
    pub const MAX_VARIANTS: usize = 4;

    pub fn validate(&self) -> Result<()> {
        if self.fusion_strategy == FusionStrategy::Weighted {
            validate_weights(&[self.weights.vector, self.weights.keyword])?;
        }
        if self.top_k == 0 {
            return Err(RetrievalError::InvalidConfig("top_k must be at least 1".into()));
        }
        if self.candidate_cap == 0 {
            return Err(RetrievalError::InvalidConfig("candidate_cap must be at least 1".into()));
        }
        if !(1..=Self::MAX_VARIANTS).contains(&self.max_variants) {
            return Err(RetrievalError::InvalidConfig(format!("max_variants must be within 1..={}", Self::MAX_VARIANTS)));
        }
        if let Some(t) = self.score_threshold {
            if !t.is_finite() {
                return Err(RetrievalError::InvalidConfig("score_threshold must be finite".into()));
            }
        }
        if !(self.bm25.k1.is_finite() && self.bm25.k1 >= 0.0 && (0.0..=1.0).contains(&self.bm25.b)) {
            return Err(RetrievalError::InvalidConfig("bm25 requires k1 >= 0 and b within [0, 1]".into()));
        }
        if self.diversity.max_results == 0 {
            return Err(RetrievalError::InvalidConfig("diversity.max_results must be at least 1".into()));
        }
        if self.source_timeout_ms == 0 || self.rerank_timeout_ms == 0 {
            return Err(RetrievalError::InvalidConfig("source_timeout_ms and rerank_timeout_ms must be at least 1".into()));
        }
        Ok(())
    }

    /// Fusion policy over the given source lists, in order.
    pub fn fusion_policy(&self, sources: &[SourceKind]) -> Result<FusionPolicy> {
        match self.fusion_strategy {
            FusionStrategy::Rrf => Ok(FusionPolicy::rrf(self.rrf_k)),
            FusionStrategy::Weighted if sources.len() == 1 => FusionPolicy::weighted(vec![1.0]),
            FusionStrategy::Weighted => FusionPolicy::weighted(sources.iter().map(|s| self.weights.for_source(*s)).collect()),
        }
    }

    /// Per-source candidate budget: `min(top_k * 2, candidate_cap)`.
    pub fn source_limit(&self, top_k: usize) -> usize {
        top_k.saturating_mul(2).min(self.candidate_cap).max(1)
    }

    pub fn source_timeout(&self) -> Duration { Duration::from_millis(self.source_timeout_ms) }
    pub fn rerank_timeout(&self) -> Duration { Duration::from_millis(self.rerank_timeout_ms) }
}
