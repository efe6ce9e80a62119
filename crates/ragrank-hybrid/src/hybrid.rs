use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use ragrank_core::error::{Result, RetrievalError};
use ragrank_core::settings::{FusionStrategy, RetrievalConfig};
use ragrank_core::traits::Retriever;
use ragrank_core::types::{Candidate, RetrievalMethod, ScoredResult, SearchFilter, SourceKind};

use crate::fusion::fuse;
use crate::merge::dedup_max;

/// Per-source candidate lists for one query, plus the sources that failed.
#[derive(Debug, Clone, Default)]
pub struct SourceLists {
    pub lists: Vec<(SourceKind, Vec<Candidate>)>,
    pub failures: Vec<(SourceKind, String)>,
}

impl SourceLists {
    pub fn get(&self, kind: SourceKind) -> Option<&[Candidate]> {
        self.lists.iter().find(|(k, _)| *k == kind).map(|(_, l)| l.as_slice())
    }

    pub fn kinds(&self) -> Vec<SourceKind> { self.lists.iter().map(|(k, _)| *k).collect() }
}

/// Lexical + vector retrieval joined by fusion. Either source may be absent;
/// the missing side is reported as unavailable and the other one carries on.
#[derive(Clone, Default)]
pub struct HybridRetriever {
    lexical: Option<Arc<dyn Retriever>>,
    vector: Option<Arc<dyn Retriever>>,
}

impl HybridRetriever {
    pub fn new(lexical: Arc<dyn Retriever>, vector: Arc<dyn Retriever>) -> Self {
        Self { lexical: Some(lexical), vector: Some(vector) }
    }

    #[must_use]
    pub fn with_lexical(mut self, lexical: Arc<dyn Retriever>) -> Self {
        self.lexical = Some(lexical);
        self
    }

    #[must_use]
    pub fn with_vector(mut self, vector: Arc<dyn Retriever>) -> Self {
        self.vector = Some(vector);
        self
    }

    fn source(&self, kind: SourceKind) -> Option<&Arc<dyn Retriever>> {
        match kind {
            SourceKind::Lexical => self.lexical.as_ref(),
            SourceKind::Vector => self.vector.as_ref(),
        }
    }

    /// Sources a request under `cfg` consults, in fusion order. A source
    /// with zero weight under weighted hybrid fusion contributes nothing and
    /// is not queried.
    pub fn planned_sources(cfg: &RetrievalConfig) -> Vec<SourceKind> {
        cfg.method
            .sources()
            .iter()
            .copied()
            .filter(|k| {
                cfg.method != RetrievalMethod::Hybrid
                    || cfg.fusion_strategy != FusionStrategy::Weighted
                    || cfg.weights.for_source(*k) > 0.0
            })
            .collect()
    }

    /// Queries every planned source concurrently, each bounded by
    /// `min(top_k * 2, candidate_cap)` candidates and the source timeout.
    /// Failed or timed-out sources are recorded, never raised.
    pub async fn gather(&self, query: &str, top_k: usize, filter: Option<&SearchFilter>, cfg: &RetrievalConfig) -> SourceLists {
        let limit = cfg.source_limit(top_k);
        let timeout = cfg.source_timeout();
        let planned = Self::planned_sources(cfg);

        let calls = planned.iter().map(|&kind| {
            let source = self.source(kind).cloned();
            let query = query.to_string();
            let filter = filter.cloned();
            async move {
                let result = match source {
                    Some(s) => run_source(s, query, limit, filter, timeout).await,
                    None => Err(RetrievalError::SourceUnavailable { source_kind: kind, reason: "not configured".into() }),
                };
                (kind, result)
            }
        });

        let mut out = SourceLists::default();
        for (kind, result) in join_all(calls).await {
            match result {
                Ok(list) => {
                    debug!(source = %kind, hits = list.len(), "source returned");
                    out.lists.push((kind, list));
                }
                Err(e) => {
                    warn!(source = %kind, error = %e, "retrieval source degraded");
                    out.failures.push((kind, e.to_string()));
                }
            }
        }
        out
    }

    /// Fuses gathered lists under `cfg` and keeps `top_k`.
    pub fn fuse_lists(lists: &SourceLists, cfg: &RetrievalConfig, top_k: usize) -> Result<Vec<ScoredResult>> {
        if lists.lists.is_empty() {
            return Ok(Vec::new());
        }
        let policy = cfg.fusion_policy(&lists.kinds())?;
        let inputs: Vec<Vec<Candidate>> = lists.lists.iter().map(|(_, l)| l.clone()).collect();
        fuse(&inputs, &policy, top_k)
    }

    /// Single-query hybrid retrieval: gather, fuse, trim to `top_k`.
    pub async fn retrieve(&self, query: &str, top_k: usize, filter: Option<&SearchFilter>, cfg: &RetrievalConfig) -> Result<Vec<ScoredResult>> {
        let lists = self.gather(query, top_k, filter, cfg).await;
        Self::fuse_lists(&lists, cfg, top_k)
    }
}

async fn run_source(
    source: Arc<dyn Retriever>,
    query: String,
    limit: usize,
    filter: Option<SearchFilter>,
    timeout: Duration,
) -> Result<Vec<Candidate>> {
    let kind = source.kind();
    let task = tokio::task::spawn_blocking(move || source.retrieve(&query, limit, filter.as_ref()));
    match tokio::time::timeout(timeout, task).await {
        Err(_) => Err(RetrievalError::Timeout { what: format!("{kind} retrieval"), after: timeout }),
        Ok(Err(join)) => Err(RetrievalError::SourceUnavailable { source_kind: kind, reason: join.to_string() }),
        Ok(Ok(Err(e))) => Err(RetrievalError::SourceUnavailable { source_kind: kind, reason: format!("{e:#}") }),
        Ok(Ok(Ok(list))) => {
            let mut list = dedup_max(list);
            list.truncate(limit);
            Ok(list)
        }
    }
}
