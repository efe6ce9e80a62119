//! Per-request sequencing of the ranking stages.
//!
//! `INIT → EXPAND → RETRIEVE → MERGE → FUSE → RERANK → SELECT`. Each stage
//! maps the previous `PipelineState` to a new one. Only `INIT` can fail a
//! request; any later stage that errors is logged, recorded in the report,
//! and the request continues from the state the stage was given.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use ragrank_core::error::{Result, RetrievalError};
use ragrank_core::settings::RetrievalConfig;
use ragrank_core::traits::{ChunkCorpus, QueryExpander, Retriever};
use ragrank_core::types::{Query, RetrievedChunk, SearchFilter, SourceKind};

use crate::diversity::DiversitySelector;
use crate::expansion::build_variants;
use crate::hybrid::{HybridRetriever, SourceLists};
use crate::merge::merge_variants;
use crate::pipeline::{PipelineReport, PipelineState, Stage, PIPELINE};
use crate::rerank::Reranker;
use crate::session::{SessionContext, SessionTurn};

/// One retrieval request. Unset fields fall back to the orchestrator's
/// configuration.
#[derive(Debug, Clone, Default)]
pub struct RetrievalRequest {
    pub query: String,
    pub top_k: Option<usize>,
    pub filter: Option<SearchFilter>,
    pub config: Option<RetrievalConfig>,
}

impl RetrievalRequest {
    pub fn new(query: impl Into<String>) -> Self { Self { query: query.into(), ..Self::default() } }

    #[must_use]
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: SearchFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn config(mut self, config: RetrievalConfig) -> Self {
        self.config = Some(config);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalResponse {
    pub results: Vec<RetrievedChunk>,
    pub report: PipelineReport,
}

#[derive(Default)]
pub struct OrchestratorBuilder {
    corpus: Option<Arc<dyn ChunkCorpus>>,
    config: RetrievalConfig,
    lexical: Option<Arc<dyn Retriever>>,
    vector: Option<Arc<dyn Retriever>>,
    reranker: Reranker,
    expander: Option<Arc<dyn QueryExpander>>,
}

impl OrchestratorBuilder {
    pub fn new(corpus: Arc<dyn ChunkCorpus>) -> Self { Self { corpus: Some(corpus), ..Self::default() } }

    #[must_use]
    pub fn config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn lexical(mut self, source: Arc<dyn Retriever>) -> Self {
        self.lexical = Some(source);
        self
    }

    #[must_use]
    pub fn vector(mut self, source: Arc<dyn Retriever>) -> Self {
        self.vector = Some(source);
        self
    }

    #[must_use]
    pub fn reranker(mut self, reranker: Reranker) -> Self {
        self.reranker = reranker;
        self
    }

    #[must_use]
    pub fn expander(mut self, expander: Arc<dyn QueryExpander>) -> Self {
        self.expander = Some(expander);
        self
    }

    /// Validates the configuration; invalid fusion weights or an unknown
    /// strategy fail here, before any request is served.
    pub fn build(self) -> Result<Orchestrator> {
        self.config.validate()?;
        let corpus = self.corpus.ok_or_else(|| RetrievalError::InvalidConfig("orchestrator needs a chunk corpus".into()))?;
        let mut hybrid = HybridRetriever::default();
        if let Some(l) = self.lexical {
            hybrid = hybrid.with_lexical(l);
        }
        if let Some(v) = self.vector {
            hybrid = hybrid.with_vector(v);
        }
        info!(
            method = ?self.config.method,
            fusion = ?self.config.fusion_strategy,
            rerank = self.reranker.is_available(),
            expand = self.expander.is_some(),
            "orchestrator ready"
        );
        Ok(Orchestrator { corpus, hybrid, reranker: self.reranker, expander: self.expander, config: self.config })
    }
}

/// Stateless between requests: concurrent calls share only read-only
/// indices and collaborators.
pub struct Orchestrator {
    corpus: Arc<dyn ChunkCorpus>,
    hybrid: HybridRetriever,
    reranker: Reranker,
    expander: Option<Arc<dyn QueryExpander>>,
    config: RetrievalConfig,
}

impl Orchestrator {
    pub fn builder(corpus: Arc<dyn ChunkCorpus>) -> OrchestratorBuilder { OrchestratorBuilder::new(corpus) }

    pub fn config(&self) -> &RetrievalConfig { &self.config }

    pub fn corpus(&self) -> &dyn ChunkCorpus { self.corpus.as_ref() }

    /// Ranked chunks for `query`, most relevant first. No match is an empty
    /// list, never an error.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&SearchFilter>,
        config: Option<&RetrievalConfig>,
    ) -> Result<Vec<RetrievedChunk>> {
        let request = RetrievalRequest { query: query.to_string(), top_k: Some(top_k), filter: filter.cloned(), config: config.cloned() };
        Ok(self.run(request).await?.results)
    }

    /// Runs the pipeline and returns the results with a per-stage report.
    pub async fn run(&self, request: RetrievalRequest) -> Result<RetrievalResponse> {
        let started = Instant::now();
        let mut report = PipelineReport::default();
        let mut state = self.init(request)?;
        report.completed.push(Stage::Init);

        if state.top_k == 0 {
            report.skipped.extend(PIPELINE);
            return Ok(RetrievalResponse { results: Vec::new(), report });
        }

        for stage in PIPELINE {
            if self.skips(stage, &state) {
                debug!(%stage, "stage skipped");
                report.skipped.push(stage);
                continue;
            }
            let next = match stage {
                Stage::Init => Ok(state.clone()),
                Stage::Expand => self.expand(&state).await,
                Stage::Retrieve => self.retrieve_stage(&state).await,
                Stage::Merge => Ok(merge(&state)),
                Stage::Fuse => fuse(&state),
                Stage::Rerank => self.rerank(&state).await,
                Stage::Select => self.select(&state),
            };
            match next {
                Ok(s) => {
                    state = s;
                    report.completed.push(stage);
                }
                Err(e) => {
                    warn!(%stage, error = %e, "stage degraded");
                    report.degraded.push((stage, e.to_string()));
                }
            }
        }

        // A skipped or failed select still has to honour top_k.
        if !report.completed.contains(&Stage::Select) {
            state.results = self.resolve(&state, state.top_k);
        }

        report.variants = state.query.variants.clone();
        report.intent = state.query.intent.clone();
        report.source_failures = state.source_failures;
        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            query = %state.query.text,
            results = state.results.len(),
            degraded = report.degraded.len(),
            elapsed_ms = report.elapsed_ms,
            "retrieval done"
        );
        Ok(RetrievalResponse { results: state.results, report })
    }

    /// Runs a request and records it as a turn of `session`.
    pub async fn run_in_session(&self, session: &mut SessionContext, request: RetrievalRequest) -> Result<RetrievalResponse> {
        let response = self.run(request).await?;
        session.record(SessionTurn {
            query: response.report.variants.first().cloned().unwrap_or_default(),
            intent: response.report.intent.clone(),
            chunk_ids: response.results.iter().map(|r| r.chunk_id.clone()).collect(),
            at: chrono::Utc::now(),
        });
        Ok(response)
    }

    fn init(&self, request: RetrievalRequest) -> Result<PipelineState> {
        let text = request.query.trim();
        if text.is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }
        let config = match request.config {
            Some(c) => {
                c.validate()?;
                c
            }
            None => self.config.clone(),
        };
        let top_k = request.top_k.unwrap_or(config.top_k);
        let pool_k = if config.rerank && self.reranker.is_available() { top_k.saturating_mul(2) } else { top_k };
        debug!(query = text, top_k, pool_k, method = ?config.method, "request accepted");
        Ok(PipelineState::new(Query::new(text), request.filter, config, top_k, pool_k))
    }

    fn skips(&self, stage: Stage, state: &PipelineState) -> bool {
        match stage {
            Stage::Expand => !state.config.expand || state.config.max_variants <= 1 || self.expander.is_none(),
            Stage::Rerank => !state.config.rerank || !self.reranker.is_available() || state.fused.is_empty(),
            _ => false,
        }
    }

    async fn expand(&self, state: &PipelineState) -> Result<PipelineState> {
        let Some(expander) = self.expander.clone() else { return Ok(state.clone()) };
        let text = state.query.text.clone();
        let wanted = state.config.max_variants.saturating_sub(1);
        let timeout = state.config.source_timeout();
        let task = tokio::task::spawn_blocking(move || expander.expand(&text, wanted));
        let expansion = match tokio::time::timeout(timeout, task).await {
            Err(_) => return Err(RetrievalError::Timeout { what: "query expansion".into(), after: timeout }),
            Ok(Err(join)) => return Err(RetrievalError::ModelUnavailable(join.to_string())),
            Ok(Ok(Err(e))) => return Err(RetrievalError::ModelUnavailable(format!("{e:#}"))),
            Ok(Ok(Ok(expansion))) => expansion,
        };
        let mut next = state.clone();
        next.query.variants = build_variants(&state.query.text, &expansion, state.config.max_variants);
        next.query.intent = expansion.intent;
        debug!(variants = next.query.variants.len(), "query variants");
        Ok(next)
    }

    async fn retrieve_stage(&self, state: &PipelineState) -> Result<PipelineState> {
        let calls = state
            .query
            .variants
            .iter()
            .map(|v| self.hybrid.gather(v, state.top_k, state.filter.as_ref(), &state.config));
        let gathered: Vec<SourceLists> = join_all(calls).await;

        let mut next = state.clone();
        next.per_variant = gathered.iter().map(|g| g.lists.clone()).collect();
        for (kind, reason) in gathered.into_iter().flat_map(|g| g.failures) {
            if !next.source_failures.iter().any(|(k, _)| *k == kind) {
                next.source_failures.push((kind, reason));
            }
        }
        if next.per_variant.iter().all(Vec::is_empty) {
            let kind = next.source_failures.first().map_or(SourceKind::Lexical, |(k, _)| *k);
            return Err(RetrievalError::SourceUnavailable { source_kind: kind, reason: "every retrieval source failed".into() });
        }
        Ok(next)
    }

    async fn rerank(&self, state: &PipelineState) -> Result<PipelineState> {
        let reranker = self.reranker.clone().with_max_chars(state.config.rerank_max_chars).with_timeout(state.config.rerank_timeout());
        let reranked = reranker.try_rerank(&state.query.text, &state.fused, self.corpus.as_ref(), state.top_k).await?;
        let mut next = state.clone();
        next.fused = reranked;
        Ok(next)
    }

    fn select(&self, state: &PipelineState) -> Result<PipelineState> {
        let mut next = state.clone();
        let resolved = self.resolve(state, state.fused.len());
        let kept: Vec<RetrievedChunk> = match state.config.score_threshold {
            Some(t) => resolved.into_iter().filter(|r| r.score >= t).take(state.top_k).collect(),
            None => resolved.into_iter().take(state.top_k).collect(),
        };
        next.results = DiversitySelector::new(state.config.diversity).select(kept);
        Ok(next)
    }

    /// Looks fused ids up in the corpus, dropping ids it does not hold.
    fn resolve(&self, state: &PipelineState, limit: usize) -> Vec<RetrievedChunk> {
        let mut out = Vec::with_capacity(limit.min(state.fused.len()));
        for r in state.fused.iter().take(limit) {
            match self.corpus.get(&r.chunk_id) {
                Some(chunk) => out.push(RetrievedChunk::from_chunk(chunk, r.score, out.len())),
                None => warn!(chunk = %r.chunk_id, "fused chunk missing from corpus"),
            }
        }
        out
    }
}

/// Per source, collapses the variants' lists into one, keeping each chunk's
/// best score.
fn merge(state: &PipelineState) -> PipelineState {
    let mut kinds: Vec<SourceKind> = Vec::new();
    for lists in &state.per_variant {
        for (kind, _) in lists {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
    }
    // Fusion weights follow the planned source order, not arrival order.
    let order = HybridRetriever::planned_sources(&state.config);
    kinds.sort_by_key(|k| order.iter().position(|o| o == k).unwrap_or(usize::MAX));

    let mut next = state.clone();
    next.merged = kinds
        .into_iter()
        .map(|kind| {
            let lists = state.per_variant.iter().flat_map(|v| v.iter().filter(|(k, _)| *k == kind).map(|(_, l)| l.clone()));
            (kind, merge_variants(lists))
        })
        .collect();
    next
}

fn fuse(state: &PipelineState) -> Result<PipelineState> {
    let lists = SourceLists { lists: state.merged.clone(), failures: Vec::new() };
    let mut next = state.clone();
    next.fused = HybridRetriever::fuse_lists(&lists, &state.config, state.pool_k)?;
    debug!(fused = next.fused.len(), pool = state.pool_k, "fused");
    Ok(next)
}
