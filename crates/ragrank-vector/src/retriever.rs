use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::debug;

use ragrank_core::traits::{Embedder, Retriever, VectorStore};
use ragrank_core::types::{rank_order, Candidate, SearchFilter, SourceKind};

/// Thin adapter: embed the query, search the store, hand back candidates.
pub struct VectorRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl VectorRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self { Self { embedder, store } }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }
}

impl Retriever for VectorRetriever {
    fn kind(&self) -> SourceKind { SourceKind::Vector }

    fn retrieve(&self, query: &str, k: usize, filter: Option<&SearchFilter>) -> Result<Vec<Candidate>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let q_vec = self
            .embedder
            .embed_batch(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("embedder returned no vector for the query"))?;
        if q_vec.len() != self.embedder.dim() {
            return Err(anyhow!("query vector has {} dims, embedder declares {}", q_vec.len(), self.embedder.dim()));
        }
        let matches = self.store.search(&q_vec, k, filter)?;

        // Stores may repeat an id (e.g. several vectors per chunk); keep the best.
        let mut best: HashMap<String, f32> = HashMap::new();
        for m in matches.into_iter().filter(|m| m.score.is_finite()) {
            best.entry(m.id).and_modify(|s| *s = s.max(m.score)).or_insert(m.score);
        }
        let mut hits: Vec<(String, f32)> = best.into_iter().collect();
        hits.sort_by(|a, b| rank_order((a.1, 0, a.0.as_str()), (b.1, 0, b.0.as_str())));
        hits.truncate(k);
        debug!(hits = hits.len(), "vector retrieve");
        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(rank, (id, score))| Candidate::new(id, score, SourceKind::Vector, rank))
            .collect())
    }
}
