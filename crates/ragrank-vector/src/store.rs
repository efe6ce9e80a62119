use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::info;

use ragrank_core::traits::{Embedder, VectorMatch, VectorStore};
use ragrank_core::types::{rank_order, Chunk, Meta, SearchFilter};

const EMBED_BATCH: usize = 64;

struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Exact cosine search over every stored vector. Only strictly positive
/// similarities are returned.
pub struct InMemoryVectorStore {
    dim: usize,
    entries: Vec<Entry>,
}

impl InMemoryVectorStore {
    pub fn new(dim: usize) -> Self { Self { dim, entries: Vec::new() } }

    /// Embeds every chunk's content with `embedder` and stores it.
    pub fn from_chunks(chunks: &[Chunk], embedder: &dyn Embedder) -> Result<Self> {
        let mut store = Self::new(embedder.dim());
        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = embedder.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(anyhow!("embedder returned {} vectors for {} texts", vectors.len(), batch.len()));
            }
            for (chunk, vector) in batch.iter().zip(vectors) {
                store.insert(chunk.clone(), vector)?;
            }
        }
        info!(vectors = store.len(), dim = store.dim, "in-memory vector store built");
        Ok(store)
    }

    pub fn insert(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dim {
            return Err(anyhow!("vector for '{}' has {} dims, store expects {}", chunk.id, vector.len(), self.dim));
        }
        self.entries.push(Entry { chunk, vector });
        Ok(())
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn dim(&self) -> usize { self.dim }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

fn payload(chunk: &Chunk) -> Meta {
    let mut p = chunk.metadata.clone();
    p.insert("page".into(), Value::from(chunk.page));
    p.insert("type".into(), Value::from(chunk.chunk_type.to_string()));
    p
}

impl VectorStore for InMemoryVectorStore {
    fn search(&self, vector: &[f32], k: usize, filter: Option<&SearchFilter>) -> Result<Vec<VectorMatch>> {
        if vector.len() != self.dim {
            return Err(anyhow!("query vector has {} dims, store expects {}", vector.len(), self.dim));
        }
        let mut scored: Vec<(&Entry, f32)> = self
            .entries
            .iter()
            .filter(|e| filter.is_none_or(|f| f.matches(&e.chunk)))
            .map(|e| (e, cosine(vector, &e.vector)))
            .filter(|(_, s)| *s > 0.0)
            .collect();
        scored.sort_by(|a, b| rank_order((a.1, 0, a.0.chunk.id.as_str()), (b.1, 0, b.0.chunk.id.as_str())));
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(e, score)| VectorMatch { id: e.chunk.id.clone(), score, payload: payload(&e.chunk) })
            .collect())
    }
}
