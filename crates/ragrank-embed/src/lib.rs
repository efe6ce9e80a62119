//! ragrank-embed
//!
//! Embedding providers. Model inference lives outside this workspace; the
//! `HashingEmbedder` gives deterministic, L2-normalized vectors so the rest
//! of the engine can run offline and in tests.

use anyhow::{anyhow, Result};
use std::hash::{Hash, Hasher};
use tracing::debug;
use twox_hash::XxHash64;

use ragrank_core::traits::Embedder;

pub const DEFAULT_DIM: usize = 384;

/// Feature-hashing embedder: every token lands in one of `dim` buckets.
/// Texts sharing tokens get positive cosine similarity; identical texts get
/// identical vectors.
pub struct HashingEmbedder { dim: usize, max_len: usize }

impl HashingEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 { return Err(anyhow!("embedding dimension must be positive")); }
        Ok(Self { dim, max_len: 512 })
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .take(self.max_len);
        for token in tokens {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 { for x in &mut v { *x /= norm; } }
        v
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!(batch = texts.len(), dim = self.dim, "hashing embedder batch");
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// The embedder used when no external provider is configured.
pub fn get_default_embedder(dim: Option<usize>) -> Result<Box<dyn Embedder>> {
    Ok(Box::new(HashingEmbedder::new(dim.unwrap_or(DEFAULT_DIM))?))
}
