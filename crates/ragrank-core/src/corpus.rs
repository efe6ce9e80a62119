//! In-memory chunk corpus keyed by chunk id.

use std::collections::HashMap;

use crate::error::{Result, RetrievalError};
use crate::traits::ChunkCorpus;
use crate::types::Chunk;

#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    chunks: HashMap<String, Chunk>,
    order: Vec<String>,
}

impl InMemoryCorpus {
    /// Builds a corpus, rejecting duplicate chunk ids.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Result<Self> {
        let mut corpus = Self::default();
        for c in chunks {
            if corpus.chunks.contains_key(&c.id) {
                return Err(RetrievalError::DuplicateChunk(c.id));
            }
            corpus.order.push(c.id.clone());
            corpus.chunks.insert(c.id.clone(), c);
        }
        Ok(corpus)
    }

    /// Chunks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.order.iter().filter_map(|id| self.chunks.get(id))
    }
}

impl ChunkCorpus for InMemoryCorpus {
    fn get(&self, id: &str) -> Option<&Chunk> { self.chunks.get(id) }
    fn len(&self) -> usize { self.chunks.len() }
}
