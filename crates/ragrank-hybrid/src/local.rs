use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use ragrank_core::corpus::InMemoryCorpus;
use ragrank_core::settings::{LexicalBackend, RetrievalConfig};
use ragrank_core::traits::{ChunkCorpus, Embedder, Retriever};
use ragrank_core::types::Chunk;
use ragrank_text::{Bm25Index, IndexStats, TantivyKeywordIndex};
use ragrank_vector::{InMemoryVectorStore, VectorRetriever};

use crate::orchestrator::OrchestratorBuilder;

/// Fully in-process indices over one chunk set: a lexical source picked by
/// `lexical_backend`, a cosine vector store, and the corpus itself.
pub struct LocalIndex {
    pub corpus: Arc<InMemoryCorpus>,
    pub lexical: Arc<dyn Retriever>,
    pub vector: Arc<dyn Retriever>,
    pub stats: IndexStats,
}

impl LocalIndex {
    pub fn build(chunks: Vec<Chunk>, embedder: Arc<dyn Embedder>, config: &RetrievalConfig) -> Result<Self> {
        let bm25 = Bm25Index::build(&chunks, config.bm25);
        let stats = bm25.stats();
        let lexical: Arc<dyn Retriever> = match config.lexical_backend {
            LexicalBackend::Bm25 => Arc::new(bm25),
            LexicalBackend::Tantivy => Arc::new(TantivyKeywordIndex::build(&chunks)?),
        };
        let store = InMemoryVectorStore::from_chunks(&chunks, embedder.as_ref())?;
        let vector: Arc<dyn Retriever> = Arc::new(VectorRetriever::new(embedder, Arc::new(store)));
        let corpus = Arc::new(InMemoryCorpus::from_chunks(chunks)?);
        info!(chunks = corpus.len(), backend = ?config.lexical_backend, "local index built");
        Ok(Self { corpus, lexical, vector, stats })
    }

    /// A builder preloaded with this index's sources and `config`.
    pub fn orchestrator(&self, config: RetrievalConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(self.corpus.clone())
            .config(config)
            .lexical(self.lexical.clone())
            .vector(self.vector.clone())
    }
}
