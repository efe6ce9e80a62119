use std::collections::HashMap;

use tracing::{info, warn};

use ragrank_core::settings::Bm25Params;
use ragrank_core::traits::ChunkCorpus;
use ragrank_core::types::Chunk;

use crate::tokenize::tokenize;

pub(crate) struct IndexedDoc {
    pub(crate) chunk: Chunk,
    pub(crate) len: usize,
}

/// In-memory inverted index: `term -> {doc -> tf}` plus per-term idf and the
/// average document length. Read-only once built.
pub struct Bm25Index {
    pub(crate) params: Bm25Params,
    pub(crate) docs: Vec<IndexedDoc>,
    pub(crate) by_id: HashMap<String, usize>,
    pub(crate) postings: HashMap<String, HashMap<usize, u32>>,
    pub(crate) idf: HashMap<String, f32>,
    pub(crate) avg_doc_length: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexStats {
    pub documents: usize,
    pub terms: usize,
    pub avg_doc_length: f32,
}

impl Bm25Index {
    pub fn new(params: Bm25Params) -> Self {
        Self {
            params,
            docs: Vec::new(),
            by_id: HashMap::new(),
            postings: HashMap::new(),
            idf: HashMap::new(),
            avg_doc_length: 0.0,
        }
    }

    /// Builds the index over `chunks` with default parameters.
    pub fn index_documents(chunks: &[Chunk]) -> Self {
        Self::build(chunks, Bm25Params::default())
    }

    pub fn build(chunks: &[Chunk], params: Bm25Params) -> Self {
        let mut index = Self::new(params);
        for c in chunks {
            if index.by_id.contains_key(&c.id) {
                warn!(chunk_id = %c.id, "duplicate chunk id skipped by lexical index");
                continue;
            }
            let terms = tokenize(&c.content);
            let doc = index.docs.len();
            for t in &terms {
                *index.postings.entry(t.clone()).or_default().entry(doc).or_insert(0) += 1;
            }
            index.by_id.insert(c.id.clone(), doc);
            index.docs.push(IndexedDoc { chunk: c.clone(), len: terms.len() });
        }

        let n = index.docs.len();
        if n > 0 {
            let total: usize = index.docs.iter().map(|d| d.len).sum();
            index.avg_doc_length = total as f32 / n as f32;
        }
        index.idf = index
            .postings
            .iter()
            .map(|(term, posting)| (term.clone(), idf(n, posting.len())))
            .collect();
        info!(documents = n, terms = index.postings.len(), avg_doc_length = index.avg_doc_length, "bm25 index built");
        index
    }

    pub fn params(&self) -> Bm25Params { self.params }

    pub fn idf(&self, term: &str) -> Option<f32> { self.idf.get(term).copied() }

    pub fn avg_doc_length(&self) -> f32 { self.avg_doc_length }

    pub fn stats(&self) -> IndexStats {
        IndexStats { documents: self.docs.len(), terms: self.postings.len(), avg_doc_length: self.avg_doc_length }
    }
}

/// `max(0, ln((N - df + 0.5) / (df + 0.5)))`
pub fn idf(n: usize, df: usize) -> f32 {
    let (n, df) = (n as f64, df as f64);
    (((n - df + 0.5) / (df + 0.5)).ln()).max(0.0) as f32
}

impl ChunkCorpus for Bm25Index {
    fn get(&self, id: &str) -> Option<&Chunk> {
        self.by_id.get(id).map(|&i| &self.docs[i].chunk)
    }

    fn len(&self) -> usize { self.docs.len() }
}
