use std::collections::HashMap;

use tracing::debug;

use ragrank_core::traits::Retriever;
use ragrank_core::types::{rank_order, Candidate, SearchFilter, SourceKind};

use crate::index::Bm25Index;
use crate::tokenize::tokenize;

impl Bm25Index {
    /// Top `k` chunks by BM25 score. Only chunks with a positive score are
    /// returned, so a chunk sharing no term with the query never appears.
    pub fn retrieve(&self, query: &str, k: usize, filter: Option<&SearchFilter>) -> Vec<Candidate> {
        if self.docs.is_empty() || k == 0 || self.avg_doc_length <= 0.0 {
            return Vec::new();
        }
        let terms = tokenize(query);
        let mut scores: HashMap<usize, f32> = HashMap::new();
        for term in &terms {
            let (Some(posting), Some(&idf)) = (self.postings.get(term), self.idf.get(term)) else { continue };
            if idf <= 0.0 {
                continue;
            }
            for (&doc, &tf) in posting {
                *scores.entry(doc).or_insert(0.0) += idf * self.term_weight(tf, self.docs[doc].len);
            }
        }

        let mut hits: Vec<(usize, f32)> = scores
            .into_iter()
            .filter(|(_, s)| *s > 0.0 && s.is_finite())
            .filter(|(doc, _)| filter.is_none_or(|f| f.matches(&self.docs[*doc].chunk)))
            .collect();
        hits.sort_by(|a, b| rank_order((a.1, 0, self.docs[a.0].chunk.id.as_str()), (b.1, 0, self.docs[b.0].chunk.id.as_str())));
        hits.truncate(k);
        debug!(query, terms = terms.len(), hits = hits.len(), "bm25 retrieve");

        hits.into_iter()
            .enumerate()
            .map(|(rank, (doc, score))| Candidate::new(self.docs[doc].chunk.id.clone(), score, SourceKind::Lexical, rank))
            .collect()
    }

    /// BM25 score of one chunk for `query`, 0 when it shares no term.
    pub fn score(&self, query: &str, chunk_id: &str) -> f32 {
        let Some(&doc) = self.by_id.get(chunk_id) else { return 0.0 };
        if self.avg_doc_length <= 0.0 {
            return 0.0;
        }
        tokenize(query)
            .iter()
            .filter_map(|t| {
                let tf = *self.postings.get(t)?.get(&doc)?;
                Some(self.idf.get(t).copied().unwrap_or(0.0) * self.term_weight(tf, self.docs[doc].len))
            })
            .sum()
    }

    fn term_weight(&self, tf: u32, doc_len: usize) -> f32 {
        let (k1, b) = (self.params.k1, self.params.b);
        let tf = tf as f32;
        let norm = 1.0 - b + b * (doc_len as f32 / self.avg_doc_length);
        (tf * (k1 + 1.0)) / (tf + k1 * norm)
    }
}

impl Retriever for Bm25Index {
    fn kind(&self) -> SourceKind { SourceKind::Lexical }

    fn retrieve(&self, query: &str, k: usize, filter: Option<&SearchFilter>) -> anyhow::Result<Vec<Candidate>> {
        Ok(Bm25Index::retrieve(self, query, k, filter))
    }
}
