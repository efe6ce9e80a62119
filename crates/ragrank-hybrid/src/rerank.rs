use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use ragrank_core::error::{Result, RetrievalError};
use ragrank_core::traits::{ChunkCorpus, CrossEncoder};
use ragrank_core::types::ScoredResult;

use crate::fusion::sort_ranked;

pub const DEFAULT_MAX_CHARS: usize = 400;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Cross-encoder reranking over fused results.
///
/// Scores are replaced by the model's relevance probability, never blended.
/// Without a model the reranker passes its input through untouched.
#[derive(Clone)]
pub struct Reranker {
    model: Option<Arc<dyn CrossEncoder>>,
    max_chars: usize,
    timeout: Duration,
}

impl Default for Reranker {
    fn default() -> Self { Self::disabled() }
}

impl Reranker {
    pub fn new(model: Arc<dyn CrossEncoder>) -> Self {
        Self { model: Some(model), max_chars: DEFAULT_MAX_CHARS, timeout: DEFAULT_TIMEOUT }
    }

    pub fn disabled() -> Self { Self { model: None, max_chars: DEFAULT_MAX_CHARS, timeout: DEFAULT_TIMEOUT } }

    #[must_use]
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_available(&self) -> bool { self.model.is_some() }

    /// Scores every `(query, passage)` pair in one batched call, re-sorts by
    /// the new scores and keeps `top_k`. Fails with `ModelUnavailable` or
    /// `Timeout`; callers decide whether to fall back.
    pub async fn try_rerank(
        &self,
        query: &str,
        results: &[ScoredResult],
        corpus: &dyn ChunkCorpus,
        top_k: usize,
    ) -> Result<Vec<ScoredResult>> {
        let Some(model) = self.model.clone() else {
            return Err(RetrievalError::ModelUnavailable("no cross-encoder configured".into()));
        };
        if results.is_empty() {
            return Ok(Vec::new());
        }

        let pairs: Vec<(String, String)> = results
            .iter()
            .map(|r| {
                let passage = corpus.get(&r.chunk_id).map(|c| truncate_at_word(&c.content, self.max_chars)).unwrap_or_default();
                (query.to_string(), passage.to_string())
            })
            .collect();

        let task = tokio::task::spawn_blocking(move || model.score_pairs(&pairs));
        let logits = match tokio::time::timeout(self.timeout, task).await {
            Err(_) => return Err(RetrievalError::Timeout { what: "cross-encoder".into(), after: self.timeout }),
            Ok(Err(join)) => return Err(RetrievalError::ModelUnavailable(join.to_string())),
            Ok(Ok(Err(e))) => return Err(RetrievalError::ModelUnavailable(format!("{e:#}"))),
            Ok(Ok(Ok(logits))) => logits,
        };
        if logits.len() != results.len() {
            return Err(RetrievalError::ModelUnavailable(format!(
                "cross-encoder returned {} scores for {} passages",
                logits.len(),
                results.len()
            )));
        }

        let mut out: Vec<ScoredResult> = results
            .iter()
            .zip(logits)
            .map(|(r, logit)| ScoredResult { score: probability(logit), ..r.clone() })
            .collect();
        sort_ranked(&mut out);
        out.truncate(top_k);
        debug!(passages = results.len(), kept = out.len(), "reranked");
        Ok(out)
    }

    /// Like [`Reranker::try_rerank`] but never fails: any model problem
    /// returns `results` in their incoming order.
    pub async fn rerank(&self, query: &str, results: Vec<ScoredResult>, corpus: &dyn ChunkCorpus, top_k: usize) -> Vec<ScoredResult> {
        match self.try_rerank(query, &results, corpus, top_k).await {
            Ok(reranked) => reranked,
            Err(e) => {
                if self.is_available() {
                    warn!(error = %e, "rerank skipped, keeping fused order");
                }
                results
            }
        }
    }
}

/// Logistic mapping of a relevance logit to [0, 1]. NaN scores 0.
pub fn probability(logit: f32) -> f32 {
    if logit.is_nan() {
        return 0.0;
    }
    1.0 / (1.0 + (-logit).exp())
}

/// Cuts `text` to at most `max_chars` characters, backing up to the last
/// whitespace so no word is split. A first word longer than the limit is
/// kept whole.
pub fn truncate_at_word(text: &str, max_chars: usize) -> &str {
    let text = text.trim();
    let Some((cut, _)) = text.char_indices().nth(max_chars) else { return text };
    let head = &text[..cut];
    if text[cut..].starts_with(char::is_whitespace) {
        return head.trim_end();
    }
    match head.rfind(char::is_whitespace) {
        Some(ws) => head[..ws].trim_end(),
        None => text.split(char::is_whitespace).next().unwrap_or(text),
    }
}
