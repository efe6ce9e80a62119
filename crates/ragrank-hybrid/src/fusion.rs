//! Combining ranked lists from independent sources.
//!
//! Both strategies deduplicate each input list by chunk id (best score wins)
//! before combining, and both emit results sorted by fused score, then by
//! coverage (number of lists the chunk appeared in), then by chunk id.

use std::collections::HashMap;

use ragrank_core::error::{Result, RetrievalError};
use ragrank_core::settings::{FusionPolicy, FusionStrategy};
use ragrank_core::types::{rank_order, Candidate, ScoredResult};

use crate::merge::dedup_max;
use crate::normalize::normalize_candidates;

pub trait Fusion: Send + Sync {
    fn fuse(&self, lists: &[Vec<Candidate>]) -> Result<Vec<ScoredResult>>;
}

/// `fused = Σ weight_i * minmax_i(doc)`
pub struct WeightedFusion {
    weights: Vec<f32>,
}

impl WeightedFusion {
    pub fn new(weights: Vec<f32>) -> Result<Self> {
        let policy = FusionPolicy::weighted(weights)?;
        Ok(Self { weights: policy.weights })
    }
}

impl Fusion for WeightedFusion {
    fn fuse(&self, lists: &[Vec<Candidate>]) -> Result<Vec<ScoredResult>> {
        if lists.len() != self.weights.len() {
            return Err(RetrievalError::FusionConfig(format!(
                "{} weights configured for {} result lists",
                self.weights.len(),
                lists.len()
            )));
        }
        let mut acc = Accumulator::default();
        for (list, &w) in lists.iter().zip(&self.weights) {
            let list = dedup_max(list.clone());
            for (id, norm) in normalize_candidates(&list) {
                acc.add(id, w * norm);
            }
        }
        Ok(acc.finish())
    }
}

/// `fused = Σ 1 / (k + rank + 1)` over the lists a chunk appears in, with
/// 0-based ranks. Scale-free, so lists need no normalization.
pub struct ReciprocalRankFusion {
    k: u32,
}

impl ReciprocalRankFusion {
    pub fn new(k: u32) -> Self { Self { k } }
}

impl Fusion for ReciprocalRankFusion {
    fn fuse(&self, lists: &[Vec<Candidate>]) -> Result<Vec<ScoredResult>> {
        let k = self.k as f32;
        let mut acc = Accumulator::default();
        for list in lists {
            for c in dedup_max(list.clone()) {
                acc.add(&c.chunk_id, 1.0 / (k + c.source_rank as f32 + 1.0));
            }
        }
        Ok(acc.finish())
    }
}

/// The fusion implementation a policy selects.
pub fn fusion_for(policy: &FusionPolicy) -> Result<Box<dyn Fusion>> {
    Ok(match policy.strategy {
        FusionStrategy::Weighted => Box::new(WeightedFusion::new(policy.weights.clone())?),
        FusionStrategy::Rrf => Box::new(ReciprocalRankFusion::new(policy.rrf_k)),
    })
}

/// Fuses `lists` under `policy` and keeps the best `top_k`.
pub fn fuse(lists: &[Vec<Candidate>], policy: &FusionPolicy, top_k: usize) -> Result<Vec<ScoredResult>> {
    let mut fused = fusion_for(policy)?.fuse(lists)?;
    fused.truncate(top_k);
    Ok(fused)
}

#[derive(Default)]
struct Accumulator {
    by_id: HashMap<String, (f32, usize)>,
}

impl Accumulator {
    fn add(&mut self, id: &str, score: f32) {
        let e = self.by_id.entry(id.to_string()).or_insert((0.0, 0));
        e.0 += score;
        e.1 += 1;
    }

    fn finish(self) -> Vec<ScoredResult> {
        let mut out: Vec<ScoredResult> = self
            .by_id
            .into_iter()
            .map(|(chunk_id, (score, coverage))| ScoredResult { chunk_id, score, coverage, final_rank: 0 })
            .collect();
        sort_ranked(&mut out);
        out
    }
}

/// Sorts by score, coverage, chunk id and renumbers `final_rank`.
pub fn sort_ranked(results: &mut [ScoredResult]) {
    results.sort_by(|a, b| rank_order((a.score, a.coverage, a.chunk_id.as_str()), (b.score, b.coverage, b.chunk_id.as_str())));
    for (rank, r) in results.iter_mut().enumerate() {
        r.final_rank = rank;
    }
}
