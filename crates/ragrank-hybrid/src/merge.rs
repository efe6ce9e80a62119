use std::collections::HashMap;

use ragrank_core::types::{rank_order, Candidate};

/// Collapses repeated chunk ids to the highest-scoring occurrence, then
/// re-sorts by score and renumbers `source_rank`.
pub fn dedup_max(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut best: HashMap<String, Candidate> = HashMap::with_capacity(candidates.len());
    for c in candidates {
        if !c.raw_score.is_finite() {
            continue;
        }
        match best.get_mut(&c.chunk_id) {
            Some(old) if c.raw_score > old.raw_score => *old = c,
            Some(_) => {}
            None => { best.insert(c.chunk_id.clone(), c); }
        }
    }
    let mut out: Vec<Candidate> = best.into_values().collect();
    out.sort_by(|a, b| rank_order((a.raw_score, 0, a.chunk_id.as_str()), (b.raw_score, 0, b.chunk_id.as_str())));
    for (rank, c) in out.iter_mut().enumerate() {
        c.source_rank = rank;
    }
    out
}

/// Merges one source's lists across query variants, keeping each chunk's
/// best score. Runs before fusion: it widens recall, it does not rank.
pub fn merge_variants<I>(lists: I) -> Vec<Candidate>
where
    I: IntoIterator<Item = Vec<Candidate>>,
{
    dedup_max(lists.into_iter().flatten().collect())
}
