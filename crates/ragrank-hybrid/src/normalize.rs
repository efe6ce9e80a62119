use ragrank_core::types::Candidate;

/// Min-max scales one batch of scores into `[0, 1]`.
///
/// When every finite input is equal (a single element, all zeros, ...) each
/// one maps to `1.0`. Non-finite inputs map to `0.0`, so the output is always
/// finite.
pub fn min_max(scores: &[f32]) -> Vec<f32> {
    let (min, max) = scores
        .iter()
        .filter(|s| s.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| (lo.min(f64::from(s)), hi.max(f64::from(s))));
    scores
        .iter()
        .map(|&s| {
            if !s.is_finite() {
                0.0
            } else if max == min {
                1.0
            } else {
                (((f64::from(s) - min) / (max - min)) as f32).clamp(0.0, 1.0)
            }
        })
        .collect()
}

/// `(chunk_id, normalized)` for one source's candidate list, order kept.
pub fn normalize_candidates(candidates: &[Candidate]) -> Vec<(&str, f32)> {
    let raw: Vec<f32> = candidates.iter().map(|c| c.raw_score).collect();
    candidates.iter().map(|c| c.chunk_id.as_str()).zip(min_max(&raw)).collect()
}
