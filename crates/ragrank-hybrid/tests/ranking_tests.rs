use chrono::{Duration, Utc};

use ragrank_core::settings::{DiversityConfig, FusionPolicy};
use ragrank_core::types::{Candidate, Chunk, ChunkType, RetrievedChunk, SourceKind};
use ragrank_hybrid::fusion::{fuse, Fusion, ReciprocalRankFusion, WeightedFusion};
use ragrank_hybrid::merge::{dedup_max, merge_variants};
use ragrank_hybrid::normalize::min_max;
use ragrank_hybrid::session::{SessionPolicy, SessionStore, SessionTurn};
use ragrank_hybrid::DiversitySelector;

fn lex(id: &str, score: f32, rank: usize) -> Candidate { Candidate::new(id, score, SourceKind::Lexical, rank) }
fn vec_hit(id: &str, score: f32, rank: usize) -> Candidate { Candidate::new(id, score, SourceKind::Vector, rank) }

fn hit(id: &str, score: f32, page: u32, chunk_type: ChunkType) -> RetrievedChunk {
    RetrievedChunk::from_chunk(&Chunk::new(id, id, chunk_type, page), score, 0)
}

#[test]
fn normalization_stays_in_unit_interval() {
    let out = min_max(&[3.0, -1.0, 7.5, 0.0]);
    assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(out[1], 0.0);
    assert_eq!(out[2], 1.0);

    assert_eq!(min_max(&[0.4, 0.4, 0.4]), vec![1.0, 1.0, 1.0]);
    assert_eq!(min_max(&[2.0]), vec![1.0]);
    assert!(min_max(&[]).is_empty());
    assert_eq!(min_max(&[f32::NAN, 1.0, 2.0]), vec![0.0, 0.0, 1.0]);
}

#[test]
fn fusion_output_is_the_union_capped_at_top_k() {
    let lists = vec![
        vec![vec_hit("a", 0.9, 0), vec_hit("b", 0.5, 1), vec_hit("c", 0.1, 2)],
        vec![lex("c", 4.0, 0), lex("d", 2.0, 1)],
    ];
    let policy = FusionPolicy::weighted(vec![0.7, 0.3]).expect("policy");
    assert_eq!(fuse(&lists, &policy, 10).expect("fuse").len(), 4);
    assert_eq!(fuse(&lists, &policy, 2).expect("fuse").len(), 2);
    assert_eq!(fuse(&lists, &FusionPolicy::rrf(60), 3).expect("fuse").len(), 3);
}

#[test]
fn weighted_fusion_combines_normalized_scores() {
    let lists = vec![
        vec![vec_hit("a", 0.9, 0), vec_hit("b", 0.5, 1)],
        vec![lex("b", 4.0, 0), lex("a", 2.0, 1)],
    ];
    let fused = WeightedFusion::new(vec![0.7, 0.3]).expect("weights").fuse(&lists).expect("fuse");
    assert_eq!(fused[0].chunk_id, "a");
    assert!((fused[0].score - 0.7).abs() < 1e-6);
    assert!((fused[1].score - 0.3).abs() < 1e-6);
    assert_eq!(fused[0].coverage, 2);
    assert_eq!(fused[1].final_rank, 1);
}

#[test]
fn weighted_fusion_rejects_mismatched_lists() {
    let fusion = WeightedFusion::new(vec![0.5, 0.5]).expect("weights");
    assert!(fusion.fuse(&[vec![lex("a", 1.0, 0)]]).is_err());
    assert!(WeightedFusion::new(vec![0.6, 0.6]).is_err());
}

#[test]
fn rrf_single_top_hit_scores_one_over_61() {
    let lists = vec![vec![lex("only", 12.0, 0)], vec![]];
    let fused = ReciprocalRankFusion::new(60).fuse(&lists).expect("fuse");
    assert_eq!(fused.len(), 1);
    assert_eq!(fused[0].score, 1.0 / 61.0);
    assert_eq!(fused[0].coverage, 1);
}

#[test]
fn rrf_prefers_chunks_found_by_both_sources() {
    let lists = vec![
        vec![vec_hit("x", 0.9, 0), vec_hit("both", 0.8, 1)],
        vec![lex("y", 9.0, 0), lex("both", 3.0, 1)],
    ];
    let fused = ReciprocalRankFusion::new(60).fuse(&lists).expect("fuse");
    assert_eq!(fused[0].chunk_id, "both");
    // x and y tie on score and coverage; id order decides.
    assert_eq!(fused[1].chunk_id, "x");
    assert_eq!(fused[2].chunk_id, "y");
}

#[test]
fn duplicates_keep_the_higher_score() {
    let merged = dedup_max(vec![lex("a", 1.0, 0), lex("b", 2.0, 1), lex("a", 3.0, 2)]);
    let got: Vec<(&str, f32, usize)> = merged.iter().map(|c| (c.chunk_id.as_str(), c.raw_score, c.source_rank)).collect();
    assert_eq!(got, vec![("a", 3.0, 0), ("b", 2.0, 1)]);

    let across = merge_variants(vec![vec![lex("a", 0.2, 0)], vec![lex("a", 0.6, 0), lex("c", 0.1, 1)]]);
    assert_eq!(across[0].raw_score, 0.6);
    assert_eq!(across.len(), 2);
}

#[test]
fn diversity_caps_at_eight() {
    let candidates: Vec<RetrievedChunk> = (0..20)
        .map(|i| hit(&format!("c{i:02}"), 0.95, i, if i % 2 == 0 { ChunkType::Text } else { ChunkType::Table }))
        .collect();
    let picked = DiversitySelector::default().select(candidates);
    assert_eq!(picked.len(), 8);
    assert!(picked.iter().enumerate().all(|(i, c)| c.rank == i));
}

#[test]
fn diversity_requires_high_score_for_repeated_pages() {
    let candidates = vec![
        hit("a", 0.99, 1, ChunkType::Text),
        hit("b", 0.98, 2, ChunkType::Table),
        hit("c", 0.97, 3, ChunkType::Image),
        hit("d", 0.79, 1, ChunkType::Text),
        hit("e", 0.85, 2, ChunkType::Table),
        hit("f", 0.50, 4, ChunkType::Image),
    ];
    let ids: Vec<String> = DiversitySelector::default().select(candidates).into_iter().map(|c| c.chunk_id).collect();
    assert_eq!(ids, vec!["a", "b", "c", "e", "f"]);
}

#[test]
fn diversity_requires_higher_score_for_repeated_types_after_five() {
    let candidates: Vec<RetrievedChunk> = vec![
        hit("a", 0.99, 1, ChunkType::Text),
        hit("b", 0.98, 2, ChunkType::Text),
        hit("c", 0.97, 3, ChunkType::Text),
        hit("d", 0.96, 4, ChunkType::Text),
        hit("e", 0.95, 5, ChunkType::Text),
        hit("f", 0.85, 6, ChunkType::Text),
        hit("g", 0.60, 7, ChunkType::Image),
    ];
    let ids: Vec<String> = DiversitySelector::default().select(candidates).into_iter().map(|c| c.chunk_id).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d", "e", "g"]);
}

#[test]
fn early_repeats_are_allowed() {
    let cfg = DiversityConfig { max_results: 3, ..DiversityConfig::default() };
    let candidates = vec![hit("a", 0.2, 1, ChunkType::Text), hit("b", 0.1, 1, ChunkType::Text), hit("c", 0.05, 1, ChunkType::Text), hit("d", 0.9, 1, ChunkType::Text)];
    let ids: Vec<String> = DiversitySelector::new(cfg).select(candidates).into_iter().map(|c| c.chunk_id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

fn turn(query: &str, at: chrono::DateTime<Utc>) -> SessionTurn {
    SessionTurn { query: query.into(), intent: Some("procedure".into()), chunk_ids: vec!["a".into()], at }
}

#[test]
fn session_history_is_capped() {
    let mut store = SessionStore::new(SessionPolicy { max_history: 3, ..SessionPolicy::default() });
    let now = Utc::now();
    let session = store.session_at("s1", now);
    for i in 0..5 {
        session.record(turn(&format!("q{i}"), now));
    }
    let queries: Vec<&str> = session.history().iter().map(|t| t.query.as_str()).collect();
    assert_eq!(queries, vec!["q2", "q3", "q4"]);
    assert_eq!(session.topics(), ["procedure".to_string()]);
    assert!(session.summary().contains("Previous query: q4"));
}

#[test]
fn sessions_expire_after_ttl() {
    let mut store = SessionStore::new(SessionPolicy { ttl: Duration::minutes(5), ..SessionPolicy::default() });
    let t0 = Utc::now();
    store.session_at("old", t0);
    store.session_at("fresh", t0 + Duration::minutes(4));
    assert_eq!(store.evict_expired(t0 + Duration::minutes(6)), 1);
    assert!(store.get("old").is_none());
    assert!(store.get("fresh").is_some());
}

#[test]
fn full_store_evicts_least_recently_seen() {
    let mut store = SessionStore::new(SessionPolicy { max_sessions: 2, ..SessionPolicy::default() });
    let t0 = Utc::now();
    store.session_at("a", t0);
    store.session_at("b", t0 + Duration::seconds(1));
    store.session_at("a", t0 + Duration::seconds(2));
    store.session_at("c", t0 + Duration::seconds(3));
    assert_eq!(store.len(), 2);
    assert!(store.get("b").is_none());
    assert!(store.get("a").is_some());
    assert!(store.get("c").is_some());
}

#[test]
fn reading_a_session_does_not_refresh_it() {
    let mut store = SessionStore::new(SessionPolicy { max_sessions: 2, ..SessionPolicy::default() });
    let t0 = Utc::now();
    store.session_at("a", t0);
    store.session_at("b", t0);
    assert!(store.get("a").is_some());
    store.session_at("c", t0);
    assert!(store.get("a").is_none());
    assert_eq!(store.len(), 2);
}

#[test]
fn zero_capacity_store_keeps_one_session() {
    let mut store = SessionStore::new(SessionPolicy { max_sessions: 0, ..SessionPolicy::default() });
    let t0 = Utc::now();
    store.session_at("a", t0).record(turn("first", t0));
    store.session_at("b", t0);
    assert_eq!(store.len(), 1);
    assert!(store.get("b").is_some_and(|s| s.history().is_empty()));
}
