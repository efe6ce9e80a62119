use std::fs;

use tempfile::TempDir;

use ragrank_core::config::{resolve_with_base, Config};
use ragrank_core::settings::{FusionPolicy, FusionStrategy, LexicalBackend};
use ragrank_core::traits::ChunkCorpus;
use ragrank_core::types::SourceKind;
use ragrank_core::{Chunk, ChunkType, InMemoryCorpus, RetrievalConfig, RetrievalError, RetrievalMethod, SearchFilter};

#[test]
fn defaults_match_documented_tunables() {
    let cfg = RetrievalConfig::default();
    assert_eq!(cfg.method, RetrievalMethod::Hybrid);
    assert_eq!(cfg.fusion_strategy, FusionStrategy::Weighted);
    assert!((cfg.weights.vector - 0.7).abs() < 1e-6);
    assert!((cfg.weights.keyword - 0.3).abs() < 1e-6);
    assert_eq!(cfg.rrf_k, 60);
    assert_eq!(cfg.diversity.max_results, 8);
    assert!((cfg.diversity.page_min_score - 0.8).abs() < 1e-6);
    assert!((cfg.diversity.type_min_score - 0.9).abs() < 1e-6);
    cfg.validate().expect("defaults are valid");
}

#[test]
fn source_limit_leaves_fusion_headroom_under_cap() {
    let cfg = RetrievalConfig::default();
    assert_eq!(cfg.source_limit(5), 10);
    assert_eq!(cfg.source_limit(50), 20);
}

#[test]
fn weights_not_summing_to_one_are_a_fusion_config_error() {
    let mut cfg = RetrievalConfig::default();
    cfg.weights.vector = 0.9;
    cfg.weights.keyword = 0.3;
    assert!(matches!(cfg.validate(), Err(RetrievalError::FusionConfig(_))));

    assert!(matches!(FusionPolicy::weighted(vec![0.5, 0.6]), Err(RetrievalError::FusionConfig(_))));
    assert!(matches!(FusionPolicy::weighted(vec![f32::NAN, 1.0]), Err(RetrievalError::FusionConfig(_))));
}

#[test]
fn rrf_ignores_weights() {
    let mut cfg = RetrievalConfig::default();
    cfg.fusion_strategy = FusionStrategy::Rrf;
    cfg.weights.vector = 5.0;
    cfg.validate().expect("weights are unused by rrf");
    let policy = cfg.fusion_policy(&[SourceKind::Vector, SourceKind::Lexical]).expect("policy");
    assert_eq!(policy.rrf_k, 60);
}

#[test]
fn single_source_weighted_policy_uses_full_weight() {
    let cfg = RetrievalConfig::default();
    let policy = cfg.fusion_policy(&[SourceKind::Lexical]).expect("policy");
    assert_eq!(policy.weights, vec![1.0]);
}

#[test]
fn config_file_overrides_defaults() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(
        tmp.path().join("config.toml"),
        r#"
[retrieval]
method = "keyword"
fusion_strategy = "rrf"
top_k = 3
lexical_backend = "tantivy"

[retrieval.diversity]
max_results = 4
"#,
    )
    .expect("write");

    let config = Config::load_from(tmp.path()).expect("load");
    let cfg = config.retrieval().expect("retrieval");
    assert_eq!(cfg.method, RetrievalMethod::Keyword);
    assert_eq!(cfg.fusion_strategy, FusionStrategy::Rrf);
    assert_eq!(cfg.top_k, 3);
    assert_eq!(cfg.lexical_backend, LexicalBackend::Tantivy);
    assert_eq!(cfg.diversity.max_results, 4);
    assert_eq!(cfg.diversity.page_after, 3, "unset nested keys keep defaults");
}

#[test]
fn missing_retrieval_table_yields_defaults() {
    let tmp = TempDir::new().expect("tmp");
    let config = Config::load_from(tmp.path()).expect("load");
    assert_eq!(config.retrieval().expect("retrieval"), RetrievalConfig::default());
}

#[test]
fn unknown_fusion_strategy_is_rejected_at_load_time() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(tmp.path().join("config.toml"), "[retrieval]\nfusion_strategy = \"borda\"\n").expect("write");
    let config = Config::load_from(tmp.path()).expect("load");
    assert!(matches!(config.retrieval(), Err(RetrievalError::FusionConfig(_))));
}

#[test]
fn invalid_file_weights_are_rejected_at_load_time() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(tmp.path().join("config.toml"), "[retrieval.weights]\nvector = 0.2\nkeyword = 0.2\n").expect("write");
    let config = Config::load_from(tmp.path()).expect("load");
    let err = config.retrieval().expect_err("weights sum to 0.4");
    assert!(err.is_terminal());
    assert!(matches!(err, RetrievalError::FusionConfig(_)));
}

#[test]
fn filter_requires_every_set_field() {
    let chunk = Chunk::new("c1", "inverter wiring", ChunkType::Table, 4).with_meta("source", "manual.pdf");
    assert!(SearchFilter::default().matches(&chunk));
    assert!(SearchFilter::by_type(ChunkType::Table).matches(&chunk));
    assert!(!SearchFilter::by_type(ChunkType::Image).matches(&chunk));

    let mut f = SearchFilter { page: Some(4), ..SearchFilter::default() };
    f.metadata.insert("source".into(), "manual.pdf".into());
    assert!(f.matches(&chunk));
    f.metadata.insert("source".into(), "other.pdf".into());
    assert!(!f.matches(&chunk));
}

#[test]
fn chunk_deserializes_with_type_key_and_defaults() {
    let c: Chunk = serde_json::from_str(r#"{"id":"a","content":"x","type":"image"}"#).expect("parse");
    assert_eq!(c.chunk_type, ChunkType::Image);
    assert_eq!(c.page, 0);
    assert!(c.metadata.is_empty());
}

#[test]
fn corpus_rejects_duplicate_ids() {
    let dup = vec![Chunk::new("a", "x", ChunkType::Text, 1), Chunk::new("a", "y", ChunkType::Text, 2)];
    let err = InMemoryCorpus::from_chunks(dup).expect_err("duplicate id");
    assert!(matches!(&err, RetrievalError::DuplicateChunk(id) if id == "a"), "{err}");

    let corpus = InMemoryCorpus::from_chunks(vec![Chunk::new("a", "x", ChunkType::Text, 1)]).expect("corpus");
    assert_eq!(corpus.len(), 1);
    assert_eq!(corpus.get("a").map(|c| c.page), Some(1));
}

#[test]
fn relative_paths_resolve_against_base() {
    let base = std::path::Path::new("/srv/ragrank");
    assert_eq!(resolve_with_base(base, "corpus/chunks.jsonl"), base.join("corpus/chunks.jsonl"));
    assert_eq!(resolve_with_base(base, "/abs/x.jsonl"), std::path::PathBuf::from("/abs/x.jsonl"));
}

#[test]
fn zero_timeouts_are_rejected() {
    let cfg = RetrievalConfig { source_timeout_ms: 0, ..RetrievalConfig::default() };
    assert!(matches!(cfg.validate(), Err(RetrievalError::InvalidConfig(_))));
    let cfg = RetrievalConfig { rerank_timeout_ms: 0, ..RetrievalConfig::default() };
    assert!(matches!(cfg.validate(), Err(RetrievalError::InvalidConfig(_))));
    let cfg = RetrievalConfig { source_timeout_ms: 1, rerank_timeout_ms: 1, ..RetrievalConfig::default() };
    assert!(cfg.validate().is_ok());
}
