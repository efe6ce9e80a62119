use ragrank_core::traits::{ChunkCorpus, Retriever};
use ragrank_core::types::{Chunk, ChunkType, SearchFilter, SourceKind};
use ragrank_text::index::idf;
use ragrank_text::{tokenize, Bm25Index, TantivyKeywordIndex};

fn three_docs() -> Vec<Chunk> {
    vec![
        Chunk::new("A", "solar inverter efficiency solar inverter", ChunkType::Text, 1),
        Chunk::new("B", "battery storage capacity notes", ChunkType::Table, 2),
        Chunk::new("C", "weather forecast rainy tomorrow", ChunkType::Text, 3),
    ]
}

#[test]
fn tokenizer_lowercases_and_drops_short_tokens() {
    assert_eq!(tokenize("The PV-array's 48V output, at 10kW!"), vec!["the", "array", "48v", "output", "10kw"]);
    assert!(tokenize("a an to of").is_empty());
}

#[test]
fn idf_is_clamped_at_zero() {
    assert!((idf(3, 1) - (2.5f32 / 1.5).ln()).abs() < 1e-6);
    assert_eq!(idf(3, 2), 0.0);
    assert_eq!(idf(3, 3), 0.0);
}

#[test]
fn strong_match_ranks_before_weak_and_non_match_is_excluded() {
    let index = Bm25Index::index_documents(&three_docs());
    let hits = index.retrieve("solar inverter battery", 2, None);
    let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert!(hits[0].raw_score > hits[1].raw_score);
    assert!(hits.iter().all(|h| h.source == SourceKind::Lexical));
    assert_eq!(hits[1].source_rank, 1);

    let wide = index.retrieve("solar inverter battery", 10, None);
    assert_eq!(wide.len(), 2, "C shares no term and is never returned");
    assert_eq!(index.score("solar inverter battery", "C"), 0.0);
}

#[test]
fn scores_follow_the_bm25_formula() {
    let index = Bm25Index::index_documents(&three_docs());
    let avg = 13.0f32 / 3.0;
    let idf = (2.5f32 / 1.5).ln();
    let k1 = 1.5f32;
    let b = 0.75f32;
    let expected_b = idf * (1.0 * (k1 + 1.0)) / (1.0 + k1 * (1.0 - b + b * (4.0 / avg)));
    assert!((index.avg_doc_length() - avg).abs() < 1e-5);
    let hits = index.retrieve("battery", 5, None);
    assert_eq!(hits.len(), 1);
    assert!((hits[0].raw_score - expected_b).abs() < 1e-5);
}

#[test]
fn empty_index_returns_nothing() {
    let index = Bm25Index::index_documents(&[]);
    assert!(index.retrieve("anything at all", 5, None).is_empty());
    assert!(index.is_empty());
}

#[test]
fn type_filter_restricts_results() {
    let index = Bm25Index::index_documents(&three_docs());
    let tables = index.retrieve("solar battery", 5, Some(&SearchFilter::by_type(ChunkType::Table)));
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].chunk_id, "B");
}

#[test]
fn index_doubles_as_chunk_corpus() {
    let index = Bm25Index::index_documents(&three_docs());
    assert_eq!(index.len(), 3);
    assert_eq!(index.get("B").map(|c| c.page), Some(2));
    assert!(index.get("Z").is_none());
    assert_eq!(index.stats().documents, 3);
}

#[test]
fn ties_break_on_chunk_id() {
    let chunks = vec![
        Chunk::new("z", "photovoltaic module", ChunkType::Text, 1),
        Chunk::new("m", "photovoltaic module", ChunkType::Text, 2),
        Chunk::new("q", "unrelated grid topic", ChunkType::Text, 3),
        Chunk::new("r", "another unrelated entry", ChunkType::Text, 4),
        Chunk::new("s", "charge controller sizing", ChunkType::Text, 5),
    ];
    let index = Bm25Index::index_documents(&chunks);
    let ids: Vec<String> = index.retrieve("photovoltaic", 5, None).into_iter().map(|c| c.chunk_id).collect();
    assert_eq!(ids, vec!["m".to_string(), "z".to_string()]);
}

#[test]
fn tantivy_backend_honours_retriever_contract() {
    let index = TantivyKeywordIndex::build(&three_docs()).expect("index");
    let hits = index.retrieve("solar inverter", 5, None).expect("search");
    assert_eq!(hits.first().map(|h| h.chunk_id.as_str()), Some("A"));
    assert!(hits.iter().all(|h| h.raw_score > 0.0));
    assert!(index.retrieve("rainy", 5, Some(&SearchFilter::by_type(ChunkType::Table))).expect("search").is_empty());
    assert!(index.retrieve("", 5, None).expect("search").is_empty());
}

#[test]
fn short_query_terms_match_nothing_in_either_backend() {
    let mut docs = three_docs();
    docs.push(Chunk::new("D", "pv on the roof", ChunkType::Text, 4));
    let bm25 = Bm25Index::index_documents(&docs);
    let tantivy = TantivyKeywordIndex::build(&docs).expect("index");
    for query in ["pv", "on pv", "PV"] {
        assert!(bm25.retrieve(query, 5, None).is_empty(), "bm25 matched '{query}'");
        assert!(tantivy.retrieve(query, 5, None).expect("tantivy").is_empty(), "tantivy matched '{query}'");
    }
    let roof: Vec<String> = tantivy.retrieve("roof", 5, None).expect("tantivy").into_iter().map(|h| h.chunk_id).collect();
    assert_eq!(roof, vec!["D"]);
}
