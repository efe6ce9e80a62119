use std::fs;

use ragrank_cli::{corpus_files, load_chunks, parse_args, parse_file, preview, USAGE};
use ragrank_core::settings::FusionStrategy;
use ragrank_core::types::{ChunkType, RetrievalMethod};
use tempfile::TempDir;

#[test]
fn loads_json_jsonl_and_wrapped_files_from_a_tree() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("a.json"), r#"[{"id": "a1", "content": "solar panel", "type": "text", "page": 1}]"#).expect("write");
    fs::create_dir(dir.path().join("nested")).expect("mkdir");
    fs::write(
        dir.path().join("nested/b.jsonl"),
        "{\"id\": \"b1\", \"content\": \"battery table\", \"type\": \"table\", \"page\": 2}\n\n{\"id\": \"a1\", \"content\": \"dup\"}\n",
    )
    .expect("write");
    fs::write(dir.path().join("c.json"), r#"{"chunks": [{"id": "c1", "content": "diagram", "type": "image", "page": 3, "metadata": {"source": "manual.pdf"}}]}"#)
        .expect("write");
    fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

    assert_eq!(corpus_files(dir.path()).expect("files").len(), 3);
    let chunks = load_chunks(dir.path(), false).expect("load");
    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "c1", "b1"]);
    assert_eq!(chunks[2].chunk_type, ChunkType::Table);
    assert_eq!(chunks[1].metadata.get("source").and_then(|v| v.as_str()), Some("manual.pdf"));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{"items": []}"#).expect("write");
    assert!(parse_file(&path).is_err());
    assert!(load_chunks(&dir.path().join("missing"), false).is_err());
}

#[test]
fn preview_flattens_and_shortens() {
    assert_eq!(preview("one\n two   three", 50), "one two three");
    assert_eq!(preview("abcdef ghij", 6), "abcdef…");
}

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| (*a).to_string()).collect()
}

#[test]
fn query_flags_are_parsed() {
    let args = parse_args(&argv(&["query", "battery wiring", "--top-k", "3", "--method", "keyword", "--fusion", "rrf"])).expect("args");
    assert_eq!(args.cmd, "query");
    assert_eq!(args.query.as_deref(), Some("battery wiring"));
    assert_eq!(args.top_k, Some(3));
    assert_eq!(args.method, Some(RetrievalMethod::Keyword));
    assert_eq!(args.fusion, Some(FusionStrategy::Rrf));
}

#[test]
fn unsupported_flags_are_rejected() {
    assert!(!USAGE.contains("--no-rerank"));
    assert!(parse_args(&argv(&["query", "battery", "--no-rerank"])).is_err());
    assert!(parse_args(&argv(&["query", "battery", "--top-k"])).is_err());
    assert!(parse_args(&argv(&["query", "battery", "--method", "fuzzy"])).is_err());
    assert!(parse_args(&[]).is_err());
}
