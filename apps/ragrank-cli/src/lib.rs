//! Argument parsing and chunk loading for the `ragrank` binary.
//!
//! A corpus is a `.json` file (an array of chunks, or an object with a
//! `chunks` array), a `.jsonl` file (one chunk per line), or a directory
//! walked recursively for both.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use ragrank_core::config::expand_path;
use ragrank_core::settings::FusionStrategy;
use ragrank_core::types::{Chunk, RetrievalMethod};

pub const USAGE: &str = "Usage: ragrank query \"<text>\" [--corpus PATH] [--top-k N] [--method vector|keyword|hybrid] [--fusion weighted|rrf]\n       ragrank stats [--corpus PATH]";

#[derive(Debug, Default)]
pub struct Args {
    pub cmd: String,
    pub query: Option<String>,
    pub corpus: Option<PathBuf>,
    pub top_k: Option<usize>,
    pub method: Option<RetrievalMethod>,
    pub fusion: Option<FusionStrategy>,
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1).map(String::as_str).ok_or_else(|| anyhow!("{flag} requires a value"))
}

/// Parses the arguments after the program name.
pub fn parse_args(args: &[String]) -> Result<Args> {
    let Some(cmd) = args.first().cloned() else { return Err(anyhow!(USAGE)) };
    let mut out = Args { cmd, ..Args::default() };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--corpus" => { out.corpus = Some(expand_path(value(args, i, "--corpus")?)); i += 1; }
            "--top-k" => { out.top_k = Some(value(args, i, "--top-k")?.parse().map_err(|_| anyhow!("--top-k requires a number"))?); i += 1; }
            "--method" => {
                out.method = Some(match value(args, i, "--method")? {
                    "vector" => RetrievalMethod::Vector,
                    "keyword" => RetrievalMethod::Keyword,
                    "hybrid" => RetrievalMethod::Hybrid,
                    other => return Err(anyhow!("unknown method '{other}'")),
                });
                i += 1;
            }
            "--fusion" => {
                out.fusion = Some(match value(args, i, "--fusion")? {
                    "weighted" => FusionStrategy::Weighted,
                    "rrf" => FusionStrategy::Rrf,
                    other => return Err(anyhow!("unknown fusion strategy '{other}'")),
                });
                i += 1;
            }
            a if !a.starts_with('-') && out.query.is_none() => out.query = Some(a.to_string()),
            a => return Err(anyhow!("unexpected argument '{a}'\n{USAGE}")),
        }
        i += 1;
    }
    Ok(out)
}

fn is_corpus_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("json" | "jsonl"))
}

/// Corpus files under `root`, sorted so loading order is stable.
pub fn corpus_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(anyhow!("corpus path {} does not exist", root.display()));
    }
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_corpus_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

pub fn parse_file(path: &Path) -> Result<Vec<Chunk>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
        return text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(n, l)| serde_json::from_str(l).with_context(|| format!("{}:{}", path.display(), n + 1)))
            .collect();
    }
    let value: Value = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let chunks = match value {
        Value::Object(mut map) => map.remove("chunks").ok_or_else(|| anyhow!("{}: object without a `chunks` array", path.display()))?,
        other => other,
    };
    serde_json::from_value(chunks).with_context(|| format!("decoding chunks in {}", path.display()))
}

/// Loads every chunk under `root`. Chunks whose id was already seen are
/// skipped with a warning.
pub fn load_chunks(root: &Path, show_progress: bool) -> Result<Vec<Chunk>> {
    let files = corpus_files(root)?;
    let pb = if show_progress { ProgressBar::new(files.len() as u64) } else { ProgressBar::hidden() };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );

    let mut seen = std::collections::HashSet::new();
    let mut chunks = Vec::new();
    for file in &files {
        pb.set_message(file.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string());
        for chunk in parse_file(file)? {
            if seen.insert(chunk.id.clone()) {
                chunks.push(chunk);
            } else {
                warn!(chunk_id = %chunk.id, file = %file.display(), "duplicate chunk id skipped");
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    debug!(files = files.len(), chunks = chunks.len(), "corpus loaded");
    Ok(chunks)
}

/// First `max_chars` characters of `text` on one line.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}
