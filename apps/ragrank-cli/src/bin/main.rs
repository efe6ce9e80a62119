use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use ragrank_core::config::{expand_path, Config};
use ragrank_core::settings::RetrievalConfig;
use ragrank_embed::get_default_embedder;
use ragrank_hybrid::{LocalIndex, RetrievalRequest};

use ragrank_cli::{parse_args, Args, USAGE};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn corpus_path(args: &Args, config: &Config) -> PathBuf {
    args.corpus.clone().unwrap_or_else(|| {
        let dir: String = config.get("data.corpus_path").unwrap_or_else(|_| "data/chunks".to_string());
        expand_path(dir)
    })
}

fn retrieval_config(args: &Args, config: &Config) -> Result<RetrievalConfig> {
    let mut cfg = config.retrieval()?;
    if let Some(m) = args.method { cfg.method = m; }
    if let Some(f) = args.fusion { cfg.fusion_strategy = f; }
    if let Some(k) = args.top_k { cfg.top_k = k; }
    cfg.validate()?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {e}"); e })?;
    let args = parse_args(&env::args().skip(1).collect::<Vec<_>>())?;
    let cfg = retrieval_config(&args, &config)?;
    let corpus = corpus_path(&args, &config);
    let dim: Option<usize> = config.get("embedding.dim").ok();

    match args.cmd.as_str() {
        "query" => {
            let query = args.query.clone().ok_or_else(|| anyhow!(USAGE))?;
            let chunks = ragrank_cli::load_chunks(&corpus, true)?;
            let embedder = Arc::from(get_default_embedder(dim)?);
            let index = LocalIndex::build(chunks, embedder, &cfg)?;
            let engine = index.orchestrator(cfg.clone()).build()?;
            let response = engine.run(RetrievalRequest::new(query).top_k(cfg.top_k)).await?;
            if response.results.is_empty() {
                println!("No results.");
            }
            for r in &response.results {
                println!(
                    "{:>2}. {:.4}  {}  p{} [{}]  {}",
                    r.rank + 1,
                    r.score,
                    r.chunk_id,
                    r.page,
                    r.chunk_type,
                    ragrank_cli::preview(&r.content, 100)
                );
            }
            for (stage, reason) in &response.report.degraded {
                eprintln!("⚠️  {stage} degraded: {reason}");
            }
        }
        "stats" => {
            let chunks = ragrank_cli::load_chunks(&corpus, false)?;
            let index = LocalIndex::build(chunks, Arc::from(get_default_embedder(dim)?), &cfg)?;
            println!("Corpus: {}", corpus.display());
            println!("📊 {} chunks, {} terms, avg length {:.1} tokens", index.stats.documents, index.stats.terms, index.stats.avg_doc_length);
            println!("Method: {:?}, fusion: {:?}, lexical backend: {:?}", cfg.method, cfg.fusion_strategy, cfg.lexical_backend);
        }
        other => return Err(anyhow!("unknown command '{other}'\n{USAGE}")),
    }
    Ok(())
}
