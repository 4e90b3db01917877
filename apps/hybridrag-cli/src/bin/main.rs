use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use hybridrag_core::config::{resolve_with_base, Config};
use hybridrag_core::context::RetrievalContext;
use hybridrag_core::traits::{Embedder, PassthroughGenerator, VectorStore};
use hybridrag_core::types::{DocumentInput, MetaValue};
use hybridrag_embed::get_default_embedder;
use hybridrag_hybrid::{render_outcome, HybridQuery, IterativeQuery, RetrievalEngine};
use hybridrag_text::{ChunkOptions, Chunker};

#[derive(Parser)]
#[command(name = "hybridrag", version, about = "Hybrid retrieval over a directory of text files")]
struct Cli {
    /// Directory of .txt files; defaults to `data.raw_txt_dir` from config.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Print the retrieval context (steps and references) as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the chunks a file splits into.
    Chunk { file: PathBuf },
    /// Chunk and index every .txt file under the data directory.
    Ingest,
    /// Single-pass vector search.
    Query {
        query: String,
        #[arg(short, long)]
        n: Option<usize>,
    },
    /// Vector + keyword search fused with RRF, then re-ranked.
    Hybrid {
        query: String,
        #[arg(short, long)]
        n: Option<usize>,
        /// Exact metadata match, `key=value`; repeatable. JSON scalars keep their
        /// type (`chunkIndex=2`, `draft=true`), quote to force text (`year="2024"`).
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, MetaValue)>,
    },
    /// Multi-hop retrieval. No generator is wired in, so each step reuses the query.
    Iterate {
        query: String,
        #[arg(short, long)]
        steps: Option<usize>,
        #[arg(short, long)]
        n: Option<usize>,
    },
}

fn parse_filter(s: &str) -> Result<(String, MetaValue), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), MetaValue::parse_scalar(v))),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("loading config")?;
    let engine_config = config.engine()?;
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| {
        let dir: String = config.get("data.raw_txt_dir").unwrap_or_else(|_| "../dev_data/txt".to_string());
        resolve_with_base(Path::new("."), dir)
    });
    let embedder = get_default_embedder()?;

    if let Commands::Chunk { file } = &cli.command {
        let text = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
        let chunker = Chunker::new(ChunkOptions::from(&engine_config.chunking));
        for (i, chunk) in chunker.chunk_with(&text, embedder.as_ref()).await.iter().enumerate() {
            println!("--- chunk {} ({} chars) ---\n{}\n", i + 1, chunk.chars().count(), chunk);
        }
        return Ok(());
    }

    let (store, persistent) = open_store(&config, embedder.clone()).await?;
    let engine = RetrievalEngine::builder().store(store).embedder(embedder).config(engine_config).build()?;
    // an in-memory store starts empty on every run
    if matches!(cli.command, Commands::Ingest) || !persistent {
        ingest(&engine, &data_dir).await?;
    }

    let mut ctx = RetrievalContext::new();
    match cli.command {
        Commands::Chunk { .. } | Commands::Ingest => {}
        Commands::Query { query, n } => println!("{}", engine.retrieve(&query, n, &mut ctx).await),
        Commands::Hybrid { query, n, filters } => {
            let mut q = HybridQuery::new(query);
            q.n_results = n;
            for (k, v) in filters { q = q.filter(k, v); }
            println!("{}", render_outcome(&engine.hybrid_retrieve(&q, &mut ctx).await));
        }
        Commands::Iterate { query, steps, n } => {
            let q = IterativeQuery { query, steps, n_results: n, filter: None };
            let contexts = engine.iterative_retrieve(&q, &PassthroughGenerator, &mut ctx).await;
            for (i, c) in contexts.iter().enumerate() {
                println!("== step {} ==\n{}\n", i + 1, if c.is_empty() { "(no context)" } else { c.as_str() });
            }
        }
    }
    if cli.json { println!("{}", serde_json::to_string_pretty(&ctx)?); }
    Ok(())
}

#[cfg(feature = "lance")]
async fn open_store(config: &Config, embedder: Arc<dyn Embedder>) -> anyhow::Result<(Arc<dyn VectorStore>, bool)> {
    let dir: String = config.get("data.lancedb_index_dir").unwrap_or_else(|_| "../dev_data/indexes/lancedb".to_string());
    let path = resolve_with_base(Path::new("."), dir);
    std::fs::create_dir_all(&path)?;
    let store = hybridrag_vector::LanceVectorStore::open(&path, "documents", embedder).await?;
    Ok((Arc::new(store), true))
}

#[cfg(not(feature = "lance"))]
async fn open_store(_config: &Config, embedder: Arc<dyn Embedder>) -> anyhow::Result<(Arc<dyn VectorStore>, bool)> {
    Ok((Arc::new(hybridrag_vector::MemoryVectorStore::new(embedder)), false))
}

fn text_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == "txt"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

async fn ingest(engine: &RetrievalEngine, dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() { bail!("data directory {} does not exist", dir.display()); }
    let files = text_files(dir);
    info!(dir = %dir.display(), files = files.len(), "ingesting");
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?);

    let mut chunks = 0;
    for path in &files {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => { warn!(path = %path.display(), "skipping unreadable file: {}", e); pb.inc(1); continue; }
        };
        let id = path.strip_prefix(dir).unwrap_or(path).to_string_lossy().to_string();
        let title = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| id.clone());
        let doc = DocumentInput::new(id, text)
            .with_metadata("source", path.display().to_string())
            .with_metadata("title", title);
        chunks += engine.upsert_with_chunks(&doc, None).await?.len();
        pb.inc(1);
    }
    pb.finish_with_message(format!("{chunks} chunks"));
    println!("✅ Ingested {} files ({} chunks)", files.len(), chunks);
    Ok(())
}
