//! Stratum command-line entrypoint.
//!
//! ```text
//! stratum --ingest chunks.jsonl --query "when is the exam?" --k 5
//! stratum --health-check
//! ```
//!
//! Ingest files hold one JSON [`DocumentChunk`] per line.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};
use mimalloc::MiMalloc;

use stratum::cache::DocumentChunk;
use stratum::config::Config;
use stratum::embedding::{Embedder, HttpEmbedder, StubEmbedder};
use stratum::store::CachedVectorStore;
use stratum::vectordb::QdrantStore;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const INGEST_BATCH_SIZE: usize = 64;
const DEFAULT_K: usize = 5;

#[derive(Debug, Default)]
struct CliArgs {
    health_check: bool,
    ingest: Option<PathBuf>,
    query: Option<String>,
    k: Option<usize>,
}

impl CliArgs {
    fn parse<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--health-check" => parsed.health_check = true,
                "--ingest" => {
                    let path = args.next().context("--ingest needs a file path")?;
                    parsed.ingest = Some(PathBuf::from(path));
                }
                "--query" => {
                    parsed.query = Some(args.next().context("--query needs query text")?);
                }
                "--k" => {
                    let raw = args.next().context("--k needs a number")?;
                    parsed.k = Some(raw.parse().with_context(|| format!("invalid --k '{raw}'"))?);
                }
                other => bail!("unknown argument '{other}'"),
            }
        }
        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse(std::env::args().skip(1))?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    if args.health_check {
        std::process::exit(run_health_check(&config).await);
    }

    tracing::info!(
        budget_bytes = config.memory_budget_bytes,
        embedding_dim = config.embedding_dim,
        max_documents = config.max_documents,
        fallback = config.fallback_enabled,
        "Stratum starting"
    );

    let embedder: Arc<dyn Embedder> = match config.http_embedder_config() {
        Some(http_config) => Arc::new(HttpEmbedder::new(http_config)?),
        None => {
            tracing::warn!("No STRATUM_EMBEDDING_URL configured, running embedder in stub mode");
            Arc::new(StubEmbedder::new(config.embedding_dim))
        }
    };

    let fallback = if config.fallback_enabled {
        match QdrantStore::connect(
            &config.qdrant_url,
            config.collection.clone(),
            config.embedding_dim as u64,
        )
        .await
        {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!("Failed to connect to Qdrant: {}. Running RAM only.", e);
                None
            }
        }
    } else {
        None
    };

    let store = CachedVectorStore::new(
        config.store_config(),
        config.ram_cache_config(),
        embedder,
        fallback,
    )?;

    if let Some(path) = &args.ingest {
        let started = Instant::now();
        let ingested = ingest_file(&store, path).await?;
        tracing::info!(
            documents = ingested,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingest complete"
        );
    }

    if let Some(query) = &args.query {
        let k = args.k.unwrap_or(DEFAULT_K);
        let hits = store.search(query.as_str(), k).await?;
        println!("{}", serde_json::to_string_pretty(&hits)?);
    }

    let joined = store.wait_for_background_tasks().await;
    tracing::debug!(joined, "Background tasks drained");

    eprintln!("{}", serde_json::to_string_pretty(&store.get_stats())?);
    Ok(())
}

async fn ingest_file<F, E>(store: &CachedVectorStore<F, E>, path: &Path) -> anyhow::Result<usize>
where
    F: stratum::vectordb::VectorStore + 'static,
    E: Embedder + ?Sized + 'static,
{
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut chunks = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let chunk: DocumentChunk = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid chunk", path.display(), line_no + 1))?;
        chunks.push(chunk);
    }

    for batch in chunks.chunks(INGEST_BATCH_SIZE) {
        store.add_documents(batch).await?;
    }
    Ok(chunks.len())
}

async fn run_health_check(config: &Config) -> i32 {
    let store = match QdrantStore::new(
        &config.qdrant_url,
        config.collection.clone(),
        config.embedding_dim as u64,
    ) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            return 1;
        }
    };

    match store.health_check().await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            1
        }
    }
}
