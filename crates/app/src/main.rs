mod http;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use docqa_core::{
    AnyEmbedder, ChatCompletionClient, Embedder, HashedNgramEmbedder, IndexStore, QaPipeline,
    RemoteEmbedder, DEFAULT_COMPLETION_BASE_URL, DEFAULT_COMPLETION_MODEL,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_MAX_QUESTION_CHARS, DEFAULT_TOP_K,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa-api", version)]
struct Cli {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "DOCQA_BIND", default_value = "127.0.0.1:8000")]
    bind: String,

    /// Path of the persisted vector index artifact.
    #[arg(long, env = "DOCQA_INDEX_PATH", default_value = "data/index.json")]
    index_path: PathBuf,

    /// Chunks retrieved per question.
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Maximum question length in characters.
    #[arg(long, default_value_t = DEFAULT_MAX_QUESTION_CHARS)]
    max_question_chars: usize,

    /// OpenAI-compatible embeddings base URL. The deterministic local
    /// embedder is used when unset.
    #[arg(long, env = "DOCQA_EMBEDDING_URL")]
    embedding_url: Option<String>,

    /// Embedding model requested from the remote backend.
    #[arg(long, env = "DOCQA_EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    embedding_model: String,

    /// Embedding vector dimensions.
    #[arg(long, env = "DOCQA_EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// OpenAI-compatible chat completion base URL.
    #[arg(long, env = "DOCQA_LLM_URL", default_value = DEFAULT_COMPLETION_BASE_URL)]
    llm_url: String,

    /// Chat completion model.
    #[arg(long, env = "DOCQA_LLM_MODEL", default_value = DEFAULT_COMPLETION_MODEL)]
    llm_model: String,

    /// API key for the embedding and completion backends.
    #[arg(long, env = "DOCQA_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// Seconds before an external call times out.
    #[arg(long, env = "DOCQA_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    /// Retry attempts for transient backend failures.
    #[arg(long, env = "DOCQA_MAX_RETRIES", default_value_t = 3)]
    max_retries: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.request_timeout_secs.max(1));

    let embedder = match &cli.embedding_url {
        Some(url) => AnyEmbedder::Remote(RemoteEmbedder::new(
            cli.api_key.clone(),
            url,
            &cli.embedding_model,
            cli.embedding_dimensions,
            timeout,
            cli.max_retries,
        )?),
        None => AnyEmbedder::Hashed(HashedNgramEmbedder {
            dimensions: cli.embedding_dimensions,
        }),
    };

    let generator = ChatCompletionClient::new(
        cli.api_key.clone(),
        &cli.llm_url,
        &cli.llm_model,
        timeout,
        cli.max_retries,
    )?;

    let model_id = embedder.model_id().to_string();
    let dimensions = embedder.dimensions();
    let store = IndexStore::new(cli.index_path.clone(), model_id.clone(), dimensions);

    let pipeline = QaPipeline::new(store, embedder, generator)
        .with_limits(cli.top_k, cli.max_question_chars);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        index = %cli.index_path.display(),
        embedding_model = %model_id,
        completion_model = %cli.llm_model,
        "docqa-api boot"
    );

    let app = http::router(http::AppState {
        pipeline: Arc::new(pipeline),
    });

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app).await.context("server shutdown")?;
    Ok(())
}
