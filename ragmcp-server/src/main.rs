//! ragmcp HTTP Server
//!
//! Serves the ragmcp MCP tools over HTTP. Every capability (vector store,
//! embedding model, completion client) is built before the listener binds.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults (0.0.0.0:8000, ./vector_db, all-MiniLM-L6-v2)
//! ragmcp-server
//!
//! # Offline embedder, custom collection
//! ragmcp-server --embedding-model hashing --collection notes
//!
//! # Enable answers from rag_query
//! ANTHROPIC_API_KEY=... ragmcp-server --verbose
//! ```
//!
//! ## MCP Configuration
//!
//! Stdio-only MCP clients reach the server through the bridge:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "rag": {
//!       "command": "ragmcp",
//!       "args": ["proxy", "http://localhost:8000/sse"]
//!     }
//!   }
//! }
//! ```
//!
//! ## Endpoints
//!
//! - **POST /sse**: JSON-RPC (MCP) requests
//! - **GET /health**: liveness and configured capabilities
//! - **GET /tools**: tool catalog

use anyhow::{Context, Result};
use clap::Parser;
use ragmcp::completion::{AnthropicCompletion, DEFAULT_ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS};
use ragmcp::config::{self, ServerConfig};
use ragmcp::mcp::http;
use ragmcp::{AppContext, Embedder, HashingEmbedder, LocalVectorStore, McpServer};
use ragmcp_embed::{EmbedConfig, FastEmbedder, Model};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Embedding backend selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmbeddingChoice {
    /// Feature hashing, no model download
    Hashing,
    /// A fastembed model
    Fast(Model),
}

impl FromStr for EmbeddingChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("hashing") {
            return Ok(EmbeddingChoice::Hashing);
        }
        Model::from_str(s)
            .map(EmbeddingChoice::Fast)
            .map_err(|e| e.to_string())
    }
}

/// ragmcp Server - Document search and RAG answers via Model Context Protocol
#[derive(Parser, Debug)]
#[command(name = "ragmcp-server")]
#[command(
    author,
    version,
    about = "ragmcp Server - MCP tools for document ingestion, search and RAG answers"
)]
struct Args {
    /// Host to bind
    #[arg(long, env = "RAGMCP_HOST", default_value = config::DEFAULT_HOST)]
    host: String,

    /// Port to bind
    #[arg(long, short = 'p', env = "RAGMCP_PORT", default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Directory holding persisted collections
    #[arg(long, env = "RAGMCP_PERSIST_DIR", default_value = config::DEFAULT_PERSIST_DIRECTORY)]
    persist_dir: PathBuf,

    /// Collection the tools operate on
    #[arg(
        long,
        short = 'c',
        env = "RAGMCP_COLLECTION",
        default_value = config::DEFAULT_COLLECTION_NAME
    )]
    collection: String,

    /// Embedding model (all-minilm-l6-v2, bge-small, multilingual, hashing)
    #[arg(long, env = "RAGMCP_EMBEDDING_MODEL", default_value = "all-minilm-l6-v2")]
    embedding_model: EmbeddingChoice,

    /// Cache directory for downloaded embedding models
    #[arg(long, env = "RAGMCP_MODEL_CACHE_DIR")]
    model_cache_dir: Option<PathBuf>,

    /// Anthropic API key; rag_query cannot answer without it
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: Option<String>,

    /// Anthropic model used for answers
    #[arg(long, env = "RAGMCP_ANTHROPIC_MODEL", default_value = DEFAULT_ANTHROPIC_MODEL)]
    anthropic_model: String,

    /// Maximum tokens per answer
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Enable verbose logging (outputs to stderr)
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            persist_directory: self.persist_dir.clone(),
            collection_name: self.collection.clone(),
        }
    }

    fn model_cache_dir(&self) -> PathBuf {
        self.model_cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ragmcp")
                .join("models")
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = args.server_config();
    let ctx = build_context(&args, &config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;

    http::serve(listener, McpServer::new(ctx), shutdown_signal()).await?;

    Ok(())
}

/// Build every capability up front so no request ever races an initializer
async fn build_context(args: &Args, config: &ServerConfig) -> Result<AppContext> {
    let embedder = build_embedder(args).await?;

    tracing::info!(
        "Opening collection {} in {}",
        config.collection_name,
        config.persist_directory.display()
    );
    let store = LocalVectorStore::open(
        &config.persist_directory,
        &config.collection_name,
        embedder,
    )
    .await
    .context("Failed to open vector store")?;

    let mut ctx = AppContext::new(Arc::new(store));

    match &args.anthropic_api_key {
        Some(key) if !key.is_empty() => {
            let completion = AnthropicCompletion::new(key.clone())?
                .with_model(&args.anthropic_model)
                .with_max_tokens(args.max_tokens);
            tracing::info!("Answers enabled with {}", completion.model());
            ctx = ctx.with_completion(Arc::new(completion));
        }
        _ => tracing::warn!("ANTHROPIC_API_KEY not set, rag_query will not answer"),
    }

    Ok(ctx)
}

async fn build_embedder(args: &Args) -> Result<Arc<dyn Embedder>> {
    match args.embedding_model {
        EmbeddingChoice::Hashing => Ok(Arc::new(HashingEmbedder::new())),
        EmbeddingChoice::Fast(model) => {
            let config = EmbedConfig {
                model,
                cache_dir: Some(args.model_cache_dir()),
                show_download_progress: args.verbose,
            };
            // Model loading may download files; keep it off the async workers
            let embedder = tokio::task::spawn_blocking(move || FastEmbedder::with_config(config))
                .await
                .context("Embedding model loader panicked")??;
            tracing::info!(
                "Embedding with {} ({} dimensions)",
                model.name(),
                embedder.dimensions()
            );
            Ok(Arc::new(embedder))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from(["ragmcp-server"]).unwrap();
        assert_eq!(args.port, 8000);
        assert_eq!(args.collection, "rag_documents");
        assert_eq!(args.embedding_model, EmbeddingChoice::Fast(Model::AllMiniLmL6V2));
        assert_eq!(args.max_tokens, 2000);
        assert!(!args.verbose);

        let args = Args::try_parse_from([
            "ragmcp-server",
            "--port",
            "9000",
            "--embedding-model",
            "hashing",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.port, 9000);
        assert_eq!(args.embedding_model, EmbeddingChoice::Hashing);
        assert!(args.verbose);
        assert_eq!(args.server_config().bind_address(), "0.0.0.0:9000");
    }

    #[test]
    fn test_embedding_choice() {
        assert_eq!(
            "multilingual".parse::<EmbeddingChoice>().unwrap(),
            EmbeddingChoice::Fast(Model::Multilingual)
        );
        assert!("word2vec".parse::<EmbeddingChoice>().is_err());
        assert!(Args::try_parse_from(["ragmcp-server", "--embedding-model", "word2vec"]).is_err());
    }

    #[tokio::test]
    async fn test_context_built_at_startup() {
        let dir = tempdir().unwrap();
        let mut args = Args::try_parse_from([
            "ragmcp-server",
            "--embedding-model",
            "hashing",
            "--collection",
            "startup",
        ])
        .unwrap();
        args.persist_dir = dir.path().to_path_buf();
        args.anthropic_api_key = None;

        let ctx = build_context(&args, &args.server_config()).await.unwrap();
        assert!(!ctx.has_completion());
        assert_eq!(ctx.store.count().await.unwrap(), 0);
        assert_eq!(ctx.store.info().collection_name, "startup");
        assert!(dir.path().join("startup.json").exists());
    }

    #[tokio::test]
    async fn test_context_with_api_key() {
        let dir = tempdir().unwrap();
        let mut args = Args::try_parse_from(["ragmcp-server", "--embedding-model", "hashing"])
            .unwrap();
        args.persist_dir = dir.path().to_path_buf();
        args.anthropic_api_key = Some("test-key".to_string());

        let ctx = build_context(&args, &args.server_config()).await.unwrap();
        assert!(ctx.has_completion());
    }
}
