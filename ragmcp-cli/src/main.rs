//! ragmcp CLI - stdio bridge and command-line client for a ragmcp server

mod files;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use ragmcp::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use ragmcp::config::{DEFAULT_BRIDGE_TIMEOUT_SECS, DEFAULT_SERVER_URL};
use ragmcp::mcp::tools::{DEFAULT_K, DEFAULT_LANGUAGE};
use ragmcp::{Bridge, HttpTransport, McpClient};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default timeout for ingestion, which embeds every chunk server-side
const INGEST_TIMEOUT_SECS: u64 = 120;

#[derive(Parser)]
#[command(name = "ragmcp")]
#[command(
    author,
    version,
    about = "ragmcp - Bridge and client for the ragmcp MCP server"
)]
#[command(propagate_version = true)]
struct Cli {
    /// JSON-RPC endpoint of the server
    #[arg(
        long,
        short = 'u',
        env = "RAGMCP_SERVER_URL",
        default_value = DEFAULT_SERVER_URL,
        global = true
    )]
    server_url: String,

    /// Request timeout in seconds (default: 60, 120 for add)
    #[arg(long, short = 't', global = true)]
    timeout: Option<u64>,

    /// Enable verbose output (logs go to stderr)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Relay JSON-RPC between stdin/stdout and the server
    Proxy {
        /// Server URL (overrides --server-url)
        url: Option<String>,
    },

    /// List the server's tools
    Tools,

    /// Add text files or directories to the collection
    Add {
        /// Files or directories (directories are walked for text files)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Chunk size in characters
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Chunk overlap in characters
        #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
        chunk_overlap: usize,
    },

    /// Search for similar documents
    Search {
        /// Search query
        query: String,

        /// Number of results
        #[arg(short = 'k', long, default_value_t = DEFAULT_K)]
        k: usize,
    },

    /// Answer a question from the stored documents
    Ask {
        /// Question to answer
        question: String,

        /// Number of documents to retrieve
        #[arg(short = 'k', long, default_value_t = DEFAULT_K)]
        k: usize,

        /// Answer language (ko, en)
        #[arg(long, short = 'l', default_value = DEFAULT_LANGUAGE)]
        language: String,
    },

    /// Show collection information
    Info,

    /// Delete the whole collection
    Delete {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout belongs to the protocol in proxy mode, so logs always go to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if matches!(cli.command, Commands::Proxy { .. }) {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let timeout = |default_secs: u64| Duration::from_secs(cli.timeout.unwrap_or(default_secs));

    match cli.command {
        Commands::Proxy { url } => {
            let url = url.unwrap_or(cli.server_url);
            cmd_proxy(&url, timeout(DEFAULT_BRIDGE_TIMEOUT_SECS)).await
        }
        Commands::Tools => {
            let client = connect(&cli.server_url, timeout(DEFAULT_BRIDGE_TIMEOUT_SECS))?;
            cmd_tools(&client).await
        }
        Commands::Add {
            paths,
            chunk_size,
            chunk_overlap,
        } => {
            let client = connect(&cli.server_url, timeout(INGEST_TIMEOUT_SECS))?;
            cmd_add(&client, &paths, chunk_size, chunk_overlap).await
        }
        Commands::Search { query, k } => {
            let client = connect(&cli.server_url, timeout(DEFAULT_BRIDGE_TIMEOUT_SECS))?;
            call_and_print(&client, "search_documents", json!({"query": query, "k": k})).await
        }
        Commands::Ask {
            question,
            k,
            language,
        } => {
            let client = connect(&cli.server_url, timeout(DEFAULT_BRIDGE_TIMEOUT_SECS))?;
            call_and_print(
                &client,
                "rag_query",
                json!({"question": question, "k": k, "language": language}),
            )
            .await
        }
        Commands::Info => {
            let client = connect(&cli.server_url, timeout(DEFAULT_BRIDGE_TIMEOUT_SECS))?;
            call_and_print(&client, "get_collection_info", json!({})).await
        }
        Commands::Delete { yes } => {
            let client = connect(&cli.server_url, timeout(DEFAULT_BRIDGE_TIMEOUT_SECS))?;
            call_and_print(&client, "delete_collection", json!({"confirm": yes})).await
        }
    }
}

fn connect(url: &str, timeout: Duration) -> Result<McpClient> {
    Ok(McpClient::new(HttpTransport::new(url, timeout)?))
}

async fn cmd_proxy(url: &str, timeout: Duration) -> Result<()> {
    let bridge = Bridge::new(HttpTransport::new(url, timeout)?);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    bridge.run(stdin, stdout).await?;

    Ok(())
}

async fn cmd_tools(client: &McpClient) -> Result<()> {
    let tools = client.list_tools().await?;

    println!("Available tools:");
    for tool in tools {
        println!("  {} - {}", tool.name, tool.description);
    }
    Ok(())
}

async fn cmd_add(
    client: &McpClient,
    paths: &[PathBuf],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<()> {
    let files = files::collect_text_files(paths)?;
    if files.is_empty() {
        bail!("No text files found");
    }

    let added_at = chrono::Utc::now().to_rfc3339();
    let texts: Vec<&str> = files.iter().map(|f| f.content.as_str()).collect();
    let metadatas: Vec<Value> = files.iter().map(|f| f.metadata(&added_at)).collect();

    eprintln!("Adding {} files...", files.len());

    call_and_print(
        client,
        "add_documents",
        json!({
            "texts": texts,
            "metadatas": metadatas,
            "chunk_size": chunk_size,
            "chunk_overlap": chunk_overlap
        }),
    )
    .await
}

async fn call_and_print(client: &McpClient, tool: &str, arguments: Value) -> Result<()> {
    let result = client.call_tool(tool, arguments).await?;
    println!("{}", result.joined_text());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["ragmcp", "proxy"]).unwrap();
        assert!(matches!(cli.command, Commands::Proxy { url: None }));
        assert!(cli.timeout.is_none());

        let cli = Cli::try_parse_from(["ragmcp", "ask", "what is rust?", "-l", "en", "-k", "2"])
            .unwrap();
        match cli.command {
            Commands::Ask {
                question,
                k,
                language,
            } => {
                assert_eq!(question, "what is rust?");
                assert_eq!(k, 2);
                assert_eq!(language, "en");
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_add_defaults() {
        let cli = Cli::try_parse_from(["ragmcp", "add", "docs"]).unwrap();
        match cli.command {
            Commands::Add {
                paths,
                chunk_size,
                chunk_overlap,
            } => {
                assert_eq!(paths, vec![PathBuf::from("docs")]);
                assert_eq!(chunk_size, 1000);
                assert_eq!(chunk_overlap, 200);
            }
            _ => panic!("expected add"),
        }

        assert!(Cli::try_parse_from(["ragmcp", "add"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ragmcp",
            "info",
            "--server-url",
            "http://example.com/sse",
            "--timeout",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.server_url, "http://example.com/sse");
        assert_eq!(cli.timeout, Some(5));
    }

    #[test]
    fn test_delete_requires_flag_for_confirmation() {
        let cli = Cli::try_parse_from(["ragmcp", "delete"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { yes: false }));

        let cli = Cli::try_parse_from(["ragmcp", "delete", "--yes"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { yes: true }));
    }
}
