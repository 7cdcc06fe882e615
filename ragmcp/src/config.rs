//! Configuration defaults shared by the server and the client binaries

use std::path::PathBuf;

/// Default listen host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8000;

/// Default directory for persisted collections
pub const DEFAULT_PERSIST_DIRECTORY: &str = "./vector_db";

/// Default collection name
pub const DEFAULT_COLLECTION_NAME: &str = "rag_documents";

/// Path of the JSON-RPC endpoint
pub const RPC_PATH: &str = "/sse";

/// Default URL the bridge and client talk to
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000/sse";

/// Default end-to-end timeout for a bridged request, in seconds
pub const DEFAULT_BRIDGE_TIMEOUT_SECS: u64 = 60;

/// Server process configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Directory holding persisted collections
    pub persist_directory: PathBuf,
    /// Collection the tools operate on
    pub collection_name: String,
}

impl ServerConfig {
    /// `host:port` string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            persist_directory: PathBuf::from(DEFAULT_PERSIST_DIRECTORY),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
        }
    }
}
