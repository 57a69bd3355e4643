use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use swap_store::{FileRequestStore, InMemoryRequestStore, RequestStore, SyncMode};

use crate::error::{ServerError, ServerResult};

/// Port the service has always listened on.
pub const DEFAULT_PORT: u16 = 5000;

/// Default location of the request log.
pub const DEFAULT_LOG_PATH: &str = "data/swap-requests.log";

/// Server configuration, loadable from TOML.
///
/// ```toml
/// bind_addr = "0.0.0.0:5000"
/// allow_any_origin = true
///
/// [storage]
/// backend = "file"
/// path = "/var/lib/sectionswap/requests.log"
/// sync = "every-write"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Answer CORS preflights for any origin (the web front-end is served
    /// from a different host).
    pub allow_any_origin: bool,
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            allow_any_origin: true,
            storage: StorageConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

/// Which [`RequestStore`] backend to open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum StorageConfig {
    /// Volatile store; everything is lost on shutdown.
    Memory,
    /// Append-only log file.
    File {
        path: PathBuf,
        #[serde(default)]
        sync: SyncMode,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::File {
            path: PathBuf::from(DEFAULT_LOG_PATH),
            sync: SyncMode::default(),
        }
    }
}

impl StorageConfig {
    /// Open the configured backend.
    pub fn open(&self) -> ServerResult<Arc<dyn RequestStore>> {
        let store: Arc<dyn RequestStore> = match self {
            Self::Memory => Arc::new(InMemoryRequestStore::new()),
            Self::File { path, sync } => Arc::new(FileRequestStore::open(path, *sync)?),
        };
        Ok(store)
    }
}
