//! HTTP server for Section Swap.
//!
//! Exposes the request store and the matcher as a small JSON API:
//!
//! | Method | Path | |
//! |--------|------|---|
//! | `POST` | `/api/swap-requests` | submit `{currentSection, desiredSection, contact}` |
//! | `GET`  | `/api/swap-requests` | all requests, newest first |
//! | `GET`  | `/api/find-matches/:current/:desired?contact=` | `{matchType, matches}` |
//! | `GET`  | `/api/health` | liveness and record count |
//!
//! Failures are returned as `{"error": message}` with a 400, 500 or 503 status.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::{ServerConfig, StorageConfig, DEFAULT_PORT};
pub use error::{ServerError, ServerResult};
pub use server::SwapServer;
pub use state::AppState;
