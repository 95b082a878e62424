//! ResQ daemon library
//!
//! HTTP and WebSocket front end for the map state hub. Re-exported for the
//! binary and for integration tests.

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod feed;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{DaemonConfig, RelayConfig};
pub use state::AppState;
