//! HTTP adapter for protolab.
//!
//! Exposes the merge variants over HTTP against one process-wide shared
//! ancestor. Contamination caused by one request stays visible to every
//! later request until `POST /reset`, unless the server runs in scoped
//! ancestor mode.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{AppState, MergeResponse, ResetResponse, StatusResponse, BODY_NESTING_LIMIT};
pub use router::build_router;
pub use server::ProtolabServer;
