//! HTTP API module.
//!
//! This module provides the HTTP server, the API types and the pipeline log
//! stream for the gateway.

pub mod logs;
pub mod server;
pub mod types;

pub use server::{build_router, start_server, AppState};
pub use types::*;
pub use logs::*;
