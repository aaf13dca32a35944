//! # Gateway - multi-domain analysis gateway
//!
//! Accepts free text, structured payloads and uploaded documents, routes each
//! request to a registered domain analyzer or to a generic LLM reasoner, and
//! records every handled request in an append-only artifact log.
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!   upload ──────────▶│  Normalizer  │──┐
//!                      └──────────────┘  │   ┌──────────────┐
//!                                        ├──▶│   Reasoner   │──┐
//!   text / JSON ──┐    ┌──────────────┐  │   └──────────────┘  │   ┌──────────────┐
//!                 └──▶│ Orchestrator │──┤                     ├──▶│ Artifact log │
//!                      └──────────────┘  │   ┌──────────────┐  │   └──────────────┘
//!                                        └──▶│   Registry   │──┘
//!                                            └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gateway::{AnalysisRequest, AppContext, GatewayConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = AppContext::from_config(GatewayConfig::from_env()?)?;
//!     let request = AnalysisRequest::from_value(json!({ "site_area_m2": 120, "floors": 2 }))
//!         .with_domain(Some("construction"));
//!     let reply = context.orchestrator.dispatch(request).await?;
//!     println!("artifact #{}: {}", reply.artifact_id, reply.result);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Environment configuration
//! - [`normalizer`] - PDF, DOCX, CSV, spreadsheet and text extraction
//! - [`registry`] - Domain analyzers and their registry
//! - [`reasoner`] - LLM text and vision completion
//! - [`artifacts`] - Append-only artifact log
//! - [`dispatch`] - Request classification and routing
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;

// Leaves
pub mod normalizer;
pub mod reasoner;
pub mod registry;

// Storage
pub mod artifacts;

// Orchestration
pub mod context;
pub mod dispatch;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AnalyzerError, ConfigError, DispatchError, ErrorKind, NormalizeError, ReasonerError,
    RegistryError, ServerError, StorageError,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{GatewayConfig, Limits, ReasonerConfig};
pub use context::AppContext;

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use artifacts::{ArtifactLog, ArtifactRecord, ArtifactStats, ArtifactStore};
pub use dispatch::{AnalysisRequest, Envelope, Orchestrator, Reply};
pub use normalizer::{ContentKind, ExtractedContent, Normalizer, Upload};
pub use reasoner::{AnthropicReasoner, Reasoner, UnavailableReasoner};
pub use registry::{Analyzer, AnalyzerRegistry, DomainDescriptor, FnAnalyzer, Payload};

// =============================================================================
// Re-exports - Server
// =============================================================================

pub mod server {
    pub use crate::api::server::*;
}
