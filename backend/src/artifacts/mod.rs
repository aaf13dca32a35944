//! Artifact log: durable, append-only record of every handled request.
//!
//! Records are never mutated. Ids come from the store and strictly increase,
//! including across [`ArtifactLog::clear`]. Listing is newest first.
//!
//! [`ArtifactLog`] wraps an [`ArtifactStore`] with the listing policy: by
//! default a failing `list` degrades to an empty sequence and a warning, in
//! strict mode the error is returned.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryArtifactStore;
pub use sqlite::SqliteArtifactStore;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::logs::log_warning;
use crate::error::StorageResult;

/// Artifact kind for registry analyses
pub const KIND_ANALYSIS: &str = "analysis";
/// Artifact kind for free-text chat replies
pub const KIND_CHAT: &str = "chat";
/// Artifact kind for summaries of unmatched structured payloads
pub const KIND_SUMMARY: &str = "summary";
/// Artifact kind for document and table uploads
pub const KIND_DOCUMENT: &str = "document";
/// Artifact kind for image uploads
pub const KIND_VISION: &str = "vision";
/// Artifact kind for per-row table ingestion
pub const KIND_INGEST: &str = "ingest";

/// One persisted analysis event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    pub id: i64,
    pub domain: String,
    pub kind: String,
    pub payload: Value,
    /// RFC 3339, UTC
    pub created_at: String,
}

/// Per-domain activity counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactStats {
    pub total: usize,
    pub by_domain: BTreeMap<String, usize>,
}

/// Ordered append-only storage backend.
pub trait ArtifactStore: Send + Sync {
    /// Persist a record and return its id. Durable once this returns.
    fn append(&self, domain: &str, kind: &str, payload: &Value) -> StorageResult<i64>;

    /// At most `limit` records, descending id.
    fn list(&self, limit: usize) -> StorageResult<Vec<ArtifactRecord>>;

    /// Remove every record; returns how many were removed.
    fn clear(&self) -> StorageResult<usize>;

    fn stats(&self) -> StorageResult<ArtifactStats>;
}

/// Current time in the stored timestamp format
pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Artifact store plus listing policy
#[derive(Clone)]
pub struct ArtifactLog {
    store: Arc<dyn ArtifactStore>,
    strict: bool,
    default_limit: usize,
}

impl ArtifactLog {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            strict: false,
            default_limit: 200,
        }
    }

    /// In-memory log, for tests and one-shot CLI runs
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryArtifactStore::new()))
    }

    /// Surface listing errors instead of degrading to an empty result
    pub fn with_strict_listing(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Cap used when a caller gives no limit
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    pub fn append(&self, domain: &str, kind: &str, payload: &Value) -> StorageResult<i64> {
        let id = self.store.append(domain, kind, payload)?;
        tracing::debug!(id, domain, kind, "artifact appended");
        Ok(id)
    }

    /// Newest records first. `None` uses the default limit.
    pub fn list(&self, limit: Option<usize>) -> StorageResult<Vec<ArtifactRecord>> {
        let limit = limit.unwrap_or(self.default_limit);
        match self.store.list(limit) {
            Ok(records) => Ok(records),
            Err(e) if !self.strict => {
                log_warning(format!("StorageDegraded: artifact listing failed: {}", e));
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub fn clear(&self) -> StorageResult<usize> {
        let removed = self.store.clear()?;
        tracing::info!(removed, "artifact log cleared");
        Ok(removed)
    }

    pub fn stats(&self) -> StorageResult<ArtifactStats> {
        self.store.stats()
    }
}

impl std::fmt::Debug for ArtifactLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactLog")
            .field("strict", &self.strict)
            .field("default_limit", &self.default_limit)
            .finish()
    }
}
