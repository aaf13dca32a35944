//! In-memory artifact store.

use serde_json::Value;
use std::sync::Mutex;

use super::{timestamp, ArtifactRecord, ArtifactStats, ArtifactStore};
use crate::error::{StorageError, StorageResult};

#[derive(Default)]
struct State {
    records: Vec<ArtifactRecord>,
    /// Last issued id; survives `clear`
    last_id: i64,
}

/// Volatile store with the same id guarantees as the SQLite one.
#[derive(Default)]
pub struct MemoryArtifactStore {
    state: Mutex<State>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn append(&self, domain: &str, kind: &str, payload: &Value) -> StorageResult<i64> {
        let mut state = self.state.lock().map_err(|_| StorageError::Poisoned)?;
        state.last_id += 1;
        let id = state.last_id;
        state.records.push(ArtifactRecord {
            id,
            domain: domain.to_string(),
            kind: kind.to_string(),
            payload: payload.clone(),
            created_at: timestamp(),
        });
        Ok(id)
    }

    fn list(&self, limit: usize) -> StorageResult<Vec<ArtifactRecord>> {
        let state = self.state.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(state.records.iter().rev().take(limit).cloned().collect())
    }

    fn clear(&self) -> StorageResult<usize> {
        let mut state = self.state.lock().map_err(|_| StorageError::Poisoned)?;
        let removed = state.records.len();
        state.records.clear();
        Ok(removed)
    }

    fn stats(&self) -> StorageResult<ArtifactStats> {
        let state = self.state.lock().map_err(|_| StorageError::Poisoned)?;
        let mut stats = ArtifactStats {
            total: state.records.len(),
            ..Default::default()
        };
        for record in &state.records {
            *stats.by_domain.entry(record.domain.clone()).or_insert(0) += 1;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_clear_keeps_counter() {
        let store = MemoryArtifactStore::new();
        store.append("d", "chat", &json!({})).unwrap();
        let before = store.append("d", "chat", &json!({})).unwrap();
        assert_eq!(store.clear().unwrap(), 2);

        let after = store.append("d", "chat", &json!({})).unwrap();
        assert!(after > before);
        assert_eq!(store.list(10).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_appends_unique_ids() {
        let store = Arc::new(MemoryArtifactStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..25)
                        .map(|i| store.append("d", "chat", &json!({"t": t, "i": i})).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 200);
        assert_eq!(store.stats().unwrap().total, 200);
    }
}
