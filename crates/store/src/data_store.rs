//! Backing store contract and the in-memory implementation.

use crate::error::StoreResult;
use page_model::PageId;
use std::collections::HashMap;
use std::sync::Mutex;

/// Durable key-value storage for serialized page bytes, keyed by
/// `(session, page)`.
///
/// Implementations must be safe for concurrent use across sessions. I/O
/// failures surface as errors and are propagated by the page store without
/// translation.
pub trait DataStore: Send + Sync {
    /// Store the serialized bytes of a page, replacing any previous version.
    fn store_data(&self, session_id: &str, page_id: PageId, data: &[u8]) -> StoreResult<()>;

    /// Fetch the serialized bytes of a page, or `None` if the store holds no
    /// copy.
    fn get_data(&self, session_id: &str, page_id: PageId) -> StoreResult<Option<Vec<u8>>>;

    /// Delete the stored bytes of a page. Deleting an absent page is not an
    /// error.
    fn remove_data(&self, session_id: &str, page_id: PageId) -> StoreResult<()>;

    /// Delete everything stored for a session.
    fn remove_session(&self, session_id: &str) -> StoreResult<()>;

    /// Whether this store propagates data across cluster nodes itself.
    ///
    /// A replicating store makes byte-level replication through session
    /// serialization unnecessary, so the page store skips the
    /// prepare-for-serialization swap for it.
    fn is_replicated(&self) -> bool;
}

/// In-memory backing store.
///
/// Holds page bytes in a per-session map. Suitable for tests and for
/// single-node deployments that accept losing page state on restart.
#[derive(Default)]
pub struct MemoryDataStore {
    sessions: Mutex<HashMap<String, HashMap<PageId, Vec<u8>>>>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with at least one stored page.
    pub fn session_count(&self) -> usize {
        let sessions = self.sessions.lock().unwrap();
        sessions.len()
    }

    /// Number of pages stored for a session.
    pub fn page_count(&self, session_id: &str) -> usize {
        let sessions = self.sessions.lock().unwrap();
        sessions.get(session_id).map_or(0, HashMap::len)
    }
}

impl DataStore for MemoryDataStore {
    fn store_data(&self, session_id: &str, page_id: PageId, data: &[u8]) -> StoreResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(session_id.to_string())
            .or_default()
            .insert(page_id, data.to_vec());
        Ok(())
    }

    fn get_data(&self, session_id: &str, page_id: PageId) -> StoreResult<Option<Vec<u8>>> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .get(session_id)
            .and_then(|pages| pages.get(&page_id))
            .cloned())
    }

    fn remove_data(&self, session_id: &str, page_id: PageId) -> StoreResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(pages) = sessions.get_mut(session_id) {
            pages.remove(&page_id);
            if pages.is_empty() {
                sessions.remove(session_id);
            }
        }
        Ok(())
    }

    fn remove_session(&self, session_id: &str) -> StoreResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(session_id);
        Ok(())
    }

    fn is_replicated(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_get_round_trip() {
        let store = MemoryDataStore::new();

        store.store_data("s1", PageId(1), &[1, 2, 3]).unwrap();

        assert_eq!(store.get_data("s1", PageId(1)).unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.get_data("s1", PageId(2)).unwrap(), None);
        assert_eq!(store.get_data("s2", PageId(1)).unwrap(), None);
    }

    #[test]
    fn store_replaces_previous_version() {
        let store = MemoryDataStore::new();

        store.store_data("s1", PageId(1), &[1]).unwrap();
        store.store_data("s1", PageId(1), &[2]).unwrap();

        assert_eq!(store.get_data("s1", PageId(1)).unwrap(), Some(vec![2]));
        assert_eq!(store.page_count("s1"), 1);
    }

    #[test]
    fn remove_data_is_tolerant_of_missing_pages() {
        let store = MemoryDataStore::new();

        store.store_data("s1", PageId(1), &[1]).unwrap();
        store.remove_data("s1", PageId(1)).unwrap();
        store.remove_data("s1", PageId(1)).unwrap();
        store.remove_data("unknown", PageId(1)).unwrap();

        assert_eq!(store.get_data("s1", PageId(1)).unwrap(), None);
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn remove_session_leaves_other_sessions() {
        let store = MemoryDataStore::new();

        store.store_data("s1", PageId(1), &[1]).unwrap();
        store.store_data("s1", PageId(2), &[2]).unwrap();
        store.store_data("s2", PageId(1), &[3]).unwrap();

        store.remove_session("s1").unwrap();

        assert_eq!(store.get_data("s1", PageId(1)).unwrap(), None);
        assert_eq!(store.get_data("s2", PageId(1)).unwrap(), Some(vec![3]));
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn memory_store_is_not_replicated() {
        assert!(!MemoryDataStore::new().is_replicated());
    }
}
