//! Bounded most-recently-used cache of serialized page records.
//!
//! The cache sits between the page store and its backing store to avoid
//! serializing the same page twice in quick succession: once during the
//! normal request cycle and once more if the session is replicated right
//! afterwards. Entries are kept in recency order and evicted from the least
//! recently used end once the configured capacity is reached.

use page_model::{PageId, SerializedPage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of records currently in the cache
    pub entry_count: usize,

    /// Maximum number of records the cache will hold
    pub capacity: usize,

    /// Number of cache hits
    pub hits: u64,

    /// Number of cache misses
    pub misses: u64,

    /// Number of records evicted at capacity
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Internal cache state
struct CacheState {
    /// Recency order: front = least recently used, back = most recently used
    entries: VecDeque<Arc<SerializedPage>>,

    /// Statistics
    stats: CacheStats,
}

impl CacheState {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            stats: CacheStats { capacity, ..Default::default() },
        }
    }

    /// Remove and return the first record matching the identity, if any.
    fn take(&mut self, session_id: &str, page_id: PageId) -> Option<Arc<SerializedPage>> {
        let position = self
            .entries
            .iter()
            .position(|record| record.identifies(session_id, page_id))?;
        let record = self.entries.remove(position);
        self.stats.entry_count = self.entries.len();
        record
    }

    /// Evict from the least recently used end until at most `capacity` records remain.
    fn evict_to_capacity(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            if let Some(evicted) = self.entries.pop_front() {
                self.stats.evictions += 1;
                log::trace!("evicted {evicted} from the serialized page cache");
            }
        }
        self.stats.entry_count = self.entries.len();
    }
}

/// Bounded most-recently-used cache of serialized pages.
///
/// Thread-safe; a single instance is shared by all request threads. Records
/// are found by identity scan, which is appropriate for the very small
/// capacities this cache is configured with (a few dozen entries). A
/// capacity of zero disables the cache entirely: every operation becomes a
/// no-op and every lookup a miss.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use page_model::{PageId, SerializedPage};
/// use pagevault_cache::SerializedPageCache;
///
/// let cache = SerializedPageCache::new(40);
/// cache.store(Arc::new(SerializedPage::new("session", PageId(1), vec![1, 2, 3])));
///
/// let record = cache.get("session", PageId(1)).expect("cached");
/// assert_eq!(record.data(), Some(&[1u8, 2, 3][..]));
/// ```
#[derive(Clone)]
pub struct SerializedPageCache {
    capacity: usize,
    state: Arc<Mutex<CacheState>>,
}

impl SerializedPageCache {
    /// Create a cache holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Arc::new(Mutex::new(CacheState::new(capacity))),
        }
    }

    /// Store a record as the most recently used entry.
    ///
    /// Any existing record with the same `(session, page)` identity is
    /// replaced, so the cache never holds two entries for one logical page.
    /// If the cache is over capacity afterwards, least recently used records
    /// are evicted.
    pub fn store(&self, record: Arc<SerializedPage>) {
        if self.capacity == 0 {
            return;
        }
        let mut state = self.state.lock().unwrap();

        state.take(record.session_id(), record.page_id());
        state.entries.push_back(record);
        state.evict_to_capacity(self.capacity);
    }

    /// Retrieve the record for a page, marking it most recently used.
    ///
    /// Returns `None` on a miss or when the cache is disabled. A miss is
    /// never an error: callers must always be prepared to fall back to the
    /// backing store.
    pub fn get(&self, session_id: &str, page_id: PageId) -> Option<Arc<SerializedPage>> {
        if self.capacity == 0 {
            return None;
        }
        let mut state = self.state.lock().unwrap();

        match state.take(session_id, page_id) {
            Some(record) => {
                state.entries.push_back(Arc::clone(&record));
                state.stats.entry_count = state.entries.len();
                state.stats.hits += 1;
                Some(record)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Remove the record for a page.
    ///
    /// Returns the removed record, or `None` if the page was not cached.
    pub fn remove(&self, session_id: &str, page_id: PageId) -> Option<Arc<SerializedPage>> {
        if self.capacity == 0 {
            return None;
        }
        let mut state = self.state.lock().unwrap();
        state.take(session_id, page_id)
    }

    /// Remove every record belonging to a session.
    ///
    /// Records of other sessions are untouched.
    pub fn remove_session(&self, session_id: &str) {
        if self.capacity == 0 {
            return;
        }
        let mut state = self.state.lock().unwrap();
        state.entries.retain(|record| record.session_id() != session_id);
        state.stats.entry_count = state.entries.len();
    }

    /// Drop every record.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.entries.clear();
        state.stats.entry_count = 0;
    }

    /// Number of records currently cached.
    pub fn len(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured maximum number of records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().unwrap();
        state.stats
    }
}
