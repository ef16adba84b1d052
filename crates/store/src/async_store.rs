//! Write-behind wrapper deferring backing-store writes to a background thread.
//!
//! Stores are queued and flushed by a single named flusher thread so the
//! request thread does not wait on backing-store I/O. Reads check the pending
//! queue before the inner store, which keeps a just-stored page visible
//! before its write lands. When the queue is full, a store degrades to a
//! synchronous write on the calling thread.

use crate::data_store::DataStore;
use crate::error::StoreResult;
use page_model::PageId;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configuration for the write-behind store.
#[derive(Debug, Clone)]
pub struct AsyncStoreConfig {
    /// Maximum number of pending writes before stores degrade to synchronous
    /// delegation. Default: 100.
    pub queue_capacity: usize,

    /// Maximum time the flusher sleeps when the queue is empty.
    /// Default: 100ms.
    pub poll_interval: Duration,
}

impl Default for AsyncStoreConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl AsyncStoreConfig {
    /// Create a configuration with the given queue capacity.
    pub fn new(queue_capacity: usize) -> Self {
        Self { queue_capacity, ..Self::default() }
    }

    /// Set the flusher poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// A page write waiting to be flushed to the inner store.
struct PendingPage {
    session_id: String,
    page_id: PageId,
    data: Vec<u8>,
}

impl PendingPage {
    fn identifies(&self, session_id: &str, page_id: PageId) -> bool {
        self.session_id == session_id && self.page_id == page_id
    }
}

/// Write-behind data store.
///
/// Wraps any [`DataStore`] and absorbs `store_data` calls into a bounded
/// in-memory queue drained by a background flusher. Removal operations drop
/// matching pending writes before delegating, so a removed page cannot be
/// resurrected by a late flush. Flush failures cannot be propagated to the
/// request that caused them; they are logged as errors with the page
/// identity.
///
/// Dropping the store (or calling [`shutdown`](AsyncDataStore::shutdown))
/// drains the remaining queue before the flusher exits.
pub struct AsyncDataStore {
    inner: Arc<dyn DataStore>,
    queue: Arc<Mutex<VecDeque<PendingPage>>>,
    queue_capacity: usize,
    shutdown: Arc<AtomicBool>,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncDataStore {
    /// Wrap `inner`, spawning the background flusher.
    pub fn new(inner: Arc<dyn DataStore>, config: AsyncStoreConfig) -> Self {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let flusher = {
            let inner = Arc::clone(&inner);
            let queue = Arc::clone(&queue);
            let shutdown = Arc::clone(&shutdown);
            let poll_interval = config.poll_interval;
            thread::Builder::new()
                .name("pagevault-flusher".to_string())
                .spawn(move || Self::run_flusher(inner, queue, shutdown, poll_interval))
                .expect("failed to spawn flusher thread")
        };

        Self {
            inner,
            queue,
            queue_capacity: config.queue_capacity,
            shutdown,
            flusher: Mutex::new(Some(flusher)),
        }
    }

    /// Flusher loop: drain pending writes, sleeping while idle. The loop only
    /// exits once shutdown is signalled *and* the queue is empty, so shutdown
    /// always drains.
    fn run_flusher(
        inner: Arc<dyn DataStore>,
        queue: Arc<Mutex<VecDeque<PendingPage>>>,
        shutdown: Arc<AtomicBool>,
        poll_interval: Duration,
    ) {
        loop {
            let pending = queue.lock().unwrap().pop_front();
            match pending {
                Some(page) => {
                    if let Err(err) = inner.store_data(&page.session_id, page.page_id, &page.data)
                    {
                        log::error!(
                            "write-behind flush failed for page {} of session {}: {err}",
                            page.page_id,
                            page.session_id
                        );
                    }
                }
                None => {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }
                    thread::sleep(poll_interval);
                }
            }
        }
    }

    /// Number of writes waiting to be flushed.
    pub fn pending(&self) -> usize {
        let queue = self.queue.lock().unwrap();
        queue.len()
    }

    /// Signal the flusher to drain the queue and stop, then wait for it.
    ///
    /// Idempotent; also invoked on drop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.flusher.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl DataStore for AsyncDataStore {
    fn store_data(&self, session_id: &str, page_id: PageId, data: &[u8]) -> StoreResult<()> {
        // After shutdown nothing drains the queue; write synchronously.
        if self.shutdown.load(Ordering::Acquire) {
            return self.inner.store_data(session_id, page_id, data);
        }
        {
            let mut queue = self.queue.lock().unwrap();
            // A newer write supersedes any queued one for the same page.
            queue.retain(|pending| !pending.identifies(session_id, page_id));
            if queue.len() < self.queue_capacity {
                queue.push_back(PendingPage {
                    session_id: session_id.to_string(),
                    page_id,
                    data: data.to_vec(),
                });
                return Ok(());
            }
        }
        // Queue full: write on the calling thread.
        self.inner.store_data(session_id, page_id, data)
    }

    fn get_data(&self, session_id: &str, page_id: PageId) -> StoreResult<Option<Vec<u8>>> {
        {
            let queue = self.queue.lock().unwrap();
            if let Some(pending) = queue
                .iter()
                .rev()
                .find(|pending| pending.identifies(session_id, page_id))
            {
                return Ok(Some(pending.data.clone()));
            }
        }
        self.inner.get_data(session_id, page_id)
    }

    fn remove_data(&self, session_id: &str, page_id: PageId) -> StoreResult<()> {
        {
            let mut queue = self.queue.lock().unwrap();
            queue.retain(|pending| !pending.identifies(session_id, page_id));
        }
        self.inner.remove_data(session_id, page_id)
    }

    fn remove_session(&self, session_id: &str) -> StoreResult<()> {
        {
            let mut queue = self.queue.lock().unwrap();
            queue.retain(|pending| pending.session_id != session_id);
        }
        self.inner.remove_session(session_id)
    }

    fn is_replicated(&self) -> bool {
        self.inner.is_replicated()
    }
}

impl Drop for AsyncDataStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_store::MemoryDataStore;

    fn wrapped(queue_capacity: usize) -> (AsyncDataStore, Arc<MemoryDataStore>) {
        let inner = Arc::new(MemoryDataStore::new());
        let store = AsyncDataStore::new(
            Arc::clone(&inner) as Arc<dyn DataStore>,
            AsyncStoreConfig::new(queue_capacity).with_poll_interval(Duration::from_millis(5)),
        );
        (store, inner)
    }

    #[test]
    fn queued_page_is_readable_before_flush() {
        let (store, _inner) = wrapped(100);

        store.store_data("s1", PageId(1), &[1, 2, 3]).unwrap();

        // Read-through of the pending queue, regardless of flush timing.
        assert_eq!(store.get_data("s1", PageId(1)).unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn shutdown_drains_the_queue() {
        let (store, inner) = wrapped(100);

        for page_id in 0..20 {
            store.store_data("s1", PageId(page_id), &[page_id as u8]).unwrap();
        }
        store.shutdown();

        assert_eq!(store.pending(), 0);
        assert_eq!(inner.page_count("s1"), 20);
        assert_eq!(inner.get_data("s1", PageId(7)).unwrap(), Some(vec![7]));
    }

    #[test]
    fn newer_write_supersedes_queued_write() {
        let (store, inner) = wrapped(100);

        store.store_data("s1", PageId(1), &[1]).unwrap();
        store.store_data("s1", PageId(1), &[2]).unwrap();

        assert!(store.pending() <= 1);
        assert_eq!(store.get_data("s1", PageId(1)).unwrap(), Some(vec![2]));

        store.shutdown();
        assert_eq!(inner.get_data("s1", PageId(1)).unwrap(), Some(vec![2]));
    }

    #[test]
    fn full_queue_degrades_to_synchronous_write() {
        // Capacity zero forces every write down the synchronous path.
        let (store, inner) = wrapped(0);

        store.store_data("s1", PageId(1), &[9]).unwrap();

        assert_eq!(store.pending(), 0);
        assert_eq!(inner.get_data("s1", PageId(1)).unwrap(), Some(vec![9]));
    }

    #[test]
    fn remove_cancels_pending_write() {
        let (store, inner) = wrapped(100);

        store.store_data("s1", PageId(1), &[1]).unwrap();
        store.remove_data("s1", PageId(1)).unwrap();
        store.shutdown();

        assert_eq!(inner.get_data("s1", PageId(1)).unwrap(), None);
    }

    #[test]
    fn remove_session_cancels_pending_session_writes() {
        let (store, inner) = wrapped(100);

        store.store_data("s1", PageId(1), &[1]).unwrap();
        store.store_data("s1", PageId(2), &[2]).unwrap();
        store.store_data("s2", PageId(1), &[3]).unwrap();
        store.remove_session("s1").unwrap();
        store.shutdown();

        assert_eq!(inner.page_count("s1"), 0);
        assert_eq!(inner.get_data("s2", PageId(1)).unwrap(), Some(vec![3]));
    }

    #[test]
    fn replication_flag_delegates_to_inner_store() {
        let (store, _inner) = wrapped(100);
        assert!(!store.is_replicated());
    }
}
