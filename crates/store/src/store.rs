//! Page store orchestration: serialization, caching, durable storage, and
//! the session replication protocol.

use crate::async_store::{AsyncDataStore, AsyncStoreConfig};
use crate::config::StoreConfig;
use crate::data_store::DataStore;
use crate::disk::DiskDataStore;
use crate::error::{StoreError, StoreResult};
use crate::serializer::PageSerializer;
use page_model::{ManageablePage, PageId, SerializedPage};
use pagevault_cache::SerializedPageCache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The two forms a session may hold for a page slot.
///
/// Between requests a session usually holds the live page object. Just before
/// the session itself is serialized for replication to another node, the page
/// store swaps live pages for their [`SerializedPage`] records; on the
/// receiving node the records are written through to the backing store and
/// turned back into live pages on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEntry<P> {
    /// The in-memory page object.
    Live(P),
    /// The page in serialized-record form.
    Serialized(SerializedPage),
}

/// Session-scoped page persistence.
///
/// One shared instance serves all request threads of an application; sessions
/// are partitioned purely by the session-id key passed to every operation.
/// After construction the store holds only immutable wiring: the serializer,
/// the backing [`DataStore`], and the bounded cache of recent serializations.
///
/// The cache exists to avoid redundant *serialization* work, not to speed up
/// reads: a page serialized during the request cycle is reused as-is when the
/// session is replicated moments later.
pub struct PageStore<P> {
    serializer: Box<dyn PageSerializer<P>>,
    data_store: Arc<dyn DataStore>,
    cache: SerializedPageCache,
}

impl<P: ManageablePage> PageStore<P> {
    /// Create a store over the given serializer and backing store, with a
    /// cache holding up to `cache_pages` serialized pages (0 disables it).
    pub fn new(
        serializer: Box<dyn PageSerializer<P>>,
        data_store: Arc<dyn DataStore>,
        cache_pages: usize,
    ) -> Self {
        Self {
            serializer,
            data_store,
            cache: SerializedPageCache::new(cache_pages),
        }
    }

    /// Create a store from configuration: a [`DiskDataStore`] at the
    /// configured directory, optionally wrapped write-behind, and the
    /// configured cache capacity.
    pub fn from_config(
        serializer: Box<dyn PageSerializer<P>>,
        config: &StoreConfig,
    ) -> StoreResult<Self> {
        let disk = DiskDataStore::new(&config.data_dir)?;
        let data_store: Arc<dyn DataStore> = if config.write_behind {
            Arc::new(AsyncDataStore::new(
                Arc::new(disk),
                AsyncStoreConfig::new(config.write_queue_capacity),
            ))
        } else {
            Arc::new(disk)
        };
        Ok(Self::new(serializer, data_store, config.cache_pages))
    }

    /// The serialized-page cache, exposed for inspection.
    pub fn cache(&self) -> &SerializedPageCache {
        &self.cache
    }

    /// Retrieve and deserialize a page.
    ///
    /// The cache is consulted first (touching the entry); a stripped cached
    /// record or a miss falls back to the backing store. Returns `Ok(None)`
    /// if neither holds the page.
    pub fn get_page(&self, session_id: &str, page_id: PageId) -> StoreResult<Option<P>> {
        if let Some(record) = self.cache.get(session_id, page_id) {
            if let Some(data) = record.data() {
                return self.deserialize(session_id, page_id, data).map(Some);
            }
        }

        match self.data_store.get_data(session_id, page_id)? {
            Some(data) => self.deserialize(session_id, page_id, &data).map(Some),
            None => Ok(None),
        }
    }

    /// Serialize and persist a page.
    ///
    /// On success the record is placed in the cache and the bytes forwarded
    /// to the backing store. If the serializer fails, a warning naming the
    /// page is logged and the call returns `Ok(())` without touching cache or
    /// backing store: the page is simply not persisted this round, and the
    /// surrounding request layer will treat it as expired if it is never
    /// persisted again.
    pub fn store_page(&self, session_id: &str, page: &P) -> StoreResult<()> {
        let page_id = page.page_id();
        let Some(data) = self.serializer.serialize(page) else {
            log::warn!(
                "could not serialize page {page_id} of session {session_id}; \
                 the page will not be persisted this request"
            );
            return Ok(());
        };

        let record = Arc::new(SerializedPage::new(session_id, page_id, data));
        self.cache.store(Arc::clone(&record));
        if let Some(bytes) = record.data() {
            self.data_store.store_data(session_id, page_id, bytes)?;
        }
        Ok(())
    }

    /// Remove a page from the cache and the backing store.
    pub fn remove_page(&self, session_id: &str, page_id: PageId) -> StoreResult<()> {
        self.cache.remove(session_id, page_id);
        self.data_store.remove_data(session_id, page_id)
    }

    /// Purge everything held for a session. Invoked when the session ends.
    pub fn unbind(&self, session_id: &str) -> StoreResult<()> {
        self.cache.remove_session(session_id);
        self.data_store.remove_session(session_id)
    }

    /// Replication protocol, sending side: swap a live page for its
    /// serialized record before the session object graph is serialized.
    ///
    /// The cached serialization is reused when present, so a page stored
    /// during the request cycle is not serialized a second time. A stripped
    /// record is rehydrated from the backing store, because the caller is
    /// about to need actual bytes. Two cases pass through unchanged: a
    /// replicated backing store (it propagates bytes itself, the swap is
    /// unnecessary) and a live page the serializer cannot handle (logged as a
    /// warning; the session will carry the live object).
    pub fn prepare_for_serialization(
        &self,
        session_id: &str,
        entry: SessionEntry<P>,
    ) -> StoreResult<SessionEntry<P>> {
        if self.data_store.is_replicated() {
            return Ok(entry);
        }

        match entry {
            SessionEntry::Live(page) => {
                let page_id = page.page_id();
                if let Some(cached) = self.cache.get(session_id, page_id) {
                    if cached.has_data() {
                        return Ok(SessionEntry::Serialized(cached.as_ref().clone()));
                    }
                }
                match self.serializer.serialize(&page) {
                    Some(data) => {
                        let record = SerializedPage::new(session_id, page_id, data);
                        self.cache.store(Arc::new(record.clone()));
                        Ok(SessionEntry::Serialized(record))
                    }
                    None => {
                        log::warn!(
                            "could not serialize page {page_id} of session {session_id} \
                             for session replication; keeping the live page"
                        );
                        Ok(SessionEntry::Live(page))
                    }
                }
            }
            SessionEntry::Serialized(record) => {
                if record.has_data() {
                    return Ok(SessionEntry::Serialized(record));
                }
                match self.data_store.get_data(record.session_id(), record.page_id())? {
                    Some(data) => Ok(SessionEntry::Serialized(SerializedPage::new(
                        record.session_id(),
                        record.page_id(),
                        data,
                    ))),
                    None => {
                        log::warn!(
                            "no stored payload for {record} during session replication; \
                             the page will be treated as expired"
                        );
                        Ok(SessionEntry::Serialized(record))
                    }
                }
            }
        }
    }

    /// Replication protocol, receiving side: unpack a session entry after the
    /// session was deserialized on this node.
    ///
    /// A record carrying a payload is written through to the backing store
    /// immediately, so a crash before the next store cannot lose it, and is
    /// returned stripped to avoid holding the bytes twice in memory. A
    /// stripped record means the durable store is authoritative and passes
    /// through, as does a live page.
    pub fn restore_after_serialization(
        &self,
        entry: SessionEntry<P>,
    ) -> StoreResult<SessionEntry<P>> {
        match entry {
            SessionEntry::Live(page) => Ok(SessionEntry::Live(page)),
            SessionEntry::Serialized(record) => {
                if let Some(bytes) = record.data() {
                    self.data_store
                        .store_data(record.session_id(), record.page_id(), bytes)?;
                } else {
                    return Ok(SessionEntry::Serialized(record));
                }
                Ok(SessionEntry::Serialized(record.strip()))
            }
        }
    }

    /// Normalize either entry form into the live page.
    ///
    /// A stripped record is rehydrated from the backing store first; if the
    /// store holds no copy either, the page is unrecoverable and
    /// [`StoreError::MissingPayload`] is returned.
    pub fn convert_to_page(&self, entry: SessionEntry<P>) -> StoreResult<P> {
        match entry {
            SessionEntry::Live(page) => Ok(page),
            SessionEntry::Serialized(record) => {
                let session_id = record.session_id().to_string();
                let page_id = record.page_id();
                let data = match record.into_data() {
                    Some(data) => data,
                    None => self.data_store.get_data(&session_id, page_id)?.ok_or_else(|| {
                        StoreError::MissingPayload {
                            session_id: session_id.clone(),
                            page_id,
                        }
                    })?,
                };
                self.deserialize(&session_id, page_id, &data)
            }
        }
    }

    fn deserialize(&self, session_id: &str, page_id: PageId, data: &[u8]) -> StoreResult<P> {
        self.serializer
            .deserialize(data)
            .ok_or_else(|| StoreError::Deserialize {
                session_id: session_id.to_string(),
                page_id,
            })
    }
}
