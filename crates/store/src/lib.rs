//! Pagevault Store Library
//!
//! Session-scoped page persistence: serialization orchestration, a bounded
//! cache of recent serializations, pluggable durable backing stores, and the
//! session replication protocol.
//!
//! A [`PageStore`] is shared by all request threads of an application. Each
//! operation carries the session id; pages are addressed by
//! [`PageId`](page_model::PageId) within their session.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use page_model::{ManageablePage, PageId};
//! use pagevault_store::{DataStore, JsonPageSerializer, MemoryDataStore, PageStore};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct CheckoutPage {
//!     id: u64,
//!     step: u32,
//! }
//!
//! impl ManageablePage for CheckoutPage {
//!     fn page_id(&self) -> PageId {
//!         PageId(self.id)
//!     }
//! }
//!
//! let store = PageStore::new(
//!     Box::new(JsonPageSerializer::new()),
//!     Arc::new(MemoryDataStore::new()) as Arc<dyn DataStore>,
//!     40,
//! );
//!
//! store.store_page("session-1", &CheckoutPage { id: 1, step: 2 }).unwrap();
//!
//! let page = store.get_page("session-1", PageId(1)).unwrap();
//! assert_eq!(page, Some(CheckoutPage { id: 1, step: 2 }));
//! ```

pub mod async_store;
pub mod config;
pub mod data_store;
pub mod disk;
pub mod error;
pub mod serializer;
pub mod store;

pub use async_store::{AsyncDataStore, AsyncStoreConfig};
pub use config::{ConfigError, StoreConfig};
pub use data_store::{DataStore, MemoryDataStore};
pub use disk::DiskDataStore;
pub use error::{StoreError, StoreResult};
pub use serializer::{JsonPageSerializer, PageSerializer};
pub use store::{PageStore, SessionEntry};
