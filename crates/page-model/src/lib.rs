//! Core record and identity types shared by the page cache and page store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifier of a page within a session.
///
/// Page ids are assigned by the application layer and are only meaningful
/// together with a session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A page as seen by the persistence layer: an opaque unit of per-user state
/// that knows its own id. Everything else about the page belongs to the
/// application.
pub trait ManageablePage {
    fn page_id(&self) -> PageId;
}

/// One version of one page within one session, in serialized form.
///
/// A record whose payload is `None` is *stripped*: its bytes were already
/// flushed to the backing store and dropped from memory, and must be
/// rehydrated from the backing store before use.
///
/// Equality and hashing are derived from the `(session_id, page_id)` identity
/// pair only, never from the payload. Two records for the same logical page
/// compare equal even when one carries newer bytes or no bytes at all, which
/// is what lets the cache replace-on-store and remove-by-identity without
/// byte comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedPage {
    session_id: String,
    page_id: PageId,
    data: Option<Vec<u8>>,
}

impl SerializedPage {
    /// Create a record carrying a serialized payload.
    pub fn new(session_id: impl Into<String>, page_id: PageId, data: Vec<u8>) -> Self {
        Self { session_id: session_id.into(), page_id, data: Some(data) }
    }

    /// Create a payload-less record pointing at the backing store's copy.
    pub fn stripped(session_id: impl Into<String>, page_id: PageId) -> Self {
        Self { session_id: session_id.into(), page_id, data: None }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// The serialized payload, or `None` for a stripped record.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Consume the record, yielding the payload if present.
    pub fn into_data(self) -> Option<Vec<u8>> {
        self.data
    }

    /// Drop the payload, keeping only the identity pair.
    pub fn strip(mut self) -> Self {
        self.data = None;
        self
    }

    /// Whether this record identifies the given page of the given session.
    pub fn identifies(&self, session_id: &str, page_id: PageId) -> bool {
        self.session_id == session_id && self.page_id == page_id
    }
}

impl PartialEq for SerializedPage {
    fn eq(&self, other: &Self) -> bool {
        self.session_id == other.session_id && self.page_id == other.page_id
    }
}

impl Eq for SerializedPage {}

impl Hash for SerializedPage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.session_id.hash(state);
        self.page_id.hash(state);
    }
}

impl fmt::Display for SerializedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} of session {}", self.page_id, self.session_id)
    }
}
