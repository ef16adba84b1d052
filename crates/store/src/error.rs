use page_model::PageId;
use std::io;

/// Errors surfaced by the page store and its backing stores.
///
/// Backing-store I/O failures propagate untranslated; the remaining variants
/// are invalid-state conditions in the store protocol itself.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(
        "page {page_id} of session {session_id} has no serialized payload \
         and the backing store holds no copy"
    )]
    MissingPayload { session_id: String, page_id: PageId },

    #[error("stored bytes for page {page_id} of session {session_id} were rejected by the serializer")]
    Deserialize { session_id: String, page_id: PageId },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
