//! Page serializer contract and the bundled JSON implementation.
//!
//! The byte layout of a serialized page belongs entirely to the serializer;
//! the page store treats payloads as opaque.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Converts pages to and from their serialized byte form.
///
/// Failure is signaled by an absent result, never by a panic. The page store
/// decides how a failed serialization is reported; implementations should at
/// most leave a debug note.
pub trait PageSerializer<P>: Send + Sync {
    /// Serialize a page, or `None` if the page cannot be serialized.
    fn serialize(&self, page: &P) -> Option<Vec<u8>>;

    /// Reconstruct a page from bytes produced by `serialize`, or `None` if
    /// the bytes are not a valid page.
    fn deserialize(&self, data: &[u8]) -> Option<P>;
}

/// JSON page serializer for any serde-serializable page type.
pub struct JsonPageSerializer<P> {
    _page: PhantomData<fn() -> P>,
}

impl<P> JsonPageSerializer<P> {
    pub fn new() -> Self {
        Self { _page: PhantomData }
    }
}

impl<P> Default for JsonPageSerializer<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> PageSerializer<P> for JsonPageSerializer<P>
where
    P: Serialize + DeserializeOwned,
{
    fn serialize(&self, page: &P) -> Option<Vec<u8>> {
        match serde_json::to_vec(page) {
            Ok(data) => Some(data),
            Err(err) => {
                log::debug!("page did not serialize to JSON: {err}");
                None
            }
        }
    }

    fn deserialize(&self, data: &[u8]) -> Option<P> {
        match serde_json::from_slice(data) {
            Ok(page) => Some(page),
            Err(err) => {
                log::debug!("stored bytes did not deserialize as a page: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestPage {
        id: u64,
        title: String,
    }

    #[test]
    fn json_round_trip() {
        let serializer = JsonPageSerializer::<TestPage>::new();
        let page = TestPage { id: 3, title: "checkout".to_string() };

        let data = serializer.serialize(&page).expect("page should serialize");
        let back = serializer.deserialize(&data).expect("bytes should deserialize");

        assert_eq!(back, page);
    }

    #[test]
    fn rejects_bytes_that_are_not_a_page() {
        let serializer = JsonPageSerializer::<TestPage>::new();

        assert!(serializer.deserialize(b"not json at all").is_none());
        assert!(serializer.deserialize(b"{\"unrelated\":true}").is_none());
    }
}
