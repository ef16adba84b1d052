//! Pagevault Cache Library
//!
//! Bounded most-recently-used cache of serialized page records.

pub mod pages;

pub use pages::{CacheStats, SerializedPageCache};
