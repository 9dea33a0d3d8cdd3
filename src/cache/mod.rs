//! Local cache mirror: per-collection snapshots for offline reads.

pub mod mirror;

pub use mirror::{CacheMirror, CollectionSnapshot, CACHE_PREFIX};
