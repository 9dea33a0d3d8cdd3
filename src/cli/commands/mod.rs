//! CLI command implementations.

pub mod cache;
pub mod completions;
pub mod queue;

pub use cache::{cache_list, cache_show};
pub use completions::completions;
pub use queue::{clear, list, retry, status};
