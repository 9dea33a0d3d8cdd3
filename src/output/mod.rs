//! Output formatting for the CLI: pretty (colored) and JSON.

pub mod json;
pub mod pretty;

pub use json::to_json;
pub use pretty::{format_age, format_mutation_list};
