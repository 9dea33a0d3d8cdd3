//! Configuration: data paths and YAML settings.

pub mod paths;
pub mod settings;

pub use paths::Paths;
pub use settings::{Config, GeneralConfig, SyncSettings};
