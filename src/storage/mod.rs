//! Durable storage: the `SQLite` database and the key-value blob contract.

pub mod database;
pub mod kv;
pub mod migrations;

pub use database::Database;
pub use kv::{KeyValueStore, MemoryStore, SqliteStore};
