//! Cache inspection commands.

use colored::Colorize;

use crate::cache::CacheMirror;
use crate::cli::args::OutputFormat;
use crate::error::FieldsyncError;
use crate::output::{format_age, to_json};

/// List cached collections with record counts.
pub fn cache_list(mirror: &CacheMirror, format: OutputFormat) -> Result<String, FieldsyncError> {
    let collections = mirror.collections();

    match format {
        OutputFormat::Json => {
            let data: Vec<_> = collections
                .iter()
                .map(|name| {
                    serde_json::json!({
                        "collection": name,
                        "records": mirror.read(name).len(),
                        "last_synced_at": mirror.last_synced_at(name).map(|t| t.to_rfc3339()),
                    })
                })
                .collect();
            to_json(&data)
        }
        OutputFormat::Pretty => {
            if collections.is_empty() {
                return Ok("No cached collections.".to_string());
            }

            let mut lines = Vec::new();
            lines.push(format!("Cached Collections ({})", collections.len()));
            lines.push("─".repeat(50));

            for name in &collections {
                let count = mirror.read(name).len();
                let synced = mirror
                    .last_synced_at(name)
                    .map_or_else(|| "never refreshed".to_string(), format_age);
                lines.push(format!(
                    "  {:<16} {:>5} records   {}",
                    name,
                    count,
                    synced.dimmed()
                ));
            }

            Ok(lines.join("\n"))
        }
    }
}

/// Show the cached records of one collection.
pub fn cache_show(
    mirror: &CacheMirror,
    collection: &str,
    format: OutputFormat,
) -> Result<String, FieldsyncError> {
    let snapshot = mirror
        .snapshot(collection)
        .ok_or_else(|| FieldsyncError::NotFound(format!("collection {collection}")))?;

    match format {
        OutputFormat::Json => to_json(&snapshot),
        OutputFormat::Pretty => {
            let mut lines = Vec::new();

            lines.push(format!(
                "{} ({} records)",
                collection.bold(),
                snapshot.records.len()
            ));
            if let Some(synced) = snapshot.last_synced_at {
                lines.push(format!("Last refreshed {}", format_age(synced).dimmed()));
            }
            lines.push("─".repeat(50));

            for record in &snapshot.records {
                lines.push(serde_json::to_string(record)?);
            }

            Ok(lines.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use serde_json::json;
    use std::sync::Arc;

    fn mirror() -> CacheMirror {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        CacheMirror::open(store).unwrap()
    }

    #[test]
    fn test_cache_list_empty() {
        let mirror = mirror();

        let output = cache_list(&mirror, OutputFormat::Pretty).unwrap();
        assert_eq!(output, "No cached collections.");
    }

    #[test]
    fn test_cache_list_with_collections() {
        let mirror = mirror();
        mirror.refresh("tasks", vec![json!({"id": "t1"})]).unwrap();

        let output = cache_list(&mirror, OutputFormat::Json).unwrap();
        assert!(output.contains("\"collection\": \"tasks\""));
        assert!(output.contains("\"records\": 1"));
    }

    #[test]
    fn test_cache_show_unknown_collection() {
        let mirror = mirror();

        assert!(matches!(
            cache_show(&mirror, "ghost", OutputFormat::Pretty),
            Err(FieldsyncError::NotFound(_))
        ));
    }

    #[test]
    fn test_cache_show_renders_records() {
        let mirror = mirror();
        mirror
            .refresh("tasks", vec![json!({"id": "t1", "title": "A"})])
            .unwrap();

        let output = cache_show(&mirror, "tasks", OutputFormat::Pretty).unwrap();
        assert!(output.contains("1 records"));
        assert!(output.contains("\"title\":\"A\""));
    }
}
