//! Queue maintenance commands.

use colored::Colorize;

use crate::cache::CacheMirror;
use crate::cli::args::OutputFormat;
use crate::error::FieldsyncError;
use crate::output::{format_age, format_mutation_list, to_json};
use crate::sync::MutationQueue;

/// Show queue and cache status.
pub fn status(
    queue: &MutationQueue,
    mirror: &CacheMirror,
    attempt_ceiling: u32,
    format: OutputFormat,
) -> Result<String, FieldsyncError> {
    let stats = queue.stats();
    let collections = mirror.collections();

    match format {
        OutputFormat::Json => {
            let cache: Vec<_> = collections
                .iter()
                .map(|name| {
                    serde_json::json!({
                        "collection": name,
                        "records": mirror.read(name).len(),
                        "last_synced_at": mirror.last_synced_at(name).map(|t| t.to_rfc3339()),
                    })
                })
                .collect();

            let data = serde_json::json!({
                "pending": stats.pending,
                "oldest_pending": stats.oldest_pending.map(|t| t.to_rfc3339()),
                "attempt_ceiling": attempt_ceiling,
                "cache": cache,
            });
            to_json(&data)
        }
        OutputFormat::Pretty => {
            let mut lines = Vec::new();

            lines.push("Sync Status".bold().to_string());
            lines.push("─".repeat(40));

            lines.push(format!(
                "  Pending:  {} {}",
                stats.pending,
                if stats.pending > 0 {
                    "mutations waiting to sync".dimmed()
                } else {
                    "".dimmed()
                }
            ));

            if let Some(oldest) = stats.oldest_pending {
                lines.push(format!("  Oldest:   {}", format_age(oldest).dimmed()));
            }

            lines.push(format!("  Ceiling:  {attempt_ceiling} attempts"));

            lines.push(String::new());
            lines.push("Cached Collections".bold().to_string());
            lines.push("─".repeat(40));

            if collections.is_empty() {
                lines.push("  (none)".dimmed().to_string());
            }

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

/// List queued mutations.
pub fn list(
    queue: &MutationQueue,
    limit: usize,
    format: OutputFormat,
) -> Result<String, FieldsyncError> {
    let mutations = queue.pending();

    match format {
        OutputFormat::Json => to_json(&mutations),
        OutputFormat::Pretty => {
            if mutations.is_empty() {
                Ok("No mutations queued.".to_string())
            } else {
                Ok(format_mutation_list(&mutations, limit))
            }
        }
    }
}

/// Re-arm mutations for the next flush.
pub fn retry(
    queue: &MutationQueue,
    all: bool,
    id: Option<u64>,
    format: OutputFormat,
) -> Result<String, FieldsyncError> {
    if let Some(id) = id {
        queue.reset_attempts(id)?;

        match format {
            OutputFormat::Json => {
                let data = serde_json::json!({"reset": [id]});
                to_json(&data)
            }
            OutputFormat::Pretty => Ok(format!("Reset mutation {id} for retry")),
        }
    } else if all {
        let ids = queue.pending_ids();
        for id in &ids {
            queue.reset_attempts(*id)?;
        }

        match format {
            OutputFormat::Json => {
                let data = serde_json::json!({"reset": ids});
                to_json(&data)
            }
            OutputFormat::Pretty => Ok(format!("Reset {} mutations for retry", ids.len())),
        }
    } else {
        Err(FieldsyncError::Config(
            "Specify --all or provide a mutation id".to_string(),
        ))
    }
}

/// Clear the mutation queue.
pub fn clear(
    queue: &MutationQueue,
    force: bool,
    format: OutputFormat,
) -> Result<String, FieldsyncError> {
    if !force {
        return Err(FieldsyncError::Config(
            "Use --force to clear the queue; dropped mutations never reach the remote store"
                .to_string(),
        ));
    }

    let dropped = queue.len();
    queue.clear()?;

    match format {
        OutputFormat::Json => {
            let data = serde_json::json!({"cleared": dropped});
            to_json(&data)
        }
        OutputFormat::Pretty => Ok(format!("Cleared {dropped} mutations from the queue")),
    }
}
