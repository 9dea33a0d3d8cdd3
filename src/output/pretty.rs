//! Human-readable output formatting for the fieldsync CLI.

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::sync::QueuedMutation;

/// Render an age like "3 hours ago" from a past timestamp.
#[must_use]
pub fn format_age(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(timestamp);
    if age.num_hours() > 0 {
        format!("{} hours ago", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{} minutes ago", age.num_minutes())
    } else {
        "just now".to_string()
    }
}

/// Render queued mutations as a table, newest last.
#[must_use]
pub fn format_mutation_list(mutations: &[QueuedMutation], limit: usize) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Queued Mutations ({})", mutations.len()));
    lines.push("─".repeat(60));
    lines.push(format!(
        "{:<6} {:<8} {:<14} {:<18} {}",
        "ID", "Kind", "Target", "Enqueued", "Attempts"
    ));
    lines.push("─".repeat(60));

    for mutation in mutations.iter().take(limit) {
        let attempts = if mutation.attempts > 0 {
            mutation.attempts.to_string().yellow().to_string()
        } else {
            mutation.attempts.to_string()
        };

        lines.push(format!(
            "{:<6} {:<8} {:<14} {:<18} {}",
            mutation.id,
            mutation.kind().display_name(),
            mutation.target,
            mutation.enqueued_at.format("%Y-%m-%d %H:%M").to_string(),
            attempts
        ));

        if let Some(error) = &mutation.last_error {
            let short_error = if error.len() > 50 {
                format!("{}...", &error[..47])
            } else {
                error.clone()
            };
            lines.push(format!("       {}", short_error.red()));
        }
    }

    if mutations.len() > limit {
        lines.push(format!("... and {} more", mutations.len() - limit).dimmed().to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::MutationPayload;
    use serde_json::json;

    #[test]
    fn test_format_age_just_now() {
        assert_eq!(format_age(Utc::now()), "just now");
    }

    #[test]
    fn test_format_age_minutes() {
        let earlier = Utc::now() - chrono::Duration::minutes(12);
        assert_eq!(format_age(earlier), "12 minutes ago");
    }

    #[test]
    fn test_format_mutation_list() {
        let mut mutation = QueuedMutation::new(
            7,
            "tasks",
            MutationPayload::Create {
                record: json!({"title": "A"}),
            },
        );
        mutation.attempts = 2;
        mutation.last_error = Some("connection reset".to_string());

        let rendered = format_mutation_list(&[mutation], 10);

        assert!(rendered.contains("Queued Mutations (1)"));
        assert!(rendered.contains("Create"));
        assert!(rendered.contains("tasks"));
        assert!(rendered.contains("connection reset"));
    }

    #[test]
    fn test_format_mutation_list_respects_limit() {
        let mutations: Vec<QueuedMutation> = (1..=5)
            .map(|i| {
                QueuedMutation::new(
                    i,
                    "tasks",
                    MutationPayload::Delete {
                        id: format!("t{i}"),
                    },
                )
            })
            .collect();

        let rendered = format_mutation_list(&mutations, 2);

        assert!(rendered.contains("and 3 more"));
    }
}
