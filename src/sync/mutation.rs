//! Mutation types for the offline queue.
//!
//! A mutation is a single create/update/delete intent not yet confirmed
//! applied to the remote store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of change a mutation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Insert a new record.
    Create,
    /// Patch an existing record.
    Update,
    /// Remove an existing record.
    Delete,
}

impl MutationKind {
    /// Get the display name for this mutation kind.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Payload of a queued mutation, tagged by kind.
///
/// The queue stays free of per-collection schemas: records and change sets
/// are opaque JSON objects, and the record identifier is carried explicitly
/// where the remote store needs one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationPayload {
    /// Full record minus server-assigned fields.
    Create {
        /// The record to insert.
        record: Value,
    },
    /// Record identifier plus the changed fields only.
    Update {
        /// Identifier of the record to patch.
        id: String,
        /// Partial set of changed fields.
        changes: Value,
    },
    /// Record identifier to remove.
    Delete {
        /// Identifier of the record to remove.
        id: String,
    },
}

impl MutationPayload {
    /// The mutation kind this payload encodes.
    #[must_use]
    pub const fn kind(&self) -> MutationKind {
        match self {
            Self::Create { .. } => MutationKind::Create,
            Self::Update { .. } => MutationKind::Update,
            Self::Delete { .. } => MutationKind::Delete,
        }
    }

    /// The record identifier this payload targets, if it names one.
    ///
    /// For `Create` the identifier is taken from the record's `"id"` field
    /// when present (client-assigned ids allow upsert semantics on replay).
    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        match self {
            Self::Create { record } => record.get("id").and_then(Value::as_str),
            Self::Update { id, .. } | Self::Delete { id } => Some(id),
        }
    }
}

/// A queued mutation with replay metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMutation {
    /// Unique id, assigned at enqueue time from a monotonic counter.
    pub id: u64,
    /// Logical record collection this mutation applies to.
    pub target: String,
    /// The change itself.
    pub payload: MutationPayload,
    /// When the mutation was queued.
    pub enqueued_at: DateTime<Utc>,
    /// Number of failed replay attempts so far.
    pub attempts: u32,
    /// Last replay attempt timestamp.
    pub last_attempt: Option<DateTime<Utc>>,
    /// Last replay error message.
    pub last_error: Option<String>,
}

impl QueuedMutation {
    /// Create a new pending mutation.
    #[must_use]
    pub fn new(id: u64, target: impl Into<String>, payload: MutationPayload) -> Self {
        Self {
            id,
            target: target.into(),
            payload,
            enqueued_at: Utc::now(),
            attempts: 0,
            last_attempt: None,
            last_error: None,
        }
    }

    /// The mutation kind.
    #[must_use]
    pub const fn kind(&self) -> MutationKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_from_payload() {
        let create = MutationPayload::Create {
            record: json!({"title": "Patrol gate B"}),
        };
        assert_eq!(create.kind(), MutationKind::Create);

        let update = MutationPayload::Update {
            id: "t1".to_string(),
            changes: json!({"title": "B"}),
        };
        assert_eq!(update.kind(), MutationKind::Update);

        let delete = MutationPayload::Delete {
            id: "t1".to_string(),
        };
        assert_eq!(delete.kind(), MutationKind::Delete);
    }

    #[test]
    fn test_record_id() {
        let create = MutationPayload::Create {
            record: json!({"id": "t9", "title": "Check in"}),
        };
        assert_eq!(create.record_id(), Some("t9"));

        let create_without_id = MutationPayload::Create {
            record: json!({"title": "Check in"}),
        };
        assert_eq!(create_without_id.record_id(), None);

        let delete = MutationPayload::Delete {
            id: "t1".to_string(),
        };
        assert_eq!(delete.record_id(), Some("t1"));
    }

    #[test]
    fn test_payload_wire_shape() {
        let update = MutationPayload::Update {
            id: "t1".to_string(),
            changes: json!({"title": "B"}),
        };
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"kind\":\"update\""));
        assert!(json.contains("\"id\":\"t1\""));

        let back: MutationPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, update);
    }

    #[test]
    fn test_new_mutation_starts_pending() {
        let m = QueuedMutation::new(
            1,
            "tasks",
            MutationPayload::Create {
                record: json!({"title": "A"}),
            },
        );
        assert_eq!(m.id, 1);
        assert_eq!(m.target, "tasks");
        assert_eq!(m.kind(), MutationKind::Create);
        assert_eq!(m.attempts, 0);
        assert!(m.last_attempt.is_none());
        assert!(m.last_error.is_none());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(MutationKind::Create.display_name(), "Create");
        assert_eq!(MutationKind::Delete.to_string(), "Delete");
    }
}
