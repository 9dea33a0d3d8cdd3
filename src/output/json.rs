//! JSON output formatting for the fieldsync CLI.

use serde::Serialize;

use crate::error::FieldsyncError;

/// Generic JSON formatter for any serializable type.
///
/// # Errors
///
/// Returns `FieldsyncError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, FieldsyncError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_json_pretty_prints() {
        let value = json!({"pending": 2, "collections": ["tasks"]});
        let result = to_json(&value).unwrap();

        assert!(result.contains("\"pending\": 2"));
        assert!(result.contains("\"tasks\""));
    }
}
