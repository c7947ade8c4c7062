//! Remote status payloads merged into task records by status pollers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::TaskStatus;

/// Status reported by an external source for a task.
///
/// Only `status` is required. Every other field is optional; unknown fields
/// are kept in `extra` and merged into the record's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Reported lifecycle status.
    pub status: TaskStatus,

    /// Reported progress percentage. Any JSON number is accepted and
    /// rounded into `0..=100`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_progress"
    )]
    pub progress: Option<u8>,

    /// Reported error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Any additional opaque fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn deserialize_progress<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(|p| if p.is_nan() { 0 } else { p.clamp(0.0, 100.0).round() as u8 }))
}

impl StatusUpdate {
    /// Create an update carrying only a status.
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            progress: None,
            error: None,
            extra: Map::new(),
        }
    }

    /// Builder method to set progress.
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Builder method to set an error message.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Builder method to add an opaque field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let update: StatusUpdate = serde_json::from_str(r#"{"status":"running"}"#).unwrap();
        assert_eq!(update, StatusUpdate::new(TaskStatus::Running));
    }

    #[test]
    fn test_unknown_fields_land_in_extra() {
        let update: StatusUpdate = serde_json::from_str(
            r#"{"status":"running","progress":40,"stage":"outline","chapters":3}"#,
        )
        .unwrap();

        assert_eq!(update.progress, Some(40));
        assert_eq!(update.extra.get("stage"), Some(&Value::from("outline")));
        assert_eq!(update.extra.get("chapters"), Some(&Value::from(3)));
    }

    #[test]
    fn test_fractional_progress() {
        let update: StatusUpdate =
            serde_json::from_str(r#"{"status":"running","progress":50.0}"#).unwrap();
        assert_eq!(update.progress, Some(50));

        let update: StatusUpdate =
            serde_json::from_str(r#"{"status":"running","progress":33.6}"#).unwrap();
        assert_eq!(update.progress, Some(34));
    }

    #[test]
    fn test_out_of_range_progress_is_clamped() {
        let update: StatusUpdate =
            serde_json::from_str(r#"{"status":"completed","progress":250}"#).unwrap();
        assert_eq!(update.progress, Some(100));

        let update: StatusUpdate =
            serde_json::from_str(r#"{"status":"running","progress":-5}"#).unwrap();
        assert_eq!(update.progress, Some(0));
    }

    #[test]
    fn test_null_progress() {
        let update: StatusUpdate =
            serde_json::from_str(r#"{"status":"running","progress":null}"#).unwrap();
        assert_eq!(update.progress, None);
    }

    #[test]
    fn test_missing_status_is_rejected() {
        let result: Result<StatusUpdate, _> = serde_json::from_str(r#"{"progress":10}"#);
        assert!(result.is_err());
    }
}
