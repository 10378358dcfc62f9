use super::catalog::{SelectionEntry, null_as_default};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Identity of one accepted dispatch.
///
/// Ids increase monotonically for the life of the process; `0` never names a request.
pub type RequestId = u64;

/// Which backend action a dispatch runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Non-destructive dry run
    Preview,
    /// Destructive removal of the matched data
    Clean,
}

impl OperationKind {
    /// Human-readable action name used in status lines and logs
    pub fn action_name(self) -> &'static str {
        match self {
            OperationKind::Preview => "Preview",
            OperationKind::Clean => "Clean",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action_name())
    }
}

/// A dispatch as handed to the worker: the action plus the selection captured at
/// dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub kind: OperationKind,
    pub selection: Vec<SelectionEntry>,
}

impl OperationRequest {
    /// Build a request, rejecting an empty selection
    pub fn new(
        kind: OperationKind,
        selection: Vec<SelectionEntry>,
    ) -> Result<Self, OperationError> {
        if selection.is_empty() {
            return Err(OperationError::NoSelection);
        }
        Ok(Self { kind, selection })
    }
}

/// Aggregated outcome of a preview or clean, as computed by the backend.
///
/// Byte counts are stored exactly as received and never recomputed client-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub total_size: u64,
    pub total_files: u32,

    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<ResultItem>,

    /// Set when the backend stopped part-way (for example after a server-side abort)
    #[serde(default)]
    pub partial: bool,
}

impl OperationResult {
    /// Total size in binary megabytes, e.g. `100.00 MB`
    pub fn display_size(&self) -> String {
        format_size_mb(self.total_size)
    }
}

/// Per-option line of an [`OperationResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    pub cleaner_id: String,
    pub option_id: String,
    pub size: u64,
    pub file_count: u32,

    /// Matched paths; the backend sends `null` when nothing matched
    #[serde(default, deserialize_with = "null_as_default")]
    pub paths: Vec<String>,
}

/// Format a byte count as binary megabytes with two decimals.
///
/// Display only: the stored byte counts are never altered.
pub fn format_size_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

/// Errors reported by the orchestration layer.
///
/// Local faults (`NoSelection`, `AlreadyRunning`, `NotRunning`) are reported synchronously
/// before any worker exists. Network faults are produced on a worker and delivered as a
/// terminal event. None of them is fatal to the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("No items selected")]
    NoSelection,

    #[error("An operation is already running")]
    AlreadyRunning,

    #[error("No operation to abort")]
    NotRunning,

    #[error("Cannot connect to backend: {0}")]
    Unreachable(String),

    #[error("Backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Operation cancelled by user")]
    Cancelled,
}

/// The one live status of the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum OperationStatus {
    Idle,
    Busy {
        kind: OperationKind,
        request_id: RequestId,
        started_at: Instant,
    },
    Completed(OperationResult),
    PartiallyCompleted(OperationResult),
    Failed(OperationError),
    Aborted,
}

impl OperationStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, OperationStatus::Busy { .. })
    }

    /// Request id of the in-flight operation, if any
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            OperationStatus::Busy { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }

    /// Short status line for the presentation layer
    pub fn describe(&self, action: Option<OperationKind>) -> String {
        let action = action.map(|k| k.action_name()).unwrap_or("Operation");
        match self {
            OperationStatus::Idle => "Ready".to_string(),
            OperationStatus::Busy { kind, .. } => format!("{}...", kind),
            OperationStatus::Completed(result) => {
                format!("{} complete: {}", action, result.display_size())
            }
            OperationStatus::PartiallyCompleted(result) => {
                format!("{} cancelled: {} so far", action, result.display_size())
            }
            OperationStatus::Failed(error) => format!("{} error: {}", action, error),
            OperationStatus::Aborted => "Operation cancelled by user".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_mb() {
        assert_eq!(format_size_mb(104_857_600), "100.00 MB");
        assert_eq!(format_size_mb(0), "0.00 MB");
        assert_eq!(format_size_mb(1_572_864), "1.50 MB");
    }

    #[test]
    fn test_display_size_keeps_bytes() {
        let result = OperationResult {
            total_size: 1_234_567,
            total_files: 3,
            items: Vec::new(),
            partial: false,
        };

        assert_eq!(result.display_size(), "1.18 MB");
        assert_eq!(result.total_size, 1_234_567);
    }

    #[test]
    fn test_request_rejects_empty_selection() {
        let err = OperationRequest::new(OperationKind::Clean, Vec::new()).unwrap_err();
        assert_eq!(err, OperationError::NoSelection);

        let request = OperationRequest::new(
            OperationKind::Preview,
            vec![SelectionEntry::new("browser-cache", "cookies")],
        )
        .unwrap();
        assert_eq!(request.selection.len(), 1);
    }

    #[test]
    fn test_deserialize_backend_result() {
        let json = r#"{
            "total_size": 104857600,
            "total_files": 12,
            "items": [
                {"cleaner_id": "browser-cache", "option_id": "cookies", "size": 104857600, "file_count": 12, "paths": ["/tmp/a"]}
            ]
        }"#;
        let result: OperationResult = serde_json::from_str(json).unwrap();

        assert_eq!(result.total_files, 12);
        assert!(!result.partial);
        assert_eq!(result.items[0].paths, vec!["/tmp/a".to_string()]);
    }

    #[test]
    fn test_null_items_and_paths_decode_as_empty() {
        let json = r#"{"total_size": 0, "total_files": 0, "items": [
            {"cleaner_id": "browser-cache", "option_id": "cookies", "size": 0, "file_count": 0, "paths": null}
        ]}"#;
        let result: OperationResult = serde_json::from_str(json).unwrap();
        assert!(result.items[0].paths.is_empty());

        let result: OperationResult =
            serde_json::from_str(r#"{"total_size": 0, "total_files": 0, "items": null}"#).unwrap();
        assert!(result.items.is_empty());
    }

    #[test]
    fn test_status_describe() {
        let result = OperationResult {
            total_size: 104_857_600,
            total_files: 12,
            items: Vec::new(),
            partial: false,
        };

        assert_eq!(
            OperationStatus::Completed(result).describe(Some(OperationKind::Preview)),
            "Preview complete: 100.00 MB"
        );
        assert_eq!(
            OperationStatus::Failed(OperationError::NoSelection).describe(None),
            "Operation error: No items selected"
        );
        assert_eq!(OperationStatus::Idle.describe(None), "Ready");
    }
}
