//! Error types for fleettrack.
//!
//! This module defines all error types used throughout the fleettrack crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fleettrack operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Fetch Errors ===
    /// A backend fetch failed during a poll tick or detail lookup.
    ///
    /// These are transient: the polling loop logs them and retries on the
    /// next scheduled tick.
    #[error("fetch failed during {operation}: {message}")]
    Fetch {
        /// What was being fetched (e.g. "rider list", "parcel history").
        operation: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Tracking Errors ===
    /// Focus was requested for a rider that cannot be centered on.
    ///
    /// The rider is unknown, offline, or has never reported coordinates.
    /// Surfaced to the operator as a "tracking unavailable" notice.
    #[error("tracking unavailable for rider '{rider_key}'")]
    FocusUnavailable {
        /// Key of the rider that could not be focused.
        rider_key: String,
    },

    /// A quota/detail lookup failed for a single rider.
    ///
    /// Scoped to the open detail view; never affects the polling loop.
    #[error("detail lookup failed for rider '{rider_key}': {message}")]
    DetailLookup {
        /// Key of the rider whose lookup failed.
        rider_key: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Replay Errors ===
    /// Failed to load a replay data file.
    #[error("failed to load replay data from {path}: {message}")]
    ReplayLoad {
        /// Path to the replay file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for fleettrack operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new transient fetch error.
    #[must_use]
    pub fn fetch(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a focus-unavailable error for the given rider.
    #[must_use]
    pub fn focus_unavailable(rider_key: impl Into<String>) -> Self {
        Self::FocusUnavailable {
            rider_key: rider_key.into(),
        }
    }

    /// Create a detail-lookup error scoped to one rider.
    #[must_use]
    pub fn detail_lookup(rider_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DetailLookup {
            rider_key: rider_key.into(),
            message: message.into(),
        }
    }

    /// Create a replay-load error for the given path.
    #[must_use]
    pub fn replay_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ReplayLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is transient (safe to absorb until the next tick).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Check if this error is a focus-unavailable notice.
    #[must_use]
    pub fn is_focus_unavailable(&self) -> bool {
        matches!(self, Self::FocusUnavailable { .. })
    }

    /// A short operator-facing message for this error.
    ///
    /// Never exposes raw backend error text; detail stays in the logs.
    #[must_use]
    pub fn operator_notice(&self) -> String {
        match self {
            Self::Fetch { operation, .. } => {
                format!("Could not refresh {operation}. Retrying shortly.")
            }
            Self::FocusUnavailable { rider_key } => {
                format!("Live tracking is unavailable for {rider_key}.")
            }
            Self::DetailLookup { rider_key, .. } => {
                format!("Could not load details for {rider_key}.")
            }
            _ => "Something went wrong. See logs for details.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::fetch("rider list", "connection refused");
        assert_eq!(
            err.to_string(),
            "fetch failed during rider list: connection refused"
        );

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_error_is_transient() {
        assert!(Error::fetch("riders", "timeout").is_transient());
        assert!(!Error::internal("bug").is_transient());
        assert!(!Error::focus_unavailable("R1").is_transient());
    }

    #[test]
    fn test_error_is_focus_unavailable() {
        assert!(Error::focus_unavailable("R1").is_focus_unavailable());
        assert!(!Error::fetch("riders", "timeout").is_focus_unavailable());
    }

    #[test]
    fn test_focus_unavailable_display() {
        let err = Error::focus_unavailable("rider42");
        let msg = err.to_string();
        assert!(msg.contains("rider42"));
        assert!(msg.contains("unavailable"));
    }

    #[test]
    fn test_detail_lookup_display() {
        let err = Error::detail_lookup("rider42", "backend returned 500");
        let msg = err.to_string();
        assert!(msg.contains("rider42"));
        assert!(msg.contains("backend returned 500"));
    }

    #[test]
    fn test_replay_load_display() {
        let err = Error::replay_load("/tmp/frames.json", "unexpected EOF");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/frames.json"));
        assert!(msg.contains("unexpected EOF"));
    }

    #[test]
    fn test_operator_notice_hides_backend_text() {
        let err = Error::fetch("rider list", "ECONNREFUSED 10.0.0.7:5432");
        let notice = err.operator_notice();
        assert!(!notice.contains("ECONNREFUSED"));
        assert!(notice.contains("rider list"));
    }

    #[test]
    fn test_operator_notice_focus() {
        let notice = Error::focus_unavailable("R9").operator_notice();
        assert!(notice.contains("R9"));
        assert!(notice.contains("unavailable"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "poll interval must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("poll interval"));
    }
}
