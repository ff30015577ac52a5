//! Core error types for studyflow-core.
//!
//! Parse failures and schedule conflicts are recovered locally and folded
//! into metrics; only resource exhaustion and internal invariant violations
//! surface as hard failures to the caller.

use thiserror::Error;

/// Core error type for studyflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A time interval could not be constructed because its end does not
    /// come after its start. Fatal for that single interval, never for the
    /// whole batch.
    #[error("Malformed interval: end ({end}) must be after start ({start})")]
    MalformedInterval {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Free-text or timestamp input could not be understood.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// An input set exceeded the configured size guard. No partial result
    /// is produced for the request.
    #[error("Resource limit exceeded for {what}: {actual} > {limit}")]
    ResourceExhausted {
        what: &'static str,
        actual: usize,
        limit: usize,
    },

    /// The allocator emitted a schedule that violates its own invariants.
    /// This is a programming defect, not a user-facing condition.
    #[error("Scheduling invariant violated: {0}")]
    InvariantViolated(String),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse errors raised at the ingestion boundary.
///
/// Candidate-schedule entries that fail with one of these are excluded and
/// counted in `parsing_success_rate`, never propagated as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Timestamp not recognized under any supported format
    #[error("Unrecognized timestamp: '{0}'")]
    Timestamp(String),

    /// Clock time (e.g. "9am", "17:00") not recognized
    #[error("Unrecognized clock time: '{0}'")]
    ClockTime(String),

    /// Calendar date not recognized
    #[error("Unrecognized date: '{0}'")]
    Date(String),

    /// Study-window rule not recognized
    #[error("Unrecognized study window rule: '{0}'")]
    StudyWindow(String),

    /// Empty timestamp or time field
    #[error("Empty timestamp")]
    EmptyTimestamp,

    /// A required field was absent from a candidate entry
    #[error("Missing field '{0}' in candidate entry")]
    MissingField(&'static str),

    /// A field was present but carried an unusable value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
