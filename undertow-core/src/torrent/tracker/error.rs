//! Failure of a single announce attempt.

use std::fmt;
use std::time::Duration;

/// Why one tracker URL did not produce a peer list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("unsupported tracker scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    #[error("invalid tracker URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("tracker unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("tracker did not respond within {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("tracker returned HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("tracker rejected announce: {reason}")]
    Rejected { reason: String },

    #[error("malformed tracker response: {reason}")]
    MalformedResponse { reason: String },
}

impl TrackerError {
    /// Connection-level failure, as opposed to a tracker that answered.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TrackerError::Unreachable { .. }
                | TrackerError::Timeout { .. }
                | TrackerError::HttpStatus { .. }
        )
    }
}

/// One failed URL in a failover run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceFailure {
    pub url: String,
    pub error: TrackerError,
}

impl fmt::Display for AnnounceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.url, self.error)
    }
}
