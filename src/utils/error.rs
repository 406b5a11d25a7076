//! Error handling module
//!
//! Defines the error taxonomy of a probe run and how each error is classified
//! when it ends a scenario

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Probe error types
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// HTTP transport error (connect, read, request timeout)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Endpoint answered with a non-success status
    #[error("Endpoint returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response present but shaped unexpectedly
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Response present but a check did not hold
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// Streaming deadline or idle timeout exceeded
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Run was cancelled before the scenario finished
    #[error("Cancelled")]
    Cancelled,
}

/// Classification of a failed scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Protocol,
    Assertion,
    Timeout,
    Cancelled,
    Config,
}

impl ProbeError {
    /// Get failure kind
    pub fn kind(&self) -> FailureKind {
        match self {
            ProbeError::Config(_) => FailureKind::Config,
            ProbeError::Transport(e) if e.is_timeout() => FailureKind::Timeout,
            ProbeError::Transport(_) => FailureKind::Transport,
            ProbeError::Status { .. }
            | ProbeError::Protocol(_)
            | ProbeError::Serialization(_) => FailureKind::Protocol,
            ProbeError::Assertion(_) => FailureKind::Assertion,
            ProbeError::Timeout(_) => FailureKind::Timeout,
            ProbeError::Cancelled => FailureKind::Cancelled,
        }
    }

    /// Whether the full error chain should be logged
    pub fn should_log_details(&self) -> bool {
        !matches!(self, ProbeError::Assertion(_) | ProbeError::Cancelled)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Transport => "transport",
            FailureKind::Protocol => "protocol",
            FailureKind::Assertion => "assertion",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Config => "config",
        };
        f.write_str(s)
    }
}

/// Result type alias
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Error handling helper functions
pub mod helpers {
    use super::*;

    /// Create protocol error
    pub fn protocol_error(message: impl Into<String>) -> ProbeError {
        ProbeError::Protocol(message.into())
    }

    /// Create assertion error
    pub fn assertion_error(message: impl Into<String>) -> ProbeError {
        ProbeError::Assertion(message.into())
    }

    /// Create status error
    pub fn status_error(status: u16, message: impl Into<String>) -> ProbeError {
        ProbeError::Status {
            status,
            message: message.into(),
        }
    }
}

/// Error context extension trait
pub trait ErrorContext<T> {
    /// Add protocol error context
    fn protocol_context(self, message: &str) -> ProbeResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn protocol_context(self, message: &str) -> ProbeResult<T> {
        self.map_err(|e| ProbeError::Protocol(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        assert_eq!(ProbeError::Protocol("x".to_string()).kind(), FailureKind::Protocol);
        assert_eq!(ProbeError::Assertion("x".to_string()).kind(), FailureKind::Assertion);
        assert_eq!(ProbeError::Timeout(Duration::from_secs(1)).kind(), FailureKind::Timeout);
        assert_eq!(ProbeError::Cancelled.kind(), FailureKind::Cancelled);
        assert_eq!(ProbeError::Config(anyhow::anyhow!("x")).kind(), FailureKind::Config);
        assert_eq!(helpers::status_error(500, "boom").kind(), FailureKind::Protocol);
    }

    #[test]
    fn test_error_context() {
        let bytes = vec![0xff, 0xfe];
        let result: Result<(), std::str::Utf8Error> = std::str::from_utf8(&bytes).map(|_| ());

        let probe_result = result.protocol_context("Invalid UTF-8 in stream");
        match probe_result {
            Err(ProbeError::Protocol(msg)) => assert!(msg.contains("Invalid UTF-8 in stream")),
            other => panic!("Expected protocol error, got {:?}", other),
        }
    }
}
