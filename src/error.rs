//! Error types for dbx-query.
//!
//! Every failure raised while submitting, polling or assembling a statement
//! is one of the variants below, so callers can branch on the kind of failure
//! instead of matching on message text.

use std::time::Duration;

use thiserror::Error;

use crate::transport::StatementState;

/// Main error type for statement execution.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Missing or invalid endpoint, credential or config file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller supplied an empty compute target or SQL text.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network failure, unexpected HTTP status or a malformed response body.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint refused the submission. Carries the remote body verbatim.
    #[error("Statement rejected: {0}")]
    RemoteRejection(String),

    /// The statement reached FAILED, CANCELED or CLOSED.
    #[error("Statement {state}: {message}")]
    RemoteExecutionFailed {
        state: StatementState,
        message: String,
    },

    /// The caller's timeout elapsed while the statement was still running.
    #[error("{}", timeout_message(.statement_id.as_deref(), .timeout))]
    ExecutionTimeout {
        statement_id: Option<String>,
        timeout: Duration,
    },

    /// A result chunk could not be fetched or parsed, or is missing.
    #[error("Failed to fetch result chunk {chunk_index}: {reason}")]
    ChunkFetchFailed { chunk_index: u32, reason: String },
}

fn timeout_message(statement_id: Option<&str>, timeout: &Duration) -> String {
    match statement_id {
        Some(id) => format!(
            "Statement {} timed out after {} seconds",
            id,
            timeout.as_secs_f64()
        ),
        None => format!(
            "Statement submission timed out after {} seconds",
            timeout.as_secs_f64()
        ),
    }
}

impl QueryError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an invalid request error with the given message.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a remote rejection error carrying the remote body.
    pub fn rejection(body: impl Into<String>) -> Self {
        Self::RemoteRejection(body.into())
    }

    /// Creates a remote execution failure for a terminal state.
    ///
    /// Falls back to a message naming the state when the server sent none.
    pub fn execution_failed(state: StatementState, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("statement reached terminal state {}", state));
        Self::RemoteExecutionFailed { state, message }
    }

    /// Creates a timeout error.
    pub fn timeout(statement_id: Option<&str>, timeout: Duration) -> Self {
        Self::ExecutionTimeout {
            statement_id: statement_id.map(String::from),
            timeout,
        }
    }

    /// Creates a chunk fetch error for the given chunk index.
    pub fn chunk(chunk_index: u32, reason: impl Into<String>) -> Self {
        Self::ChunkFetchFailed {
            chunk_index,
            reason: reason.into(),
        }
    }

    /// Returns true if this error is a timeout rather than a remote failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ExecutionTimeout { .. })
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::InvalidRequest(_) => "Invalid Request",
            Self::Transport(_) => "Transport Error",
            Self::RemoteRejection(_) => "Remote Rejection",
            Self::RemoteExecutionFailed { .. } => "Execution Failed",
            Self::ExecutionTimeout { .. } => "Execution Timeout",
            Self::ChunkFetchFailed { .. } => "Chunk Fetch Failed",
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Transport(format!("Request timed out: {}", e))
        } else if e.is_connect() {
            Self::Transport(format!("Failed to connect: {}", e))
        } else {
            Self::Transport(format!("Request failed: {}", e))
        }
    }
}

/// Result type alias using QueryError.
pub type Result<T> = std::result::Result<T, QueryError>;
