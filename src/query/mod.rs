//! Statement execution for dbx-query.
//!
//! Submission, status polling and result assembly live in separate modules;
//! [`QueryExecutor`] composes them into one call.

pub mod assembler;
pub mod executor;
pub mod links;
pub mod poller;
pub mod submitter;

pub use assembler::ResultAssembler;
pub use executor::{ExecutionOutcome, QueryExecutor};
pub use links::ChunkLinkResolver;
pub use poller::{PollOutcome, PollPolicy, StatusPoller};
pub use submitter::{StatementSubmitter, SubmittedStatement};

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::transport::{ResultSchema, Row};

/// One submitted statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Server-assigned identifier.
    pub id: String,
    /// Warehouse the statement runs on.
    pub compute_target: String,
    /// SQL source.
    pub text: String,
    pub submitted_at: SystemTime,
}

/// Unified result of a statement, whether it arrived inline or in chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledResult {
    pub schema: ResultSchema,
    pub data_array: Vec<Row>,
    /// Always equal to `data_array.len()`.
    pub row_count: usize,
}

impl AssembledResult {
    /// Creates a result, deriving the row count from the rows.
    pub fn new(schema: ResultSchema, data_array: Vec<Row>) -> Self {
        let row_count = data_array.len();
        Self {
            schema,
            data_array,
            row_count,
        }
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.data_array.is_empty()
    }
}

/// Shortens SQL for log lines, respecting char boundaries.
pub(crate) fn sql_preview(sql: &str) -> String {
    const MAX_CHARS: usize = 100;
    let trimmed = sql.trim();
    match trimmed.char_indices().nth(MAX_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
