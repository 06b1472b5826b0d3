//! Statement submission.

use std::time::SystemTime;
use tracing::{debug, info};

use super::{sql_preview, Statement};
use crate::error::{QueryError, Result};
use crate::transport::{StatementRequest, StatementStatus, StatementTransport};

/// A freshly submitted statement together with the state it was reported in.
#[derive(Debug, Clone)]
pub struct SubmittedStatement {
    pub statement: Statement,
    /// May already be terminal.
    pub status: StatementStatus,
}

/// Turns a (warehouse, SQL) pair into a submitted statement.
pub struct StatementSubmitter<'a> {
    transport: &'a dyn StatementTransport,
}

impl<'a> StatementSubmitter<'a> {
    /// Creates a new submitter.
    pub fn new(transport: &'a dyn StatementTransport) -> Self {
        Self { transport }
    }

    /// Submits `sql_text` to `compute_target` without waiting for completion.
    ///
    /// Results are requested as external links. SQL syntax is not checked here.
    pub async fn submit(&self, compute_target: &str, sql_text: &str) -> Result<SubmittedStatement> {
        if compute_target.trim().is_empty() {
            return Err(QueryError::invalid_request("compute target must not be empty"));
        }
        if sql_text.trim().is_empty() {
            return Err(QueryError::invalid_request("SQL text must not be empty"));
        }

        let request = StatementRequest::asynchronous(compute_target, sql_text);
        debug!(
            "Submitting statement to warehouse {}: \"{}\"",
            compute_target,
            sql_preview(sql_text)
        );

        let submitted_at = SystemTime::now();
        let response = self.transport.submit_statement(&request).await?;

        let id = response
            .statement_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                QueryError::transport("Submission response did not include a statement_id")
            })?;
        let status = response.into_status()?;

        info!("Statement {} submitted ({})", id, status.state);

        Ok(SubmittedStatement {
            statement: Statement {
                id,
                compute_target: compute_target.to_string(),
                text: sql_text.to_string(),
                submitted_at,
            },
            status,
        })
    }
}
