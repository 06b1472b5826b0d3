//! Statement execution: submit, poll, assemble.
//!
//! [`QueryExecutor`] is built once per process and can be shared across
//! concurrent executions; each call owns its statement and result.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use super::{
    sql_preview, AssembledResult, ChunkLinkResolver, PollPolicy, ResultAssembler, Statement,
    StatementSubmitter, StatusPoller,
};
use crate::config::ExecutionConfig;
use crate::error::{QueryError, Result};
use crate::transport::{StatementState, StatementTransport};

/// Runs statements against one workspace.
#[derive(Clone)]
pub struct QueryExecutor {
    transport: Arc<dyn StatementTransport>,
    policy: PollPolicy,
    max_concurrent_fetches: usize,
}

/// Successful execution with the statement and the states it went through.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub statement: Statement,
    pub observed: Vec<StatementState>,
    pub result: AssembledResult,
}

impl QueryExecutor {
    /// Creates a new executor using the given transport and settings.
    pub fn new(transport: Arc<dyn StatementTransport>, config: &ExecutionConfig) -> Self {
        Self {
            transport,
            policy: config.poll_policy(),
            max_concurrent_fetches: config.max_concurrent_fetches,
        }
    }

    /// Replaces the polling backoff policy.
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs `sql_text` on `compute_target`, waiting at most `timeout_seconds`.
    pub async fn execute_sql_query(
        &self,
        compute_target: &str,
        sql_text: &str,
        timeout_seconds: u64,
    ) -> Result<AssembledResult> {
        self.execute(
            compute_target,
            sql_text,
            Duration::from_secs(timeout_seconds),
        )
        .await
    }

    /// Runs `sql_text` on `compute_target` and returns its assembled result.
    ///
    /// `timeout` covers submission and polling. Downloading the result once
    /// the statement has succeeded does not count against it.
    pub async fn execute(
        &self,
        compute_target: &str,
        sql_text: &str,
        timeout: Duration,
    ) -> Result<AssembledResult> {
        self.execute_detailed(compute_target, sql_text, timeout)
            .await
            .map(|outcome| outcome.result)
    }

    /// Like [`execute`](Self::execute), also returning the statement and observed states.
    pub async fn execute_detailed(
        &self,
        compute_target: &str,
        sql_text: &str,
        timeout: Duration,
    ) -> Result<ExecutionOutcome> {
        let transport = self.transport.as_ref();
        let started_at = Instant::now();

        info!(
            "Executing SQL on warehouse {}: \"{}\"",
            compute_target,
            sql_preview(sql_text)
        );

        let submitted = tokio::time::timeout(
            timeout,
            StatementSubmitter::new(transport).submit(compute_target, sql_text),
        )
        .await
        .map_err(|_| {
            warn!(
                "Submission to warehouse {} timed out after {:?}",
                compute_target, timeout
            );
            QueryError::timeout(None, timeout)
        })??;
        let statement = submitted.statement;

        let outcome = StatusPoller::new(transport, self.policy)
            .poll_until_terminal(&statement, submitted.status, started_at, timeout)
            .await?;
        info!(
            "Statement {} succeeded after {} polls. Fetching results...",
            statement.id, outcome.polls
        );

        let manifest = outcome.status.result_manifest;
        let payload = ChunkLinkResolver::new(transport)
            .resolve(&statement.id, manifest.as_ref(), outcome.status.result_payload)
            .await?;

        let result = ResultAssembler::with_concurrency(transport, self.max_concurrent_fetches)
            .assemble(manifest.as_ref(), payload.as_ref())
            .await?;
        info!(
            "Successfully fetched {} rows for statement {}",
            result.row_count, statement.id
        );

        Ok(ExecutionOutcome {
            statement,
            observed: outcome.observed,
            result,
        })
    }
}
