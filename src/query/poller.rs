//! Status polling state machine.
//!
//! Starting from the state reported at submission, the poller re-reads the
//! statement status at a fixed interval until a terminal state is observed or
//! the caller's budget runs out. At most one status request is in flight.
//! Time is read from tokio's clock, so tests can pause and advance it.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::Statement;
use crate::error::{QueryError, Result};
use crate::transport::{StatementState, StatementStatus, StatementTransport};

/// Default wait between two status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Backoff policy between status requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
}

impl PollPolicy {
    /// Creates a fixed-interval policy.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

/// Final status of a successful statement plus what was observed on the way.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub status: StatementStatus,
    /// Every state seen, starting with the one reported at submission.
    pub observed: Vec<StatementState>,
    /// Number of status requests issued.
    pub polls: usize,
}

/// Polls a statement until it reaches a terminal state.
pub struct StatusPoller<'a> {
    transport: &'a dyn StatementTransport,
    policy: PollPolicy,
}

impl<'a> StatusPoller<'a> {
    /// Creates a new poller.
    pub fn new(transport: &'a dyn StatementTransport, policy: PollPolicy) -> Self {
        Self { transport, policy }
    }

    /// Drives `statement` from `initial` to a terminal state.
    ///
    /// `started_at` marks the beginning of the whole execution, so time spent
    /// on submission counts against `timeout`. Returns the SUCCEEDED status;
    /// FAILED, CANCELED and CLOSED become `RemoteExecutionFailed`. Running out
    /// of time yields `ExecutionTimeout` and leaves the remote statement alone.
    pub async fn poll_until_terminal(
        &self,
        statement: &Statement,
        initial: StatementStatus,
        started_at: Instant,
        timeout: Duration,
    ) -> Result<PollOutcome> {
        let deadline = started_at + timeout;
        let mut observed = vec![initial.state];
        let mut status = initial;
        let mut polls = 0;

        while !status.state.is_terminal() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out(statement, timeout));
            }

            tokio::time::sleep(self.policy.interval.min(remaining)).await;

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out(statement, timeout));
            }

            let next = tokio::time::timeout(remaining, self.transport.get_statement(&statement.id))
                .await
                .map_err(|_| self.timed_out(statement, timeout))??
                .into_status()?;
            polls += 1;

            debug!(
                "Polling statement {}. Current state: {}",
                statement.id, next.state
            );

            if !status.state.can_transition_to(next.state) {
                return Err(QueryError::transport(format!(
                    "Statement {} went from {} back to {}",
                    statement.id, status.state, next.state
                )));
            }

            observed.push(next.state);
            status = next;
        }

        match status.state {
            StatementState::Succeeded => Ok(PollOutcome {
                status,
                observed,
                polls,
            }),
            state => {
                let err = QueryError::execution_failed(state, status.error_message);
                error!("Statement {} ended in {}: {}", statement.id, state, err);
                Err(err)
            }
        }
    }

    fn timed_out(&self, statement: &Statement, timeout: Duration) -> QueryError {
        warn!(
            "Statement {} timed out after {:?}; it is left running remotely",
            statement.id, timeout
        );
        QueryError::timeout(Some(&statement.id), timeout)
    }
}
