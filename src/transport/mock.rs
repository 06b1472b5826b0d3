//! Scripted transport for testing.
//!
//! Replays queued statement responses and serves chunk bodies from memory,
//! recording every call so tests can assert on polling behavior.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::types::{ResultPayload, Row, StatementRequest, StatementResponse};
use super::StatementTransport;
use crate::error::{QueryError, Result};

/// A scripted reply for the submit or status endpoint.
#[derive(Debug, Clone)]
enum Reply {
    Response(StatementResponse),
    Reject(String),
    Fail(String),
}

impl Reply {
    fn into_result(self) -> Result<StatementResponse> {
        match self {
            Self::Response(resp) => Ok(resp),
            Self::Reject(body) => Err(QueryError::rejection(body)),
            Self::Fail(msg) => Err(QueryError::transport(msg)),
        }
    }
}

/// A chunk body served for one external link.
#[derive(Debug, Clone)]
struct MockChunk {
    rows: Option<Vec<Row>>,
    delay: Duration,
}

/// One recorded call against the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Submit(StatementRequest),
    GetStatement { statement_id: String, at: Instant },
    GetResultChunk { statement_id: String, chunk_index: u32 },
    FetchChunk(String),
}

#[derive(Debug, Default)]
struct MockState {
    submit: Option<Reply>,
    statuses: VecDeque<Reply>,
    /// Replayed once `statuses` runs dry.
    last_status: Option<Reply>,
    status_delay: Duration,
    chunk_pages: HashMap<u32, ResultPayload>,
    chunks: HashMap<String, MockChunk>,
    calls: Vec<MockCall>,
}

/// A transport that returns predefined responses.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    /// Creates an empty mock. Every call fails until scripted.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only happens after a test already panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sets the response to the submission request.
    pub fn on_submit(self, response: StatementResponse) -> Self {
        self.lock().submit = Some(Reply::Response(response));
        self
    }

    /// Makes the submission fail with a remote rejection carrying `body`.
    pub fn reject_submit(self, body: impl Into<String>) -> Self {
        self.lock().submit = Some(Reply::Reject(body.into()));
        self
    }

    /// Makes the submission fail at the network level.
    pub fn fail_submit(self, msg: impl Into<String>) -> Self {
        self.lock().submit = Some(Reply::Fail(msg.into()));
        self
    }

    /// Queues a status response. The last queued status repeats forever.
    pub fn then_status(self, response: StatementResponse) -> Self {
        self.lock().statuses.push_back(Reply::Response(response));
        self
    }

    /// Queues a network failure for the next status request.
    pub fn then_status_failure(self, msg: impl Into<String>) -> Self {
        self.lock().statuses.push_back(Reply::Fail(msg.into()));
        self
    }

    /// Delays every status response, simulating a slow endpoint.
    pub fn with_status_delay(self, delay: Duration) -> Self {
        self.lock().status_delay = delay;
        self
    }

    /// Serves `page` for the chunk-link endpoint at `chunk_index`.
    pub fn with_chunk_page(self, chunk_index: u32, page: ResultPayload) -> Self {
        self.lock().chunk_pages.insert(chunk_index, page);
        self
    }

    /// Serves `rows` when `url` is fetched.
    pub fn with_chunk(self, url: impl Into<String>, rows: Vec<Row>) -> Self {
        self.with_delayed_chunk(url, rows, Duration::ZERO)
    }

    /// Serves `rows` for `url` after `delay`.
    pub fn with_delayed_chunk(
        self,
        url: impl Into<String>,
        rows: Vec<Row>,
        delay: Duration,
    ) -> Self {
        self.lock().chunks.insert(
            url.into(),
            MockChunk {
                rows: Some(rows),
                delay,
            },
        );
        self
    }

    /// Makes fetching `url` fail after `delay`.
    pub fn with_failing_chunk(self, url: impl Into<String>, delay: Duration) -> Self {
        self.lock()
            .chunks
            .insert(url.into(), MockChunk { rows: None, delay });
        self
    }

    /// Returns all calls made so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Returns the number of status requests made so far.
    pub fn status_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::GetStatement { .. }))
            .count()
    }

    /// Returns the URLs fetched so far, in call order.
    pub fn fetched_links(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::FetchChunk(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    fn next_status(&self, statement_id: &str) -> (Duration, Option<Reply>) {
        let mut state = self.lock();
        state.calls.push(MockCall::GetStatement {
            statement_id: statement_id.to_string(),
            at: Instant::now(),
        });

        let reply = match state.statuses.pop_front() {
            Some(reply) => {
                state.last_status = Some(reply.clone());
                Some(reply)
            }
            None => state.last_status.clone(),
        };
        (state.status_delay, reply)
    }
}

#[async_trait]
impl StatementTransport for MockTransport {
    async fn submit_statement(&self, request: &StatementRequest) -> Result<StatementResponse> {
        let reply = {
            let mut state = self.lock();
            state.calls.push(MockCall::Submit(request.clone()));
            state.submit.clone()
        };

        reply
            .ok_or_else(|| QueryError::transport("No submit response scripted"))?
            .into_result()
    }

    async fn get_statement(&self, statement_id: &str) -> Result<StatementResponse> {
        let (delay, reply) = self.next_status(statement_id);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        reply
            .ok_or_else(|| QueryError::transport("No status response scripted"))?
            .into_result()
    }

    async fn get_result_chunk(
        &self,
        statement_id: &str,
        chunk_index: u32,
    ) -> Result<ResultPayload> {
        let mut state = self.lock();
        state.calls.push(MockCall::GetResultChunk {
            statement_id: statement_id.to_string(),
            chunk_index,
        });

        state
            .chunk_pages
            .get(&chunk_index)
            .cloned()
            .ok_or_else(|| QueryError::transport(format!("HTTP 404: no chunk {}", chunk_index)))
    }

    async fn fetch_chunk(&self, external_link: &str) -> Result<Vec<Row>> {
        let chunk = {
            let mut state = self.lock();
            state
                .calls
                .push(MockCall::FetchChunk(external_link.to_string()));
            state.chunks.get(external_link).cloned()
        };

        let chunk = chunk.ok_or_else(|| {
            QueryError::transport("External link download failed (HTTP 404 Not Found)")
        })?;

        if !chunk.delay.is_zero() {
            tokio::time::sleep(chunk.delay).await;
        }

        chunk.rows.ok_or_else(|| {
            QueryError::transport("External link download failed (HTTP 403 Forbidden)")
        })
    }
}
