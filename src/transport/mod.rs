//! Transport layer for the SQL Statement Execution API.
//!
//! Provides a trait-based interface over the remote calls the executor needs,
//! so the HTTP implementation can be swapped for a scripted one in tests.

mod http;
mod mock;
mod types;

pub use http::HttpTransport;
pub use mock::{MockCall, MockTransport};
pub use types::{
    ColumnInfo, ExternalLink, ResultManifest, ResultPayload, ResultSchema, Row, ServiceError,
    StatementRequest, StatementResponse, StatementState, StatementStatus, StatusBody,
};

use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the remote operations used to run a statement.
///
/// Implementations must be thread-safe so one transport can serve
/// concurrent executions.
#[async_trait]
pub trait StatementTransport: Send + Sync {
    /// POST /api/2.0/sql/statements
    ///
    /// Fails with `RemoteRejection` when the endpoint refuses the request.
    async fn submit_statement(&self, request: &StatementRequest) -> Result<StatementResponse>;

    /// GET /api/2.0/sql/statements/{statement_id}
    async fn get_statement(&self, statement_id: &str) -> Result<StatementResponse>;

    /// GET /api/2.0/sql/statements/{statement_id}/result/chunks/{chunk_index}
    ///
    /// Returns the descriptor(s) for one chunk of an external-links result.
    async fn get_result_chunk(&self, statement_id: &str, chunk_index: u32)
        -> Result<ResultPayload>;

    /// Downloads a pre-signed chunk location and parses it as a row array.
    ///
    /// Must not send the bearer token.
    async fn fetch_chunk(&self, external_link: &str) -> Result<Vec<Row>>;
}
