//! HTTP transport backed by reqwest.
//!
//! Talks to `{host}/api/2.0/sql/statements` with bearer authentication and
//! downloads external links with a separate, unauthenticated client.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::types::{ResultPayload, Row, StatementRequest, StatementResponse};
use super::StatementTransport;
use crate::config::Credentials;
use crate::error::{QueryError, Result};

/// Statement API client for one workspace.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    token: String,
    /// Sends the bearer token; used for the statement API only.
    api_client: Client,
    /// Never sends the bearer token; pre-signed links carry their own authorization.
    link_client: Client,
}

impl HttpTransport {
    /// Creates a transport for the given workspace credentials.
    pub fn new(credentials: &Credentials, request_timeout: Duration) -> Result<Self> {
        let api_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| QueryError::config(format!("Failed to create HTTP client: {}", e)))?;
        let link_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| QueryError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: credentials.host.trim_end_matches('/').to_string(),
            token: credentials.token.clone(),
            api_client,
            link_client,
        })
    }

    /// Returns the statements endpoint URL.
    fn statements_url(&self) -> String {
        format!("{}/api/2.0/sql/statements", self.base_url)
    }

    /// Reads the body and parses it as JSON, mapping HTTP failures to transport errors.
    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(QueryError::transport(format!("HTTP {}: {}", status, body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| QueryError::transport(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl StatementTransport for HttpTransport {
    async fn submit_statement(&self, request: &StatementRequest) -> Result<StatementResponse> {
        let resp = self
            .api_client
            .post(self.statements_url())
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        debug!("Submit returned HTTP {}", status);

        // 4xx means the remote side validated and refused the statement.
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            let body = resp.text().await?;
            return Err(QueryError::rejection(body));
        }

        Self::read_json(resp).await
    }

    async fn get_statement(&self, statement_id: &str) -> Result<StatementResponse> {
        let url = format!("{}/{}", self.statements_url(), statement_id);

        let resp = self
            .api_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::read_json(resp).await
    }

    async fn get_result_chunk(
        &self,
        statement_id: &str,
        chunk_index: u32,
    ) -> Result<ResultPayload> {
        let url = format!(
            "{}/{}/result/chunks/{}",
            self.statements_url(),
            statement_id,
            chunk_index
        );

        let resp = self
            .api_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::read_json(resp).await
    }

    async fn fetch_chunk(&self, external_link: &str) -> Result<Vec<Row>> {
        let resp = self.link_client.get(external_link).send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        // The URL carries a signature, so it is left out of the message.
        if !status.is_success() {
            return Err(QueryError::transport(format!(
                "External link download failed (HTTP {}): {}",
                status, body
            )));
        }

        serde_json::from_str::<Vec<Row>>(&body)
            .map_err(|e| QueryError::transport(format!("Chunk body is not a row array: {}", e)))
    }
}
