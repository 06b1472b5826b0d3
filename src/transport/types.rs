//! Wire types for the SQL Statement Execution API.
//!
//! Request and response bodies exchanged with `/api/2.0/sql/statements`,
//! plus the [`StatementStatus`] snapshot the poller works with.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{QueryError, Result};

/// A row of a result set. Cells are kept as raw JSON values.
pub type Row = Vec<serde_json::Value>;

/// Request body for submitting a statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatementRequest {
    pub warehouse_id: String,
    pub statement: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_timeout: Option<String>, // e.g. "0s" to return immediately

    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_wait_timeout: Option<String>, // "CONTINUE" or "CANCEL"

    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>, // "INLINE" or "EXTERNAL_LINKS"

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>, // "JSON_ARRAY", "ARROW_STREAM" or "CSV"
}

impl StatementRequest {
    /// Builds a request that returns immediately and prefers external links.
    pub fn asynchronous(warehouse_id: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            warehouse_id: warehouse_id.into(),
            statement: statement.into(),
            wait_timeout: Some("0s".to_string()),
            on_wait_timeout: Some("CONTINUE".to_string()),
            disposition: Some("EXTERNAL_LINKS".to_string()),
            format: Some("JSON_ARRAY".to_string()),
        }
    }
}

/// Execution state of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementState {
    Pending,
    Running,
    #[serde(alias = "FINISHED")]
    Succeeded,
    Failed,
    Canceled,
    Closed,
}

impl StatementState {
    /// Returns the state as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
            Self::Closed => "CLOSED",
        }
    }

    /// Returns true once no further progress can happen.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Returns true if a statement in this state may next be observed in `next`.
    ///
    /// Non-terminal states may repeat; RUNNING never goes back to PENDING and
    /// nothing leaves a terminal state.
    pub fn can_transition_to(&self, next: StatementState) -> bool {
        match self {
            Self::Pending => true,
            Self::Running => next != Self::Pending,
            _ => false,
        }
    }
}

impl fmt::Display for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Response body of the submit and status endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatementResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ResultManifest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultPayload>,
}

impl StatementResponse {
    /// Creates a response reporting `state` for statement `id`.
    pub fn with_state(id: impl Into<String>, state: StatementState) -> Self {
        Self {
            statement_id: Some(id.into()),
            status: Some(StatusBody { state, error: None }),
            manifest: None,
            result: None,
        }
    }

    /// Attaches a remote error message to the status.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        if let Some(status) = self.status.as_mut() {
            status.error = Some(ServiceError {
                message: Some(message.into()),
                error_code: None,
            });
        }
        self
    }

    /// Attaches a manifest.
    pub fn with_manifest(mut self, manifest: ResultManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// Attaches an inline result.
    pub fn with_inline_rows(mut self, rows: Vec<Row>) -> Self {
        self.result = Some(ResultPayload {
            data_array: Some(rows),
            ..Default::default()
        });
        self
    }

    /// Attaches an external-links result.
    pub fn with_external_links(mut self, links: Vec<ExternalLink>) -> Self {
        self.result = Some(ResultPayload {
            external_links: Some(links),
            ..Default::default()
        });
        self
    }

    /// Converts the response into a status snapshot.
    ///
    /// Fails if the response carries no status object.
    pub fn into_status(self) -> Result<StatementStatus> {
        let status = self
            .status
            .ok_or_else(|| QueryError::transport("Response did not include a status"))?;

        Ok(StatementStatus {
            state: status.state,
            error_message: status.error.and_then(|e| e.message),
            result_manifest: self.manifest,
            result_payload: self.result,
        })
    }
}

/// The `status` object of a statement response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusBody {
    pub state: StatementState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

/// Error detail attached to a failed statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

/// Metadata describing the shape of a statement's result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultManifest {
    #[serde(default)]
    pub schema: ResultSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunk_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
}

impl ResultManifest {
    /// Creates a manifest with the given columns.
    pub fn with_columns(columns: Vec<ColumnInfo>) -> Self {
        Self {
            schema: ResultSchema {
                column_count: Some(columns.len() as u32),
                columns,
                extra: Default::default(),
            },
            ..Default::default()
        }
    }

    /// Sets the announced chunk count.
    pub fn with_chunk_count(mut self, total_chunk_count: u32) -> Self {
        self.total_chunk_count = Some(total_chunk_count);
        self
    }
}

/// Column layout of a result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_count: Option<u32>,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    /// Keys not modelled above, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    /// Type details such as `type_precision`, `type_scale` or `type_interval_type`.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ColumnInfo {
    /// Creates a new column with the given name and type.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            name: name.into(),
            type_text: Some(type_name.to_lowercase()),
            type_name: Some(type_name),
            position: None,
            extra: Default::default(),
        }
    }
}

/// Result body: inline rows or a list of chunk descriptors.
///
/// The chunk-link endpoint returns the same shape for one chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_array: Option<Vec<Row>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_links: Option<Vec<ExternalLink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_chunk_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

/// A pre-signed location holding one chunk of the result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalLink {
    pub chunk_index: u32,
    pub external_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_chunk_index: Option<u32>,
}

impl ExternalLink {
    /// Creates a link for the given chunk index.
    pub fn new(chunk_index: u32, external_link: impl Into<String>) -> Self {
        Self {
            chunk_index,
            external_link: external_link.into(),
            expiration: None,
            row_count: None,
            row_offset: None,
            next_chunk_index: None,
        }
    }

    /// Sets the index of the chunk that follows this one.
    pub fn with_next(mut self, next_chunk_index: u32) -> Self {
        self.next_chunk_index = Some(next_chunk_index);
        self
    }
}

/// Snapshot of a statement's execution progress.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementStatus {
    pub state: StatementState,
    /// Present only for FAILED/CANCELED/CLOSED when the server sent one.
    pub error_message: Option<String>,
    pub result_manifest: Option<ResultManifest>,
    pub result_payload: Option<ResultPayload>,
}
