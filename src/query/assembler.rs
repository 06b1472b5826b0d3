//! Result assembly.
//!
//! Turns the manifest and payload of a SUCCEEDED statement into one
//! [`AssembledResult`]. Inline rows are taken as-is. Chunked results are
//! downloaded concurrently from their pre-signed links and concatenated in
//! chunk index order, whatever order the downloads finish in.

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use super::AssembledResult;
use crate::error::{QueryError, Result};
use crate::transport::{ExternalLink, ResultManifest, ResultPayload, Row, StatementTransport};

/// Default number of chunk downloads allowed in flight.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Shape of a result payload.
#[derive(Debug)]
enum PayloadShape<'p> {
    Empty,
    Inline(&'p [Row]),
    Chunked(Vec<&'p ExternalLink>),
}

impl<'p> PayloadShape<'p> {
    fn of(payload: Option<&'p ResultPayload>) -> Result<Self> {
        let Some(payload) = payload else {
            return Ok(Self::Empty);
        };

        let links = payload.external_links.as_deref().unwrap_or_default();
        match (payload.data_array.as_deref(), links.is_empty()) {
            (Some(rows), true) => Ok(Self::Inline(rows)),
            (None, true) => Ok(Self::Empty),
            (None, false) => Ok(Self::Chunked(links.iter().collect())),
            (Some(_), false) => Err(QueryError::transport(
                "Result payload has both inline rows and external links",
            )),
        }
    }
}

/// Builds an [`AssembledResult`] from a statement's result payload.
pub struct ResultAssembler<'a> {
    transport: &'a dyn StatementTransport,
    max_concurrent_fetches: usize,
}

impl<'a> ResultAssembler<'a> {
    /// Creates a new assembler with the default fetch concurrency.
    pub fn new(transport: &'a dyn StatementTransport) -> Self {
        Self::with_concurrency(transport, DEFAULT_MAX_CONCURRENT_FETCHES)
    }

    /// Creates a new assembler allowing `max_concurrent_fetches` downloads at once.
    pub fn with_concurrency(
        transport: &'a dyn StatementTransport,
        max_concurrent_fetches: usize,
    ) -> Self {
        Self {
            transport,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
        }
    }

    /// Assembles the result described by `manifest` and `payload`.
    ///
    /// A missing payload, or one with neither rows nor links, is an empty
    /// result. Any chunk that cannot be fetched aborts the whole assembly.
    pub async fn assemble(
        &self,
        manifest: Option<&ResultManifest>,
        payload: Option<&ResultPayload>,
    ) -> Result<AssembledResult> {
        let schema = manifest.map(|m| m.schema.clone()).unwrap_or_default();

        let rows = match PayloadShape::of(payload)? {
            PayloadShape::Empty => Vec::new(),
            PayloadShape::Inline(rows) => rows.to_vec(),
            PayloadShape::Chunked(mut links) => {
                links.sort_by_key(|link| link.chunk_index);
                check_chunk_sequence(&links, manifest.and_then(|m| m.total_chunk_count))?;
                self.fetch_all(&links).await?
            }
        };

        Ok(AssembledResult::new(schema, rows))
    }

    /// Downloads every chunk and concatenates them in index order.
    ///
    /// Dropping the stream on the first error cancels the other downloads.
    async fn fetch_all(&self, links: &[&ExternalLink]) -> Result<Vec<Row>> {
        let mut chunks: Vec<(u32, Vec<Row>)> = stream::iter(links.iter().copied())
            .map(|link| self.fetch_one(link))
            .buffer_unordered(self.max_concurrent_fetches)
            .try_collect()
            .await?;

        chunks.sort_by_key(|(index, _)| *index);
        Ok(chunks.into_iter().flat_map(|(_, rows)| rows).collect())
    }

    async fn fetch_one(&self, link: &ExternalLink) -> Result<(u32, Vec<Row>)> {
        let rows = self
            .transport
            .fetch_chunk(&link.external_link)
            .await
            .map_err(|e| QueryError::chunk(link.chunk_index, failure_reason(e)))?;

        if let Some(expected) = link.row_count {
            if rows.len() as u64 != expected {
                return Err(QueryError::chunk(
                    link.chunk_index,
                    format!("expected {} rows, got {}", expected, rows.len()),
                ));
            }
        }

        debug!("Fetched chunk {} ({} rows)", link.chunk_index, rows.len());
        Ok((link.chunk_index, rows))
    }
}

/// Checks that sorted links cover `0..n` exactly once.
fn check_chunk_sequence(links: &[&ExternalLink], total_chunk_count: Option<u32>) -> Result<()> {
    for (position, link) in links.iter().enumerate() {
        let position = position as u32;
        if link.chunk_index < position {
            return Err(QueryError::chunk(
                link.chunk_index,
                "duplicate chunk descriptor",
            ));
        }
        if link.chunk_index > position {
            return Err(QueryError::chunk(position, "chunk descriptor is missing"));
        }
    }

    if let Some(total) = total_chunk_count {
        let present = links.len() as u32;
        if present < total {
            return Err(QueryError::chunk(present, "chunk descriptor is missing"));
        }
        if present > total {
            return Err(QueryError::chunk(
                total,
                format!("manifest announces only {} chunks", total),
            ));
        }
    }

    Ok(())
}

fn failure_reason(err: QueryError) -> String {
    match err {
        QueryError::Transport(msg) => msg,
        other => other.to_string(),
    }
}
