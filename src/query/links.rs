//! Chunk link resolution.
//!
//! A status response only lists the first batch of external links. The rest
//! are announced through `manifest.total_chunk_count` and each link's
//! `next_chunk_index`, and must be requested one chunk at a time.

use std::collections::BTreeSet;
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::transport::{ExternalLink, ResultManifest, ResultPayload, StatementTransport};

/// Upper bound on chunk-link requests when the manifest gives no count.
const MAX_UNANNOUNCED_CHUNKS: usize = 100_000;

/// Completes the list of chunk descriptors for an external-links result.
pub struct ChunkLinkResolver<'a> {
    transport: &'a dyn StatementTransport,
}

impl<'a> ChunkLinkResolver<'a> {
    /// Creates a new resolver.
    pub fn new(transport: &'a dyn StatementTransport) -> Self {
        Self { transport }
    }

    /// Returns `payload` with descriptors for every announced chunk.
    ///
    /// Inline and empty payloads are returned unchanged.
    pub async fn resolve(
        &self,
        statement_id: &str,
        manifest: Option<&ResultManifest>,
        payload: Option<ResultPayload>,
    ) -> Result<Option<ResultPayload>> {
        let Some(mut payload) = payload else {
            return Ok(None);
        };
        let Some(mut links) = payload.external_links.take() else {
            return Ok(Some(payload));
        };

        let total = manifest.and_then(|m| m.total_chunk_count);
        let mut known: BTreeSet<u32> = links.iter().map(|l| l.chunk_index).collect();
        let mut pending: BTreeSet<u32> = match total {
            Some(total) => (0..total).filter(|i| !known.contains(i)).collect(),
            None => next_hints(&links, payload.next_chunk_index)
                .filter(|i| !known.contains(i))
                .collect(),
        };
        let limit = total.map(|t| t as usize).unwrap_or(MAX_UNANNOUNCED_CHUNKS);
        let mut requests = 0;

        while let Some(index) = pending.pop_first() {
            if known.contains(&index) {
                continue;
            }
            requests += 1;
            if requests > limit {
                return Err(QueryError::transport(format!(
                    "Statement {} announced more than {} result chunks",
                    statement_id, limit
                )));
            }

            debug!("Resolving link for chunk {} of {}", index, statement_id);
            let page = self
                .transport
                .get_result_chunk(statement_id, index)
                .await
                .map_err(|e| QueryError::chunk(index, format!("link request failed: {e}")))?;
            let page_links = page.external_links.unwrap_or_default();

            if !page_links.iter().any(|l| l.chunk_index == index) {
                return Err(QueryError::chunk(
                    index,
                    "chunk endpoint returned no external link",
                ));
            }

            if total.is_none() {
                pending.extend(
                    next_hints(&page_links, page.next_chunk_index).filter(|i| !known.contains(i)),
                );
            }
            for link in page_links {
                if known.insert(link.chunk_index) {
                    links.push(link);
                }
            }
        }

        payload.external_links = Some(links);
        Ok(Some(payload))
    }
}

fn next_hints(links: &[ExternalLink], page_next: Option<u32>) -> impl Iterator<Item = u32> + '_ {
    links
        .iter()
        .filter_map(|l| l.next_chunk_index)
        .chain(page_next)
}
