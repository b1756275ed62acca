//! Query search by name prefix.

use super::registry::*;
use super::CoreRetrieval;
use guildfetch_api::*;

/// Like a lookup, but the id set is unknown: complete on a short chunk,
/// once the limit is reached, or once every announced chunk arrived.
pub(super) struct SearchPolicy {
    limit: usize,
    page_size: usize,
    chunks_seen: u32,
}

impl SearchPolicy {
    pub(super) fn new(limit: u32, page_size: u32) -> Self {
        Self {
            limit: limit as usize,
            page_size: page_size as usize,
            chunks_seen: 0,
        }
    }
}

impl RequestPolicy for SearchPolicy {
    fn is_complete(&mut self, accumulated: &MemberMap, meta: &ChunkMeta) -> bool {
        let ChunkMeta::Members {
            index, count, size, ..
        } = meta
        else {
            return false;
        };

        self.chunks_seen += 1;
        tracing::trace!(index, count, size, "search chunk");

        *size < self.page_size
            || (self.limit > 0 && accumulated.len() >= self.limit)
            || self.chunks_seen >= *count
    }
}

impl CoreRetrieval {
    /// Search members by name prefix, returning at most `limit` of them,
    /// or every match if `limit` is 0.
    pub(super) async fn search(
        &self,
        query: &str,
        limit: u32,
        kind: RequestKind,
        options: &FetchOptions,
    ) -> GfResult<MemberMap> {
        if !query.is_empty() && limit > MAX_QUERY_LIMIT {
            return Err(GfError::invalid_argument(format!(
                "query limit must be at most {MAX_QUERY_LIMIT}, got {limit}"
            )));
        }

        let token = self.token_for(options)?;
        let spec = RequestSpec {
            guild_id: self.guild_id(),
            kind,
            policy: Box::new(SearchPolicy::new(
                limit,
                self.config.server_page_size,
            )),
            timeout: options
                .timeout
                .unwrap_or_else(|| self.config.search_timeout()),
            mode: DeadlineMode::Sliding,
            max_retries: 0,
        };
        let message = PushMessage::RequestMembers(RequestMembers {
            guild_id: self.guild_id(),
            target: MemberTarget::Query(query.to_string()),
            limit,
            presences: options.presences,
            nonce: token.clone(),
        });

        let mut members = self
            .dispatcher
            .request(token, spec, message)
            .await?
            .outcome()
            .await?;

        if limit > 0 && members.len() > limit as usize {
            let mut ids = members.keys().copied().collect::<Vec<_>>();
            ids.sort_unstable();
            for id in ids.into_iter().skip(limit as usize) {
                members.remove(&id);
            }
        }

        Ok(members)
    }
}
