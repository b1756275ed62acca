//! Targeted lookup by user id.

use super::registry::*;
use super::CoreRetrieval;
use guildfetch_api::*;
use std::collections::HashSet;

/// Complete once every requested id is accounted for, on a short chunk,
/// or once the server sent every chunk it announced.
pub(super) struct LookupPolicy {
    requested: usize,
    page_size: usize,
    chunks_seen: u32,
    not_found: HashSet<UserId>,
}

impl LookupPolicy {
    pub(super) fn new(requested: usize, page_size: u32) -> Self {
        Self {
            requested,
            page_size: page_size as usize,
            chunks_seen: 0,
            not_found: HashSet::new(),
        }
    }
}

impl RequestPolicy for LookupPolicy {
    fn is_complete(&mut self, accumulated: &MemberMap, meta: &ChunkMeta) -> bool {
        let ChunkMeta::Members {
            index,
            count,
            size,
            not_found,
        } = meta
        else {
            return false;
        };

        self.chunks_seen += 1;
        tracing::trace!(index, count, size, "lookup chunk");
        self.not_found.extend(not_found.iter().copied());

        accumulated.len() + self.not_found.len() >= self.requested
            || *size < self.page_size
            || self.chunks_seen >= *count
    }
}

impl CoreRetrieval {
    /// Look up a single member, preferring a complete cached record.
    pub(super) async fn lookup_one(
        &self,
        user_id: UserId,
        options: &FetchOptions,
    ) -> GfResult<Member> {
        if !options.force {
            if let Some(member) = self.store.get(self.guild_id(), user_id).await?
            {
                if !member.partial {
                    tracing::trace!(%user_id, "lookup served from store");
                    return Ok(member);
                }
            }
        }

        if options.via_rest {
            let member = self.rest.get_member(self.guild_id(), user_id).await?;
            return self.store.put(member).await;
        }

        self.lookup(vec![user_id], options)
            .await?
            .remove(&user_id)
            .ok_or_else(|| {
                GfError::other(format!(
                    "unknown member {user_id} in guild {}",
                    self.guild_id()
                ))
            })
    }

    /// Look up a set of members over the push channel. Ids the server
    /// does not know are missing from the result.
    pub(super) async fn lookup(
        &self,
        user_ids: Vec<UserId>,
        options: &FetchOptions,
    ) -> GfResult<MemberMap> {
        let mut seen = HashSet::new();
        let user_ids = user_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect::<Vec<_>>();

        if user_ids.is_empty() {
            return Err(GfError::invalid_argument("no user ids to look up"));
        }
        if user_ids.len() > self.config.max_lookup_ids as usize {
            return Err(GfError::invalid_argument(format!(
                "cannot look up {} ids at once, the maximum is {}",
                user_ids.len(),
                self.config.max_lookup_ids
            )));
        }

        let token = self.token_for(options)?;
        let spec = RequestSpec {
            guild_id: self.guild_id(),
            kind: RequestKind::Lookup,
            policy: Box::new(LookupPolicy::new(
                user_ids.len(),
                self.config.server_page_size,
            )),
            timeout: options
                .timeout
                .unwrap_or_else(|| self.config.lookup_timeout()),
            mode: DeadlineMode::Fixed,
            max_retries: 0,
        };
        let message = PushMessage::RequestMembers(RequestMembers {
            guild_id: self.guild_id(),
            target: MemberTarget::UserIds(user_ids),
            limit: 0,
            presences: options.presences,
            nonce: token.clone(),
        });

        self.dispatcher
            .request(token, spec, message)
            .await?
            .outcome()
            .await
    }
}
