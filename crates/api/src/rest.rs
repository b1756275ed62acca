//! REST path related types.

use crate::*;
use std::sync::Arc;

/// The request/response path to the remote service.
///
/// Guildfetch only uses the member endpoints: single member lookups outside
/// the push channel flow, and the paged listing used as safe bulk path for
/// small guilds. Rate limiting is the implementation's concern.
#[cfg_attr(any(test, feature = "mockall"), mockall::automock)]
pub trait RestClient: 'static + Send + Sync + std::fmt::Debug {
    /// Get a single member of a guild.
    fn get_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> BoxFut<'_, GfResult<Member>>;

    /// List up to `limit` members of a guild, ordered by user id,
    /// starting after the `after` id.
    fn list_members(
        &self,
        guild_id: GuildId,
        after: Option<UserId>,
        limit: u32,
    ) -> BoxFut<'_, GfResult<Vec<Member>>>;
}

/// Trait-object [RestClient].
pub type DynRestClient = Arc<dyn RestClient>;
