//! Member store related types.

use crate::*;
use std::sync::Arc;

/// The entity store member records live in.
///
/// The store is shared by every strategy of a coordinator and by the host.
/// Writes are last-write-wins per (guild, user).
pub trait MemberStore: 'static + Send + Sync + std::fmt::Debug {
    /// Get a member record, if the store holds one.
    fn get(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> BoxFut<'_, GfResult<Option<Member>>>;

    /// Store a member record, returning the stored record.
    fn put(&self, member: Member) -> BoxFut<'_, GfResult<Member>>;

    /// Count the member records held for a guild.
    fn count(&self, guild_id: GuildId) -> BoxFut<'_, GfResult<usize>>;

    /// Get every member record held for a guild.
    fn list(&self, guild_id: GuildId) -> BoxFut<'_, GfResult<MemberMap>>;
}

/// Trait-object [MemberStore].
pub type DynMemberStore = Arc<dyn MemberStore>;

/// A factory for constructing [MemberStore] instances.
pub trait MemberStoreFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut config::Config) -> GfResult<()>;

    /// Validate configuration.
    fn validate_config(&self, config: &config::Config) -> GfResult<()>;

    /// Construct a member store instance.
    fn create(
        &self,
        builder: Arc<builder::Builder>,
    ) -> BoxFut<'static, GfResult<DynMemberStore>>;
}

/// Trait-object [MemberStoreFactory].
pub type DynMemberStoreFactory = Arc<dyn MemberStoreFactory>;
