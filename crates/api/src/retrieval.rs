//! Retrieval related types.
//!
//! [Retrieval] is the caller facing api of the member retrieval
//! coordinator. It turns high-level asks ("this member", "everyone named
//! abc...", "the whole directory") into push channel enumeration requests
//! and collects the streamed answers.

use crate::*;
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of results a single query page may ask for.
pub const MAX_QUERY_LIMIT: u32 = 100;

/// What a [Retrieval::fetch] call asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSpec {
    /// The full member directory of the guild.
    Directory,

    /// A single member.
    User(UserId),

    /// An explicit set of members.
    Users(Vec<UserId>),

    /// Members whose name starts with `query`.
    Query {
        /// The name prefix. The empty string matches everyone.
        query: String,

        /// Result limit, 0 for no limit.
        limit: u32,
    },
}

/// The result of a [Retrieval::fetch] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// A single member, answering [FetchSpec::User].
    One(Member),

    /// An exact result set.
    Many(MemberMap),

    /// A result set that may be incomplete. Returned by strategies that
    /// cannot guarantee they saw every member.
    BestEffort(MemberMap),
}

impl Fetched {
    /// Flatten into a member map, regardless of the variant.
    pub fn into_members(self) -> MemberMap {
        match self {
            Self::One(m) => {
                let mut out = MemberMap::new();
                out.insert(m.id, m);
                out
            }
            Self::Many(map) | Self::BestEffort(map) => map,
        }
    }

    /// True if the result may be missing members.
    pub fn is_best_effort(&self) -> bool {
        matches!(self, Self::BestEffort(_))
    }

    /// Number of members in the result.
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(map) | Self::BestEffort(map) => map.len(),
        }
    }

    /// True if the result holds no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-call options of [Retrieval::fetch].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip the cache-hit fast path of single member lookups.
    pub force: bool,

    /// Ask the server to include presences.
    pub presences: bool,

    /// Override the configured deadline of the request.
    pub timeout: Option<Duration>,

    /// Use this correlation token instead of a generated one.
    /// At most [MAX_TOKEN_LEN](crate::id::MAX_TOKEN_LEN) characters, and
    /// not starting with
    /// [MEMBER_LIST_TOKEN_PREFIX](crate::id::MEMBER_LIST_TOKEN_PREFIX).
    pub nonce: Option<String>,

    /// Resolve a single member lookup over the REST path instead of the
    /// push channel.
    pub via_rest: bool,
}

impl FetchOptions {
    /// Check the options before any network action.
    pub fn validate(&self) -> GfResult<()> {
        if self.timeout == Some(Duration::ZERO) {
            return Err(GfError::invalid_argument("timeout must be non-zero"));
        }
        if let Some(nonce) = &self.nonce {
            if nonce.starts_with(id::MEMBER_LIST_TOKEN_PREFIX) {
                return Err(GfError::invalid_argument(format!(
                    "nonce must not start with {:?}",
                    id::MEMBER_LIST_TOKEN_PREFIX
                )));
            }
            Token::new(nonce.as_str())?;
        }
        Ok(())
    }
}

/// Options of [Retrieval::fetch_windowed_list].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowedListOptions {
    /// The channel the member list is scoped to.
    pub channel_id: ChannelId,

    /// First list index of the requested window.
    pub offset: u32,

    /// Subscribe to the first window alongside the requested one,
    /// which reduces how often the server drops the subscription.
    pub double_range: bool,

    /// Override the configured retry budget. Must be at least 1.
    pub max_retries: Option<u32>,

    /// Override the configured deadline.
    pub timeout: Option<Duration>,
}

impl WindowedListOptions {
    /// Options for the first window of a channel list.
    pub fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            offset: 0,
            double_range: false,
            max_retries: None,
            timeout: None,
        }
    }

    /// Check the options before any network action.
    pub fn validate(&self) -> GfResult<()> {
        if self.max_retries == Some(0) {
            return Err(GfError::invalid_argument(
                "maxRetries must be at least 1",
            ));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(GfError::invalid_argument("timeout must be non-zero"));
        }
        Ok(())
    }
}

/// Options of [Retrieval::fetch_bruteforce]. Unset fields fall back to
/// the module configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BruteforceOptions {
    /// Page limit of each candidate query, 1 to [MAX_QUERY_LIMIT].
    pub limit: Option<u32>,

    /// Delay between successive candidate queries.
    pub delay: Option<Duration>,

    /// Maximum candidate length. Must be at least 1.
    pub depth: Option<u8>,
}

impl BruteforceOptions {
    /// Check the options before any network action.
    pub fn validate(&self) -> GfResult<()> {
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_QUERY_LIMIT {
                return Err(GfError::invalid_argument(format!(
                    "limit must be between 1 and {MAX_QUERY_LIMIT}, got {limit}"
                )));
            }
        }
        if self.depth == Some(0) {
            return Err(GfError::invalid_argument("depth must be at least 1"));
        }
        Ok(())
    }
}

/// What the coordinator knows about the guild it retrieves from.
/// The facade picks a directory strategy from these signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildContext {
    /// The guild.
    pub guild_id: GuildId,

    /// The known total member count.
    pub member_count: u64,

    /// The caller holds the elevated management capability.
    pub can_manage_members: bool,

    /// A channel whose member list covers the whole guild.
    pub list_channel: Option<ChannelId>,
}

impl GuildContext {
    /// Context for a guild with no elevated capability.
    pub fn new(guild_id: GuildId, member_count: u64) -> Self {
        Self {
            guild_id,
            member_count,
            can_manage_members: false,
            list_channel: None,
        }
    }
}

/// The member retrieval coordinator of a single guild.
pub trait Retrieval: 'static + Send + Sync + std::fmt::Debug {
    /// Fetch members, choosing a strategy from the shape of `spec`.
    fn fetch(
        &self,
        spec: FetchSpec,
        options: FetchOptions,
    ) -> BoxFut<'_, GfResult<Fetched>>;

    /// Fetch one window of a channel scoped member list.
    fn fetch_windowed_list(
        &self,
        options: WindowedListOptions,
    ) -> BoxFut<'_, GfResult<MemberMap>>;

    /// Enumerate members by querying name prefixes. The result may be
    /// incomplete.
    fn fetch_bruteforce(
        &self,
        options: BruteforceOptions,
    ) -> BoxFut<'_, GfResult<MemberMap>>;

    /// Cancel an in-flight request. A no-op for unknown or already
    /// resolved tokens.
    fn cancel(&self, token: Token) -> BoxFut<'_, ()>;

    /// Cancel every in-flight request and stop processing push events.
    fn shutdown(&self) -> BoxFut<'_, ()>;
}

/// Trait-object [Retrieval].
pub type DynRetrieval = Arc<dyn Retrieval>;

/// A factory for creating [Retrieval] instances.
pub trait RetrievalFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut config::Config) -> GfResult<()>;

    /// Validate configuration.
    fn validate_config(&self, config: &config::Config) -> GfResult<()>;

    /// Construct a retrieval instance for a guild. The instance registers
    /// itself as the handler of `push`.
    fn create(
        &self,
        builder: Arc<builder::Builder>,
        guild: GuildContext,
        store: DynMemberStore,
        push: DynPushChannel,
        rest: DynRestClient,
    ) -> BoxFut<'static, GfResult<DynRetrieval>>;
}

/// Trait-object [RetrievalFactory].
pub type DynRetrievalFactory = Arc<dyn RetrievalFactory>;
