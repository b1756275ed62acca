//! Guild member types.

use crate::{GuildId, RoleId, Timestamp, UserId};
use std::collections::{BTreeSet, HashMap};

/// Member flags as reported by the remote service.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct MemberFlags(pub u32);

impl MemberFlags {
    /// The member left and rejoined the guild.
    pub const DID_REJOIN: u32 = 1 << 0;
    /// The member completed onboarding.
    pub const COMPLETED_ONBOARDING: u32 = 1 << 1;
    /// The member bypasses verification requirements.
    pub const BYPASSES_VERIFICATION: u32 = 1 << 2;
    /// The member started onboarding.
    pub const STARTED_ONBOARDING: u32 = 1 << 3;

    /// True if every bit of `flag` is set.
    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag == flag
    }
}

/// A member of a guild.
///
/// Member records are owned by the [MemberStore](crate::MemberStore).
/// Results handed out by a retrieval are snapshots, not the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// The user id of this member.
    pub id: UserId,

    /// The guild this member belongs to.
    pub guild_id: GuildId,

    /// The account name. Query searches prefix-match against this and
    /// the nickname.
    pub username: String,

    /// Roles held by this member.
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,

    /// Guild specific nickname, if any.
    #[serde(default)]
    pub nickname: Option<String>,

    /// Member flags.
    #[serde(default)]
    pub flags: MemberFlags,

    /// When the member joined the guild.
    pub joined_at: Timestamp,

    /// A partial record was built from incomplete data (e.g. a mention)
    /// and must be re-fetched before it is trusted.
    #[serde(default)]
    pub partial: bool,
}

impl Member {
    /// Construct a complete member record with no roles, nickname or flags.
    pub fn new(
        guild_id: GuildId,
        id: UserId,
        username: impl Into<String>,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            id,
            guild_id,
            username: username.into(),
            roles: BTreeSet::new(),
            nickname: None,
            flags: MemberFlags::default(),
            joined_at,
            partial: false,
        }
    }

    /// The name shown for this member in the guild.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }

    /// True if a query search for `prefix` would match this member.
    /// Matching is case-insensitive on the username and the nickname.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        let prefix = prefix.to_lowercase();
        self.username.to_lowercase().starts_with(&prefix)
            || self
                .nickname
                .as_ref()
                .map(|n| n.to_lowercase().starts_with(&prefix))
                .unwrap_or(false)
    }
}

/// Members keyed by their user id.
pub type MemberMap = HashMap<UserId, Member>;
