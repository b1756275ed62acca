//! Push channel message shapes.
//!
//! Only the parts needed for request correlation are modeled. How these
//! shapes are framed and encoded on the wire is up to the
//! [PushChannel](crate::PushChannel) implementation.

use crate::{ChannelId, GuildId, Member, Token, UserId};

/// An inclusive range of member list indices, `[start, end]`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ListRange(pub u32, pub u32);

impl ListRange {
    /// The range of `size` indices starting at `offset`.
    pub fn window(offset: u32, size: u32) -> Self {
        Self(offset, offset.saturating_add(size.saturating_sub(1)))
    }

    /// First index of the range.
    pub fn start(&self) -> u32 {
        self.0
    }

    /// Last index of the range (inclusive).
    pub fn end(&self) -> u32 {
        self.1
    }
}

impl std::fmt::Display for ListRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.0, self.1)
    }
}

/// What a member request asks for.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberTarget {
    /// Members whose name starts with this string. The empty string
    /// matches everyone.
    Query(String),

    /// Exactly these members.
    UserIds(Vec<UserId>),
}

/// Enumeration request, answered by one or more [MembersChunk]s echoing
/// the nonce.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMembers {
    /// Guild to enumerate.
    pub guild_id: GuildId,

    /// Query string or explicit id set.
    #[serde(flatten)]
    pub target: MemberTarget,

    /// Maximum number of members to return, 0 for no limit.
    pub limit: u32,

    /// Whether the server should include presences.
    pub presences: bool,

    /// Correlation token.
    pub nonce: Token,
}

/// Windowed member list subscription, answered by [ListUpdate]s.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRanges {
    /// Guild the list belongs to.
    pub guild_id: GuildId,

    /// Channel the list is scoped to.
    pub channel_id: ChannelId,

    /// Subscribed index ranges.
    pub ranges: Vec<ListRange>,
}

/// A message sent over the push channel.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushMessage {
    /// Enumeration request.
    RequestMembers(RequestMembers),

    /// Member list subscription.
    SubscribeRanges(SubscribeRanges),
}

/// One batch of members answering a [RequestMembers].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersChunk {
    /// Guild the members belong to.
    pub guild_id: GuildId,

    /// The members in this chunk.
    pub members: Vec<Member>,

    /// Index of this chunk, `0..chunk_count`.
    pub chunk_index: u32,

    /// Total number of chunks the server will send for the request.
    pub chunk_count: u32,

    /// Requested ids the server does not know.
    #[serde(default)]
    pub not_found: Vec<UserId>,

    /// The nonce of the request, if it carried one.
    #[serde(default)]
    pub nonce: Option<Token>,
}

/// A single operation of a [ListUpdate].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListOp {
    /// The full content of a subscribed range.
    Sync {
        /// The range.
        range: ListRange,
        /// The members in the range.
        items: Vec<Member>,
    },

    /// The server dropped a range; it must be subscribed again.
    Invalidate {
        /// The range.
        range: ListRange,
    },

    /// A member was inserted at an index.
    Insert {
        /// List index.
        index: u32,
        /// The member.
        item: Member,
    },

    /// The member at an index changed.
    Update {
        /// List index.
        index: u32,
        /// The member.
        item: Member,
    },

    /// The member at an index was removed.
    Delete {
        /// List index.
        index: u32,
    },
}

/// Update of a channel scoped member list.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUpdate {
    /// Guild the list belongs to.
    pub guild_id: GuildId,

    /// Channel the list is scoped to.
    pub channel_id: ChannelId,

    /// Total member count of the guild, if the server reported it.
    #[serde(default)]
    pub member_count: Option<u64>,

    /// Operations, to be applied in order.
    pub ops: Vec<ListOp>,
}

/// An event received from the push channel.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "t", content = "d", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushEvent {
    /// Chunk answering an enumeration request.
    MembersChunk(MembersChunk),

    /// Member list update.
    ListUpdate(ListUpdate),
}
