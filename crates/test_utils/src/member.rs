//! Test utilities associated with members.

use crate::id::create_user_id_list;
use guildfetch_api::{GuildId, Member, Timestamp, UserId};

/// Create a complete member record.
pub fn test_member(guild_id: GuildId, id: UserId, username: &str) -> Member {
    Member::new(guild_id, id, username, Timestamp::now())
}

/// Create `count` members with distinct random ids. Usernames are
/// `member-<n>`.
pub fn test_members(guild_id: GuildId, count: usize) -> Vec<Member> {
    create_user_id_list(count)
        .into_iter()
        .enumerate()
        .map(|(n, id)| test_member(guild_id, id, &format!("member-{n}")))
        .collect()
}
