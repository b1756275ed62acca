//! Test utilities associated with guilds.

use guildfetch_api::{ChannelId, GuildId};

/// A guild id for use in tests.
pub const TEST_GUILD_ID: GuildId = GuildId(1);

/// A member list channel id for use in tests.
pub const TEST_CHANNEL_ID: ChannelId = ChannelId(2);
