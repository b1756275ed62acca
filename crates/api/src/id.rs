//! Types dealing with entity identity and request correlation.

use crate::{GfError, GfResult};
use std::sync::Arc;

macro_rules! imp_deref {
    ($i:ty, $t:ty) => {
        impl std::ops::Deref for $i {
            type Target = $t;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

macro_rules! imp_from {
    ($a:ty, $b:ty, $i:ident => $e:expr) => {
        impl From<$b> for $a {
            fn from($i: $b) -> Self {
                $e
            }
        }
    };
}

/// Snowflake ids travel as decimal strings on the wire, since they do not
/// fit into the integer range of every json consumer.
pub(crate) mod serde_snowflake {
    pub fn serialize<S>(v: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(v)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(u64),
        }

        match serde::Deserialize::deserialize(deserializer)? {
            Raw::Num(n) => Ok(n),
            Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

macro_rules! imp_snowflake {
    ($(#[$meta:meta])* $i:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $i(#[serde(with = "serde_snowflake")] pub u64);

        imp_deref!($i, u64);
        imp_from!($i, u64, v => $i(v));

        impl std::fmt::Display for $i {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl std::fmt::Debug for $i {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($i), self.0)
            }
        }

        impl std::str::FromStr for $i {
            type Err = GfError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map($i).map_err(|_| {
                    GfError::invalid_argument(format!(
                        "{} is not a valid {}",
                        s,
                        stringify!($i),
                    ))
                })
            }
        }
    };
}

imp_snowflake!(
    /// Identifies a guild (the community whose members are retrieved).
    GuildId
);

imp_snowflake!(
    /// Identifies a user, and by extension their member record in a guild.
    UserId
);

imp_snowflake!(
    /// Identifies a channel. Member lists are scoped to a channel.
    ChannelId
);

imp_snowflake!(
    /// Identifies a role held by a member.
    RoleId
);

/// Maximum length of a token sent to the server as a request nonce.
pub const MAX_TOKEN_LEN: usize = 32;

/// Prefix of the tokens member list subscriptions are tracked under.
pub const MEMBER_LIST_TOKEN_PREFIX: &str = "list:";

/// Opaque correlation token.
///
/// A member request carries its token as nonce, and every chunk the server
/// streams back for that request echoes it. Tokens are unique for the
/// lifetime of a coordinator.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Token(Arc<str>);

imp_deref!(Token, str);

impl Token {
    /// Construct a caller-chosen token. It must be non-empty and at most
    /// [MAX_TOKEN_LEN] bytes long.
    pub fn new(token: impl Into<String>) -> GfResult<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(GfError::invalid_argument("token must not be empty"));
        }
        if token.len() > MAX_TOKEN_LEN {
            return Err(GfError::invalid_argument(format!(
                "token {token:?} is longer than {MAX_TOKEN_LEN} bytes"
            )));
        }
        Ok(Self(token.into_boxed_str().into()))
    }

    /// Construct a generated token from a per-instance prefix and a
    /// sequence number. The result is at most 24 characters.
    pub fn generated(prefix: u32, seq: u64) -> Self {
        Self(format!("{prefix:08x}{seq:x}").into_boxed_str().into())
    }

    /// The token a member list subscription is tracked under.
    ///
    /// List updates do not echo a nonce, they are addressed by guild and
    /// channel. This token is never sent to the server, so it is not
    /// subject to the nonce length limit.
    pub fn for_member_list(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self(
            format!("{MEMBER_LIST_TOKEN_PREFIX}{guild_id}:{channel_id}")
                .into_boxed_str()
                .into(),
        )
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token({})", &self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn snowflake_json_is_a_string() {
        let id = UserId(80351110224678912);
        let enc = serde_json::to_string(&id).unwrap();
        assert_eq!("\"80351110224678912\"", enc);
        let dec: UserId = serde_json::from_str(&enc).unwrap();
        assert_eq!(id, dec);
    }

    #[test]
    fn snowflake_accepts_numbers() {
        let dec: GuildId = serde_json::from_str("42").unwrap();
        assert_eq!(GuildId(42), dec);
    }

    #[test]
    fn snowflake_from_str() {
        assert_eq!(ChannelId(7), "7".parse::<ChannelId>().unwrap());
        assert!(matches!(
            "seven".parse::<ChannelId>(),
            Err(GfError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn token_length_is_bounded() {
        Token::new("a".repeat(MAX_TOKEN_LEN)).unwrap();
        assert!(matches!(
            Token::new("a".repeat(MAX_TOKEN_LEN + 1)),
            Err(GfError::InvalidArgument { .. })
        ));
        assert!(matches!(
            Token::new(""),
            Err(GfError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn generated_tokens_fit_a_nonce() {
        let t = Token::generated(u32::MAX, u64::MAX);
        assert!(t.len() <= MAX_TOKEN_LEN);
        assert_ne!(Token::generated(1, 1), Token::generated(1, 2));
    }

    #[test]
    fn member_list_token_is_stable() {
        assert_eq!(
            Token::for_member_list(GuildId(1), ChannelId(2)),
            Token::for_member_list(GuildId(1), ChannelId(2)),
        );
        assert_eq!(
            "list:1:2",
            Token::for_member_list(GuildId(1), ChannelId(2)).to_string()
        );
    }
}
