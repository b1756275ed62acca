#![deny(missing_docs)]
//! Guildfetch API contains the module traits and the basic types required
//! to define the api of those traits.
//!
//! The member retrieval coordinator reconciles the two access paths of a
//! remote guild service: a request/response REST path and a push channel
//! that streams members as unordered chunks correlated by a token.
//!
//! If you want to use the coordinator itself, please see the
//! guildfetch_core crate.

/// Boxed future type.
pub type BoxFut<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub mod builder;
pub mod config;

mod error;
pub use error::*;

pub mod id;
pub use id::{ChannelId, GuildId, RoleId, Token, UserId};

mod timestamp;
pub use timestamp::*;

pub mod member;
pub use member::*;

pub mod protocol;
pub use protocol::*;

pub mod push;
pub use push::*;

pub mod rest;
pub use rest::*;

pub mod retrieval;
pub use retrieval::*;

pub mod store;
pub use store::*;
