#![deny(missing_docs)]
//! Guildfetch member retrieval coordinator.
//!
//! This crate provides the [factories::CoreRetrievalFactory], the
//! production retrieval module, along with an in-memory member store and
//! an in-process push channel for testing.

use guildfetch_api::{builder::Builder, config::Config};

/// Construct a production-ready default builder.
///
/// - `member_store` - The default member store is
///   [factories::MemMemberStoreFactory].
/// - `retrieval` - The default retrieval module is
///   [factories::CoreRetrievalFactory].
pub fn default_builder() -> Builder {
    Builder {
        config: Config::default(),
        member_store: factories::MemMemberStoreFactory::create(),
        retrieval: factories::CoreRetrievalFactory::create(),
    }
}

pub mod factories;
