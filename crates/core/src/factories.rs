//! Factories for generating instances of guildfetch modules.

pub mod core_retrieval;
pub use core_retrieval::CoreRetrievalFactory;

mod mem_member_store;
pub use mem_member_store::*;

mod mem_push_channel;
pub use mem_push_channel::*;
