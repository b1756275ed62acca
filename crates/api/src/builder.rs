//! Builder-related types.

use crate::*;
use std::sync::Arc;

/// The general guildfetch builder.
/// This contains both configuration and factory instances,
/// allowing construction of runtime module instances.
#[derive(Debug)]
pub struct Builder {
    /// The module configuration to be used when building modules.
    /// This can be loaded from disk or modified before freezing the builder.
    pub config: config::Config,

    /// The [store::MemberStoreFactory] to be used for creating
    /// [store::MemberStore] instances.
    pub member_store: store::DynMemberStoreFactory,

    /// The [retrieval::RetrievalFactory] to be used for creating
    /// [retrieval::Retrieval] instances.
    pub retrieval: retrieval::DynRetrievalFactory,
}

impl Builder {
    /// Construct a default config given the configured module factories.
    /// Note, this should be called before freezing the Builder instance
    /// in an Arc<>.
    pub fn with_default_config(mut self) -> GfResult<Self> {
        {
            let Self {
                config,
                member_store,
                retrieval,
            } = &mut self;

            member_store.default_config(config)?;
            retrieval.default_config(config)?;
        }

        Ok(self)
    }

    /// Validate the current configuration with every module factory.
    pub fn validate_config(&self) -> GfResult<()> {
        self.member_store.validate_config(&self.config)?;
        self.retrieval.validate_config(&self.config)?;

        Ok(())
    }

    /// Freeze the builder. The result is passed to module factories.
    pub fn build(self) -> GfResult<Arc<Self>> {
        self.validate_config()?;
        Ok(Arc::new(self))
    }
}
