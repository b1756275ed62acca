//! Core retrieval is the guildfetch member retrieval coordinator.
//!
//! It reconciles the two access paths of the remote service, the REST path
//! and the push channel, into the operations of [Retrieval].
//!
//! It consists of multiple parts:
//! - The correlation registry, mapping a token to the state of one
//!   in-flight enumeration request.
//! - The chunk dispatcher, a single task that owns the registry, receives
//!   every push event and routes it to the matching request.
//! - Four request strategies built on the registry.
//! - The facade selecting a strategy for [Retrieval::fetch].
//!
//! ### Correlation
//!
//! A strategy registers its request with the dispatcher and only sends the
//! request message once the registration is confirmed. Every chunk the
//! server streams back echoes the token, is written to the member store,
//! and is accumulated on the pending request. After each chunk the
//! strategy's completion predicate decides whether the request is done.
//! A request resolves exactly once: on completion, deadline, retry
//! exhaustion or cancellation, whichever comes first. Late chunks for a
//! resolved request are dropped.
//!
//! ### Strategies
//!
//! - Targeted lookup: explicit user ids. A cached, complete member is
//!   returned without touching the push channel. Fixed deadline.
//! - Query search: a name prefix and a result limit. Sliding deadline.
//! - Windowed list: one index window of a channel scoped member list.
//!   Server invalidations trigger resubscription until the retry budget
//!   is spent. Sliding deadline.
//! - Brute force: query searches over every prefix of an alphabet up to a
//!   configured length, skipping prefixes under an empty one, throttled.
//!
//! ### Directory selection
//!
//! A full directory fetch uses the windowed list if the caller can manage
//! members and a list channel is known, paged REST listing for guilds
//! below the safe listing threshold, and brute force otherwise. Results of
//! brute force, and of windowed listing above the approximation threshold,
//! are returned as [Fetched::BestEffort].

use guildfetch_api::{builder, config::*, *};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

mod bruteforce;
mod directory;
mod dispatcher;
mod lookup;
mod registry;
mod search;
mod windowed;

use dispatcher::Dispatcher;
use registry::RequestKind;

/// CoreRetrieval configuration types.
pub mod config {
    use guildfetch_api::{config::ModConfig, GfError, GfResult};
    use std::time::Duration;

    /// Configuration parameters for
    /// [CoreRetrievalFactory](super::CoreRetrievalFactory).
    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    pub struct CoreRetrievalConfig {
        /// Deadline of a targeted lookup. The deadline is fixed, it is
        /// not extended by received chunks.
        ///
        /// Default: 120s.
        pub lookup_timeout_ms: u64,

        /// Deadline of a query search, extended by every received chunk.
        ///
        /// Default: 120s.
        pub search_timeout_ms: u64,

        /// Page size of the server's member chunks. A chunk smaller than
        /// this signals the server has no more matches.
        ///
        /// Default: 1000.
        pub server_page_size: u32,

        /// Maximum number of ids in a targeted lookup.
        ///
        /// Default: 100.
        pub max_lookup_ids: u32,

        /// How often a windowed list subscription is resent after the
        /// server invalidates it.
        ///
        /// Default: 3.
        pub windowed_max_retries: u32,

        /// Deadline of a windowed list subscription, extended by every
        /// received update.
        ///
        /// Default: 10s.
        pub windowed_timeout_ms: u64,

        /// Number of list indices in one window.
        ///
        /// Default: 100.
        pub windowed_range_size: u32,

        /// Windowed listing of guilds larger than this is approximate.
        ///
        /// Default: 100000.
        pub windowed_approximate_above: u64,

        /// Characters brute force candidates are built from.
        ///
        /// Default: lowercase letters, digits and `_-.`.
        pub bruteforce_alphabet: String,

        /// Maximum brute force candidate length.
        ///
        /// Default: 1.
        pub bruteforce_depth: u8,

        /// Delay between brute force candidate queries.
        ///
        /// Default: 500ms.
        pub bruteforce_delay_ms: u64,

        /// Smallest delay a caller may request between brute force
        /// candidate queries. Smaller requests are raised to this value.
        ///
        /// Default: 500ms.
        pub bruteforce_min_delay_ms: u64,

        /// Result limit of each brute force candidate query.
        ///
        /// Default: 100.
        pub bruteforce_limit: u32,

        /// Guilds with fewer members than this are listed over the REST
        /// path when no windowed list is available.
        ///
        /// Default: 10000.
        pub safe_listing_threshold: u64,

        /// Page size of the REST listing.
        ///
        /// Default: 1000.
        pub rest_page_size: u32,
    }

    impl Default for CoreRetrievalConfig {
        fn default() -> Self {
            Self {
                lookup_timeout_ms: 120_000,
                search_timeout_ms: 120_000,
                server_page_size: 1000,
                max_lookup_ids: 100,
                windowed_max_retries: 3,
                windowed_timeout_ms: 10_000,
                windowed_range_size: 100,
                windowed_approximate_above: 100_000,
                bruteforce_alphabet: "abcdefghijklmnopqrstuvwxyz0123456789_-."
                    .to_string(),
                bruteforce_depth: 1,
                bruteforce_delay_ms: 500,
                bruteforce_min_delay_ms: 500,
                bruteforce_limit: 100,
                safe_listing_threshold: 10_000,
                rest_page_size: 1000,
            }
        }
    }

    impl CoreRetrievalConfig {
        /// Reject configurations no request could succeed with.
        pub fn validate(&self) -> GfResult<()> {
            let non_zero = [
                ("lookupTimeoutMs", self.lookup_timeout_ms),
                ("searchTimeoutMs", self.search_timeout_ms),
                ("windowedTimeoutMs", self.windowed_timeout_ms),
                ("serverPageSize", self.server_page_size as u64),
                ("maxLookupIds", self.max_lookup_ids as u64),
                ("windowedMaxRetries", self.windowed_max_retries as u64),
                ("windowedRangeSize", self.windowed_range_size as u64),
                ("bruteforceDepth", self.bruteforce_depth as u64),
                ("bruteforceLimit", self.bruteforce_limit as u64),
                ("restPageSize", self.rest_page_size as u64),
            ];
            for (name, value) in non_zero {
                if value == 0 {
                    return Err(GfError::invalid_argument(format!(
                        "{name} must be non-zero"
                    )));
                }
            }
            if self.bruteforce_alphabet.is_empty() {
                return Err(GfError::invalid_argument(
                    "bruteforceAlphabet must not be empty",
                ));
            }
            if self.bruteforce_limit > guildfetch_api::MAX_QUERY_LIMIT {
                return Err(GfError::invalid_argument(format!(
                    "bruteforceLimit must be at most {}",
                    guildfetch_api::MAX_QUERY_LIMIT
                )));
            }
            Ok(())
        }

        /// Get the lookup timeout as a [Duration].
        pub fn lookup_timeout(&self) -> Duration {
            Duration::from_millis(self.lookup_timeout_ms)
        }

        /// Get the search timeout as a [Duration].
        pub fn search_timeout(&self) -> Duration {
            Duration::from_millis(self.search_timeout_ms)
        }

        /// Get the windowed list timeout as a [Duration].
        pub fn windowed_timeout(&self) -> Duration {
            Duration::from_millis(self.windowed_timeout_ms)
        }

        /// Get the brute force delay as a [Duration].
        pub fn bruteforce_delay(&self) -> Duration {
            Duration::from_millis(self.bruteforce_delay_ms)
        }

        /// Get the minimum brute force delay as a [Duration].
        pub fn bruteforce_min_delay(&self) -> Duration {
            Duration::from_millis(self.bruteforce_min_delay_ms)
        }
    }

    /// Module-level configuration for CoreRetrieval.
    #[derive(
        Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize,
    )]
    #[serde(default, rename_all = "camelCase")]
    pub struct CoreRetrievalModConfig {
        /// CoreRetrieval configuration.
        pub core_retrieval: CoreRetrievalConfig,
    }

    impl ModConfig for CoreRetrievalModConfig {}
}

use config::*;

/// A production-ready member retrieval module.
#[derive(Debug)]
pub struct CoreRetrievalFactory {}

impl CoreRetrievalFactory {
    /// Construct a new CoreRetrievalFactory.
    pub fn create() -> DynRetrievalFactory {
        Arc::new(Self {})
    }
}

impl RetrievalFactory for CoreRetrievalFactory {
    fn default_config(&self, config: &mut Config) -> GfResult<()> {
        config.set_module_config(&CoreRetrievalModConfig::default())
    }

    fn validate_config(&self, config: &Config) -> GfResult<()> {
        let config: CoreRetrievalModConfig = config.get_module_config()?;
        config.core_retrieval.validate()
    }

    fn create(
        &self,
        builder: Arc<builder::Builder>,
        guild: GuildContext,
        store: DynMemberStore,
        push: DynPushChannel,
        rest: DynRestClient,
    ) -> BoxFut<'static, GfResult<DynRetrieval>> {
        Box::pin(async move {
            let config: CoreRetrievalModConfig =
                builder.config.get_module_config()?;
            config.core_retrieval.validate()?;
            let out: DynRetrieval = Arc::new(CoreRetrieval::new(
                config.core_retrieval,
                guild,
                store,
                push,
                rest,
            ));
            Ok(out)
        })
    }
}

#[derive(Debug)]
struct CoreRetrieval {
    config: CoreRetrievalConfig,
    guild: GuildContext,
    member_count: Arc<AtomicU64>,
    store: DynMemberStore,
    rest: DynRestClient,
    dispatcher: Dispatcher,
}

impl CoreRetrieval {
    fn new(
        config: CoreRetrievalConfig,
        guild: GuildContext,
        store: DynMemberStore,
        push: DynPushChannel,
        rest: DynRestClient,
    ) -> Self {
        let member_count = Arc::new(AtomicU64::new(guild.member_count));
        let dispatcher = Dispatcher::spawn(
            guild.guild_id,
            store.clone(),
            push,
            member_count.clone(),
        );

        Self {
            config,
            guild,
            member_count,
            store,
            rest,
            dispatcher,
        }
    }

    fn guild_id(&self) -> GuildId {
        self.guild.guild_id
    }

    /// The latest known total member count. Member list updates refresh it.
    fn member_count(&self) -> u64 {
        self.member_count.load(Ordering::Relaxed)
    }

    /// The caller's nonce, or a fresh token.
    fn token_for(&self, options: &FetchOptions) -> GfResult<Token> {
        match &options.nonce {
            Some(nonce) => Token::new(nonce.as_str()),
            None => Ok(self.dispatcher.next_token()),
        }
    }
}

impl Retrieval for CoreRetrieval {
    fn fetch(
        &self,
        spec: FetchSpec,
        options: FetchOptions,
    ) -> BoxFut<'_, GfResult<Fetched>> {
        Box::pin(async move {
            options.validate()?;

            match spec {
                FetchSpec::User(user_id) => {
                    self.lookup_one(user_id, &options).await.map(Fetched::One)
                }
                FetchSpec::Users(user_ids) => {
                    self.lookup(user_ids, &options).await.map(Fetched::Many)
                }
                FetchSpec::Query { query, limit } => self
                    .search(&query, limit, RequestKind::Search, &options)
                    .await
                    .map(Fetched::Many),
                FetchSpec::Directory => self.fetch_directory(&options).await,
            }
        })
    }

    fn fetch_windowed_list(
        &self,
        options: WindowedListOptions,
    ) -> BoxFut<'_, GfResult<MemberMap>> {
        Box::pin(async move { self.windowed_list(options).await })
    }

    fn fetch_bruteforce(
        &self,
        options: BruteforceOptions,
    ) -> BoxFut<'_, GfResult<MemberMap>> {
        Box::pin(async move { self.bruteforce(options).await })
    }

    fn cancel(&self, token: Token) -> BoxFut<'_, ()> {
        Box::pin(async move {
            if !self.dispatcher.cancel(token.clone()).await {
                tracing::trace!(%token, "cancel: no such request");
            }
        })
    }

    fn shutdown(&self) -> BoxFut<'_, ()> {
        Box::pin(async move { self.dispatcher.shutdown().await })
    }
}
