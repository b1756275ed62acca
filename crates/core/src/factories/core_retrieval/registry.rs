//! The correlation registry, mapping tokens to in-flight requests.
//!
//! The registry is plain synchronous state. It is owned by the dispatch
//! task, which is the only place it is ever mutated, so it needs no locks.
//! Time is passed in explicitly.

use guildfetch_api::*;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// How the deadline of a request moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeadlineMode {
    /// The deadline is set once at registration.
    Fixed,

    /// Every delivered chunk pushes the deadline out by the full timeout.
    Sliding,
}

/// The strategy a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    Lookup,
    Search,
    WindowedList,
    Bruteforce,
}

/// What the dispatcher knows about a delivered batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChunkMeta {
    /// A members chunk answering a member request.
    Members {
        index: u32,
        count: u32,
        size: usize,
        not_found: Vec<UserId>,
    },

    /// Items of a member list update. `synced` is set for the full content
    /// of `range`, and unset for single item inserts and updates.
    List {
        range: Option<ListRange>,
        synced: bool,
    },
}

/// What to do when the server invalidates a list range.
#[derive(Debug)]
pub(crate) enum InvalidateAction {
    /// The range does not concern this request.
    Ignore,

    /// Send this message again, if the retry budget allows.
    Resend(PushMessage),

    /// Fail the request.
    Fail,
}

/// The strategy specific part of a pending request.
pub(crate) trait RequestPolicy: 'static + Send {
    /// Called after every delivery, with the members accumulated so far.
    fn is_complete(&mut self, accumulated: &MemberMap, meta: &ChunkMeta)
        -> bool;

    /// Called when the server invalidates a list range.
    fn on_invalidate(&mut self, _range: ListRange) -> InvalidateAction {
        InvalidateAction::Fail
    }
}

/// Everything needed to register a request.
pub(crate) struct RequestSpec {
    pub guild_id: GuildId,
    pub kind: RequestKind,
    pub policy: Box<dyn RequestPolicy>,
    pub timeout: Duration,
    pub mode: DeadlineMode,
    pub max_retries: u32,
}

impl std::fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSpec")
            .field("guild_id", &self.guild_id)
            .field("kind", &self.kind)
            .field("timeout", &self.timeout)
            .field("mode", &self.mode)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

type Resolve = oneshot::Sender<GfResult<MemberMap>>;

struct PendingRequest {
    guild_id: GuildId,
    kind: RequestKind,
    accumulated: MemberMap,
    policy: Box<dyn RequestPolicy>,
    deadline: Instant,
    timeout: Duration,
    mode: DeadlineMode,
    retries: u32,
    max_retries: u32,
    resolve: Resolve,
}

impl PendingRequest {
    fn resolve(self, token: &Token, result: GfResult<MemberMap>) {
        match &result {
            Ok(members) => tracing::debug!(
                %token,
                guild_id = %self.guild_id,
                kind = ?self.kind,
                count = members.len(),
                "request complete"
            ),
            Err(err) => tracing::debug!(
                %token,
                guild_id = %self.guild_id,
                kind = ?self.kind,
                ?err,
                "request failed"
            ),
        }

        // The caller may have stopped waiting, that is fine.
        let _ = self.resolve.send(result);
    }
}

/// Await the outcome of a registered request.
#[derive(Debug)]
pub(crate) struct RequestHandle {
    token: Token,
    recv: oneshot::Receiver<GfResult<MemberMap>>,
}

impl RequestHandle {
    /// Wait for the request to resolve.
    pub async fn outcome(self) -> GfResult<MemberMap> {
        match self.recv.await {
            Ok(r) => r,
            // the registry went away without resolving, i.e. it was
            // torn down
            Err(_) => Err(GfError::Cancelled { token: self.token }),
        }
    }
}

/// Token to pending request map.
#[derive(Default)]
pub(crate) struct CorrelationRegistry {
    pending: HashMap<Token, PendingRequest>,
}

impl std::fmt::Debug for CorrelationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationRegistry")
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl CorrelationRegistry {
    /// Register a request. The first deadline is `now + spec.timeout`.
    pub fn register(
        &mut self,
        token: Token,
        spec: RequestSpec,
        now: Instant,
    ) -> GfResult<RequestHandle> {
        if self.pending.contains_key(&token) {
            return Err(GfError::DuplicateToken { token });
        }

        let (resolve, recv) = oneshot::channel();

        tracing::debug!(%token, ?spec, "register request");

        self.pending.insert(
            token.clone(),
            PendingRequest {
                guild_id: spec.guild_id,
                kind: spec.kind,
                accumulated: MemberMap::new(),
                policy: spec.policy,
                deadline: now + spec.timeout,
                timeout: spec.timeout,
                mode: spec.mode,
                retries: 0,
                max_retries: spec.max_retries,
                resolve,
            },
        );

        Ok(RequestHandle { token, recv })
    }

    /// Add members to a pending request and resolve it if it is complete.
    ///
    /// Unknown tokens are ignored: the request may have completed, timed
    /// out or been cancelled before this batch arrived.
    pub fn deliver(
        &mut self,
        token: &Token,
        members: Vec<Member>,
        meta: ChunkMeta,
        now: Instant,
    ) {
        let Some(req) = self.pending.get_mut(token) else {
            tracing::trace!(%token, "dropping delivery for unknown token");
            return;
        };

        for member in members {
            req.accumulated.insert(member.id, member);
        }

        if req.mode == DeadlineMode::Sliding {
            req.deadline = now + req.timeout;
        }

        if !req.policy.is_complete(&req.accumulated, &meta) {
            return;
        }

        if let Some(mut req) = self.pending.remove(token) {
            let members = std::mem::take(&mut req.accumulated);
            req.resolve(token, Ok(members));
        }
    }

    /// Handle a server side invalidation of `range`.
    ///
    /// Returns the message to send again if the request retries. A request
    /// out of retries resolves with [GfError::Invalidated].
    pub fn invalidate(
        &mut self,
        token: &Token,
        range: ListRange,
        now: Instant,
    ) -> Option<PushMessage> {
        let req = self.pending.get_mut(token)?;

        match req.policy.on_invalidate(range) {
            InvalidateAction::Ignore => None,
            InvalidateAction::Resend(message)
                if req.retries < req.max_retries =>
            {
                req.retries += 1;
                if req.mode == DeadlineMode::Sliding {
                    req.deadline = now + req.timeout;
                }
                tracing::debug!(
                    %token,
                    %range,
                    retry = req.retries,
                    max_retries = req.max_retries,
                    "range invalidated, resubscribing"
                );
                Some(message)
            }
            InvalidateAction::Resend(_) | InvalidateAction::Fail => {
                if let Some(req) = self.pending.remove(token) {
                    req.resolve(token, Err(GfError::Invalidated { range }));
                }
                None
            }
        }
    }

    /// Resolve a pending request with [GfError::Cancelled].
    /// Returns false if no request was pending under `token`.
    pub fn cancel(&mut self, token: &Token) -> bool {
        match self.pending.remove(token) {
            None => false,
            Some(req) => {
                req.resolve(
                    token,
                    Err(GfError::Cancelled {
                        token: token.clone(),
                    }),
                );
                true
            }
        }
    }

    /// Cancel every pending request, returning how many there were.
    pub fn cancel_all(&mut self) -> usize {
        let all = self.pending.drain().collect::<Vec<_>>();
        let count = all.len();
        for (token, req) in all {
            let err = GfError::Cancelled {
                token: token.clone(),
            };
            req.resolve(&token, Err(err));
        }
        count
    }

    /// Resolve a pending request with an arbitrary error.
    pub fn fail(&mut self, token: &Token, err: GfError) -> bool {
        match self.pending.remove(token) {
            None => false,
            Some(req) => {
                req.resolve(token, Err(err));
                true
            }
        }
    }

    /// The earliest deadline of all pending requests.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|r| r.deadline).min()
    }

    /// Resolve every request whose deadline is at or before `now` with
    /// [GfError::RetrievalTimeout]. Accumulated members are discarded.
    pub fn expire(&mut self, now: Instant) -> usize {
        let expired = self
            .pending
            .iter()
            .filter(|(_, r)| r.deadline <= now)
            .map(|(t, _)| t.clone())
            .collect::<Vec<_>>();

        for token in expired.iter() {
            if let Some(req) = self.pending.remove(token) {
                tracing::debug!(
                    %token,
                    discarded = req.accumulated.len(),
                    "request deadline elapsed"
                );
                let err = GfError::RetrievalTimeout {
                    token: token.clone(),
                };
                req.resolve(token, Err(err));
            }
        }

        expired.len()
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
