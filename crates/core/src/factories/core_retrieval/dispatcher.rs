//! The chunk dispatcher.
//!
//! A single task owns the [CorrelationRegistry]. Push events and commands
//! from the strategies reach it through channels, and it processes them
//! one at a time, in arrival order. The task also drives request deadlines.

use super::registry::*;
use guildfetch_api::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

enum Cmd {
    Register {
        token: Token,
        spec: RequestSpec,
        reply: oneshot::Sender<GfResult<RequestHandle>>,
    },
    Cancel {
        token: Token,
        reply: oneshot::Sender<bool>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

type CmdSend = mpsc::UnboundedSender<Cmd>;
type CmdRecv = mpsc::UnboundedReceiver<Cmd>;
type EventSend = mpsc::UnboundedSender<PushEvent>;
type EventRecv = mpsc::UnboundedReceiver<PushEvent>;

/// The handler registered with the push channel. It only forwards events
/// to the dispatch task, so it never blocks the connection.
#[derive(Debug)]
struct DispatchHandler {
    event_send: EventSend,
}

impl PushHandler for DispatchHandler {
    fn recv_event(&self, event: PushEvent) {
        if self.event_send.send(event).is_err() {
            tracing::trace!("dispatcher stopped, dropping push event");
        }
    }
}

/// Handle to the dispatch task.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    cmd_send: CmdSend,
    push: DynPushChannel,
    token_prefix: u32,
    token_seq: AtomicU64,
    task: tokio::task::AbortHandle,
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Dispatcher {
    /// Register as the handler of `push` and spawn the dispatch task.
    pub fn spawn(
        guild_id: GuildId,
        store: DynMemberStore,
        push: DynPushChannel,
        member_count: Arc<AtomicU64>,
    ) -> Self {
        let (cmd_send, cmd_recv) = mpsc::unbounded_channel();
        let (event_send, event_recv) = mpsc::unbounded_channel();

        push.register_handler(Arc::new(DispatchHandler { event_send }));

        let task = tokio::task::spawn(dispatch_task(
            guild_id,
            store,
            push.clone(),
            member_count,
            cmd_recv,
            event_recv,
        ))
        .abort_handle();

        Self {
            cmd_send,
            push,
            token_prefix: rand::random(),
            token_seq: AtomicU64::new(0),
            task,
        }
    }

    /// A token no other request of this dispatcher has used.
    pub fn next_token(&self) -> Token {
        let seq = self.token_seq.fetch_add(1, Ordering::Relaxed);
        Token::generated(self.token_prefix, seq)
    }

    /// Register a request without sending anything.
    pub async fn register(
        &self,
        token: Token,
        spec: RequestSpec,
    ) -> GfResult<RequestHandle> {
        let (reply, r) = oneshot::channel();
        self.cmd_send
            .send(Cmd::Register { token, spec, reply })
            .map_err(|_| GfError::other("retrieval is shut down"))?;
        r.await
            .map_err(|_| GfError::other("retrieval is shut down"))?
    }

    /// Register a request, then send the message that starts it.
    ///
    /// The registration is confirmed by the dispatch task before the
    /// message goes out, so no answer can arrive for an unknown token.
    pub async fn request(
        &self,
        token: Token,
        spec: RequestSpec,
        message: PushMessage,
    ) -> GfResult<RequestHandle> {
        let handle = self.register(token.clone(), spec).await?;

        if let Err(err) = self.push.send(message).await {
            tracing::debug!(%token, ?err, "request send failed");
            self.cancel(token).await;
            return Err(err);
        }

        Ok(handle)
    }

    /// Cancel a request. Returns false if nothing was pending.
    pub async fn cancel(&self, token: Token) -> bool {
        let (reply, r) = oneshot::channel();
        if self.cmd_send.send(Cmd::Cancel { token, reply }).is_err() {
            return false;
        }
        r.await.unwrap_or(false)
    }

    /// Cancel everything and stop the dispatch task.
    pub async fn shutdown(&self) {
        let (reply, r) = oneshot::channel();
        if self.cmd_send.send(Cmd::Shutdown { reply }).is_ok() {
            let _ = r.await;
        }
    }
}

async fn dispatch_task(
    guild_id: GuildId,
    store: DynMemberStore,
    push: DynPushChannel,
    member_count: Arc<AtomicU64>,
    mut cmd_recv: CmdRecv,
    mut event_recv: EventRecv,
) {
    let mut registry = CorrelationRegistry::default();
    let mut events_open = true;

    loop {
        let deadline = registry.next_deadline();

        tokio::select! {
            biased;

            cmd = cmd_recv.recv() => match cmd {
                None => break,
                Some(Cmd::Register { token, spec, reply }) => {
                    let _ = reply.send(
                        registry.register(token, spec, Instant::now()),
                    );
                    tracing::trace!(pending = registry.len(), "registered");
                }
                Some(Cmd::Cancel { token, reply }) => {
                    let _ = reply.send(registry.cancel(&token));
                }
                Some(Cmd::Shutdown { reply }) => {
                    let count = registry.cancel_all();
                    tracing::debug!(%guild_id, count, "dispatcher shutdown");
                    let _ = reply.send(());
                    break;
                }
            },
            event = event_recv.recv(), if events_open => match event {
                None => {
                    tracing::debug!(%guild_id, "push handler was replaced");
                    events_open = false;
                }
                Some(event) => {
                    dispatch_event(
                        &mut registry,
                        guild_id,
                        &store,
                        &push,
                        &member_count,
                        event,
                    )
                    .await;
                }
            },
            _ = sleep_until(deadline) => {
                registry.expire(Instant::now());
            }
        }
    }

    // Outstanding requests resolve as cancelled when the registry drops.
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn dispatch_event(
    registry: &mut CorrelationRegistry,
    guild_id: GuildId,
    store: &DynMemberStore,
    push: &DynPushChannel,
    member_count: &AtomicU64,
    event: PushEvent,
) {
    match event {
        PushEvent::MembersChunk(chunk) => {
            if chunk.guild_id != guild_id {
                tracing::trace!(
                    guild_id = %chunk.guild_id,
                    "dropping chunk for another guild"
                );
                return;
            }

            let size = chunk.members.len();
            let members = store_all(store, chunk.members).await;

            let Some(token) = chunk.nonce else {
                tracing::trace!(size, "dropping chunk without nonce");
                return;
            };

            tracing::trace!(
                %token,
                index = chunk.chunk_index,
                count = chunk.chunk_count,
                size,
                "members chunk"
            );

            registry.deliver(
                &token,
                members,
                ChunkMeta::Members {
                    index: chunk.chunk_index,
                    count: chunk.chunk_count,
                    size,
                    not_found: chunk.not_found,
                },
                Instant::now(),
            );
        }
        PushEvent::ListUpdate(update) => {
            if update.guild_id != guild_id {
                tracing::trace!(
                    guild_id = %update.guild_id,
                    "dropping list update for another guild"
                );
                return;
            }

            if let Some(count) = update.member_count {
                member_count.store(count, Ordering::Relaxed);
            }

            let token = Token::for_member_list(guild_id, update.channel_id);

            // one resubscription per update, however many of the
            // subscribed ranges it invalidates
            let mut resubscribed = false;

            for op in update.ops {
                match op {
                    ListOp::Invalidate { range } => {
                        tracing::trace!(%token, %range, "list invalidate");
                        if resubscribed {
                            continue;
                        }
                        let Some(message) =
                            registry.invalidate(&token, range, Instant::now())
                        else {
                            continue;
                        };
                        resubscribed = true;
                        if let Err(err) = push.send(message).await {
                            registry.fail(&token, err);
                        }
                    }
                    ListOp::Sync { range, items } => {
                        tracing::trace!(%token, %range, size = items.len(), "list sync");
                        let items = store_all(store, items).await;
                        registry.deliver(
                            &token,
                            items,
                            ChunkMeta::List {
                                range: Some(range),
                                synced: true,
                            },
                            Instant::now(),
                        );
                    }
                    ListOp::Insert { item, .. } | ListOp::Update { item, .. } => {
                        let items = store_all(store, vec![item]).await;
                        registry.deliver(
                            &token,
                            items,
                            ChunkMeta::List {
                                range: None,
                                synced: false,
                            },
                            Instant::now(),
                        );
                    }
                    ListOp::Delete { index } => {
                        tracing::trace!(%token, index, "list delete");
                    }
                }
            }
        }
    }
}

/// Write members to the store, returning what the store holds for each.
/// A failed write is logged and the received record is used.
async fn store_all(store: &DynMemberStore, members: Vec<Member>) -> Vec<Member> {
    let mut out = Vec::with_capacity(members.len());
    for member in members {
        match store.put(member.clone()).await {
            Ok(stored) => out.push(stored),
            Err(err) => {
                tracing::warn!(user_id = %member.id, ?err, "member store write failed");
                out.push(member);
            }
        }
    }
    out
}
