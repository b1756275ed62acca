//! The in-process stub push channel provided by guildfetch.

use guildfetch_api::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Computes the events the remote side answers a message with.
pub type Responder =
    Box<dyn Fn(&PushMessage) -> Vec<PushEvent> + 'static + Send + Sync>;

/// The in-process stub push channel provided by guildfetch.
/// This is NOT a production module. It is for testing only.
///
/// Sent messages are recorded. Events come from an optional responder,
/// invoked synchronously for every sent message, and from
/// [MemPushChannel::emit].
pub struct MemPushChannel {
    handler: Mutex<Option<DynPushHandler>>,
    sent: Mutex<Vec<PushMessage>>,
    responder: Option<Responder>,
    offline: AtomicBool,
}

impl std::fmt::Debug for MemPushChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemPushChannel")
            .field("sent", &self.sent.lock().unwrap().len())
            .field("has_responder", &self.responder.is_some())
            .finish()
    }
}

impl MemPushChannel {
    /// A channel nothing answers on, except through [MemPushChannel::emit].
    pub fn create() -> Arc<Self> {
        Arc::new(Self::new(None))
    }

    /// A channel answering every sent message with the events `responder`
    /// returns for it.
    pub fn with_responder(
        responder: impl Fn(&PushMessage) -> Vec<PushEvent>
            + 'static
            + Send
            + Sync,
    ) -> Arc<Self> {
        Arc::new(Self::new(Some(Box::new(responder))))
    }

    fn new(responder: Option<Responder>) -> Self {
        Self {
            handler: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            responder,
            offline: AtomicBool::new(false),
        }
    }

    /// Deliver an event to the registered handler as if the remote side
    /// sent it. Dropped if no handler is registered.
    pub fn emit(&self, event: PushEvent) {
        let handler = self.handler.lock().unwrap().clone();
        match handler {
            Some(handler) => handler.recv_event(event),
            None => tracing::trace!(?event, "no push handler, dropping event"),
        }
    }

    /// Every message sent so far, in order.
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// While offline, sending fails as if the connection was closed.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl PushChannel for MemPushChannel {
    fn register_handler(&self, handler: DynPushHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    fn send(&self, message: PushMessage) -> BoxFut<'_, GfResult<()>> {
        Box::pin(async move {
            if self.offline.load(Ordering::SeqCst) {
                return Err(GfError::other("push channel closed"));
            }

            self.sent.lock().unwrap().push(message.clone());

            if let Some(responder) = &self.responder {
                for event in responder(&message) {
                    self.emit(event);
                }
            }

            Ok(())
        })
    }
}
