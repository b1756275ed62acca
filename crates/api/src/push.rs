//! Push channel related types.
//!
//! The push channel is the persistent, message oriented connection to the
//! remote service. Sending, framing, heartbeats and reconnects are owned
//! by the implementation; guildfetch only sends [PushMessage]s and consumes
//! the [PushEvent] stream.

use crate::*;
use std::sync::Arc;

/// Handler for events received on a push channel.
pub trait PushHandler: 'static + Send + Sync + std::fmt::Debug {
    /// The sync handler for events received from the remote service.
    ///
    /// Implementations must not block. Events are handed over in the order
    /// the connection delivered them, and the handler must preserve that
    /// order.
    fn recv_event(&self, event: PushEvent);
}

/// Trait-object [PushHandler].
pub type DynPushHandler = Arc<dyn PushHandler>;

/// A bidirectional push connection to the remote service.
#[cfg_attr(any(test, feature = "mockall"), mockall::automock)]
pub trait PushChannel: 'static + Send + Sync + std::fmt::Debug {
    /// Register the handler for incoming events.
    ///
    /// A channel has a single multiplexed event stream, registering a new
    /// handler replaces the previous one.
    fn register_handler(&self, handler: DynPushHandler);

    /// Send a message to the remote service. This is fire-and-forget,
    /// the future resolves once the message is handed to the connection.
    fn send(&self, message: PushMessage) -> BoxFut<'_, GfResult<()>>;
}

/// Trait-object [PushChannel].
pub type DynPushChannel = Arc<dyn PushChannel>;
