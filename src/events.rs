//! Typed in-process event bus.
//!
//! The original client signalled across screens with process-wide boolean
//! flags polled on an interval. Here every cross-component signal is a
//! typed event on a broadcast channel: the push dispatcher and the search
//! snapshot refresher subscribe, and emitters never block.

use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events emitted by request handlers after a successful mutation.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A listing was stored.
    PostCreated { post_id: String, user_id: String },
    /// A listing was edited by its owner.
    PostUpdated { post_id: String, user_id: String },
    /// A listing was deleted by its owner.
    PostDeleted { post_id: String, user_id: String },
    /// A connection request was sent.
    ConnectionRequested {
        sender_id: String,
        receiver_id: String,
    },
    /// A pending request was accepted by its receiver.
    ConnectionAccepted {
        accepter_id: String,
        sender_id: String,
    },
    /// An admin approved a dealer sign-up.
    DealerApproved { user_id: String },
    /// An admin rejected a dealer; all their data is gone.
    DealerRejected { user_id: String },
}

/// Cheap-to-clone handle to the broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Emit an event. Lagging or absent subscribers are not an error;
    /// mutations must never fail because nobody is listening.
    pub fn emit(&self, event: AppEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!(event = ?e.0, "Event dropped (no subscribers)");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}
