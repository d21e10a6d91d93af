//! Room lifecycle event fan-out.
//!
//! Every room-state change is published to the room's channel for all
//! current subscribers. Secure-room events are additionally appended
//! to a capped replay log so a client that reconnects mid-lifecycle
//! can catch up. Delivery is at-least-once; the only ordering
//! guarantee is same-publisher FIFO.

use crate::errors::RoomError;
use crate::models::RoomMode;
use crate::services::ttl_sync::TtlSynchronizer;
use crate::store::{keys, RoomStore};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Maximum entries retained in the secure replay log.
pub const SIGNAL_LOG_CAP: isize = 100;

/// Events emitted on a room's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    Message,
    Encrypted,
    SelfDestruct,
    Destroy,
    DestroyRequest,
    DestroyDenied,
    TimerExtended,
    Panic,
}

impl RoomEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomEvent::Message => "chat.message",
            RoomEvent::Encrypted => "chat.encrypted",
            RoomEvent::SelfDestruct => "chat.self_destruct",
            RoomEvent::Destroy => "chat.destroy",
            RoomEvent::DestroyRequest => "chat.destroy-request",
            RoomEvent::DestroyDenied => "chat.destroy-denied",
            RoomEvent::TimerExtended => "chat.timer-extended",
            RoomEvent::Panic => "chat.panic",
        }
    }
}

/// Fans out room-state-changed events to subscribers.
pub struct LifecycleBroadcaster {
    store: Arc<dyn RoomStore>,
    ttl_sync: TtlSynchronizer,
}

impl LifecycleBroadcaster {
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        let ttl_sync = TtlSynchronizer::new(Arc::clone(&store));
        LifecycleBroadcaster { store, ttl_sync }
    }

    /// Publish an event to the room channel, append it to the secure
    /// replay log where applicable, and re-align dependent key TTLs.
    ///
    /// `keep_alive` is forwarded to the TTL synchronizer for
    /// operations that need dependent keys to persist (message
    /// appends to permanent rooms).
    #[instrument(skip_all, fields(room_id = %room_id, event = event.as_str()))]
    pub async fn broadcast(
        &self,
        room_id: &str,
        mode: RoomMode,
        event: RoomEvent,
        payload: serde_json::Value,
        keep_alive: bool,
    ) -> Result<(), RoomError> {
        let envelope = json!({
            "event": event.as_str(),
            "room_id": room_id,
            "payload": payload,
            "ts": chrono::Utc::now().timestamp(),
        });
        let serialized = envelope.to_string();

        self.store
            .publish(&keys::broadcast_channel(room_id), &serialized)
            .await?;

        if mode == RoomMode::Secure {
            let log_key = keys::secure_signals(room_id);
            self.store.list_push(&log_key, &serialized).await?;
            self.store.list_trim(&log_key, -SIGNAL_LOG_CAP, -1).await?;
        }

        debug!(
            target: "room.broadcaster",
            room_id = %room_id,
            event = event.as_str(),
            "Broadcast room event"
        );

        self.ttl_sync.sync(room_id, mode, keep_alive).await
    }
}
