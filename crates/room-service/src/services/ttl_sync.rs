//! TTL synchronization across room-scoped keys.
//!
//! The room metadata key carries the authoritative expiry. Every key
//! that belongs to the room (messages, history, signaling log) is
//! re-aligned to it after message appends, lifecycle broadcasts, and
//! timer extensions, so no room-scoped key outlives the room or is
//! orphaned shorter than it.

use crate::errors::RoomError;
use crate::models::RoomMode;
use crate::store::{keys, RoomStore, TTL_NONE};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Fallback lifetime for dependent keys of a room whose record is
/// already gone, so post-destroy residue cannot linger.
pub const MISSING_ROOM_FALLBACK_SECONDS: i64 = 120;

/// Fallback lifetime applied to dependent keys of permanent rooms
/// instead of leaving them unexpiring indefinitely.
pub const PERMANENT_ROOM_FALLBACK_SECONDS: i64 = 86_400;

/// Propagates the authoritative room expiry onto dependent keys.
pub struct TtlSynchronizer {
    store: Arc<dyn RoomStore>,
}

impl TtlSynchronizer {
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        TtlSynchronizer { store }
    }

    /// Align every dependent key with the room metadata key's TTL.
    ///
    /// `keep_alive` suppresses the permanent-room fallback for
    /// operations that explicitly need dependent keys to persist
    /// (immediately after a message append).
    #[instrument(skip_all, fields(room_id = %room_id, keep_alive = keep_alive))]
    pub async fn sync(
        &self,
        room_id: &str,
        mode: RoomMode,
        keep_alive: bool,
    ) -> Result<(), RoomError> {
        let meta_key = match mode {
            RoomMode::Legacy => keys::room_meta(room_id),
            RoomMode::Secure => keys::secure_room_meta(room_id),
        };
        let ttl = self.store.ttl(&meta_key).await?;

        let deps = dependent_keys(room_id, mode);
        match ttl {
            t if t > 0 => {
                for key in &deps {
                    self.store.expire(key, t).await?;
                }
                debug!(
                    target: "room.ttl_sync",
                    room_id = %room_id,
                    ttl = t,
                    "Aligned dependent keys with room expiry"
                );
            }
            TTL_NONE => {
                if keep_alive {
                    for key in &deps {
                        self.store.persist(key).await?;
                    }
                } else {
                    for key in &deps {
                        self.store.expire(key, PERMANENT_ROOM_FALLBACK_SECONDS).await?;
                    }
                }
            }
            _ => {
                // Room record is gone; force residue onto a short fuse.
                for key in &deps {
                    self.store.expire(key, MISSING_ROOM_FALLBACK_SECONDS).await?;
                }
                debug!(
                    target: "room.ttl_sync",
                    room_id = %room_id,
                    "Room record missing, expiring dependent keys"
                );
            }
        }

        Ok(())
    }
}

/// Every key that belongs to a room besides its metadata key.
fn dependent_keys(room_id: &str, mode: RoomMode) -> Vec<String> {
    let mut deps = vec![keys::room_messages(room_id), keys::room_history(room_id)];
    if mode == RoomMode::Secure {
        deps.push(keys::secure_signals(room_id));
    }
    deps
}
