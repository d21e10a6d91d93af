//! Key-value store interface.
//!
//! The room service consumes a shared remote key-value store with
//! hash, list, sorted-set, expiry, and publish primitives. The
//! [`RoomStore`] trait is that consumed interface; production uses
//! [`RedisRoomStore`], tests use an in-memory implementation from the
//! `room-test-utils` crate. Every component takes the store handle as
//! an explicit constructor dependency.

pub mod keys;
mod redis;

pub use self::redis::RedisRoomStore;

use crate::errors::RoomError;
use async_trait::async_trait;
use std::collections::HashMap;

/// TTL sentinel: key exists but has no expiry.
pub const TTL_NONE: i64 = -1;

/// TTL sentinel: key does not exist.
pub const TTL_MISSING: i64 = -2;

/// Consumed key-value/broadcast interface.
///
/// Per-call operations are atomic at the store level; multi-step
/// read-modify-write sequences built on top of them are not.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, RoomError>;

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), RoomError>;

    async fn exists(&self, key: &str) -> Result<bool, RoomError>;

    /// Delete keys. Deleting absent keys is a no-op.
    async fn delete(&self, keys: &[String]) -> Result<(), RoomError>;

    /// Set a key's expiry in seconds.
    async fn expire(&self, key: &str, seconds: i64) -> Result<(), RoomError>;

    /// Remove a key's expiry.
    async fn persist(&self, key: &str) -> Result<(), RoomError>;

    /// Remaining TTL in seconds, [`TTL_NONE`] or [`TTL_MISSING`].
    async fn ttl(&self, key: &str) -> Result<i64, RoomError>;

    /// Append to the tail of a list.
    async fn list_push(&self, key: &str, value: &str) -> Result<(), RoomError>;

    /// Trim a list to the inclusive index range.
    async fn list_trim(&self, key: &str, start: isize, stop: isize) -> Result<(), RoomError>;

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, RoomError>;

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), RoomError>;

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<(), RoomError>;

    async fn sorted_set_score(&self, key: &str, member: &str) -> Result<Option<f64>, RoomError>;

    /// Publish a payload to all current subscribers of a channel.
    /// Delivery is at-least-once; ordering is same-publisher FIFO only.
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), RoomError>;
}
