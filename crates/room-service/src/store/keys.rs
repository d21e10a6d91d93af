//! Store key scheme.
//!
//! The key layout is an interop contract: every key that belongs to a
//! room is derived from its room id so destroy and TTL propagation can
//! enumerate them.
//!
//! - `room:{id}` - legacy room metadata (hash)
//! - `secure_room:{id}` - secure room metadata (hash)
//! - `room:{id}:messages` - message list
//! - `room:{id}:history` - history list
//! - `secure_room:{id}:signals` - capped secure signaling/replay log
//! - `permanent_rooms` - permanent room index (sorted set, score = created_at)
//! - `user:{session_id}:rooms` - per-user permanent-room membership (sorted set)
//! - `chat:{id}` - broadcast channel

/// Permanent room index (sorted set keyed by creation time).
pub const PERMANENT_ROOMS: &str = "permanent_rooms";

pub fn room_meta(room_id: &str) -> String {
    format!("room:{room_id}")
}

pub fn secure_room_meta(room_id: &str) -> String {
    format!("secure_room:{room_id}")
}

pub fn room_messages(room_id: &str) -> String {
    format!("room:{room_id}:messages")
}

pub fn room_history(room_id: &str) -> String {
    format!("room:{room_id}:history")
}

pub fn secure_signals(room_id: &str) -> String {
    format!("secure_room:{room_id}:signals")
}

pub fn user_rooms(session_id: &str) -> String {
    format!("user:{session_id}:rooms")
}

pub fn broadcast_channel(room_id: &str) -> String {
    format!("chat:{room_id}")
}
