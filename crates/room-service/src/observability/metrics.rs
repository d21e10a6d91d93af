//! Metrics definitions for the room service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `room_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `mode`: 2 values (legacy, secure)
//! - `reason`: bounded by code (explicit, panic)
//! - `outcome`: bounded by code (admitted, verification_required,
//!   denied, full)

use metrics::counter;

/// Record a room creation.
///
/// Metric: `room_created_total`
/// Labels: `mode`
pub fn record_room_created(mode: &str) {
    counter!("room_created_total", "mode" => mode.to_string()).increment(1);
}

/// Record a room destruction.
///
/// Metric: `room_destroyed_total`
/// Labels: `mode`, `reason`
pub fn record_room_destroyed(mode: &str, reason: &str) {
    counter!("room_destroyed_total", "mode" => mode.to_string(), "reason" => reason.to_string())
        .increment(1);
}

/// Record an entry-gateway admission outcome.
///
/// Metric: `room_entry_total`
/// Labels: `outcome`
pub fn record_entry(outcome: &str) {
    counter!("room_entry_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a secure-room proof verification result.
///
/// Metric: `room_proof_verifications_total`
/// Labels: `outcome`
pub fn record_proof_verification(outcome: &str) {
    counter!("room_proof_verifications_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a message append.
///
/// Metric: `room_messages_total`
/// Labels: `mode`
pub fn record_message(mode: &str) {
    counter!("room_messages_total", "mode" => mode.to_string()).increment(1);
}
