//! Cryptographic primitives for tokens and knowledge proofs.
//!
//! The secure-room protocol runs client-side: the client derives
//! `room_key = PBKDF2-SHA256(answer, salt, iterations, 256 bits)` and
//! submits `proof = SHA256(room_key || PROOF_DOMAIN_TAG)`. The server
//! only ever stores and compares the proof, so it can verify
//! membership eligibility without being able to recover the answer or
//! the key.

use crate::errors::RoomError;
use ring::constant_time;
use ring::digest::{digest, SHA256};
use ring::rand::{SecureRandom, SystemRandom};

/// Domain separation tag appended to the room key before hashing.
/// Part of the wire protocol; clients must use the same tag.
pub const PROOF_DOMAIN_TAG: &[u8] = b"room-gatekeeper-v1";

/// Generate an opaque bearer token (32 random bytes, hex encoded).
///
/// Tokens are scoped to one room and carry no semantic meaning; they
/// are not cryptographically derived from anything.
pub fn generate_token() -> Result<String, RoomError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes).map_err(|_| {
        tracing::error!(target: "room.crypto", "Failed to generate random bytes");
        RoomError::Internal
    })?;
    Ok(hex::encode(bytes))
}

/// Generate a new room identifier.
pub fn generate_room_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a new guest identity id.
pub fn generate_guest_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Compute `SHA256(room_key || PROOF_DOMAIN_TAG)`.
///
/// This mirrors the client side of the gatekeeper protocol and exists
/// so tests and tooling can derive proofs; the server itself only
/// compares.
pub fn proof_from_room_key(room_key: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(room_key.len() + PROOF_DOMAIN_TAG.len());
    input.extend_from_slice(room_key);
    input.extend_from_slice(PROOF_DOMAIN_TAG);
    digest(&SHA256, &input).as_ref().to_vec()
}

/// Constant-time equality for proof/verifier comparison.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    constant_time::verify_slices_are_equal(a, b).is_ok()
}
