//! Client-side proof derivation, mirrored for tests.
//!
//! The gatekeeper protocol runs entirely client-side in production:
//! `room_key = PBKDF2-SHA256(normalized answer, salt, iterations)` and
//! `proof = SHA256(room_key || domain tag)`. These helpers reproduce
//! it so tests can create secure rooms and derive matching (or
//! deliberately mismatching) proofs.

use ring::pbkdf2;
use room_service::crypto::proof_from_room_key;
use room_service::models::normalize_answer;
use std::num::NonZeroU32;

/// Fixed salt for deterministic fixtures.
pub const TEST_SALT_HEX: &str = "00112233445566778899aabbccddeeff";

/// Minimum iteration count the service accepts; keeps tests fast.
pub const TEST_KDF_ITERATIONS: u32 = 10_000;

/// Derive the 32-byte room key from a security answer.
///
/// The answer is normalized (trim, case-fold, whitespace-collapse)
/// before derivation, exactly as clients do.
pub fn derive_room_key(answer: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let normalized = normalize_answer(answer);
    let iterations = NonZeroU32::new(iterations).expect("iterations must be non-zero");
    let mut key = [0u8; 32];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        normalized.as_bytes(),
        &mut key,
    );
    key
}

/// Derive the hex-encoded proof a client would submit for an answer.
pub fn derive_proof_hex(answer: &str, salt_hex: &str, iterations: u32) -> String {
    let salt = hex::decode(salt_hex).expect("salt_hex must be valid hex");
    let key = derive_room_key(answer, &salt, iterations);
    hex::encode(proof_from_room_key(&key))
}

/// Creation parameters for a secure room keyed on `answer`:
/// `(room_salt_hex, kdf_iterations, verifier_hex)`.
pub fn secure_room_params(answer: &str) -> (String, u32, String) {
    let verifier_hex = derive_proof_hex(answer, TEST_SALT_HEX, TEST_KDF_ITERATIONS);
    (TEST_SALT_HEX.to_string(), TEST_KDF_ITERATIONS, verifier_hex)
}
