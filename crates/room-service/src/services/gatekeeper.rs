//! Proof verification and admission for secure rooms.
//!
//! Secure rooms never see the shared secret. At creation the client
//! stores `SHA256(PBKDF2(answer) || tag)` as the verifier; to join, a
//! client re-derives the same value and submits it as a proof. The
//! gatekeeper compares proof and verifier in constant time and only
//! mints a room-scoped token on a match.

use crate::cookies::{secure_token_cookie, CookieMap, SetCookie, GUEST_ID_COOKIE, SESSION_ID_COOKIE};
use crate::crypto;
use crate::errors::RoomError;
use crate::models::{IdentityKey, RoomRecord};
use crate::store::{keys, RoomStore};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Successful proof verification: a member token plus the cookies that
/// carry it (and a guest id, when one was minted).
#[derive(Debug)]
pub struct GatekeeperOutcome {
    pub token: String,
    pub creator: bool,
    pub cookies: Vec<SetCookie>,
}

/// Verifies knowledge proofs and admits provers into secure rooms.
pub struct SecureGatekeeper {
    store: Arc<dyn RoomStore>,
    production: bool,
}

impl SecureGatekeeper {
    pub fn new(store: Arc<dyn RoomStore>, production: bool) -> Self {
        SecureGatekeeper { store, production }
    }

    /// Verify a submitted proof against the stored verifier and admit
    /// the prover on a match.
    ///
    /// A wrong proof and a malformed proof both fail, but with
    /// distinct errors: malformed input never reaches the comparison.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn verify_proof(
        &self,
        room_id: &str,
        proof_hex: &str,
        cookies: &CookieMap,
    ) -> Result<GatekeeperOutcome, RoomError> {
        let meta_key = keys::secure_room_meta(room_id);
        let fields = self.store.hash_get_all(&meta_key).await?;
        if fields.is_empty() {
            return Err(RoomError::NotFound("room not found".to_string()));
        }
        let mut record = RoomRecord::from_fields(&fields)?;

        let proof = hex::decode(proof_hex)
            .map_err(|_| RoomError::Validation("proof_hex is not valid hex".to_string()))?;
        if proof.len() != 32 {
            return Err(RoomError::Validation("proof must be 32 bytes".to_string()));
        }

        let verifier_hex = record
            .verifier_hex
            .clone()
            .ok_or_else(|| RoomError::Store("secure room has no verifier".to_string()))?;
        let verifier = hex::decode(&verifier_hex)
            .map_err(|_| RoomError::Store("stored verifier is not valid hex".to_string()))?;

        if !crypto::constant_time_eq(&proof, &verifier) {
            warn!(
                target: "room.gatekeeper",
                room_id = %room_id,
                "Rejected proof for secure room"
            );
            return Err(RoomError::Forbidden("proof rejected".to_string()));
        }

        // Returning member with a still-valid token keeps it.
        if let Some(token) = cookies.get(&secure_token_cookie(room_id)) {
            if record.is_member(token) {
                let creator = record.is_creator(token);
                return Ok(GatekeeperOutcome {
                    token: token.to_string(),
                    creator,
                    cookies: Vec::new(),
                });
            }
        }

        let mut set_cookies = Vec::new();
        let identity = if let Some(session_id) = cookies.get(SESSION_ID_COOKIE) {
            IdentityKey::session(session_id)
        } else if let Some(guest_id) = cookies.get(GUEST_ID_COOKIE) {
            IdentityKey::guest(guest_id)
        } else {
            let guest_id = crypto::generate_guest_id();
            set_cookies.push(SetCookie::new(
                GUEST_ID_COOKIE,
                guest_id.clone(),
                self.production,
            ));
            IdentityKey::guest(&guest_id)
        };

        if let Some(token) = record.token_for(&identity) {
            if record.is_member(token) {
                let token = token.clone();
                let creator = record.is_creator(&token);
                set_cookies.push(SetCookie::new(
                    secure_token_cookie(room_id),
                    token.clone(),
                    self.production,
                ));
                return Ok(GatekeeperOutcome {
                    token,
                    creator,
                    cookies: set_cookies,
                });
            }
        }

        if record.is_revoked(&identity) {
            warn!(
                target: "room.gatekeeper",
                room_id = %room_id,
                "Revoked identity presented a valid proof"
            );
            return Err(RoomError::Forbidden(
                "access to this room was revoked".to_string(),
            ));
        }

        if record.is_full() {
            return Err(RoomError::Conflict("room is full".to_string()));
        }

        let token = crypto::generate_token()?;
        record.admit(&identity, token.clone());
        self.store
            .hash_set(&meta_key, &record.membership_fields()?)
            .await?;

        set_cookies.push(SetCookie::new(
            secure_token_cookie(room_id),
            token.clone(),
            self.production,
        ));

        let creator = record.is_creator(&token);
        info!(
            target: "room.gatekeeper",
            room_id = %room_id,
            creator = creator,
            connected = record.connected.len(),
            "Proof accepted, participant admitted"
        );

        Ok(GatekeeperOutcome {
            token,
            creator,
            cookies: set_cookies,
        })
    }
}
