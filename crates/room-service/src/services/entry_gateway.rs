//! Room-page admission control.
//!
//! Runs once per room-page request, before the Access Gate. Admits
//! new participants, restores returning ones, rejects revoked ones,
//! enforces capacity, and assigns the creator role to the first
//! joiner.
//!
//! The capacity check is best-effort: the read of `connected` and the
//! subsequent membership write are not atomic, so two simultaneous
//! joins can both pass the check and transiently exceed
//! `max_participants`. This is a documented soft-capacity guarantee,
//! not a bug to fix here.

use crate::cookies::{
    secure_token_cookie, verified_cookie, CookieMap, SetCookie, GUEST_ID_COOKIE, ROOM_TOKEN_COOKIE,
    SESSION_ID_COOKIE,
};
use crate::crypto;
use crate::errors::RoomError;
use crate::models::{IdentityKey, RoomRecord};
use crate::store::{keys, RoomStore, TTL_NONE};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Lifetime of a freshly minted guest identity cookie (30 days).
const GUEST_COOKIE_MAX_AGE_SECONDS: i64 = 2_592_000;

/// Admission verdict for a room-page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDecision {
    /// Caller holds (or was just issued) a valid member token.
    Admitted { token: String, creator: bool },
    /// Caller must complete the verification flow first.
    VerificationRequired,
    /// Caller's identity was revoked; no token will ever be issued.
    AccessDenied,
    /// Room is at capacity and the caller has no prior membership.
    RoomFull,
}

/// Admission verdict plus the cookies to set on the response.
#[derive(Debug)]
pub struct EntryOutcome {
    pub decision: EntryDecision,
    pub cookies: Vec<SetCookie>,
}

/// Admission control for room-page requests.
pub struct EntryGateway {
    store: Arc<dyn RoomStore>,
    production: bool,
}

impl EntryGateway {
    pub fn new(store: Arc<dyn RoomStore>, production: bool) -> Self {
        EntryGateway { store, production }
    }

    /// Run the admission sequence for a room-page request.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn enter(
        &self,
        room_id: &str,
        cookies: &CookieMap,
    ) -> Result<EntryOutcome, RoomError> {
        // Secure rooms: pure check. Tokens are only ever minted by the
        // gatekeeper's proof endpoint.
        let secure_fields = self
            .store
            .hash_get_all(&keys::secure_room_meta(room_id))
            .await?;
        if !secure_fields.is_empty() {
            let record = RoomRecord::from_fields(&secure_fields)?;
            let decision = match cookies.get(&secure_token_cookie(room_id)) {
                Some(token) if record.is_member(token) => EntryDecision::Admitted {
                    token: token.to_string(),
                    creator: record.is_creator(token),
                },
                _ => EntryDecision::VerificationRequired,
            };
            return Ok(EntryOutcome {
                decision,
                cookies: Vec::new(),
            });
        }

        let meta_key = keys::room_meta(room_id);
        let fields = self.store.hash_get_all(&meta_key).await?;
        if fields.is_empty() {
            return Err(RoomError::NotFound("room not found".to_string()));
        }
        let mut record = RoomRecord::from_fields(&fields)?;

        // 1. Credentialed rooms require the verification flow first.
        if record.requires_verification() && cookies.get(&verified_cookie(room_id)).is_none() {
            return Ok(EntryOutcome {
                decision: EntryDecision::VerificationRequired,
                cookies: Vec::new(),
            });
        }

        // 2. Resolve the identity key, minting a guest id if needed.
        let mut set_cookies = Vec::new();
        let identity = if let Some(session_id) = cookies.get(SESSION_ID_COOKIE) {
            IdentityKey::session(session_id)
        } else if let Some(guest_id) = cookies.get(GUEST_ID_COOKIE) {
            IdentityKey::guest(guest_id)
        } else {
            let guest_id = crypto::generate_guest_id();
            set_cookies.push(
                SetCookie::new(GUEST_ID_COOKIE, guest_id.clone(), self.production)
                    .with_max_age(GUEST_COOKIE_MAX_AGE_SECONDS),
            );
            IdentityKey::guest(&guest_id)
        };

        // 3. Idempotent reconnection: a previously-admitted identity
        //    keeps its token even when current capacity is exceeded.
        if let Some(token) = record.token_for(&identity) {
            if record.is_member(token) {
                let token = token.clone();
                set_cookies.push(SetCookie::new(
                    ROOM_TOKEN_COOKIE,
                    token.clone(),
                    self.production,
                ));
                debug!(
                    target: "room.entry",
                    room_id = %room_id,
                    "Restored returning participant"
                );
                let creator = record.is_creator(&token);
                return Ok(EntryOutcome {
                    decision: EntryDecision::Admitted { token, creator },
                    cookies: set_cookies,
                });
            }
        }

        // 4. Revocation is permanent.
        if record.is_revoked(&identity) {
            warn!(
                target: "room.entry",
                room_id = %room_id,
                "Revoked identity attempted to rejoin"
            );
            return Ok(EntryOutcome {
                decision: EntryDecision::AccessDenied,
                cookies: Vec::new(),
            });
        }

        // 5. Capacity, with an exception for identities with prior
        //    tracked membership (permanent-room history).
        if record.is_full() {
            let prior_membership = match identity.session_id() {
                Some(session_id) => self
                    .store
                    .sorted_set_score(&keys::user_rooms(session_id), room_id)
                    .await?
                    .is_some(),
                None => false,
            };
            if !prior_membership {
                return Ok(EntryOutcome {
                    decision: EntryDecision::RoomFull,
                    cookies: Vec::new(),
                });
            }
        }

        // 6. New join. The first joiner ever becomes creator.
        let token = crypto::generate_token()?;
        record.admit(&identity, token.clone());
        self.store
            .hash_set(&meta_key, &record.membership_fields()?)
            .await?;

        // Track permanent-room membership for authenticated users so
        // they can re-enter a full room later.
        if let Some(session_id) = identity.session_id() {
            if self.store.ttl(&meta_key).await? == TTL_NONE {
                self.store
                    .sorted_set_add(
                        &keys::user_rooms(session_id),
                        room_id,
                        record.created_at as f64,
                    )
                    .await?;
            }
        }

        set_cookies.push(SetCookie::new(
            ROOM_TOKEN_COOKIE,
            token.clone(),
            self.production,
        ));

        let creator = record.is_creator(&token);
        info!(
            target: "room.entry",
            room_id = %room_id,
            creator = creator,
            connected = record.connected.len(),
            "Admitted participant"
        );

        Ok(EntryOutcome {
            decision: EntryDecision::Admitted { token, creator },
            cookies: set_cookies,
        })
    }
}
