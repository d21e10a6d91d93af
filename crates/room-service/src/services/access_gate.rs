//! Per-request membership authentication.
//!
//! The Access Gate runs before every room-scoped operation. It
//! resolves which trust mode applies (secure record checked first,
//! legacy as fallback), pulls the token from the mode-appropriate
//! cookie, and fails closed with an authentication error on any
//! missing piece. The outcome is binary: either a full [`RoomAccess`]
//! or an error, never a partial authentication.

use crate::cookies::{secure_token_cookie, CookieMap, ROOM_TOKEN_COOKIE};
use crate::errors::RoomError;
use crate::models::RoomRecord;
use crate::store::{keys, RoomStore};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Authenticated room context exposed to room-scoped operations.
#[derive(Debug, Clone)]
pub struct RoomAccess {
    pub room_id: String,
    /// The caller's bearer token, verified to be a current member.
    pub token: String,
    pub connected: Vec<String>,
    pub is_secure: bool,
    /// The room's metadata key in the store.
    pub meta_key: String,
}

/// Resolves request credentials into a verified room membership.
pub struct AccessGate {
    store: Arc<dyn RoomStore>,
}

impl AccessGate {
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        AccessGate { store }
    }

    /// Authenticate a request against a room.
    ///
    /// Fails closed with `Unauthorized` if the room id is missing, the
    /// room record is missing, the token cookie is missing, or the
    /// token is not a current member.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn authorize(
        &self,
        room_id: &str,
        cookies: &CookieMap,
    ) -> Result<RoomAccess, RoomError> {
        if room_id.trim().is_empty() {
            return Err(RoomError::Unauthorized("missing room id".to_string()));
        }

        // Secure record takes precedence over a legacy record with the
        // same id.
        let secure_key = keys::secure_room_meta(room_id);
        let secure_fields = self.store.hash_get_all(&secure_key).await?;

        let (meta_key, is_secure, fields) = if !secure_fields.is_empty() {
            (secure_key, true, secure_fields)
        } else {
            let legacy_key = keys::room_meta(room_id);
            let legacy_fields = self.store.hash_get_all(&legacy_key).await?;
            if legacy_fields.is_empty() {
                return Err(RoomError::Unauthorized("unknown room".to_string()));
            }
            (legacy_key, false, legacy_fields)
        };

        let cookie_name = if is_secure {
            secure_token_cookie(room_id)
        } else {
            ROOM_TOKEN_COOKIE.to_string()
        };
        let token = cookies
            .get(&cookie_name)
            .ok_or_else(|| RoomError::Unauthorized("missing room token".to_string()))?;

        let record = RoomRecord::from_fields(&fields)?;
        if !record.is_member(token) {
            warn!(
                target: "room.gate",
                room_id = %room_id,
                is_secure = is_secure,
                "Presented token is not a connected member"
            );
            return Err(RoomError::Unauthorized(
                "token is not a member of this room".to_string(),
            ));
        }

        Ok(RoomAccess {
            room_id: room_id.to_string(),
            token: token.to_string(),
            connected: record.connected,
            is_secure,
            meta_key,
        })
    }
}
