//! The Room Authority: creation, verification, membership lifecycle,
//! and irreversible destruction of rooms.
//!
//! This is the aggregate over the store, the TTL synchronizer, and the
//! lifecycle broadcaster. It owns every destructive operation; nothing
//! else in the service deletes room keys.

use crate::cookies::{secure_token_cookie, verified_cookie, SetCookie, ROOM_TOKEN_COOKIE};
use crate::crypto;
use crate::errors::RoomError;
use crate::models::{
    normalize_answer, AckResponse, AppendMessageRequest, CreateRoomRequest,
    CreateRoomResponse, CreateSecureRoomRequest, ExtendTimerRequest, ExtendTimerResponse,
    RoleResponse, RoomInfoResponse, RoomMode, RoomRecord, TtlResponse, VerifyResponse,
    VerifyRoomRequest,
};
use crate::observability::metrics;
use crate::services::access_gate::RoomAccess;
use crate::services::broadcaster::{LifecycleBroadcaster, RoomEvent};
use crate::store::{keys, RoomStore, TTL_MISSING, TTL_NONE};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Owns room lifecycle operations end to end.
pub struct RoomAuthority {
    store: Arc<dyn RoomStore>,
    broadcaster: LifecycleBroadcaster,
    secure_room_lifetime_seconds: i64,
    production: bool,
}

impl RoomAuthority {
    pub fn new(
        store: Arc<dyn RoomStore>,
        secure_room_lifetime_seconds: i64,
        production: bool,
    ) -> Self {
        let broadcaster = LifecycleBroadcaster::new(Arc::clone(&store));
        RoomAuthority {
            store,
            broadcaster,
            secure_room_lifetime_seconds,
            production,
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a legacy room. `ttl_minutes == 0` makes it permanent,
    /// indexed for later enumeration instead of expiring.
    #[instrument(skip_all)]
    pub async fn create(&self, req: CreateRoomRequest) -> Result<CreateRoomResponse, RoomError> {
        req.validate()?;

        let room_id = crypto::generate_room_id();
        let now = chrono::Utc::now().timestamp();
        let record = RoomRecord::new_legacy(
            now,
            req.max_participants,
            req.password,
            req.panic_password,
            req.security_question,
            req.security_answer,
        );

        let meta_key = keys::room_meta(&room_id);
        self.store.hash_set(&meta_key, &record.to_fields()?).await?;

        let expires_in = if req.ttl_minutes > 0 {
            let seconds = req.ttl_minutes * 60;
            self.store.expire(&meta_key, seconds).await?;
            Some(seconds)
        } else {
            self.store
                .sorted_set_add(keys::PERMANENT_ROOMS, &room_id, now as f64)
                .await?;
            None
        };

        metrics::record_room_created(RoomMode::Legacy.as_str());
        info!(
            target: "room.authority",
            room_id = %room_id,
            permanent = expires_in.is_none(),
            "Created room"
        );

        Ok(CreateRoomResponse {
            room_id,
            expires_in,
        })
    }

    /// Create a secure room. The lifetime is fixed by configuration and
    /// the record stores only verifier material, never the secret.
    #[instrument(skip_all)]
    pub async fn create_secure(
        &self,
        req: CreateSecureRoomRequest,
    ) -> Result<CreateRoomResponse, RoomError> {
        req.validate()?;

        let room_id = crypto::generate_room_id();
        let now = chrono::Utc::now().timestamp();
        let record = RoomRecord::new_secure(
            now,
            req.max_participants,
            req.security_question,
            req.room_salt_hex,
            req.kdf_iterations,
            req.verifier_hex,
        );

        let meta_key = keys::secure_room_meta(&room_id);
        self.store.hash_set(&meta_key, &record.to_fields()?).await?;
        self.store
            .expire(&meta_key, self.secure_room_lifetime_seconds)
            .await?;

        metrics::record_room_created(RoomMode::Secure.as_str());
        info!(target: "room.authority", room_id = %room_id, "Created secure room");

        Ok(CreateRoomResponse {
            room_id,
            expires_in: Some(self.secure_room_lifetime_seconds),
        })
    }

    // ========================================================================
    // Read-only
    // ========================================================================

    /// Public room metadata. Secure rooms disclose their derivation
    /// parameters so a joiner can compute the proof client-side.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn info(&self, room_id: &str) -> Result<RoomInfoResponse, RoomError> {
        let record = self.load_either(room_id).await?;

        let requires_verification = match record.mode {
            RoomMode::Legacy => record.requires_verification(),
            RoomMode::Secure => true,
        };

        Ok(RoomInfoResponse {
            mode: record.mode,
            max_participants: record.max_participants,
            connected_count: record.connected.len(),
            requires_verification,
            security_question: record.security_question,
            room_salt_hex: record.room_salt_hex,
            kdf_iterations: record.kdf_iterations,
        })
    }

    /// Remaining room lifetime in seconds; -1 for permanent rooms.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn ttl(&self, room_id: &str) -> Result<TtlResponse, RoomError> {
        let secure_ttl = self.store.ttl(&keys::secure_room_meta(room_id)).await?;
        if secure_ttl != TTL_MISSING {
            return Ok(TtlResponse { ttl: secure_ttl });
        }
        let legacy_ttl = self.store.ttl(&keys::room_meta(room_id)).await?;
        if legacy_ttl == TTL_MISSING {
            return Err(RoomError::NotFound("room not found".to_string()));
        }
        Ok(TtlResponse { ttl: legacy_ttl })
    }

    // ========================================================================
    // Legacy verification
    // ========================================================================

    /// Check a password or security answer against a legacy room.
    ///
    /// Side-effect-free on room state. A successful check issues the
    /// verification marker cookie that the entry gateway requires.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn verify(
        &self,
        room_id: &str,
        req: VerifyRoomRequest,
    ) -> Result<(VerifyResponse, Vec<SetCookie>), RoomError> {
        if self
            .store
            .exists(&keys::secure_room_meta(room_id))
            .await?
        {
            return Err(RoomError::Conflict(
                "secure rooms use proof verification".to_string(),
            ));
        }

        let fields = self.store.hash_get_all(&keys::room_meta(room_id)).await?;
        if fields.is_empty() {
            return Err(RoomError::NotFound("room not found".to_string()));
        }
        let record = RoomRecord::from_fields(&fields)?;

        let password_ok = match (&req.password, &record.password) {
            (Some(given), Some(stored)) => {
                crypto::constant_time_eq(given.as_bytes(), stored.as_bytes())
            }
            _ => false,
        };
        let answer_ok = match (&req.security_answer, &record.security_answer) {
            (Some(given), Some(stored)) => normalize_answer(given) == normalize_answer(stored),
            _ => false,
        };

        let verified = password_ok || answer_ok;
        if !verified {
            warn!(target: "room.authority", room_id = %room_id, "Verification failed");
            return Ok((VerifyResponse { verified: false }, Vec::new()));
        }

        let cookie = SetCookie::new(verified_cookie(room_id), "1", self.production);
        Ok((VerifyResponse { verified: true }, vec![cookie]))
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// The caller's role within the room.
    #[instrument(skip_all, fields(room_id = %access.room_id))]
    pub async fn role(&self, access: &RoomAccess) -> Result<RoleResponse, RoomError> {
        let record = self.load_at(&access.meta_key).await?;
        let role = if record.is_creator(&access.token) {
            "creator"
        } else {
            "participant"
        };
        Ok(RoleResponse {
            role: role.to_string(),
        })
    }

    /// Leave a room permanently. The caller's token is removed, their
    /// identity is revoked so they can never rejoin, and their auth
    /// cookies are cleared. Creators cannot exit; they must destroy.
    #[instrument(skip_all, fields(room_id = %access.room_id))]
    pub async fn exit(
        &self,
        access: &RoomAccess,
    ) -> Result<(AckResponse, Vec<SetCookie>), RoomError> {
        let mut record = self.load_at(&access.meta_key).await?;
        if record.is_creator(&access.token) {
            return Err(RoomError::Forbidden(
                "the creator cannot exit; destroy the room instead".to_string(),
            ));
        }

        if let Some(identity) = record.remove_member(&access.token) {
            record.revoke(&identity);
            self.store
                .hash_set(&access.meta_key, &record.membership_fields()?)
                .await?;

            if let Some(session_id) = identity.strip_prefix("session:") {
                self.store
                    .sorted_set_remove(&keys::user_rooms(session_id), &access.room_id)
                    .await?;
            }
        }

        let token_cookie = if access.is_secure {
            secure_token_cookie(&access.room_id)
        } else {
            ROOM_TOKEN_COOKIE.to_string()
        };
        let cookies = vec![
            SetCookie::removal(token_cookie, self.production),
            SetCookie::removal(verified_cookie(&access.room_id), self.production),
        ];

        info!(target: "room.authority", room_id = %access.room_id, "Participant exited");
        Ok((AckResponse { ok: true }, cookies))
    }

    // ========================================================================
    // Destruction
    // ========================================================================

    /// Creator-only irreversible destruction of the room's entire
    /// footprint. Secure rooms get a `self_destruct` signal before the
    /// final `destroy` so clients can play the teardown animation.
    #[instrument(skip_all, fields(room_id = %access.room_id))]
    pub async fn destroy(
        &self,
        access: &RoomAccess,
        reason: Option<String>,
    ) -> Result<AckResponse, RoomError> {
        let record = self.load_at(&access.meta_key).await?;
        if !record.is_creator(&access.token) {
            return Err(RoomError::Forbidden(
                "only the creator can destroy the room".to_string(),
            ));
        }

        self.delete_footprint(&access.room_id, record.mode).await?;

        if record.mode == RoomMode::Secure {
            self.broadcaster
                .broadcast(
                    &access.room_id,
                    record.mode,
                    RoomEvent::SelfDestruct,
                    json!({ "reason": reason }),
                    false,
                )
                .await?;
        }
        self.broadcaster
            .broadcast(
                &access.room_id,
                record.mode,
                RoomEvent::Destroy,
                json!({}),
                false,
            )
            .await?;

        metrics::record_room_destroyed(record.mode.as_str(), "explicit");
        info!(target: "room.authority", room_id = %access.room_id, "Destroyed room");
        Ok(AckResponse { ok: true })
    }

    /// Relay a destruction request to the creator. Stateless by
    /// design: no pending-request record is kept and duplicates are
    /// not deduplicated. The creator approves by calling `destroy` or
    /// denies via `deny_destroy`.
    #[instrument(skip_all, fields(room_id = %access.room_id))]
    pub async fn request_destroy(
        &self,
        access: &RoomAccess,
        reason: Option<String>,
    ) -> Result<AckResponse, RoomError> {
        let mode = self.mode_of(access);
        self.broadcaster
            .broadcast(
                &access.room_id,
                mode,
                RoomEvent::DestroyRequest,
                json!({ "reason": reason }),
                false,
            )
            .await?;
        Ok(AckResponse { ok: true })
    }

    /// Creator-only denial of an outstanding destruction request.
    #[instrument(skip_all, fields(room_id = %access.room_id))]
    pub async fn deny_destroy(&self, access: &RoomAccess) -> Result<AckResponse, RoomError> {
        let record = self.load_at(&access.meta_key).await?;
        if !record.is_creator(&access.token) {
            return Err(RoomError::Forbidden(
                "only the creator can deny a destruction request".to_string(),
            ));
        }
        self.broadcaster
            .broadcast(
                &access.room_id,
                record.mode,
                RoomEvent::DestroyDenied,
                json!({}),
                false,
            )
            .await?;
        Ok(AckResponse { ok: true })
    }

    /// Legacy-only duress mechanism: a matching panic code performs a
    /// silent destroy. Only `panic` is broadcast, never
    /// `self_destruct`, so nothing on screen betrays what happened.
    #[instrument(skip_all, fields(room_id = %access.room_id))]
    pub async fn panic(
        &self,
        access: &RoomAccess,
        panic_password: &str,
    ) -> Result<AckResponse, RoomError> {
        if access.is_secure {
            return Err(RoomError::Conflict(
                "secure rooms have no panic code".to_string(),
            ));
        }

        let record = self.load_at(&access.meta_key).await?;
        let matches = record
            .panic_password
            .as_ref()
            .is_some_and(|stored| {
                crypto::constant_time_eq(stored.as_bytes(), panic_password.as_bytes())
            });
        if !matches {
            warn!(target: "room.authority", room_id = %access.room_id, "Panic code rejected");
            return Err(RoomError::Forbidden("panic code rejected".to_string()));
        }

        self.delete_footprint(&access.room_id, record.mode).await?;
        self.broadcaster
            .broadcast(&access.room_id, record.mode, RoomEvent::Panic, json!({}), false)
            .await?;

        metrics::record_room_destroyed(record.mode.as_str(), "panic");
        info!(target: "room.authority", room_id = %access.room_id, "Panic destroy");
        Ok(AckResponse { ok: true })
    }

    // ========================================================================
    // Timer
    // ========================================================================

    /// Creator-only, legacy-only timer extension. Permanent rooms and
    /// secure rooms (fixed lifetime) are rejected.
    #[instrument(skip_all, fields(room_id = %access.room_id))]
    pub async fn extend_timer(
        &self,
        access: &RoomAccess,
        req: ExtendTimerRequest,
    ) -> Result<ExtendTimerResponse, RoomError> {
        req.validate()?;
        if access.is_secure {
            return Err(RoomError::Conflict(
                "secure rooms have a fixed lifetime".to_string(),
            ));
        }

        let record = self.load_at(&access.meta_key).await?;
        if !record.is_creator(&access.token) {
            return Err(RoomError::Forbidden(
                "only the creator can extend the timer".to_string(),
            ));
        }

        let current = self.store.ttl(&access.meta_key).await?;
        if current == TTL_MISSING {
            return Err(RoomError::NotFound("room not found".to_string()));
        }
        if current == TTL_NONE {
            return Err(RoomError::Conflict(
                "permanent rooms have no timer to extend".to_string(),
            ));
        }

        let expires_in = current.max(0) + req.minutes * 60;
        self.store.expire(&access.meta_key, expires_in).await?;
        self.broadcaster
            .broadcast(
                &access.room_id,
                record.mode,
                RoomEvent::TimerExtended,
                json!({ "expires_in": expires_in }),
                false,
            )
            .await?;

        info!(
            target: "room.authority",
            room_id = %access.room_id,
            expires_in = expires_in,
            "Extended room timer"
        );
        Ok(ExtendTimerResponse { expires_in })
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Append a message to the room's message and history lists, then
    /// broadcast it and re-align dependent-key TTLs, keeping permanent
    /// rooms' lists alive.
    #[instrument(skip_all, fields(room_id = %access.room_id))]
    pub async fn append_message(
        &self,
        access: &RoomAccess,
        req: AppendMessageRequest,
    ) -> Result<AckResponse, RoomError> {
        req.validate()?;

        let mode = self.mode_of(access);
        let entry = json!({
            "content": req.content,
            "encrypted": req.encrypted,
            "ts": chrono::Utc::now().timestamp(),
        })
        .to_string();

        self.store
            .list_push(&keys::room_messages(&access.room_id), &entry)
            .await?;
        self.store
            .list_push(&keys::room_history(&access.room_id), &entry)
            .await?;

        let event = if req.encrypted {
            RoomEvent::Encrypted
        } else {
            RoomEvent::Message
        };
        self.broadcaster
            .broadcast(
                &access.room_id,
                mode,
                event,
                serde_json::from_str(&entry).unwrap_or_default(),
                true,
            )
            .await?;

        metrics::record_message(mode.as_str());
        Ok(AckResponse { ok: true })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn mode_of(&self, access: &RoomAccess) -> RoomMode {
        if access.is_secure {
            RoomMode::Secure
        } else {
            RoomMode::Legacy
        }
    }

    async fn load_at(&self, meta_key: &str) -> Result<RoomRecord, RoomError> {
        let fields = self.store.hash_get_all(meta_key).await?;
        if fields.is_empty() {
            return Err(RoomError::NotFound("room not found".to_string()));
        }
        RoomRecord::from_fields(&fields)
    }

    async fn load_either(&self, room_id: &str) -> Result<RoomRecord, RoomError> {
        let secure = self
            .store
            .hash_get_all(&keys::secure_room_meta(room_id))
            .await?;
        if !secure.is_empty() {
            return RoomRecord::from_fields(&secure);
        }
        let legacy = self.store.hash_get_all(&keys::room_meta(room_id)).await?;
        if legacy.is_empty() {
            return Err(RoomError::NotFound("room not found".to_string()));
        }
        RoomRecord::from_fields(&legacy)
    }

    /// Delete every key associated with the room. Deletes run
    /// concurrently and are idempotent; a partial failure leaves
    /// residue on the TTL synchronizer's short fallback fuse.
    async fn delete_footprint(&self, room_id: &str, mode: RoomMode) -> Result<(), RoomError> {
        let mut doomed = vec![
            keys::room_messages(room_id),
            keys::room_history(room_id),
        ];
        match mode {
            RoomMode::Legacy => doomed.push(keys::room_meta(room_id)),
            RoomMode::Secure => {
                doomed.push(keys::secure_room_meta(room_id));
                doomed.push(keys::secure_signals(room_id));
            }
        }

        let (deleted, unindexed) = tokio::join!(
            self.store.delete(&doomed),
            self.store.sorted_set_remove(keys::PERMANENT_ROOMS, room_id),
        );
        deleted?;
        unindexed?;
        Ok(())
    }
}
