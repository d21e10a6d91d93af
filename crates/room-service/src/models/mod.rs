//! Data models for the room service.
//!
//! A room is persisted as a field map under a room-scoped key. The
//! membership fields (`connected`, `participants`, `revoked`) are
//! JSON-serialized inside individual hash fields; every mutating
//! operation goes through [`RoomRecord`] helpers so the membership
//! invariant (a token is in `connected` iff it is a participant value)
//! holds after each write.

use crate::errors::RoomError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Minimum participants a room may be configured for.
pub const MIN_PARTICIPANTS: u32 = 2;

/// Maximum participants a room may be configured for.
pub const MAX_PARTICIPANTS: u32 = 10;

/// Maximum room TTL in minutes (one week). 0 means permanent.
pub const MAX_TTL_MINUTES: i64 = 10_080;

/// Maximum timer extension per call, in minutes.
pub const MAX_EXTEND_MINUTES: i64 = 1_440;

/// Maximum message length in characters.
pub const MAX_MESSAGE_CHARS: usize = 8_192;

// ============================================================================
// Room mode
// ============================================================================

/// Trust model of a room.
///
/// Legacy rooms are password/security-question protected and the
/// server can see the plaintext credentials. Secure rooms only ever
/// present the server with a one-way proof derived from a shared
/// secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomMode {
    Legacy,
    Secure,
}

impl RoomMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomMode::Legacy => "legacy",
            RoomMode::Secure => "secure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "legacy" => Some(RoomMode::Legacy),
            "secure" => Some(RoomMode::Secure),
            _ => None,
        }
    }
}

// ============================================================================
// Identity keys
// ============================================================================

/// Stable per-browser/per-account identifier used for revocation.
///
/// Derived from request credentials (session or guest cookie), never
/// from the room token, so revocation survives token rotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Identity for an authenticated user session.
    pub fn session(session_id: &str) -> Self {
        IdentityKey(format!("session:{session_id}"))
    }

    /// Identity for an anonymous guest.
    pub fn guest(guest_id: &str) -> Self {
        IdentityKey(format!("guest:{guest_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_session(&self) -> bool {
        self.0.starts_with("session:")
    }

    /// The session id for authenticated identities, `None` for guests.
    pub fn session_id(&self) -> Option<&str> {
        self.0.strip_prefix("session:")
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Room record
// ============================================================================

/// One room's authoritative state, held as a field map in the store.
#[derive(Debug, Clone)]
pub struct RoomRecord {
    pub mode: RoomMode,
    pub created_at: i64,
    pub max_participants: u32,
    /// Ordered set of currently-valid tokens.
    pub connected: Vec<String>,
    /// Identity key -> token. A returning identity gets the same token.
    pub participants: HashMap<String, String>,
    /// Identity keys permanently barred from rejoining.
    pub revoked: HashSet<String>,
    /// Token of whichever participant joined first. Never overwritten.
    pub creator_token: Option<String>,
    // Legacy-only credentials
    pub password: Option<String>,
    pub panic_password: Option<String>,
    pub security_question: Option<String>,
    pub security_answer: Option<String>,
    // Secure-only verifier material (never the secret)
    pub room_salt_hex: Option<String>,
    pub kdf_iterations: Option<u32>,
    pub verifier_hex: Option<String>,
}

impl RoomRecord {
    /// Build a fresh legacy room record with empty membership.
    pub fn new_legacy(
        created_at: i64,
        max_participants: u32,
        password: Option<String>,
        panic_password: Option<String>,
        security_question: Option<String>,
        security_answer: Option<String>,
    ) -> Self {
        RoomRecord {
            mode: RoomMode::Legacy,
            created_at,
            max_participants,
            connected: Vec::new(),
            participants: HashMap::new(),
            revoked: HashSet::new(),
            creator_token: None,
            password,
            panic_password,
            security_question,
            security_answer,
            room_salt_hex: None,
            kdf_iterations: None,
            verifier_hex: None,
        }
    }

    /// Build a fresh secure room record. Only verifier material is
    /// stored; the shared secret never reaches the server.
    pub fn new_secure(
        created_at: i64,
        max_participants: u32,
        security_question: String,
        room_salt_hex: String,
        kdf_iterations: u32,
        verifier_hex: String,
    ) -> Self {
        RoomRecord {
            mode: RoomMode::Secure,
            created_at,
            max_participants,
            connected: Vec::new(),
            participants: HashMap::new(),
            revoked: HashSet::new(),
            creator_token: None,
            password: None,
            panic_password: None,
            security_question: Some(security_question),
            security_answer: None,
            room_salt_hex: Some(room_salt_hex),
            kdf_iterations: Some(kdf_iterations),
            verifier_hex: Some(verifier_hex),
        }
    }

    /// Parse a record from the stored field map.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, RoomError> {
        let mode = fields
            .get("mode")
            .and_then(|m| RoomMode::parse(m))
            .ok_or_else(|| RoomError::Store("room record has missing or invalid mode".to_string()))?;

        let created_at = fields
            .get("created_at")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let max_participants = fields
            .get("max_participants")
            .and_then(|v| v.parse().ok())
            .unwrap_or(MIN_PARTICIPANTS);

        let connected: Vec<String> = fields
            .get("connected")
            .and_then(|v| serde_json::from_str(v).ok())
            .unwrap_or_default();

        let participants: HashMap<String, String> = fields
            .get("participants")
            .and_then(|v| serde_json::from_str(v).ok())
            .unwrap_or_default();

        let revoked: HashSet<String> = fields
            .get("revoked")
            .and_then(|v| serde_json::from_str(v).ok())
            .unwrap_or_default();

        Ok(RoomRecord {
            mode,
            created_at,
            max_participants,
            connected,
            participants,
            revoked,
            creator_token: fields.get("creator_token").cloned().filter(|v| !v.is_empty()),
            password: fields.get("password").cloned().filter(|v| !v.is_empty()),
            panic_password: fields.get("panic_password").cloned().filter(|v| !v.is_empty()),
            security_question: fields
                .get("security_question")
                .cloned()
                .filter(|v| !v.is_empty()),
            security_answer: fields
                .get("security_answer")
                .cloned()
                .filter(|v| !v.is_empty()),
            room_salt_hex: fields.get("room_salt_hex").cloned().filter(|v| !v.is_empty()),
            kdf_iterations: fields.get("kdf_iterations").and_then(|v| v.parse().ok()),
            verifier_hex: fields.get("verifier_hex").cloned().filter(|v| !v.is_empty()),
        })
    }

    /// Serialize the full record to store fields (used at creation).
    pub fn to_fields(&self) -> Result<Vec<(String, String)>, RoomError> {
        let mut fields = vec![
            ("mode".to_string(), self.mode.as_str().to_string()),
            ("created_at".to_string(), self.created_at.to_string()),
            (
                "max_participants".to_string(),
                self.max_participants.to_string(),
            ),
        ];
        fields.extend(self.membership_fields()?);

        let optional = [
            ("password", &self.password),
            ("panic_password", &self.panic_password),
            ("security_question", &self.security_question),
            ("security_answer", &self.security_answer),
            ("room_salt_hex", &self.room_salt_hex),
            ("verifier_hex", &self.verifier_hex),
        ];
        for (name, value) in optional {
            if let Some(v) = value {
                fields.push((name.to_string(), v.clone()));
            }
        }
        if let Some(iter) = self.kdf_iterations {
            fields.push(("kdf_iterations".to_string(), iter.to_string()));
        }

        Ok(fields)
    }

    /// Serialize only the membership fields (used by join/exit writes).
    pub fn membership_fields(&self) -> Result<Vec<(String, String)>, RoomError> {
        let connected = serde_json::to_string(&self.connected)
            .map_err(|e| RoomError::Store(format!("membership serialization failed: {e}")))?;
        let participants = serde_json::to_string(&self.participants)
            .map_err(|e| RoomError::Store(format!("membership serialization failed: {e}")))?;
        let revoked = serde_json::to_string(&self.revoked)
            .map_err(|e| RoomError::Store(format!("membership serialization failed: {e}")))?;

        let mut fields = vec![
            ("connected".to_string(), connected),
            ("participants".to_string(), participants),
            ("revoked".to_string(), revoked),
        ];
        if let Some(creator) = &self.creator_token {
            fields.push(("creator_token".to_string(), creator.clone()));
        }
        Ok(fields)
    }

    /// Admit an identity with a freshly minted token. Sets the creator
    /// token if this is the first ever admission.
    pub fn admit(&mut self, identity: &IdentityKey, token: String) {
        self.connected.push(token.clone());
        self.participants
            .insert(identity.as_str().to_string(), token.clone());
        if self.creator_token.is_none() {
            self.creator_token = Some(token);
        }
    }

    /// Remove a member by token, returning the identity key that held
    /// it. Idempotent: removing an absent token is a no-op.
    pub fn remove_member(&mut self, token: &str) -> Option<String> {
        self.connected.retain(|t| t != token);
        let identity = self
            .participants
            .iter()
            .find(|(_, t)| t.as_str() == token)
            .map(|(identity, _)| identity.clone());
        if let Some(identity) = &identity {
            self.participants.remove(identity);
        }
        identity
    }

    /// Permanently bar an identity from rejoining this room.
    pub fn revoke(&mut self, identity: &str) {
        self.revoked.insert(identity.to_string());
    }

    pub fn is_member(&self, token: &str) -> bool {
        self.connected.iter().any(|t| t == token)
    }

    pub fn is_revoked(&self, identity: &IdentityKey) -> bool {
        self.revoked.contains(identity.as_str())
    }

    /// The token previously bound to this identity, if any.
    pub fn token_for(&self, identity: &IdentityKey) -> Option<&String> {
        self.participants.get(identity.as_str())
    }

    pub fn is_creator(&self, token: &str) -> bool {
        self.creator_token.as_deref() == Some(token)
    }

    pub fn is_full(&self) -> bool {
        self.connected.len() >= self.max_participants as usize
    }

    /// Legacy rooms with a password or a full question/answer pair
    /// require the verification flow before entry.
    pub fn requires_verification(&self) -> bool {
        self.password.is_some()
            || (self.security_question.is_some() && self.security_answer.is_some())
    }

    /// Membership invariant: token in `connected` iff it is a value of
    /// `participants`.
    pub fn membership_invariant_holds(&self) -> bool {
        let connected: HashSet<&String> = self.connected.iter().collect();
        let participant_tokens: HashSet<&String> = self.participants.values().collect();
        connected == participant_tokens
    }
}

/// Case/whitespace-normalize a security answer for comparison.
pub fn normalize_answer(answer: &str) -> String {
    answer
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Requests
// ============================================================================

/// Body of `POST /v1/rooms`.
#[derive(Clone, Deserialize)]
pub struct CreateRoomRequest {
    /// Room lifetime in minutes. 0 means permanent.
    #[serde(default)]
    pub ttl_minutes: i64,
    pub max_participants: u32,
    pub password: Option<String>,
    pub panic_password: Option<String>,
    pub security_question: Option<String>,
    pub security_answer: Option<String>,
}

/// Credentials are redacted in Debug output.
impl fmt::Debug for CreateRoomRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateRoomRequest")
            .field("ttl_minutes", &self.ttl_minutes)
            .field("max_participants", &self.max_participants)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field(
                "panic_password",
                &self.panic_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("security_question", &self.security_question)
            .field(
                "security_answer",
                &self.security_answer.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl CreateRoomRequest {
    pub fn validate(&self) -> Result<(), RoomError> {
        if self.ttl_minutes < 0 || self.ttl_minutes > MAX_TTL_MINUTES {
            return Err(RoomError::Validation(format!(
                "ttl_minutes must be 0-{MAX_TTL_MINUTES}"
            )));
        }
        if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&self.max_participants) {
            return Err(RoomError::Validation(format!(
                "max_participants must be {MIN_PARTICIPANTS}-{MAX_PARTICIPANTS}"
            )));
        }
        if self.panic_password.is_some() && self.password.is_none() {
            return Err(RoomError::Validation(
                "panic_password requires a password".to_string(),
            ));
        }
        if let (Some(panic), Some(password)) = (&self.panic_password, &self.password) {
            if panic == password {
                return Err(RoomError::Validation(
                    "panic_password must differ from password".to_string(),
                ));
            }
        }
        if self.security_question.is_some() != self.security_answer.is_some() {
            return Err(RoomError::Validation(
                "security_question and security_answer must be provided together".to_string(),
            ));
        }
        Ok(())
    }
}

/// Body of `POST /v1/rooms/secure`. All derivation happens client-side;
/// only verifier material reaches the server.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSecureRoomRequest {
    pub security_question: String,
    pub room_salt_hex: String,
    pub kdf_iterations: u32,
    pub verifier_hex: String,
    #[serde(default = "default_secure_max_participants")]
    pub max_participants: u32,
}

fn default_secure_max_participants() -> u32 {
    MIN_PARTICIPANTS
}

impl CreateSecureRoomRequest {
    pub fn validate(&self) -> Result<(), RoomError> {
        if self.security_question.trim().is_empty() || self.security_question.len() > 256 {
            return Err(RoomError::Validation(
                "security_question must be 1-256 characters".to_string(),
            ));
        }
        if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&self.max_participants) {
            return Err(RoomError::Validation(format!(
                "max_participants must be {MIN_PARTICIPANTS}-{MAX_PARTICIPANTS}"
            )));
        }
        let salt = hex::decode(&self.room_salt_hex)
            .map_err(|_| RoomError::Validation("room_salt_hex is not valid hex".to_string()))?;
        if salt.len() < 16 || salt.len() > 64 {
            return Err(RoomError::Validation(
                "room salt must be 16-64 bytes".to_string(),
            ));
        }
        if !(10_000..=5_000_000).contains(&self.kdf_iterations) {
            return Err(RoomError::Validation(
                "kdf_iterations must be 10000-5000000".to_string(),
            ));
        }
        let verifier = hex::decode(&self.verifier_hex)
            .map_err(|_| RoomError::Validation("verifier_hex is not valid hex".to_string()))?;
        if verifier.len() != 32 {
            return Err(RoomError::Validation(
                "verifier must be 32 bytes".to_string(),
            ));
        }
        Ok(())
    }
}

/// Body of `POST /v1/rooms/{id}/verify` (legacy rooms only).
#[derive(Clone, Deserialize)]
pub struct VerifyRoomRequest {
    pub password: Option<String>,
    pub security_answer: Option<String>,
}

impl fmt::Debug for VerifyRoomRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyRoomRequest")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field(
                "security_answer",
                &self.security_answer.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Body of `POST /v1/rooms/{id}/verify-proof` (secure rooms only).
#[derive(Clone, Deserialize)]
pub struct VerifyProofRequest {
    pub proof_hex: String,
}

impl fmt::Debug for VerifyProofRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyProofRequest")
            .field("proof_hex", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /v1/rooms/{id}/extend-timer`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtendTimerRequest {
    pub minutes: i64,
}

impl ExtendTimerRequest {
    pub fn validate(&self) -> Result<(), RoomError> {
        if !(1..=MAX_EXTEND_MINUTES).contains(&self.minutes) {
            return Err(RoomError::Validation(format!(
                "minutes must be 1-{MAX_EXTEND_MINUTES}"
            )));
        }
        Ok(())
    }
}

/// Body of `POST /v1/rooms/{id}/panic`.
#[derive(Clone, Deserialize)]
pub struct PanicRequest {
    pub panic_password: String,
}

impl fmt::Debug for PanicRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanicRequest")
            .field("panic_password", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /v1/rooms/{id}/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppendMessageRequest {
    pub content: String,
    /// True when the content is a client-encrypted envelope.
    #[serde(default)]
    pub encrypted: bool,
}

impl AppendMessageRequest {
    pub fn validate(&self) -> Result<(), RoomError> {
        if self.content.is_empty() {
            return Err(RoomError::Validation("content must not be empty".to_string()));
        }
        if self.content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(RoomError::Validation(format!(
                "content must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }
        Ok(())
    }
}

/// Body of `POST /v1/rooms/{id}/request-destroy`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestDestroyBody {
    /// Optional note relayed to the creator.
    pub reason: Option<String>,
}

/// Body of `DELETE /v1/rooms/{id}` (optional).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DestroyBody {
    pub reason: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
    /// Seconds until expiry; absent for permanent rooms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomInfoResponse {
    pub mode: RoomMode,
    pub max_participants: u32,
    pub connected_count: usize,
    pub requires_verification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_question: Option<String>,
    // Secure rooms disclose the derivation parameters so a joiner can
    // recompute the proof client-side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_salt_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kdf_iterations: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TtlResponse {
    /// Remaining lifetime in seconds; -1 for permanent rooms.
    pub ttl: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleResponse {
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProofAcceptedResponse {
    pub accepted: bool,
    pub creator: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtendTimerResponse {
    /// New remaining lifetime in seconds.
    pub expires_in: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn fresh_legacy() -> RoomRecord {
        RoomRecord::new_legacy(1_700_000_000, 2, None, None, None, None)
    }

    #[test]
    fn test_record_field_round_trip() {
        let mut record = RoomRecord::new_legacy(
            1_700_000_000,
            5,
            Some("pw".to_string()),
            Some("duress".to_string()),
            Some("color?".to_string()),
            Some("blue".to_string()),
        );
        record.admit(&IdentityKey::guest("g1"), "tok-1".to_string());

        let fields: HashMap<String, String> = record.to_fields().unwrap().into_iter().collect();
        let parsed = RoomRecord::from_fields(&fields).unwrap();

        assert_eq!(parsed.mode, RoomMode::Legacy);
        assert_eq!(parsed.created_at, 1_700_000_000);
        assert_eq!(parsed.max_participants, 5);
        assert_eq!(parsed.connected, vec!["tok-1".to_string()]);
        assert_eq!(parsed.creator_token.as_deref(), Some("tok-1"));
        assert_eq!(parsed.password.as_deref(), Some("pw"));
        assert_eq!(parsed.panic_password.as_deref(), Some("duress"));
        assert!(parsed.membership_invariant_holds());
    }

    #[test]
    fn test_from_fields_rejects_missing_mode() {
        let fields = HashMap::from([("created_at".to_string(), "0".to_string())]);
        let result = RoomRecord::from_fields(&fields);
        assert!(matches!(result, Err(RoomError::Store(_))));
    }

    #[test]
    fn test_admit_maintains_invariant_and_creator() {
        let mut record = fresh_legacy();
        record.admit(&IdentityKey::guest("a"), "tok-a".to_string());
        record.admit(&IdentityKey::guest("b"), "tok-b".to_string());

        assert!(record.membership_invariant_holds());
        // First joiner becomes creator and stays creator
        assert_eq!(record.creator_token.as_deref(), Some("tok-a"));
        assert!(record.is_creator("tok-a"));
        assert!(!record.is_creator("tok-b"));
    }

    #[test]
    fn test_remove_member_returns_identity_and_is_idempotent() {
        let mut record = fresh_legacy();
        let identity = IdentityKey::guest("a");
        record.admit(&identity, "tok-a".to_string());

        let removed = record.remove_member("tok-a");
        assert_eq!(removed.as_deref(), Some("guest:a"));
        assert!(record.membership_invariant_holds());
        assert!(!record.is_member("tok-a"));

        // Second removal is a no-op
        assert!(record.remove_member("tok-a").is_none());
    }

    #[test]
    fn test_revoked_identity_lookup() {
        let mut record = fresh_legacy();
        let identity = IdentityKey::session("u1");
        record.revoke(identity.as_str());
        assert!(record.is_revoked(&identity));
        assert!(!record.is_revoked(&IdentityKey::session("u2")));
    }

    #[test]
    fn test_requires_verification() {
        let mut record = fresh_legacy();
        assert!(!record.requires_verification());

        record.password = Some("pw".to_string());
        assert!(record.requires_verification());

        record.password = None;
        record.security_question = Some("q".to_string());
        // Question without an answer is not a verification gate
        assert!(!record.requires_verification());
        record.security_answer = Some("a".to_string());
        assert!(record.requires_verification());
    }

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  BLUE "), "blue");
        assert_eq!(normalize_answer("The  Blue\tSky"), "the blue sky");
        assert_eq!(normalize_answer("blue"), "blue");
    }

    #[test]
    fn test_identity_key_formats() {
        let session = IdentityKey::session("abc");
        assert_eq!(session.as_str(), "session:abc");
        assert!(session.is_session());
        assert_eq!(session.session_id(), Some("abc"));

        let guest = IdentityKey::guest("xyz");
        assert_eq!(guest.as_str(), "guest:xyz");
        assert!(!guest.is_session());
        assert!(guest.session_id().is_none());
    }

    #[test]
    fn test_create_request_validation() {
        let base = CreateRoomRequest {
            ttl_minutes: 60,
            max_participants: 2,
            password: None,
            panic_password: None,
            security_question: None,
            security_answer: None,
        };
        assert!(base.validate().is_ok());

        let mut bad = base.clone();
        bad.max_participants = 1;
        assert!(matches!(bad.validate(), Err(RoomError::Validation(_))));

        let mut bad = base.clone();
        bad.max_participants = 11;
        assert!(matches!(bad.validate(), Err(RoomError::Validation(_))));

        let mut bad = base.clone();
        bad.ttl_minutes = -1;
        assert!(matches!(bad.validate(), Err(RoomError::Validation(_))));

        // Panic password must differ from the password
        let mut bad = base.clone();
        bad.password = Some("same".to_string());
        bad.panic_password = Some("same".to_string());
        assert!(matches!(bad.validate(), Err(RoomError::Validation(_))));

        // Panic password without a password makes no sense
        let mut bad = base.clone();
        bad.panic_password = Some("duress".to_string());
        assert!(matches!(bad.validate(), Err(RoomError::Validation(_))));

        // Question without an answer
        let mut bad = base;
        bad.security_question = Some("q".to_string());
        assert!(matches!(bad.validate(), Err(RoomError::Validation(_))));
    }

    #[test]
    fn test_create_secure_request_validation() {
        let base = CreateSecureRoomRequest {
            security_question: "color?".to_string(),
            room_salt_hex: "aa".repeat(16),
            kdf_iterations: 100_000,
            verifier_hex: "bb".repeat(32),
            max_participants: 2,
        };
        assert!(base.validate().is_ok());

        let mut bad = base.clone();
        bad.room_salt_hex = "zz".to_string();
        assert!(matches!(bad.validate(), Err(RoomError::Validation(_))));

        let mut bad = base.clone();
        bad.room_salt_hex = "aa".repeat(4);
        assert!(matches!(bad.validate(), Err(RoomError::Validation(_))));

        let mut bad = base.clone();
        bad.kdf_iterations = 100;
        assert!(matches!(bad.validate(), Err(RoomError::Validation(_))));

        let mut bad = base.clone();
        bad.verifier_hex = "bb".repeat(16);
        assert!(matches!(bad.validate(), Err(RoomError::Validation(_))));

        let mut bad = base;
        bad.security_question = "  ".to_string();
        assert!(matches!(bad.validate(), Err(RoomError::Validation(_))));
    }

    #[test]
    fn test_extend_timer_validation() {
        assert!(ExtendTimerRequest { minutes: 1 }.validate().is_ok());
        assert!(ExtendTimerRequest { minutes: MAX_EXTEND_MINUTES }
            .validate()
            .is_ok());
        assert!(ExtendTimerRequest { minutes: 0 }.validate().is_err());
        assert!(ExtendTimerRequest {
            minutes: MAX_EXTEND_MINUTES + 1
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_message_validation() {
        assert!(AppendMessageRequest {
            content: "hi".to_string(),
            encrypted: false
        }
        .validate()
        .is_ok());
        assert!(AppendMessageRequest {
            content: String::new(),
            encrypted: false
        }
        .validate()
        .is_err());
        assert!(AppendMessageRequest {
            content: "x".repeat(MAX_MESSAGE_CHARS + 1),
            encrypted: false
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let req = CreateRoomRequest {
            ttl_minutes: 10,
            max_participants: 2,
            password: Some("hunter2".to_string()),
            panic_password: Some("duress".to_string()),
            security_question: Some("q".to_string()),
            security_answer: Some("a-secret".to_string()),
        };
        let debug = format!("{:?}", req);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("duress"));
        assert!(!debug.contains("a-secret"));
        assert!(debug.contains("[REDACTED]"));

        let proof = VerifyProofRequest {
            proof_hex: "cc".repeat(32),
        };
        assert!(!format!("{:?}", proof).contains("cccc"));
    }
}
