//! Lifecycle tests for legacy rooms: creation, admission, exit,
//! destruction, panic, and timer extension over the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use room_service::cookies::{verified_cookie, CookieMap, SetCookie};
use room_service::errors::RoomError;
use room_service::models::{
    AppendMessageRequest, CreateRoomRequest, ExtendTimerRequest, RoomRecord, VerifyRoomRequest,
};
use room_service::services::{AccessGate, EntryDecision, EntryGateway, RoomAccess, RoomAuthority};
use room_service::store::{keys, RoomStore, TTL_NONE};
use room_test_utils::MemoryRoomStore;
use std::sync::Arc;

struct Harness {
    store: Arc<MemoryRoomStore>,
    authority: RoomAuthority,
    gateway: EntryGateway,
    gate: AccessGate,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryRoomStore::new());
    let dyn_store: Arc<dyn RoomStore> = store.clone();
    Harness {
        store,
        authority: RoomAuthority::new(Arc::clone(&dyn_store), 3600, false),
        gateway: EntryGateway::new(Arc::clone(&dyn_store), false),
        gate: AccessGate::new(dyn_store),
    }
}

fn plain_room(ttl_minutes: i64, max_participants: u32) -> CreateRoomRequest {
    CreateRoomRequest {
        ttl_minutes,
        max_participants,
        password: None,
        panic_password: None,
        security_question: None,
        security_answer: None,
    }
}

fn cookie_value(cookies: &[SetCookie], name: &str) -> Option<String> {
    cookies
        .iter()
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

/// Admit a guest and return their token.
async fn join_as_guest(h: &Harness, room_id: &str, guest_id: &str) -> (String, bool) {
    let cookies = CookieMap::from_pairs([("guest_id", guest_id)]);
    let outcome = h.gateway.enter(room_id, &cookies).await.unwrap();
    match outcome.decision {
        EntryDecision::Admitted { token, creator } => (token, creator),
        other => panic!("expected admission, got {other:?}"),
    }
}

async fn access_for(h: &Harness, room_id: &str, token: &str) -> RoomAccess {
    let cookies = CookieMap::from_pairs([("room_token", token)]);
    h.gate.authorize(room_id, &cookies).await.unwrap()
}

async fn load_record(h: &Harness, room_id: &str) -> RoomRecord {
    let fields = h.store.hash_get_all(&keys::room_meta(room_id)).await.unwrap();
    RoomRecord::from_fields(&fields).unwrap()
}

#[tokio::test]
async fn test_create_with_ttl_sets_expiry() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 2)).await.unwrap();

    assert_eq!(created.expires_in, Some(3600));
    let ttl = h.store.ttl(&keys::room_meta(&created.room_id)).await.unwrap();
    assert_eq!(ttl, 3600);
    assert_eq!(h.authority.ttl(&created.room_id).await.unwrap().ttl, 3600);
}

#[tokio::test]
async fn test_create_permanent_room_is_indexed_not_expired() {
    let h = harness();
    let created = h.authority.create(plain_room(0, 2)).await.unwrap();

    assert_eq!(created.expires_in, None);
    assert_eq!(h.authority.ttl(&created.room_id).await.unwrap().ttl, TTL_NONE);
    let score = h
        .store
        .sorted_set_score(keys::PERMANENT_ROOMS, &created.room_id)
        .await
        .unwrap();
    assert!(score.is_some());
}

#[tokio::test]
async fn test_ttl_for_unknown_room_is_not_found() {
    let h = harness();
    let result = h.authority.ttl("nope").await;
    assert!(matches!(result, Err(RoomError::NotFound(_))));
}

#[tokio::test]
async fn test_first_joiner_becomes_creator_and_stays_creator() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 3)).await.unwrap();

    let (token_a, creator_a) = join_as_guest(&h, &created.room_id, "a").await;
    let (_token_b, creator_b) = join_as_guest(&h, &created.room_id, "b").await;

    assert!(creator_a);
    assert!(!creator_b);

    let record = load_record(&h, &created.room_id).await;
    assert_eq!(record.creator_token.as_deref(), Some(token_a.as_str()));
    assert!(record.membership_invariant_holds());
}

#[tokio::test]
async fn test_returning_guest_keeps_token() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 2)).await.unwrap();

    let (token_first, _) = join_as_guest(&h, &created.room_id, "a").await;
    let (token_second, creator) = join_as_guest(&h, &created.room_id, "a").await;

    assert_eq!(token_first, token_second);
    assert!(creator);
    let record = load_record(&h, &created.room_id).await;
    assert_eq!(record.connected.len(), 1);
}

#[tokio::test]
async fn test_room_full_rejects_new_guest() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 2)).await.unwrap();

    join_as_guest(&h, &created.room_id, "a").await;
    join_as_guest(&h, &created.room_id, "b").await;

    let cookies = CookieMap::from_pairs([("guest_id", "c")]);
    let outcome = h.gateway.enter(&created.room_id, &cookies).await.unwrap();
    assert_eq!(outcome.decision, EntryDecision::RoomFull);
}

#[tokio::test]
async fn test_enter_unknown_room_is_not_found() {
    let h = harness();
    let cookies = CookieMap::from_pairs([("guest_id", "a")]);
    let result = h.gateway.enter("nope", &cookies).await;
    assert!(matches!(result, Err(RoomError::NotFound(_))));
}

#[tokio::test]
async fn test_enter_mints_guest_identity_when_absent() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 2)).await.unwrap();

    let outcome = h
        .gateway
        .enter(&created.room_id, &CookieMap::default())
        .await
        .unwrap();

    assert!(matches!(outcome.decision, EntryDecision::Admitted { .. }));
    assert!(cookie_value(&outcome.cookies, "guest_id").is_some());
    assert!(cookie_value(&outcome.cookies, "room_token").is_some());
}

#[tokio::test]
async fn test_exit_revokes_identity_permanently() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 3)).await.unwrap();

    join_as_guest(&h, &created.room_id, "a").await;
    let (token_b, _) = join_as_guest(&h, &created.room_id, "b").await;

    let access = access_for(&h, &created.room_id, &token_b).await;
    let (ack, cookies) = h.authority.exit(&access).await.unwrap();
    assert!(ack.ok);
    assert!(cookie_value(&cookies, "room_token").is_some());

    // Old token no longer authenticates
    let denied = h
        .gate
        .authorize(
            &created.room_id,
            &CookieMap::from_pairs([("room_token", token_b.as_str())]),
        )
        .await;
    assert!(matches!(denied, Err(RoomError::Unauthorized(_))));

    // The identity can never rejoin, even though the room has space
    let cookies = CookieMap::from_pairs([("guest_id", "b")]);
    let outcome = h.gateway.enter(&created.room_id, &cookies).await.unwrap();
    assert_eq!(outcome.decision, EntryDecision::AccessDenied);

    let record = load_record(&h, &created.room_id).await;
    assert!(record.membership_invariant_holds());
}

#[tokio::test]
async fn test_creator_cannot_exit() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 2)).await.unwrap();
    let (token, _) = join_as_guest(&h, &created.room_id, "a").await;

    let access = access_for(&h, &created.room_id, &token).await;
    let result = h.authority.exit(&access).await;
    assert!(matches!(result, Err(RoomError::Forbidden(_))));
}

#[tokio::test]
async fn test_destroy_requires_creator() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 3)).await.unwrap();
    join_as_guest(&h, &created.room_id, "a").await;
    let (token_b, _) = join_as_guest(&h, &created.room_id, "b").await;

    let access = access_for(&h, &created.room_id, &token_b).await;
    let result = h.authority.destroy(&access, None).await;
    assert!(matches!(result, Err(RoomError::Forbidden(_))));
}

#[tokio::test]
async fn test_destroy_removes_entire_footprint() {
    let h = harness();
    let created = h.authority.create(plain_room(0, 2)).await.unwrap();
    let (token, _) = join_as_guest(&h, &created.room_id, "a").await;
    let access = access_for(&h, &created.room_id, &token).await;

    h.authority
        .append_message(
            &access,
            AppendMessageRequest {
                content: "hello".to_string(),
                encrypted: false,
            },
        )
        .await
        .unwrap();

    h.authority.destroy(&access, None).await.unwrap();

    assert!(matches!(
        h.authority.info(&created.room_id).await,
        Err(RoomError::NotFound(_))
    ));
    assert!(matches!(
        h.authority.ttl(&created.room_id).await,
        Err(RoomError::NotFound(_))
    ));
    let score = h
        .store
        .sorted_set_score(keys::PERMANENT_ROOMS, &created.room_id)
        .await
        .unwrap();
    assert!(score.is_none());

    let events = h
        .store
        .published_events(&keys::broadcast_channel(&created.room_id));
    assert!(events.contains(&"chat.destroy".to_string()));
    assert!(!events.contains(&"chat.self_destruct".to_string()));
}

#[tokio::test]
async fn test_panic_with_wrong_code_is_forbidden() {
    let h = harness();
    let mut req = plain_room(60, 2);
    req.password = Some("pw".to_string());
    req.panic_password = Some("boom".to_string());
    let created = h.authority.create(req).await.unwrap();

    let cookies = CookieMap::from_pairs([
        ("guest_id".to_string(), "a".to_string()),
        (verified_cookie(&created.room_id), "1".to_string()),
    ]);
    let outcome = h.gateway.enter(&created.room_id, &cookies).await.unwrap();
    let EntryDecision::Admitted { token, .. } = outcome.decision else {
        panic!("expected admission");
    };
    let access = access_for(&h, &created.room_id, &token).await;

    let result = h.authority.panic(&access, "wrong").await;
    assert!(matches!(result, Err(RoomError::Forbidden(_))));
    assert!(h.authority.info(&created.room_id).await.is_ok());
}

#[tokio::test]
async fn test_panic_destroys_silently() {
    let h = harness();
    let mut req = plain_room(60, 2);
    req.password = Some("pw".to_string());
    req.panic_password = Some("boom".to_string());
    let created = h.authority.create(req).await.unwrap();

    let cookies = CookieMap::from_pairs([
        ("guest_id".to_string(), "a".to_string()),
        (verified_cookie(&created.room_id), "1".to_string()),
    ]);
    let outcome = h.gateway.enter(&created.room_id, &cookies).await.unwrap();
    let EntryDecision::Admitted { token, .. } = outcome.decision else {
        panic!("expected admission");
    };
    let access = access_for(&h, &created.room_id, &token).await;

    h.authority.panic(&access, "boom").await.unwrap();

    assert!(matches!(
        h.authority.info(&created.room_id).await,
        Err(RoomError::NotFound(_))
    ));
    let events = h
        .store
        .published_events(&keys::broadcast_channel(&created.room_id));
    assert_eq!(events, vec!["chat.panic"]);
}

#[tokio::test]
async fn test_verify_password_and_normalized_answer() {
    let h = harness();
    let mut req = plain_room(60, 2);
    req.password = Some("pw".to_string());
    req.security_question = Some("color?".to_string());
    req.security_answer = Some("blue".to_string());
    let created = h.authority.create(req).await.unwrap();

    let (ok, cookies) = h
        .authority
        .verify(
            &created.room_id,
            VerifyRoomRequest {
                password: Some("pw".to_string()),
                security_answer: None,
            },
        )
        .await
        .unwrap();
    assert!(ok.verified);
    assert!(cookie_value(&cookies, &verified_cookie(&created.room_id)).is_some());

    // Answers are compared case/whitespace-normalized
    let (ok, _) = h
        .authority
        .verify(
            &created.room_id,
            VerifyRoomRequest {
                password: None,
                security_answer: Some("  BLUE ".to_string()),
            },
        )
        .await
        .unwrap();
    assert!(ok.verified);

    let (bad, cookies) = h
        .authority
        .verify(
            &created.room_id,
            VerifyRoomRequest {
                password: Some("nope".to_string()),
                security_answer: None,
            },
        )
        .await
        .unwrap();
    assert!(!bad.verified);
    assert!(cookies.is_empty());
}

#[tokio::test]
async fn test_credentialed_room_requires_verification_before_entry() {
    let h = harness();
    let mut req = plain_room(60, 2);
    req.password = Some("pw".to_string());
    let created = h.authority.create(req).await.unwrap();

    let outcome = h
        .gateway
        .enter(
            &created.room_id,
            &CookieMap::from_pairs([("guest_id", "a")]),
        )
        .await
        .unwrap();
    assert_eq!(outcome.decision, EntryDecision::VerificationRequired);
}

#[tokio::test]
async fn test_extend_timer_adds_to_remaining() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 2)).await.unwrap();
    let (token, _) = join_as_guest(&h, &created.room_id, "a").await;
    let access = access_for(&h, &created.room_id, &token).await;

    let extended = h
        .authority
        .extend_timer(&access, ExtendTimerRequest { minutes: 30 })
        .await
        .unwrap();

    assert_eq!(extended.expires_in, 3600 + 1800);
    let ttl = h.store.ttl(&keys::room_meta(&created.room_id)).await.unwrap();
    assert_eq!(ttl, 5400);

    let events = h
        .store
        .published_events(&keys::broadcast_channel(&created.room_id));
    assert!(events.contains(&"chat.timer-extended".to_string()));
}

#[tokio::test]
async fn test_extend_timer_rejected_for_permanent_rooms() {
    let h = harness();
    let created = h.authority.create(plain_room(0, 2)).await.unwrap();
    let (token, _) = join_as_guest(&h, &created.room_id, "a").await;
    let access = access_for(&h, &created.room_id, &token).await;

    let result = h
        .authority
        .extend_timer(&access, ExtendTimerRequest { minutes: 30 })
        .await;
    assert!(matches!(result, Err(RoomError::Conflict(_))));
}

#[tokio::test]
async fn test_extend_timer_requires_creator() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 3)).await.unwrap();
    join_as_guest(&h, &created.room_id, "a").await;
    let (token_b, _) = join_as_guest(&h, &created.room_id, "b").await;
    let access = access_for(&h, &created.room_id, &token_b).await;

    let result = h
        .authority
        .extend_timer(&access, ExtendTimerRequest { minutes: 30 })
        .await;
    assert!(matches!(result, Err(RoomError::Forbidden(_))));
}

#[tokio::test]
async fn test_append_message_aligns_dependent_ttls() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 2)).await.unwrap();
    let (token, _) = join_as_guest(&h, &created.room_id, "a").await;
    let access = access_for(&h, &created.room_id, &token).await;

    h.authority
        .append_message(
            &access,
            AppendMessageRequest {
                content: "hello".to_string(),
                encrypted: false,
            },
        )
        .await
        .unwrap();

    let meta_ttl = h.store.ttl(&keys::room_meta(&created.room_id)).await.unwrap();
    let msg_ttl = h
        .store
        .ttl(&keys::room_messages(&created.room_id))
        .await
        .unwrap();
    let hist_ttl = h
        .store
        .ttl(&keys::room_history(&created.room_id))
        .await
        .unwrap();
    assert_eq!(msg_ttl, meta_ttl);
    assert_eq!(hist_ttl, meta_ttl);

    assert_eq!(h.store.list(&keys::room_messages(&created.room_id)).len(), 1);
    let events = h
        .store
        .published_events(&keys::broadcast_channel(&created.room_id));
    assert_eq!(events, vec!["chat.message"]);
}

#[tokio::test]
async fn test_append_message_keeps_permanent_room_lists_alive() {
    let h = harness();
    let created = h.authority.create(plain_room(0, 2)).await.unwrap();
    let (token, _) = join_as_guest(&h, &created.room_id, "a").await;
    let access = access_for(&h, &created.room_id, &token).await;

    h.authority
        .append_message(
            &access,
            AppendMessageRequest {
                content: "hello".to_string(),
                encrypted: false,
            },
        )
        .await
        .unwrap();

    let msg_ttl = h
        .store
        .ttl(&keys::room_messages(&created.room_id))
        .await
        .unwrap();
    assert_eq!(msg_ttl, TTL_NONE);
}

#[tokio::test]
async fn test_destroy_request_relay_and_denial() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 3)).await.unwrap();
    let (token_a, _) = join_as_guest(&h, &created.room_id, "a").await;
    let (token_b, _) = join_as_guest(&h, &created.room_id, "b").await;

    let access_b = access_for(&h, &created.room_id, &token_b).await;
    h.authority
        .request_destroy(&access_b, Some("please".to_string()))
        .await
        .unwrap();

    // Non-creator cannot deny
    let result = h.authority.deny_destroy(&access_b).await;
    assert!(matches!(result, Err(RoomError::Forbidden(_))));

    let access_a = access_for(&h, &created.room_id, &token_a).await;
    h.authority.deny_destroy(&access_a).await.unwrap();

    let events = h
        .store
        .published_events(&keys::broadcast_channel(&created.room_id));
    assert_eq!(events, vec!["chat.destroy-request", "chat.destroy-denied"]);

    // The relay is stateless: the room record is untouched
    let record = load_record(&h, &created.room_id).await;
    assert!(record.membership_invariant_holds());
    assert_eq!(record.connected.len(), 2);
}

#[tokio::test]
async fn test_role_reporting() {
    let h = harness();
    let created = h.authority.create(plain_room(60, 3)).await.unwrap();
    let (token_a, _) = join_as_guest(&h, &created.room_id, "a").await;
    let (token_b, _) = join_as_guest(&h, &created.room_id, "b").await;

    let access_a = access_for(&h, &created.room_id, &token_a).await;
    let access_b = access_for(&h, &created.room_id, &token_b).await;

    assert_eq!(h.authority.role(&access_a).await.unwrap().role, "creator");
    assert_eq!(
        h.authority.role(&access_b).await.unwrap().role,
        "participant"
    );
}
