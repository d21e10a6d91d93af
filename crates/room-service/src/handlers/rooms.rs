//! Handlers for legacy-room creation and for the room-scoped
//! operations shared by both trust modes.

use crate::cookies::CookieMap;
use crate::errors::RoomError;
use crate::handlers::json_with_cookies;
use crate::models::{
    AckResponse, AppendMessageRequest, CreateRoomRequest, CreateRoomResponse, DestroyBody,
    ExtendTimerRequest, ExtendTimerResponse, PanicRequest, RequestDestroyBody, RoleResponse,
    RoomInfoResponse, TtlResponse, VerifyRoomRequest,
};
use crate::observability::metrics;
use crate::routes::AppState;
use crate::services::EntryDecision;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// Body of `GET /v1/rooms/{id}/enter`.
#[derive(Debug, Serialize)]
pub struct EnterResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<bool>,
}

/// POST /v1/rooms
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, RoomError> {
    let response = state.authority.create(payload).await?;
    Ok(Json(response))
}

/// GET /v1/rooms/{id}/info
pub async fn info(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomInfoResponse>, RoomError> {
    let response = state.authority.info(&room_id).await?;
    Ok(Json(response))
}

/// GET /v1/rooms/{id}/ttl
pub async fn ttl(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<TtlResponse>, RoomError> {
    let response = state.authority.ttl(&room_id).await?;
    Ok(Json(response))
}

/// POST /v1/rooms/{id}/verify
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Json(payload): Json<VerifyRoomRequest>,
) -> Result<Response, RoomError> {
    let (response, cookies) = state.authority.verify(&room_id, payload).await?;
    Ok(json_with_cookies(response, &cookies))
}

/// GET /v1/rooms/{id}/enter
pub async fn enter(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, RoomError> {
    let cookies = CookieMap::from_headers(&headers);
    let outcome = state.entry_gateway.enter(&room_id, &cookies).await?;

    match outcome.decision {
        EntryDecision::Admitted { creator, .. } => {
            metrics::record_entry("admitted");
            Ok(json_with_cookies(
                EnterResponse {
                    status: "admitted",
                    creator: Some(creator),
                },
                &outcome.cookies,
            ))
        }
        EntryDecision::VerificationRequired => {
            metrics::record_entry("verification_required");
            Ok(json_with_cookies(
                EnterResponse {
                    status: "verification_required",
                    creator: None,
                },
                &outcome.cookies,
            ))
        }
        EntryDecision::AccessDenied => {
            metrics::record_entry("denied");
            Err(RoomError::Forbidden(
                "access to this room was revoked".to_string(),
            ))
        }
        EntryDecision::RoomFull => {
            metrics::record_entry("full");
            Err(RoomError::Conflict("room is full".to_string()))
        }
    }
}

/// POST /v1/rooms/{id}/messages
pub async fn append_message(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<AppendMessageRequest>,
) -> Result<Json<AckResponse>, RoomError> {
    let cookies = CookieMap::from_headers(&headers);
    let access = state.access_gate.authorize(&room_id, &cookies).await?;
    let response = state.authority.append_message(&access, payload).await?;
    Ok(Json(response))
}

/// POST /v1/rooms/{id}/exit
pub async fn exit(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, RoomError> {
    let cookies = CookieMap::from_headers(&headers);
    let access = state.access_gate.authorize(&room_id, &cookies).await?;
    let (response, cookies) = state.authority.exit(&access).await?;
    Ok(json_with_cookies(response, &cookies))
}

/// GET /v1/rooms/{id}/role
pub async fn role(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<RoleResponse>, RoomError> {
    let cookies = CookieMap::from_headers(&headers);
    let access = state.access_gate.authorize(&room_id, &cookies).await?;
    let response = state.authority.role(&access).await?;
    Ok(Json(response))
}

/// DELETE /v1/rooms/{id}
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    payload: Option<Json<DestroyBody>>,
) -> Result<Json<AckResponse>, RoomError> {
    let cookies = CookieMap::from_headers(&headers);
    let access = state.access_gate.authorize(&room_id, &cookies).await?;
    let reason = payload.and_then(|Json(body)| body.reason);
    let response = state.authority.destroy(&access, reason).await?;
    Ok(Json(response))
}

/// POST /v1/rooms/{id}/request-destroy
pub async fn request_destroy(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    payload: Option<Json<RequestDestroyBody>>,
) -> Result<Json<AckResponse>, RoomError> {
    let cookies = CookieMap::from_headers(&headers);
    let access = state.access_gate.authorize(&room_id, &cookies).await?;
    let reason = payload.and_then(|Json(body)| body.reason);
    let response = state.authority.request_destroy(&access, reason).await?;
    Ok(Json(response))
}

/// POST /v1/rooms/{id}/deny-destroy
pub async fn deny_destroy(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AckResponse>, RoomError> {
    let cookies = CookieMap::from_headers(&headers);
    let access = state.access_gate.authorize(&room_id, &cookies).await?;
    let response = state.authority.deny_destroy(&access).await?;
    Ok(Json(response))
}

/// POST /v1/rooms/{id}/extend-timer
pub async fn extend_timer(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<ExtendTimerRequest>,
) -> Result<Json<ExtendTimerResponse>, RoomError> {
    let cookies = CookieMap::from_headers(&headers);
    let access = state.access_gate.authorize(&room_id, &cookies).await?;
    let response = state.authority.extend_timer(&access, payload).await?;
    Ok(Json(response))
}

/// POST /v1/rooms/{id}/panic
pub async fn panic(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<PanicRequest>,
) -> Result<Json<AckResponse>, RoomError> {
    let cookies = CookieMap::from_headers(&headers);
    let access = state.access_gate.authorize(&room_id, &cookies).await?;
    let response = state.authority.panic(&access, &payload.panic_password).await?;
    Ok(Json(response))
}
