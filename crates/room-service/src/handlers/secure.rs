//! Handlers for secure-room creation and proof verification.

use crate::cookies::CookieMap;
use crate::errors::RoomError;
use crate::handlers::json_with_cookies;
use crate::models::{
    CreateRoomResponse, CreateSecureRoomRequest, ProofAcceptedResponse, VerifyProofRequest,
};
use crate::observability::metrics;
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use std::sync::Arc;

/// POST /v1/rooms/secure
pub async fn create_secure(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSecureRoomRequest>,
) -> Result<Json<CreateRoomResponse>, RoomError> {
    let response = state.authority.create_secure(payload).await?;
    Ok(Json(response))
}

/// POST /v1/rooms/{id}/verify-proof
pub async fn verify_proof(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<VerifyProofRequest>,
) -> Result<Response, RoomError> {
    let cookies = CookieMap::from_headers(&headers);
    let outcome = state
        .gatekeeper
        .verify_proof(&room_id, &payload.proof_hex, &cookies)
        .await;

    match outcome {
        Ok(outcome) => {
            metrics::record_proof_verification("accepted");
            Ok(json_with_cookies(
                ProofAcceptedResponse {
                    accepted: true,
                    creator: outcome.creator,
                },
                &outcome.cookies,
            ))
        }
        Err(err) => {
            if matches!(err, RoomError::Forbidden(_)) {
                metrics::record_proof_verification("rejected");
            }
            Err(err)
        }
    }
}
