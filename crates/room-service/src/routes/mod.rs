//! Router assembly and shared application state.

use crate::config::Config;
use crate::handlers::{rooms, secure};
use crate::services::{AccessGate, EntryGateway, RoomAuthority, SecureGatekeeper};
use crate::store::RoomStore;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
///
/// The store handle is injected explicitly so tests can swap in an
/// in-memory implementation.
pub struct AppState {
    pub authority: RoomAuthority,
    pub access_gate: AccessGate,
    pub entry_gateway: EntryGateway,
    pub gatekeeper: SecureGatekeeper,
}

impl AppState {
    pub fn new(store: Arc<dyn RoomStore>, config: &Config) -> Self {
        AppState {
            authority: RoomAuthority::new(
                Arc::clone(&store),
                config.secure_room_lifetime_seconds,
                config.production,
            ),
            access_gate: AccessGate::new(Arc::clone(&store)),
            entry_gateway: EntryGateway::new(Arc::clone(&store), config.production),
            gatekeeper: SecureGatekeeper::new(store, config.production),
        }
    }
}

pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Room creation
        .route("/v1/rooms", post(rooms::create))
        .route("/v1/rooms/secure", post(secure::create_secure))
        // Verification (no auth)
        .route("/v1/rooms/:id/verify", post(rooms::verify))
        .route("/v1/rooms/:id/verify-proof", post(secure::verify_proof))
        // Read-only (no auth)
        .route("/v1/rooms/:id/info", get(rooms::info))
        .route("/v1/rooms/:id/ttl", get(rooms::ttl))
        // Entry gateway
        .route("/v1/rooms/:id/enter", get(rooms::enter))
        // Room-scoped, Access-Gate authenticated
        .route("/v1/rooms/:id/messages", post(rooms::append_message))
        .route("/v1/rooms/:id/exit", post(rooms::exit))
        .route("/v1/rooms/:id/role", get(rooms::role))
        .route("/v1/rooms/:id", delete(rooms::destroy))
        .route("/v1/rooms/:id/request-destroy", post(rooms::request_destroy))
        .route("/v1/rooms/:id/deny-destroy", post(rooms::deny_destroy))
        .route("/v1/rooms/:id/extend-timer", post(rooms::extend_timer))
        .route("/v1/rooms/:id/panic", post(rooms::panic))
        // Health check
        .route("/v1/health", get(health_check))
        // Tracing middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
