//! Core room lifecycle services.
//!
//! Handlers call into these; everything here is HTTP-agnostic apart
//! from the cookie directives it hands back.

pub mod access_gate;
pub mod authority;
pub mod broadcaster;
pub mod entry_gateway;
pub mod gatekeeper;
pub mod ttl_sync;

pub use access_gate::{AccessGate, RoomAccess};
pub use authority::RoomAuthority;
pub use broadcaster::{LifecycleBroadcaster, RoomEvent};
pub use entry_gateway::{EntryDecision, EntryGateway, EntryOutcome};
pub use gatekeeper::SecureGatekeeper;
pub use ttl_sync::TtlSynchronizer;
