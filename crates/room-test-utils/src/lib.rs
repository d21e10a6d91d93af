//! # Room Test Utilities
//!
//! Shared test utilities for the room service:
//! - [`MemoryRoomStore`]: in-memory store with static TTL bookkeeping
//!   and captured publishes
//! - Proof fixtures mirroring the client side of the secure gatekeeper
//!   protocol

pub mod memory_store;
pub mod proof_fixtures;

pub use memory_store::MemoryRoomStore;
pub use proof_fixtures::*;
