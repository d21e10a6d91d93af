//! Ephemeral room service.
//!
//! Rooms are guaranteed to vanish: automatically when their store-level
//! expiry fires, or immediately on explicit destruction. Two mutually
//! exclusive trust models are supported. Legacy rooms are protected by
//! a password or security question the server can read; secure rooms
//! only ever present the server with a proof derived from a secret it
//! never learns.
//!
//! Layering follows Handler -> Service -> Store: axum handlers in
//! [`handlers`], the lifecycle components in [`services`], and the
//! key-value/broadcast interface in [`store`].

pub mod config;
pub mod cookies;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod store;
