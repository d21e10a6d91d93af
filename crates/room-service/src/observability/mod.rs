//! Observability: metrics for room lifecycle operations.

pub mod metrics;
