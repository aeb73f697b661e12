//! HTTP middleware components.

pub mod metrics;

pub use metrics::{UNMATCHED_PATH, track_requests};
