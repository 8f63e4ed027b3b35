//! Per-episode broadcast status tracking.
pub mod tracker;

pub use crate::graph::BroadcastState;
pub use tracker::BroadcastTracker;
