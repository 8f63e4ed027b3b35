//! Defines the core data structures for the propagation graph.
pub mod attrs;
pub mod dag;
pub mod edge;
pub mod node;
pub mod storage;

// Re-export key types for convenient access
pub use attrs::{AttrTarget, Attributes};
pub use dag::SeriesGraph;
pub use edge::EdgeRecord;
pub use node::{BroadcastState, NodeId, NodeRecord};
pub use storage::GraphStore;
