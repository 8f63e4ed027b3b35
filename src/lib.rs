//! Dependency tracking and propagation scheduling for a network of
//! timeseries computations.
//!
//! Nodes are data streams (raw or derived); an edge `publisher -> subscriber`
//! means the subscriber consumes the publisher's output. On every propagation
//! pass the graph answers which derived nodes are stale, which have already
//! been recomputed in the current episode, and in what order to evaluate them.
//!
//! ```
//! use tickgraph_core::SeriesGraph;
//!
//! let mut g = SeriesGraph::new();
//! let a = g.add_node("spot", &[]).unwrap();
//! let d = g.add_node("rates", &[]).unwrap();
//! let c = g.add_node("fwd", &[a, d]).unwrap();
//!
//! g.update_broadcast_status(a).unwrap();
//! g.update_broadcast_status(d).unwrap();
//! assert!(g.check_reset_condition());
//! assert!(!g.is_broadcasted(c).unwrap());
//! ```

pub mod analysis;
pub mod broadcast;
pub mod config;
pub mod display;
pub mod error;
pub mod graph;
pub mod lineage;
pub mod schedule;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{DuplicatePolicy, GraphConfig};
pub use error::{GraphError, GraphResult};
pub use graph::{AttrTarget, BroadcastState, NodeId, SeriesGraph};
pub use lineage::RootSet;
pub use schedule::{ExecuteTimeInput, ExecuteTimes};
