//! Defines the `NodeRecord` kept for every timeseries registered in the graph.

use super::attrs::Attributes;
use petgraph::graph::NodeIndex;

/// A unique, stable handle for a node within the graph.
///
/// This is a type alias for `petgraph::graph::NodeIndex` to abstract the
/// underlying graph implementation. Two handles are the same node iff they
/// compare equal; the node's contents never take part in identity.
pub type NodeId = NodeIndex;

/// Whether a node has emitted within the current propagation episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BroadcastState {
    #[default]
    NotBroadcasted,
    Broadcasted,
}

impl BroadcastState {
    pub fn is_broadcasted(self) -> bool {
        self == BroadcastState::Broadcasted
    }
}

/// Everything the graph stores about a single timeseries.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    /// The series name the node was registered under. Unique within a graph.
    pub name: String,
    pub state: BroadcastState,
    /// Free-form caller annotations.
    pub attrs: Attributes,
}

impl NodeRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: BroadcastState::NotBroadcasted,
            attrs: Attributes::new(),
        }
    }
}
