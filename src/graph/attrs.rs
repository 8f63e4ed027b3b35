//! Free-form attribute storage for nodes and edges.

use super::node::NodeId;
use std::collections::BTreeMap;
use std::fmt;

/// Caller-defined key/value pairs. Ordered so that dumps are stable.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Addresses the node or edge an attribute lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrTarget {
    Node(NodeId),
    /// `(publisher, subscriber)`
    Edge(NodeId, NodeId),
}

impl From<NodeId> for AttrTarget {
    fn from(node: NodeId) -> Self {
        AttrTarget::Node(node)
    }
}

impl From<(NodeId, NodeId)> for AttrTarget {
    fn from((publisher, subscriber): (NodeId, NodeId)) -> Self {
        AttrTarget::Edge(publisher, subscriber)
    }
}

impl fmt::Display for AttrTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrTarget::Node(n) => write!(f, "node {}", n.index()),
            AttrTarget::Edge(p, s) => write!(f, "edge {} -> {}", p.index(), s.index()),
        }
    }
}
