//! Defines the error type shared by every graph operation.
use crate::graph::{AttrTarget, NodeId};
use thiserror::Error;

/// A contract violation reported to the caller at the point of the offending call.
///
/// None of these are retried internally; they describe structural misuse of the
/// graph API, so the scheduler decides whether to abort the episode.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Cycle detected involving node {}", .node.index())]
    Cycle { node: NodeId },
    #[error("Node '{name}' is already registered")]
    DuplicateNode { name: String },
    #[error("Attribute '{key}' is not set on {target}")]
    AttributeNotFound { target: AttrTarget, key: String },
    #[error("Invalid execute time: {0}")]
    InvalidTime(String),
    #[error("Node {} does not belong to this graph", .0.index())]
    UnknownNode(NodeId),
    #[error("No edge from node {} to node {}", .publisher.index(), .subscriber.index())]
    UnknownEdge { publisher: NodeId, subscriber: NodeId },
    #[error("Config error: {0}")]
    Config(String),
}

pub type GraphResult<T> = Result<T, GraphError>;
