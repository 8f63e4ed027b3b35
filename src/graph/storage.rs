//! storage.rs
//! Node/edge storage for the propagation graph, with name lookup and a
//! version counter that downstream caches key off.

use super::attrs::{AttrTarget, Attributes};
use super::edge::EdgeRecord;
use super::node::{NodeId, NodeRecord};
use crate::error::{GraphError, GraphResult};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::NodeIndexable;
use petgraph::Direction;
use std::cell::OnceCell;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Owns the node set, the edge set and their attributes.
///
/// Edges point publisher -> subscriber. Structure only ever grows; every
/// structural change bumps `version` so that lineage caches built against an
/// older shape can tell they are stale.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    graph: StableDiGraph<NodeRecord, EdgeRecord>,
    names: HashMap<String, NodeId>,
    version: u64,
    // Lazily computed; dropped on every structural change.
    sources: OnceCell<Vec<NodeId>>,
}

impl GraphStore {
    pub fn new() -> Self { Self::default() }

    pub fn version(&self) -> u64 { self.version }
    pub fn node_count(&self) -> usize { self.graph.node_count() }
    pub fn edge_count(&self) -> usize { self.graph.edge_count() }
    pub fn contains(&self, node: NodeId) -> bool { self.graph.contains_node(node) }

    /// All node handles, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Upper bound on `NodeId::index()`, for dense per-node scratch arrays.
    pub(crate) fn node_bound(&self) -> usize { self.graph.node_bound() }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn name(&self, node: NodeId) -> GraphResult<&str> {
        Ok(self.record(node)?.name.as_str())
    }

    /// Registers `name` and an edge from each publisher into it.
    ///
    /// Fails with `DuplicateNode` if the name is taken, or `UnknownNode` if a
    /// publisher is not part of this graph. The graph is unchanged on failure.
    pub fn add_node(&mut self, name: &str, publishers: &[NodeId]) -> GraphResult<NodeId> {
        if self.names.contains_key(name) {
            return Err(GraphError::DuplicateNode { name: name.to_string() });
        }
        self.check_nodes(publishers)?;

        let id = self.graph.add_node(NodeRecord::new(name));
        self.names.insert(name.to_string(), id);
        for &publisher in publishers {
            // Publisher lists are sets: repeated handles collapse to one edge.
            if self.graph.find_edge(publisher, id).is_none() {
                self.graph.add_edge(publisher, id, EdgeRecord::default());
            }
        }
        self.touch();

        debug!(node = id.index(), name, publishers = publishers.len(), "registered node");
        Ok(id)
    }

    /// Adds a single publisher -> subscriber edge. Returns `false` if it
    /// already existed. Acyclicity is not checked here.
    pub fn add_edge(&mut self, publisher: NodeId, subscriber: NodeId) -> GraphResult<bool> {
        self.check_nodes(&[publisher, subscriber])?;
        if self.graph.find_edge(publisher, subscriber).is_some() {
            return Ok(false);
        }
        self.graph.add_edge(publisher, subscriber, EdgeRecord::default());
        self.touch();
        trace!(publisher = publisher.index(), subscriber = subscriber.index(), "added edge");
        Ok(true)
    }

    pub fn in_degree(&self, node: NodeId) -> GraphResult<usize> {
        self.check_nodes(&[node])?;
        Ok(self.graph.neighbors_directed(node, Direction::Incoming).count())
    }

    pub fn out_degree(&self, node: NodeId) -> GraphResult<usize> {
        self.check_nodes(&[node])?;
        Ok(self.graph.neighbors_directed(node, Direction::Outgoing).count())
    }

    /// Sum of in-degrees over every node.
    pub fn total_in_degree(&self) -> usize {
        self.node_ids()
            .map(|n| self.graph.neighbors_directed(n, Direction::Incoming).count())
            .sum()
    }

    /// Sum of out-degrees over every node.
    pub fn total_out_degree(&self) -> usize {
        self.node_ids()
            .map(|n| self.graph.neighbors_directed(n, Direction::Outgoing).count())
            .sum()
    }

    /// Publishers of `node`, in insertion order.
    pub fn predecessors(&self, node: NodeId) -> GraphResult<Vec<NodeId>> {
        self.neighbors(node, Direction::Incoming)
    }

    /// Subscribers of `node`, in insertion order.
    pub fn successors(&self, node: NodeId) -> GraphResult<Vec<NodeId>> {
        self.neighbors(node, Direction::Outgoing)
    }

    fn neighbors(&self, node: NodeId, dir: Direction) -> GraphResult<Vec<NodeId>> {
        self.check_nodes(&[node])?;
        // petgraph yields the most recent edge first; sort for a stable order.
        let mut out: Vec<NodeId> = self.graph.neighbors_directed(node, dir).collect();
        out.sort_unstable();
        Ok(out)
    }

    /// Nodes with no incoming edges, in insertion order.
    pub fn sources(&self) -> &[NodeId] {
        self.sources.get_or_init(|| {
            let sources: Vec<NodeId> = self
                .node_ids()
                .filter(|&n| self.graph.neighbors_directed(n, Direction::Incoming).next().is_none())
                .collect();
            trace!(count = sources.len(), version = self.version, "computed sources");
            sources
        })
    }

    // --- Records ---

    pub fn record(&self, node: NodeId) -> GraphResult<&NodeRecord> {
        self.graph.node_weight(node).ok_or(GraphError::UnknownNode(node))
    }

    pub(crate) fn record_mut(&mut self, node: NodeId) -> GraphResult<&mut NodeRecord> {
        self.graph.node_weight_mut(node).ok_or(GraphError::UnknownNode(node))
    }

    pub(crate) fn for_each_record_mut(&mut self, mut f: impl FnMut(&mut NodeRecord)) {
        let ids: Vec<NodeId> = self.graph.node_indices().collect();
        for id in ids {
            if let Some(record) = self.graph.node_weight_mut(id) {
                f(record);
            }
        }
    }

    pub fn edge(&self, publisher: NodeId, subscriber: NodeId) -> GraphResult<&EdgeRecord> {
        self.graph
            .find_edge(publisher, subscriber)
            .and_then(|e| self.graph.edge_weight(e))
            .ok_or(GraphError::UnknownEdge { publisher, subscriber })
    }

    pub(crate) fn edge_mut(
        &mut self,
        publisher: NodeId,
        subscriber: NodeId,
    ) -> GraphResult<&mut EdgeRecord> {
        self.graph
            .find_edge(publisher, subscriber)
            .and_then(|e| self.graph.edge_weight_mut(e))
            .ok_or(GraphError::UnknownEdge { publisher, subscriber })
    }

    // --- Attributes ---

    pub fn set_attr(
        &mut self,
        target: impl Into<AttrTarget>,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> GraphResult<()> {
        self.attrs_mut(target.into())?.insert(key.into(), value);
        Ok(())
    }

    pub fn get_attr(
        &self,
        target: impl Into<AttrTarget>,
        key: &str,
    ) -> GraphResult<&serde_json::Value> {
        let target = target.into();
        self.attrs(target)?
            .get(key)
            .ok_or_else(|| GraphError::AttributeNotFound { target, key: key.to_string() })
    }

    fn attrs(&self, target: AttrTarget) -> GraphResult<&Attributes> {
        match target {
            AttrTarget::Node(n) => Ok(&self.record(n)?.attrs),
            AttrTarget::Edge(p, s) => Ok(&self.edge(p, s)?.attrs),
        }
    }

    fn attrs_mut(&mut self, target: AttrTarget) -> GraphResult<&mut Attributes> {
        match target {
            AttrTarget::Node(n) => Ok(&mut self.record_mut(n)?.attrs),
            AttrTarget::Edge(p, s) => Ok(&mut self.edge_mut(p, s)?.attrs),
        }
    }

    // --- Internals ---

    fn check_nodes(&self, nodes: &[NodeId]) -> GraphResult<()> {
        match nodes.iter().find(|&&n| !self.graph.contains_node(n)) {
            Some(&missing) => Err(GraphError::UnknownNode(missing)),
            None => Ok(()),
        }
    }

    /// Records a structural change.
    fn touch(&mut self) {
        self.version += 1;
        self.sources = OnceCell::new();
    }
}
