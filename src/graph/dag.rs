//! dag.rs
//! Wraps the low-level GraphStore with lineage, ordering and the broadcast
//! state machine. This is the surface a tick-driven scheduler talks to.

use super::attrs::AttrTarget;
use super::node::{BroadcastState, NodeId};
use super::storage::GraphStore;
use crate::analysis::{topology, GraphTelemetry};
use crate::broadcast::BroadcastTracker;
use crate::config::{DuplicatePolicy, GraphConfig};
use crate::display::trace;
use crate::error::{GraphError, GraphResult};
use crate::lineage::{RootResolver, RootSet};
use crate::schedule::{ExecuteTimeInput, ExecuteTimes};
use std::cell::Cell;
use tracing::debug;

/// The dependency/propagation graph of a network of timeseries.
///
/// Single-threaded by construction: every operation runs synchronously inside
/// the caller's tick loop, and concurrent use must be serialised by the caller.
#[derive(Debug, Clone, Default)]
pub struct SeriesGraph {
    store: GraphStore,
    resolver: RootResolver,
    tracker: BroadcastTracker,
    config: GraphConfig,
    // (store version, verdict)
    acyclic: Cell<Option<(u64, bool)>>,
}

impl SeriesGraph {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(config: GraphConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn config(&self) -> &GraphConfig { &self.config }
    pub fn store(&self) -> &GraphStore { &self.store }

    // --- Construction ---

    /// Registers a timeseries together with the series it consumes.
    ///
    /// What happens when `name` is already registered depends on
    /// `GraphConfig::duplicate_policy`.
    pub fn add_node(&mut self, name: &str, publishers: &[NodeId]) -> GraphResult<NodeId> {
        match (self.store.node_id(name), self.config.duplicate_policy) {
            (Some(existing), DuplicatePolicy::MergePublishers) => {
                if let Some(&missing) = publishers.iter().find(|&&p| !self.store.contains(p)) {
                    return Err(GraphError::UnknownNode(missing));
                }
                let mut added = 0;
                for &p in publishers {
                    if self.store.add_edge(p, existing)? {
                        added += 1;
                    }
                }
                self.store.record_mut(existing)?.state = BroadcastState::NotBroadcasted;
                debug!(node = existing.index(), name, added, "merged duplicate registration");
                Ok(existing)
            }
            _ => self.store.add_node(name, publishers),
        }
    }

    /// Adds one publisher -> subscriber dependency after construction.
    /// May introduce a cycle; that only surfaces when ordering or lineage is
    /// requested.
    pub fn add_edge(&mut self, publisher: NodeId, subscriber: NodeId) -> GraphResult<bool> {
        self.store.add_edge(publisher, subscriber)
    }

    // --- Structure queries ---

    pub fn node_id(&self, name: &str) -> Option<NodeId> { self.store.node_id(name) }
    pub fn name(&self, node: NodeId) -> GraphResult<&str> { self.store.name(node) }
    pub fn node_count(&self) -> usize { self.store.node_count() }
    pub fn edge_count(&self) -> usize { self.store.edge_count() }
    pub fn in_degree(&self, node: NodeId) -> GraphResult<usize> { self.store.in_degree(node) }
    pub fn out_degree(&self, node: NodeId) -> GraphResult<usize> { self.store.out_degree(node) }
    pub fn total_in_degree(&self) -> usize { self.store.total_in_degree() }
    pub fn total_out_degree(&self) -> usize { self.store.total_out_degree() }
    pub fn predecessors(&self, node: NodeId) -> GraphResult<Vec<NodeId>> {
        self.store.predecessors(node)
    }
    pub fn successors(&self, node: NodeId) -> GraphResult<Vec<NodeId>> {
        self.store.successors(node)
    }
    pub fn sources(&self) -> &[NodeId] { self.store.sources() }

    // --- Attributes ---

    pub fn set_attr(
        &mut self,
        target: impl Into<AttrTarget>,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> GraphResult<()> {
        self.store.set_attr(target, key, value)
    }

    pub fn get_attr(
        &self,
        target: impl Into<AttrTarget>,
        key: &str,
    ) -> GraphResult<&serde_json::Value> {
        self.store.get_attr(target, key)
    }

    pub fn set_execute_time(
        &mut self,
        publisher: NodeId,
        subscriber: NodeId,
        times: impl Into<ExecuteTimeInput>,
    ) -> GraphResult<()> {
        self.store.set_execute_time(publisher, subscriber, times)
    }

    pub fn get_execute_time(
        &self,
        publisher: NodeId,
        subscriber: NodeId,
    ) -> GraphResult<&ExecuteTimes> {
        self.store.get_execute_time(publisher, subscriber)
    }

    // --- Ordering ---

    /// Cached per graph version, so repeated checks between structural
    /// changes are O(1).
    pub fn is_acyclic(&self) -> bool {
        let version = self.store.version();
        match self.acyclic.get() {
            Some((v, verdict)) if v == version => verdict,
            _ => {
                let verdict = topology::is_acyclic(&self.store);
                self.acyclic.set(Some((version, verdict)));
                verdict
            }
        }
    }

    /// Every node, publishers before subscribers. Fails with
    /// `GraphError::Cycle` on a cyclic graph.
    pub fn topological_order(&self) -> GraphResult<Vec<NodeId>> {
        let result = topology::sort(&self.store);
        self.acyclic.set(Some((self.store.version(), result.is_ok())));
        result
    }

    // --- Lineage ---

    /// The source nodes `node` ultimately derives from; `{node}` for a source.
    pub fn roots(&mut self, node: NodeId) -> GraphResult<RootSet> {
        self.ensure_acyclic()?;
        let roots = self.resolver.roots(&self.store, node);
        if !self.config.memoize_roots {
            self.resolver.clear();
        }
        roots
    }

    pub fn clear_root_cache(&mut self) {
        self.resolver.clear();
    }

    // --- Broadcast episodes ---

    /// Records that `node` emitted. A source re-firing also makes everything
    /// downstream of it stale; the nodes reset that way are returned.
    pub fn update_broadcast_status(&mut self, node: NodeId) -> GraphResult<Vec<NodeId>> {
        if self.store.in_degree(node)? == 0 {
            self.ensure_acyclic()?;
        }
        self.tracker.update_broadcast_status(&mut self.store, node)
    }

    /// Closes the episode if every source has fired. Returns whether it did.
    pub fn check_reset_condition(&mut self) -> bool {
        self.tracker.check_reset_condition(&mut self.store)
    }

    pub fn broadcast_state(&self, node: NodeId) -> GraphResult<BroadcastState> {
        Ok(self.store.record(node)?.state)
    }

    pub fn is_broadcasted(&self, node: NodeId) -> GraphResult<bool> {
        Ok(self.broadcast_state(node)?.is_broadcasted())
    }

    pub fn episodes_completed(&self) -> u64 { self.tracker.episodes_completed() }
    pub fn stale_nodes(&self) -> Vec<NodeId> { self.tracker.stale_nodes(&self.store) }
    pub fn ready_nodes(&self) -> GraphResult<Vec<NodeId>> { self.tracker.ready_nodes(&self.store) }

    // --- Diagnostics ---

    pub fn telemetry(&self) -> GraphResult<GraphTelemetry> {
        GraphTelemetry::analyze(&self.store)
    }

    /// Renders the ancestry of `node` with broadcast flags and its roots.
    pub fn lineage_trace(&mut self, node: NodeId) -> GraphResult<String> {
        let roots = self.roots(node)?;
        Ok(trace::format_lineage(&self.store, node, &roots))
    }

    /// Guards recursive traversals. Re-sorts only when no verdict is cached
    /// for the current version or the cached one is negative, so that the
    /// error names a node on the cycle.
    fn ensure_acyclic(&self) -> GraphResult<()> {
        match self.acyclic.get() {
            Some((v, true)) if v == self.store.version() => Ok(()),
            _ => self.topological_order().map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_tracing;
    use serde_json::json;

    #[test]
    fn test_reject_policy_is_default() {
        let mut g = SeriesGraph::new();
        let a = g.add_node("A", &[]).unwrap();
        g.add_node("B", &[a]).unwrap();
        let err = g.add_node("B", &[]).unwrap_err();
        assert_eq!(err, GraphError::DuplicateNode { name: "B".into() });
    }

    #[test]
    fn test_merge_policy_reuses_node_and_adds_publishers() {
        init_tracing();
        let cfg = GraphConfig {
            duplicate_policy: DuplicatePolicy::MergePublishers,
            ..Default::default()
        };
        let mut g = SeriesGraph::with_config(cfg);
        let a = g.add_node("A", &[]).unwrap();
        let x = g.add_node("X", &[]).unwrap();
        let b = g.add_node("B", &[a]).unwrap();
        g.update_broadcast_status(b).unwrap();

        let again = g.add_node("B", &[a, x]).unwrap();
        assert_eq!(again, b);
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.predecessors(b).unwrap(), vec![a, x]);
        assert!(!g.is_broadcasted(b).unwrap());
    }

    #[test]
    fn test_acyclicity_verdict_tracks_version() {
        let mut g = SeriesGraph::new();
        let a = g.add_node("A", &[]).unwrap();
        let b = g.add_node("B", &[a]).unwrap();
        assert!(g.is_acyclic());

        g.add_edge(b, a).unwrap();
        assert!(!g.is_acyclic());
        assert!(matches!(g.topological_order(), Err(GraphError::Cycle { .. })));
    }

    #[test]
    fn test_roots_refuse_cyclic_graph() {
        let mut g = SeriesGraph::new();
        let s = g.add_node("S", &[]).unwrap();
        let a = g.add_node("A", &[s]).unwrap();
        let b = g.add_node("B", &[a]).unwrap();
        g.add_edge(b, a).unwrap();

        // Even a node whose own ancestry is fine is refused.
        assert!(matches!(g.roots(s), Err(GraphError::Cycle { .. })));
        assert!(matches!(g.update_broadcast_status(s), Err(GraphError::Cycle { .. })));
        assert!(!g.is_broadcasted(s).unwrap());
    }

    #[test]
    fn test_roots_without_memo() {
        let cfg = GraphConfig { memoize_roots: false, ..Default::default() };
        let mut g = SeriesGraph::with_config(cfg);
        let a = g.add_node("A", &[]).unwrap();
        let b = g.add_node("B", &[a]).unwrap();
        assert_eq!(g.roots(b).unwrap(), RootSet::from([a]));
        assert_eq!(g.resolver.cached(), 0);
    }

    #[test]
    fn test_clear_root_cache() {
        let mut g = SeriesGraph::new();
        let a = g.add_node("A", &[]).unwrap();
        let b = g.add_node("B", &[a]).unwrap();
        g.roots(b).unwrap();
        assert_eq!(g.resolver.cached(), 2);
        g.clear_root_cache();
        assert_eq!(g.resolver.cached(), 0);
    }

    #[test]
    fn test_attributes_through_facade() {
        let mut g = SeriesGraph::new();
        let a = g.add_node("A", &[]).unwrap();
        g.set_attr(a, "symbol", json!("ESZ6")).unwrap();
        assert_eq!(g.get_attr(a, "symbol").unwrap(), &json!("ESZ6"));
        assert!(matches!(g.get_attr(a, "tick_size"), Err(GraphError::AttributeNotFound { .. })));
    }
}
