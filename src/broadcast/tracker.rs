//! The propagation-episode state machine.
//!
//! Each node is either `NotBroadcasted` or `Broadcasted` within the current
//! episode. A source re-firing makes everything downstream of it stale again;
//! once every source has fired, the episode is over and all nodes start the
//! next one stale.
//!
//! # Known limitation
//!
//! With several independent sources, an episode only completes when *all* of
//! them have fired. If one source stalls, `check_reset_condition` never
//! resets, while fan-out from a live source keeps clearing any descendants it
//! shares with the stalled branch. Those shared descendants can flip back and
//! forth without the episode ever completing. This is the intended contract
//! for a tick pipeline in which every instrument must contribute to a cycle;
//! changing it is a product decision, not a fix.

use crate::analysis::topology;
use crate::error::GraphResult;
use crate::graph::{BroadcastState, GraphStore, NodeId};
use tracing::{debug, trace};

#[derive(Debug, Clone, Default)]
pub struct BroadcastTracker {
    episodes_completed: u64,
}

impl BroadcastTracker {
    pub fn new() -> Self { Self::default() }

    pub fn episodes_completed(&self) -> u64 { self.episodes_completed }

    /// Marks `node` as having emitted in this episode.
    ///
    /// If `node` is a source, everything reachable from it is reset to
    /// `NotBroadcasted` first, and those nodes are returned in DFS pre-order.
    /// For any other node nothing else changes and the result is empty.
    ///
    /// The fan-out fails with `GraphError::Cycle` if a cycle is reachable from
    /// the source; no state changes in that case.
    pub fn update_broadcast_status(
        &mut self,
        store: &mut GraphStore,
        node: NodeId,
    ) -> GraphResult<Vec<NodeId>> {
        let stale = if store.in_degree(node)? == 0 {
            topology::downstream_from(store, node)?
        } else {
            Vec::new()
        };

        store.record_mut(node)?.state = BroadcastState::Broadcasted;
        for &n in &stale {
            store.record_mut(n)?.state = BroadcastState::NotBroadcasted;
        }

        if stale.is_empty() {
            trace!(node = node.index(), "broadcast");
        } else {
            debug!(source = node.index(), reset = stale.len(), "source fired, downstream reset");
        }
        Ok(stale)
    }

    /// Ends the episode if every source has broadcast: all nodes, sources
    /// included, go back to `NotBroadcasted` and `true` is returned.
    /// Otherwise nothing changes.
    ///
    /// A graph without sources never completes an episode.
    pub fn check_reset_condition(&mut self, store: &mut GraphStore) -> bool {
        let sources = store.sources();
        if sources.is_empty() {
            return false;
        }
        let all_fired = sources
            .iter()
            .all(|&s| store.record(s).map(|r| r.state.is_broadcasted()).unwrap_or(false));
        if !all_fired {
            return false;
        }

        store.for_each_record_mut(|r| r.state = BroadcastState::NotBroadcasted);
        self.episodes_completed += 1;
        debug!(
            episode = self.episodes_completed,
            nodes = store.node_count(),
            "episode complete, all nodes reset"
        );
        true
    }

    /// Nodes that have not emitted yet in this episode, in insertion order.
    pub fn stale_nodes(&self, store: &GraphStore) -> Vec<NodeId> {
        store
            .node_ids()
            .filter(|&n| store.record(n).map(|r| !r.state.is_broadcasted()).unwrap_or(false))
            .collect()
    }

    /// Stale nodes whose publishers have all emitted in this episode: the
    /// ones a scheduler can evaluate next. Stale sources are always ready.
    pub fn ready_nodes(&self, store: &GraphStore) -> GraphResult<Vec<NodeId>> {
        let mut ready = Vec::new();
        for node in self.stale_nodes(store) {
            let mut all_fired = true;
            for parent in store.predecessors(node)? {
                if !store.record(parent)?.state.is_broadcasted() {
                    all_fired = false;
                    break;
                }
            }
            if all_fired {
                ready.push(node);
            }
        }
        Ok(ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(store: &GraphStore, nodes: &[NodeId]) -> Vec<bool> {
        nodes.iter().map(|&n| store.record(n).unwrap().state.is_broadcasted()).collect()
    }

    #[test]
    fn test_new_nodes_start_not_broadcasted() {
        let mut store = GraphStore::new();
        let a = store.add_node("A", &[]).unwrap();
        let b = store.add_node("B", &[a]).unwrap();
        assert_eq!(flags(&store, &[a, b]), vec![false, false]);
    }

    #[test]
    fn test_derived_node_broadcast_has_no_fan_out() {
        let mut store = GraphStore::new();
        let a = store.add_node("A", &[]).unwrap();
        let b = store.add_node("B", &[a]).unwrap();
        let c = store.add_node("C", &[b]).unwrap();
        let mut tracker = BroadcastTracker::new();

        tracker.update_broadcast_status(&mut store, c).unwrap();
        let reset = tracker.update_broadcast_status(&mut store, b).unwrap();
        assert!(reset.is_empty());
        assert_eq!(flags(&store, &[a, b, c]), vec![false, true, true]);
    }

    #[test]
    fn test_source_fan_out_resets_reachable_nodes() {
        // A -> B -> C, X -> Y
        let mut store = GraphStore::new();
        let a = store.add_node("A", &[]).unwrap();
        let b = store.add_node("B", &[a]).unwrap();
        let c = store.add_node("C", &[b]).unwrap();
        let x = store.add_node("X", &[]).unwrap();
        let y = store.add_node("Y", &[x]).unwrap();
        let mut tracker = BroadcastTracker::new();

        for n in [b, c, x, y] {
            tracker.update_broadcast_status(&mut store, n).unwrap();
        }
        let reset = tracker.update_broadcast_status(&mut store, a).unwrap();
        assert_eq!(reset, vec![b, c]);
        assert_eq!(flags(&store, &[a, b, c, x, y]), vec![true, false, false, true, true]);
    }

    #[test]
    fn test_reset_condition_is_noop_until_all_sources_fire() {
        let mut store = GraphStore::new();
        let a = store.add_node("A", &[]).unwrap();
        let d = store.add_node("D", &[]).unwrap();
        let c = store.add_node("C", &[a, d]).unwrap();
        let mut tracker = BroadcastTracker::new();

        tracker.update_broadcast_status(&mut store, a).unwrap();
        tracker.update_broadcast_status(&mut store, c).unwrap();
        assert!(!tracker.check_reset_condition(&mut store));
        assert_eq!(flags(&store, &[a, d, c]), vec![true, false, true]);

        tracker.update_broadcast_status(&mut store, d).unwrap();
        assert!(tracker.check_reset_condition(&mut store));
        assert_eq!(flags(&store, &[a, d, c]), vec![false, false, false]);
        assert_eq!(tracker.episodes_completed(), 1);
    }

    #[test]
    fn test_graph_without_sources_never_resets() {
        let mut store = GraphStore::new();
        let a = store.add_node("A", &[]).unwrap();
        let b = store.add_node("B", &[a]).unwrap();
        store.add_edge(b, a).unwrap();
        let mut tracker = BroadcastTracker::new();

        assert!(!tracker.check_reset_condition(&mut store));
        assert!(!tracker.check_reset_condition(&mut GraphStore::new()));
        assert_eq!(tracker.episodes_completed(), 0);
    }

    #[test]
    fn test_fan_out_into_cycle_changes_nothing() {
        // S -> A -> B -> A
        let mut store = GraphStore::new();
        let s = store.add_node("S", &[]).unwrap();
        let a = store.add_node("A", &[s]).unwrap();
        let b = store.add_node("B", &[a]).unwrap();
        store.add_edge(b, a).unwrap();
        let mut tracker = BroadcastTracker::new();

        tracker.update_broadcast_status(&mut store, a).unwrap();
        assert!(tracker.update_broadcast_status(&mut store, s).is_err());
        assert_eq!(flags(&store, &[s, a, b]), vec![false, true, false]);
    }

    #[test]
    fn test_stalled_source_keeps_shared_descendants_oscillating() {
        // A -> C <- D; D never fires.
        let mut store = GraphStore::new();
        let a = store.add_node("A", &[]).unwrap();
        let d = store.add_node("D", &[]).unwrap();
        let c = store.add_node("C", &[a, d]).unwrap();
        let mut tracker = BroadcastTracker::new();

        for _ in 0..3 {
            tracker.update_broadcast_status(&mut store, a).unwrap();
            assert!(!store.record(c).unwrap().state.is_broadcasted());
            tracker.update_broadcast_status(&mut store, c).unwrap();
            assert!(!tracker.check_reset_condition(&mut store));
        }
        assert_eq!(tracker.episodes_completed(), 0);
    }

    #[test]
    fn test_stale_and_ready_nodes() {
        // A -> C <- D, C -> E
        let mut store = GraphStore::new();
        let a = store.add_node("A", &[]).unwrap();
        let d = store.add_node("D", &[]).unwrap();
        let c = store.add_node("C", &[a, d]).unwrap();
        let e = store.add_node("E", &[c]).unwrap();
        let mut tracker = BroadcastTracker::new();

        assert_eq!(tracker.ready_nodes(&store).unwrap(), vec![a, d]);

        tracker.update_broadcast_status(&mut store, a).unwrap();
        assert_eq!(tracker.ready_nodes(&store).unwrap(), vec![d]);

        tracker.update_broadcast_status(&mut store, d).unwrap();
        assert_eq!(tracker.ready_nodes(&store).unwrap(), vec![c]);

        tracker.update_broadcast_status(&mut store, c).unwrap();
        assert_eq!(tracker.stale_nodes(&store), vec![e]);
        assert_eq!(tracker.ready_nodes(&store).unwrap(), vec![e]);
    }
}
