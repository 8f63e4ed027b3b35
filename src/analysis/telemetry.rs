use crate::analysis::topology;
use crate::error::GraphResult;
use crate::graph::GraphStore;

/// A structural snapshot of the graph, for periodic health logging by the
/// scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphTelemetry {
    pub node_count: usize,
    pub edge_count: usize,
    /// Nodes with no publishers (raw data streams).
    pub source_count: usize,
    /// Nodes with no subscribers (terminal outputs).
    pub sink_count: usize,
    /// Longest publisher chain, in edges. A graph of only sources has depth 0.
    pub depth: usize,
    /// Nodes that have emitted in the current episode.
    pub broadcasted: usize,
}

impl GraphTelemetry {
    /// Fails with `GraphError::Cycle` on a cyclic graph, where depth is undefined.
    pub fn analyze(store: &GraphStore) -> GraphResult<Self> {
        let order = topology::sort(store)?;
        let mut level = vec![0usize; store.node_bound()];
        let mut report = Self {
            node_count: store.node_count(),
            edge_count: store.edge_count(),
            source_count: store.sources().len(),
            ..Self::default()
        };

        // Publishers precede subscribers in `order`, so their levels are final.
        for &node in &order {
            let parents = store.predecessors(node)?;
            let lvl = parents.iter().map(|p| level[p.index()] + 1).max().unwrap_or(0);
            level[node.index()] = lvl;
            report.depth = report.depth.max(lvl);

            if store.out_degree(node)? == 0 {
                report.sink_count += 1;
            }
            if store.record(node)?.state.is_broadcasted() {
                report.broadcasted += 1;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::BroadcastTracker;

    #[test]
    fn test_telemetry_counts() {
        // A -> B -> D, A -> C -> D, X isolated
        let mut store = GraphStore::new();
        let a = store.add_node("A", &[]).unwrap();
        let b = store.add_node("B", &[a]).unwrap();
        let c = store.add_node("C", &[a]).unwrap();
        store.add_node("D", &[b, c]).unwrap();
        store.add_node("X", &[]).unwrap();
        BroadcastTracker::new().update_broadcast_status(&mut store, a).unwrap();

        let t = GraphTelemetry::analyze(&store).unwrap();
        assert_eq!(
            t,
            GraphTelemetry {
                node_count: 5,
                edge_count: 4,
                source_count: 2,
                sink_count: 2,
                depth: 2,
                broadcasted: 1,
            }
        );
    }

    #[test]
    fn test_telemetry_rejects_cycles() {
        let mut store = GraphStore::new();
        let a = store.add_node("A", &[]).unwrap();
        let b = store.add_node("B", &[a]).unwrap();
        store.add_edge(b, a).unwrap();
        assert!(GraphTelemetry::analyze(&store).is_err());
    }
}
