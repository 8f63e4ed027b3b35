//! Resolves, per node, the set of source nodes its data ultimately comes from.

use crate::error::{GraphError, GraphResult};
use crate::graph::{GraphStore, NodeId};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, trace};

/// The source ancestors of a node. Ordered by handle, so by insertion order.
pub type RootSet = BTreeSet<NodeId>;

/// Memoised root resolution.
///
/// The memo is stamped with the store version it was built against and is
/// dropped as soon as it is asked about a store at a different version, so
/// adding nodes or edges after a query never yields stale lineage.
#[derive(Debug, Clone, Default)]
pub struct RootResolver {
    memo: HashMap<NodeId, RootSet>,
    built_at: u64,
}

impl RootResolver {
    pub fn new() -> Self { Self::default() }

    /// Sources reachable backwards from `node`.
    ///
    /// A node without publishers is its own root, so the result always holds
    /// at least one node. Ancestors reached along several paths are counted
    /// once (deduplicated by handle).
    ///
    /// Fails with `GraphError::Cycle` if the ancestry of `node` contains a
    /// directed cycle; entries already memoised stay valid.
    pub fn roots(&mut self, store: &GraphStore, node: NodeId) -> GraphResult<RootSet> {
        self.sync(store.version());
        self.resolve(store, node)
    }

    /// Number of nodes with a memoised root set.
    pub fn cached(&self) -> usize { self.memo.len() }

    pub fn clear(&mut self) {
        self.memo.clear();
    }

    fn sync(&mut self, version: u64) {
        if self.built_at != version {
            if !self.memo.is_empty() {
                debug!(
                    entries = self.memo.len(),
                    from = self.built_at,
                    to = version,
                    "graph changed, dropping root cache"
                );
            }
            self.memo.clear();
            self.built_at = version;
        }
    }

    // Explicit-stack post-order walk over publishers. A node is memoised once
    // all of its publishers are; meeting a node still on the path is a cycle.
    fn resolve(&mut self, store: &GraphStore, node: NodeId) -> GraphResult<RootSet> {
        if let Some(hit) = self.memo.get(&node) {
            return Ok(hit.clone());
        }

        let mut on_path = HashSet::from([node]);
        // (node, its publishers, cursor into them)
        let mut stack: Vec<(NodeId, Vec<NodeId>, usize)> =
            vec![(node, store.predecessors(node)?, 0)];

        while let Some(frame) = stack.last_mut() {
            let next = frame.1.get(frame.2).copied();
            frame.2 += 1;

            if let Some(parent) = next {
                if self.memo.contains_key(&parent) {
                    continue;
                }
                if !on_path.insert(parent) {
                    return Err(GraphError::Cycle { node: parent });
                }
                stack.push((parent, store.predecessors(parent)?, 0));
                continue;
            }

            let Some((done, parents, _)) = stack.pop() else { break };
            let roots = if parents.is_empty() {
                RootSet::from([done])
            } else {
                let mut acc = RootSet::new();
                for parent in &parents {
                    if let Some(hit) = self.memo.get(parent) {
                        acc.extend(hit.iter().copied());
                    }
                }
                acc
            };
            on_path.remove(&done);
            trace!(node = done.index(), roots = roots.len(), "resolved roots");
            self.memo.insert(done, roots);
        }

        self.memo
            .get(&node)
            .cloned()
            .ok_or(GraphError::UnknownNode(node))
    }
}
