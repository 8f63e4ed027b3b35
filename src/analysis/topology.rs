use crate::error::{GraphError, GraphResult};
use crate::graph::{GraphStore, NodeId};
use petgraph::Direction;
use std::collections::HashMap;
use tracing::warn;

/// Performs a Topological Sort using Depth-First Search (DFS).
///
/// Returns every node such that each publisher appears before its subscribers.
/// Roots are visited in insertion order and publishers are walked in insertion
/// order, so the result is fixed for a fixed construction sequence.
///
/// The DFS colours nodes (unvisited / on the current path / finished); reaching
/// a node that is still on the path means a directed cycle, reported as
/// `GraphError::Cycle` naming that node. The walk keeps its own frame stack,
/// so chain depth is bounded by memory rather than the thread stack.
pub fn sort(store: &GraphStore) -> GraphResult<Vec<NodeId>> {
    let mut order = Vec::with_capacity(store.node_count());
    let mut state = vec![VisitState::None; store.node_bound()];

    for node in store.node_ids() {
        if state[node.index()] == VisitState::None {
            visit(node, store, &mut state, &mut order)?;
        }
    }

    Ok(order)
}

/// True iff the graph has no directed cycle. O(V+E).
pub fn is_acyclic(store: &GraphStore) -> bool {
    sort(store).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting,
    Visited,
}

// (node, neighbours still to walk, cursor into them)
type Frame = (NodeId, Vec<NodeId>, usize);

fn visit(
    start: NodeId,
    store: &GraphStore,
    state: &mut [VisitState],
    order: &mut Vec<NodeId>,
) -> GraphResult<()> {
    state[start.index()] = VisitState::Visiting;
    let mut stack: Vec<Frame> = vec![(start, store.predecessors(start)?, 0)];

    while let Some(frame) = stack.last_mut() {
        let next = frame.1.get(frame.2).copied();
        frame.2 += 1;

        match next {
            Some(parent) => match state[parent.index()] {
                VisitState::Visited => {}
                VisitState::Visiting => {
                    warn!(node = parent.index(), "cycle detected");
                    return Err(GraphError::Cycle { node: parent });
                }
                VisitState::None => {
                    state[parent.index()] = VisitState::Visiting;
                    stack.push((parent, store.predecessors(parent)?, 0));
                }
            },
            // Post-order over publishers places every publisher before `node`.
            None => {
                if let Some((node, _, _)) = stack.pop() {
                    state[node.index()] = VisitState::Visited;
                    order.push(node);
                }
            }
        }
    }
    Ok(())
}

/// Every node reachable from `start` along outgoing edges, `start` excluded,
/// in DFS pre-order.
///
/// Iterative, with the same colouring as [`sort`]: re-entering a node that is
/// still on the current path fails with `GraphError::Cycle` instead of
/// looping, so callers get an error before acting on a partial fan-out.
pub fn downstream_from(store: &GraphStore, start: NodeId) -> GraphResult<Vec<NodeId>> {
    reachable(store, start, Direction::Outgoing)
}

/// Every node `start` reads from, directly or transitively, `start` excluded,
/// in DFS pre-order over publishers. Fails with `GraphError::Cycle` like
/// [`downstream_from`].
pub fn upstream_from(store: &GraphStore, start: NodeId) -> GraphResult<Vec<NodeId>> {
    reachable(store, start, Direction::Incoming)
}

fn neighbours(store: &GraphStore, node: NodeId, dir: Direction) -> GraphResult<Vec<NodeId>> {
    match dir {
        Direction::Outgoing => store.successors(node),
        Direction::Incoming => store.predecessors(node),
    }
}

fn reachable(store: &GraphStore, start: NodeId, dir: Direction) -> GraphResult<Vec<NodeId>> {
    let mut state: HashMap<NodeId, VisitState> = HashMap::new();
    let mut order = Vec::new();
    let mut stack: Vec<Frame> = vec![(start, neighbours(store, start, dir)?, 0)];
    state.insert(start, VisitState::Visiting);

    while let Some(frame) = stack.last_mut() {
        let next = frame.1.get(frame.2).copied();
        frame.2 += 1;

        match next {
            Some(child) => match state.get(&child).copied() {
                Some(VisitState::Visiting) => {
                    warn!(node = child.index(), from = start.index(), "cycle detected during walk");
                    return Err(GraphError::Cycle { node: child });
                }
                Some(_) => {}
                None => {
                    state.insert(child, VisitState::Visiting);
                    order.push(child);
                    stack.push((child, neighbours(store, child, dir)?, 0));
                }
            },
            None => {
                if let Some((done, _, _)) = stack.pop() {
                    state.insert(done, VisitState::Visited);
                }
            }
        }
    }

    Ok(order)
}
