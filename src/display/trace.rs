use crate::graph::{GraphStore, NodeId};
use crate::lineage::RootSet;
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the publisher tree above `target`.
///
/// Each line shows the node's level, name and broadcast flag (`[x]` emitted
/// this episode, `[ ]` stale). Ancestors reached a second time are printed as
/// a back-reference instead of being expanded again. Edges carrying execute
/// times are annotated with them.
pub fn format_lineage(store: &GraphStore, target: NodeId, roots: &RootSet) -> String {
    let mut tracer = Tracer {
        store,
        visited_at_level: HashMap::new(),
        output: String::new(),
    };

    match store.name(target) {
        Ok(name) => {
            let _ = writeln!(tracer.output, "LINEAGE for node '{}':", name);
            let _ = writeln!(tracer.output, "--------------------------------------------------");
            tracer.trace_node(target, 1, "", "");
            let root_names: Vec<&str> = roots.iter().map(|&r| tracer.name(r)).collect();
            let _ = writeln!(tracer.output, "Roots: {}", root_names.join(", "));
        }
        Err(_) => {
            let _ = writeln!(tracer.output, "Error: Invalid Node ID {:?}", target);
        }
    }
    tracer.output
}

struct Tracer<'a> {
    store: &'a GraphStore,
    visited_at_level: HashMap<NodeId, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, node_id: NodeId, level: usize, prefix: &str, edge_note: &str) {
        let name = self.name(node_id);
        if let Some(&first_seen) = self.visited_at_level.get(&node_id) {
            let _ = writeln!(
                self.output,
                "{}{}{} -> (Ref to L{})",
                prefix, name, edge_note, first_seen
            );
            return;
        }
        self.visited_at_level.insert(node_id, level);

        let flag = match self.store.record(node_id) {
            Ok(r) if r.state.is_broadcasted() => "[x]",
            _ => "[ ]",
        };
        let parents = self.store.predecessors(node_id).unwrap_or_default();
        let kind = if parents.is_empty() { " (source)" } else { "" };
        let _ = writeln!(
            self.output,
            "{}[L{}] {} {}{}{}",
            prefix, level, name, flag, kind, edge_note
        );

        let stem = build_child_stem(prefix);
        for (i, &parent) in parents.iter().enumerate() {
            let connector = if i == parents.len() - 1 { "`--" } else { "|--" };
            let note = self.edge_note(parent, node_id);
            self.trace_node(parent, level + 1, &format!("{}{}", stem, connector), &note);
        }
    }

    fn edge_note(&self, publisher: NodeId, subscriber: NodeId) -> String {
        match self.store.get_execute_time(publisher, subscriber) {
            Ok(times) => {
                let list: Vec<String> =
                    times.iter().map(|t| t.format("%H:%M:%S").to_string()).collect();
                format!(" @ {}", list.join(","))
            }
            Err(_) => String::new(),
        }
    }

    fn name(&self, id: NodeId) -> &'a str {
        self.store.name(id).unwrap_or("?")
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}
