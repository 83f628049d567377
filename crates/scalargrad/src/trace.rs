//! Graph introspection: reachable node/edge sets and a bounded text dump.

use crate::error::Result;
use crate::graph::{Graph, NodeId};
use std::collections::HashSet;

/// Default number of nodes and edges printed by [`render`].
pub const DEFAULT_RENDER_CAP: usize = 60;

/// A directed edge from an operand to the node that consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// The operand
    pub parent: NodeId,
    /// The consumer
    pub child: NodeId,
}

/// Nodes and edges reachable from a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphTrace {
    /// Reachable nodes in discovery order, root first
    pub nodes: Vec<NodeId>,
    /// Distinct parent -> child edges in discovery order
    pub edges: Vec<Edge>,
}

impl GraphTrace {
    /// Formats the trace against the graph it was taken from.
    ///
    /// At most `cap` nodes and `cap` edges are printed; the remainder is
    /// summarised by a truncation line.
    pub fn render(&self, graph: &Graph, cap: usize) -> Result<String> {
        let mut lines = vec!["=== Computation Graph ===".to_string()];
        for &id in self.nodes.iter().take(cap) {
            let node = graph.node(id)?;
            lines.push(format!(
                "op={:>6} | value={:>10.6} | grad={:>10.6} | parents={}",
                node.op.name(),
                node.value,
                node.grad,
                node.parents.len()
            ));
        }
        if self.nodes.len() > cap {
            lines.push(format!("...(nodes truncated: {} more)", self.nodes.len() - cap));
        }

        lines.push("=== Edges (parent -> child) ===".to_string());
        for edge in self.edges.iter().take(cap) {
            lines.push(format!(
                "{:>6} -> {:>6}",
                graph.op(edge.parent)?.name(),
                graph.op(edge.child)?.name()
            ));
        }
        if self.edges.len() > cap {
            lines.push(format!("...(edges truncated: {} more)", self.edges.len() - cap));
        }
        lines.push("=========================".to_string());

        let mut out = lines.join("\n");
        out.push('\n');
        Ok(out)
    }
}

/// Collects every node and parent -> child edge reachable from `root`.
pub fn trace(graph: &Graph, root: NodeId) -> Result<GraphTrace> {
    graph.check(root)?;
    let nodes = graph.nodes.borrow();

    let mut seen = HashSet::from([root]);
    let mut seen_edges = HashSet::new();
    let mut result = GraphTrace {
        nodes: vec![root],
        edges: Vec::new(),
    };
    let mut stack = vec![root];

    while let Some(child) = stack.pop() {
        for &parent in &nodes[child.index()].parents {
            let edge = Edge { parent, child };
            if seen_edges.insert(edge) {
                result.edges.push(edge);
            }
            if seen.insert(parent) {
                result.nodes.push(parent);
                stack.push(parent);
            }
        }
    }

    Ok(result)
}

/// Renders the graph reachable from `root` as text.
///
/// See [`GraphTrace::render`] for the format; pass [`DEFAULT_RENDER_CAP`]
/// for the usual bound.
pub fn render(graph: &Graph, root: NodeId, cap: usize) -> Result<String> {
    trace(graph, root)?.render(graph, cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trace_chain() {
        let graph = Graph::new();
        let a = graph.variable(1.0);
        let b = a.tanh();
        let c = b.relu();

        let t = trace(&graph, c.id()).unwrap();
        assert_eq!(t.nodes.len(), 3);
        assert_eq!(t.edges.len(), 2);
        assert_eq!(t.nodes, vec![c.id(), b.id(), a.id()]);
        assert_eq!(
            t.edges,
            vec![
                Edge { parent: b.id(), child: c.id() },
                Edge { parent: a.id(), child: b.id() },
            ]
        );
    }

    #[test]
    fn test_trace_deduplicates_shared_nodes() {
        let graph = Graph::new();
        let x = graph.variable(2.0);
        let y = x * x;
        let z = y + x;

        let t = trace(&graph, z.id()).unwrap();
        assert_eq!(t.nodes.len(), 3);
        // x -> y (once, despite two operand slots), y -> z, x -> z
        assert_eq!(t.edges.len(), 3);
    }

    #[test]
    fn test_trace_leaf() {
        let graph = Graph::new();
        let x = graph.leaf(1.0);
        let t = trace(&graph, x).unwrap();
        assert_eq!(t.nodes, vec![x]);
        assert!(t.edges.is_empty());
    }

    #[test]
    fn test_render_format() {
        let graph = Graph::new();
        let a = graph.variable(1.0);
        let b = graph.variable(2.0);
        let c = a + b;
        c.backward();

        let text = render(&graph, c.id(), DEFAULT_RENDER_CAP).unwrap();
        let expected = "\
=== Computation Graph ===
op=     + | value=  3.000000 | grad=  1.000000 | parents=2
op=  leaf | value=  1.000000 | grad=  1.000000 | parents=0
op=  leaf | value=  2.000000 | grad=  1.000000 | parents=0
=== Edges (parent -> child) ===
  leaf ->      +
  leaf ->      +
=========================
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_truncates() {
        let graph = Graph::new();
        let x = graph.variable(0.0);
        let mut y = x;
        for _ in 0..10 {
            y = y.tanh();
        }

        let text = render(&graph, y.id(), 4).unwrap();
        let node_lines = text.lines().filter(|l| l.starts_with("op=")).count();
        let edge_lines = text
            .lines()
            .filter(|l| l.contains(" -> ") && !l.starts_with("==="))
            .count();
        assert_eq!(node_lines, 4);
        assert_eq!(edge_lines, 4);
        assert!(text.contains("...(nodes truncated: 7 more)"));
        assert!(text.contains("...(edges truncated: 6 more)"));
    }

    #[test]
    fn test_render_without_truncation_has_no_marker() {
        let graph = Graph::new();
        let x = graph.variable(1.0);
        let text = render(&graph, (x * 2.0).id(), 3).unwrap();
        assert!(!text.contains("truncated"));
    }
}
