//! Backward pass implementation for automatic differentiation.
//!
//! The pass orders every node reachable from the root so that parents come
//! before children, seeds the root's gradient with 1, then walks the order in
//! reverse applying each node's local gradient rule exactly once. By the time
//! a node's rule runs, all of its consumers have already added their
//! contributions to its gradient.
//!
//! Both walks use an explicit stack, so graph depth is bounded by heap memory
//! rather than by the call stack.

use crate::error::Result;
use crate::graph::{Graph, NodeId};
use log::{debug, trace};
use std::collections::HashSet;

/// Returns every node reachable from `root`, each one after all its parents.
///
/// The root is always the last element.
pub fn topological_order(graph: &Graph, root: NodeId) -> Result<Vec<NodeId>> {
    graph.check(root)?;
    Ok(order_from(graph, root))
}

/// Performs backward pass (backpropagation) through the graph.
///
/// Overwrites the root's gradient with 1.0 and adds every contribution to
/// the gradients of its ancestors. Gradients are never reset implicitly:
/// running two passes over overlapping graphs sums their results.
pub fn backward(graph: &Graph, root: NodeId) -> Result<()> {
    graph.check(root)?;
    backward_from(graph, root);
    Ok(())
}

/// Backward pass for a root known to belong to `graph`.
pub(crate) fn backward_from(graph: &Graph, root: NodeId) {
    let order = order_from(graph, root);
    debug!("backward from {root}: {} reachable nodes", order.len());

    let mut nodes = graph.nodes.borrow_mut();
    nodes[root.index()].grad = 1.0;

    for &id in order.iter().rev() {
        let node = &nodes[id.index()];
        let (op, grad, arity) = (node.op, node.grad, node.parents.len());

        let mut parent_values = [0.0; 2];
        for (slot, parent) in parent_values.iter_mut().zip(&node.parents) {
            *slot = nodes[parent.index()].value;
        }
        let contributions = op.local_gradients(&parent_values[..arity], grad);
        trace!("{id} ({}): grad={grad}, contributions={:?}", op.name(), &contributions[..arity]);

        for (k, contribution) in contributions.into_iter().take(arity).enumerate() {
            let parent = nodes[id.index()].parents[k];
            nodes[parent.index()].grad += contribution;
        }
    }
}

/// Iterative post-order walk along parent edges.
fn order_from(graph: &Graph, root: NodeId) -> Vec<NodeId> {
    let nodes = graph.nodes.borrow();
    let mut visited = HashSet::from([root]);
    let mut order = Vec::new();
    // Each frame holds a node and the index of the next parent to visit.
    let mut stack = vec![(root, 0_usize)];

    while let Some(frame) = stack.last_mut() {
        let (id, cursor) = *frame;
        let parents = &nodes[id.index()].parents;
        if cursor < parents.len() {
            frame.1 += 1;
            let parent = parents[cursor];
            if visited.insert(parent) {
                stack.push((parent, 0));
            }
        } else {
            order.push(id);
            stack.pop();
        }
    }

    order
}
