//! Computation graph for reverse-mode automatic differentiation.
//!
//! Nodes live in an arena owned by [`Graph`] and are addressed by stable
//! [`NodeId`] indices. A node only ever references nodes created before it,
//! so the parent relation is acyclic by construction and shared ancestors
//! (diamond dependencies) are stored once.

use crate::error::{AutodiffError, Result};
use crate::ops::Op;
use crate::value::Value;
use std::cell::RefCell;
use std::fmt;

/// Unique identifier for nodes in the computation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in its graph's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node{}", self.0)
    }
}

/// A node in the computation graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Forward value, fixed at construction for non-leaf nodes
    pub value: f64,
    /// Accumulated gradient of the last backward root with respect to this node
    pub grad: f64,
    /// The operation that produced this node
    pub op: Op,
    /// Operand nodes, in operand order
    pub parents: Vec<NodeId>,
}

impl Node {
    /// Checks if this node is a leaf (has no operation).
    pub fn is_leaf(&self) -> bool {
        matches!(self.op, Op::Leaf)
    }
}

/// The computation graph structure.
///
/// All methods take `&self`: node storage sits behind a `RefCell` so that
/// [`Value`] handles can borrow the graph while gradients accumulate.
#[derive(Debug, Default)]
pub struct Graph {
    pub(crate) nodes: RefCell<Vec<Node>>,
}

impl Graph {
    /// Creates a new empty computation graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// Returns true if no node has been created yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Creates a leaf node holding `value`.
    pub fn leaf(&self, value: f64) -> NodeId {
        self.push(value, Op::Leaf, Vec::new())
    }

    /// Creates a leaf node and returns a handle to it.
    pub fn variable(&self, value: f64) -> Value<'_> {
        Value::new(self, self.leaf(value))
    }

    /// Returns a handle to an existing node.
    pub fn handle(&self, id: NodeId) -> Result<Value<'_>> {
        self.check(id)?;
        Ok(Value::new(self, id))
    }

    /// Gets the forward value of a node.
    pub fn value(&self, id: NodeId) -> Result<f64> {
        self.check(id)?;
        Ok(self.value_of(id))
    }

    /// Gets the accumulated gradient of a node.
    pub fn grad(&self, id: NodeId) -> Result<f64> {
        self.check(id)?;
        Ok(self.grad_of(id))
    }

    /// Gets the operation tag of a node.
    pub fn op(&self, id: NodeId) -> Result<Op> {
        self.check(id)?;
        Ok(self.op_of(id))
    }

    /// Gets the parents of a node in operand order.
    pub fn parents(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.check(id)?;
        Ok(self.nodes.borrow()[id.0].parents.clone())
    }

    /// Returns a snapshot of a node.
    pub fn node(&self, id: NodeId) -> Result<Node> {
        self.check(id)?;
        Ok(self.nodes.borrow()[id.0].clone())
    }

    /// Overwrites the value of a leaf.
    ///
    /// Internal nodes keep the value computed when they were created, so this
    /// fails with [`AutodiffError::NotALeaf`] for them. Nodes built on top of
    /// the leaf earlier are not recomputed; rebuild the expression to see the
    /// new value propagate.
    pub fn set_value(&self, id: NodeId, value: f64) -> Result<()> {
        self.ensure_leaf(id)?;
        self.nodes.borrow_mut()[id.0].value = value;
        Ok(())
    }

    /// Resets the gradient of every node to zero.
    pub fn zero_grad(&self) {
        for node in self.nodes.borrow_mut().iter_mut() {
            node.grad = 0.0;
        }
    }

    /// Resets the gradient of every node reachable from `root`.
    pub fn zero_grad_from(&self, root: NodeId) -> Result<()> {
        let order = crate::backward::topological_order(self, root)?;
        let mut nodes = self.nodes.borrow_mut();
        for id in order {
            nodes[id.0].grad = 0.0;
        }
        Ok(())
    }

    /// Fails unless `id` names a leaf of this graph.
    pub(crate) fn ensure_leaf(&self, id: NodeId) -> Result<()> {
        self.check(id)?;
        let op = self.op_of(id);
        if op.is_leaf() {
            Ok(())
        } else {
            Err(AutodiffError::not_a_leaf(id, op.name()))
        }
    }

    /// Fails unless `id` indexes into this graph's arena.
    pub(crate) fn check(&self, id: NodeId) -> Result<()> {
        let len = self.len();
        if id.0 < len {
            Ok(())
        } else {
            Err(AutodiffError::unknown_node(id, len))
        }
    }

    /// Appends a node to the arena.
    pub(crate) fn push(&self, value: f64, op: Op, parents: Vec<NodeId>) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len());
        nodes.push(Node {
            id,
            value,
            grad: 0.0,
            op,
            parents,
        });
        id
    }

    pub(crate) fn value_of(&self, id: NodeId) -> f64 {
        self.nodes.borrow()[id.0].value
    }

    pub(crate) fn grad_of(&self, id: NodeId) -> f64 {
        self.nodes.borrow()[id.0].grad
    }

    pub(crate) fn op_of(&self, id: NodeId) -> Op {
        self.nodes.borrow()[id.0].op
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_creation() {
        let graph = Graph::new();
        assert_eq!(graph.len(), 0);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_leaf_creation() {
        let graph = Graph::new();
        let x = graph.leaf(3.0);

        assert_eq!(graph.len(), 1);
        assert_eq!(x.index(), 0);
        assert_eq!(graph.value(x).unwrap(), 3.0);
        assert_eq!(graph.grad(x).unwrap(), 0.0);
        assert!(graph.node(x).unwrap().is_leaf());
        assert!(graph.parents(x).unwrap().is_empty());
    }

    #[test]
    fn test_node_ids_are_sequential() {
        let graph = Graph::new();
        let a = graph.leaf(1.0);
        let b = graph.leaf(2.0);
        let c = graph.add(a, b).unwrap();

        assert_eq!(a.to_string(), "Node0");
        assert_eq!(b.to_string(), "Node1");
        assert_eq!(c.to_string(), "Node2");
        assert_eq!(graph.parents(c).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_unknown_node() {
        let other = Graph::new();
        other.leaf(1.0);
        let foreign = other.leaf(2.0);

        let graph = Graph::new();
        graph.leaf(1.0);
        let err = graph.value(foreign).unwrap_err();
        assert_eq!(err, AutodiffError::unknown_node(foreign, 1));
        assert!(graph.handle(foreign).is_err());
    }

    #[test]
    fn test_set_value_on_leaf() {
        let graph = Graph::new();
        let x = graph.leaf(1.0);
        graph.set_value(x, 4.5).unwrap();
        assert_eq!(graph.value(x).unwrap(), 4.5);
    }

    #[test]
    fn test_set_value_rejects_internal_node() {
        let graph = Graph::new();
        let x = graph.leaf(1.0);
        let y = graph.tanh(x).unwrap();

        let err = graph.set_value(y, 0.0).unwrap_err();
        assert!(matches!(err, AutodiffError::NotALeaf { .. }));
        assert_eq!(graph.value(y).unwrap(), 1.0_f64.tanh());
    }

    #[test]
    fn test_zero_grad() {
        let graph = Graph::new();
        let x = graph.variable(2.0);
        let y = x * x;
        y.backward();
        assert_eq!(x.grad(), 4.0);

        graph.zero_grad();
        assert_eq!(x.grad(), 0.0);
        assert_eq!(y.grad(), 0.0);
    }

    #[test]
    fn test_zero_grad_from_only_touches_reachable_nodes() {
        let graph = Graph::new();
        let x = graph.variable(2.0);
        let unrelated = graph.variable(5.0);
        let u = unrelated * 3.0;
        u.backward();

        let y = x * 3.0;
        y.backward();
        graph.zero_grad_from(y.id()).unwrap();

        assert_eq!(x.grad(), 0.0);
        assert_eq!(unrelated.grad(), 3.0);
    }
}
