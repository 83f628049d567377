//! Handle type with operator overloading.
//!
//! [`Value`] pairs a [`NodeId`] with the graph that owns it, so expressions
//! read like ordinary arithmetic: `(x * x + 3.0 * x - 1.0).tanh()`. Plain
//! `f64` operands on either side of an operator become fresh leaves.

use crate::backward;
use crate::error::Result;
use crate::graph::{Graph, NodeId};
use crate::ops::{Exponent, Op};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A node of a [`Graph`] together with a reference to the graph.
///
/// Handles are `Copy`; copying one does not duplicate the node.
#[derive(Clone, Copy)]
pub struct Value<'g> {
    graph: &'g Graph,
    id: NodeId,
}

impl<'g> Value<'g> {
    pub(crate) fn new(graph: &'g Graph, id: NodeId) -> Self {
        Self { graph, id }
    }

    /// Id of the underlying node.
    pub fn id(self) -> NodeId {
        self.id
    }

    /// The graph owning the node.
    pub fn graph(self) -> &'g Graph {
        self.graph
    }

    /// Forward value.
    pub fn value(self) -> f64 {
        self.graph.value_of(self.id)
    }

    /// Accumulated gradient.
    pub fn grad(self) -> f64 {
        self.graph.grad_of(self.id)
    }

    /// Operation tag.
    pub fn op(self) -> Op {
        self.graph.op_of(self.id)
    }

    /// Checks if the node is a leaf.
    pub fn is_leaf(self) -> bool {
        self.op().is_leaf()
    }

    /// Overwrites the value of a leaf. See [`Graph::set_value`].
    pub fn set_value(self, value: f64) -> Result<()> {
        self.graph.set_value(self.id, value)
    }

    /// Raises to a power given as a number or, erroneously, as a node.
    pub fn pow(self, exponent: impl Into<Exponent>) -> Result<Self> {
        let id = self.graph.pow(self.id, exponent)?;
        Ok(Self::new(self.graph, id))
    }

    /// Raises to a numeric power.
    pub fn powf(self, exponent: f64) -> Self {
        self.wrap(self.graph.record_pow(self.id, exponent))
    }

    /// Rectified linear unit.
    pub fn relu(self) -> Self {
        self.wrap(self.graph.record_relu(self.id))
    }

    /// Hyperbolic tangent.
    pub fn tanh(self) -> Self {
        self.wrap(self.graph.record_tanh(self.id))
    }

    /// Logistic sigmoid.
    pub fn sigmoid(self) -> Self {
        self.wrap(self.graph.record_sigmoid(self.id))
    }

    /// Runs a backward pass rooted at this node.
    ///
    /// Gradients are added to whatever the nodes already hold; zero them
    /// first when that is not wanted.
    pub fn backward(self) {
        backward::backward_from(self.graph, self.id);
    }

    fn wrap(self, id: NodeId) -> Self {
        Self::new(self.graph, id)
    }

    fn constant(self, value: f64) -> NodeId {
        self.graph.leaf(value)
    }

    fn same_graph(self, other: Self) {
        debug_assert!(
            std::ptr::eq(self.graph, other.graph),
            "operands belong to different graphs"
        );
    }
}

impl From<Value<'_>> for NodeId {
    fn from(value: Value<'_>) -> Self {
        value.id
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Value(data={:.6}, grad={:.6}, op={})",
            self.value(),
            self.grad(),
            self.op().name()
        )
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl<'g> Neg for Value<'g> {
    type Output = Value<'g>;

    fn neg(self) -> Value<'g> {
        self.wrap(self.graph.record_neg(self.id))
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $record:ident) => {
        impl<'g> $trait for Value<'g> {
            type Output = Value<'g>;

            fn $method(self, rhs: Value<'g>) -> Value<'g> {
                self.same_graph(rhs);
                self.wrap(self.graph.$record(self.id, rhs.id))
            }
        }

        impl<'g> $trait<f64> for Value<'g> {
            type Output = Value<'g>;

            fn $method(self, rhs: f64) -> Value<'g> {
                let rhs = self.constant(rhs);
                self.wrap(self.graph.$record(self.id, rhs))
            }
        }

        impl<'g> $trait<Value<'g>> for f64 {
            type Output = Value<'g>;

            fn $method(self, rhs: Value<'g>) -> Value<'g> {
                let lhs = rhs.constant(self);
                rhs.wrap(rhs.graph.$record(lhs, rhs.id))
            }
        }
    };
}

impl_binary_op!(Add, add, record_add);
impl_binary_op!(Sub, sub, record_sub);
impl_binary_op!(Mul, mul, record_mul);
impl_binary_op!(Div, div, record_div);
