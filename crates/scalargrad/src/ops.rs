//! Operations for the computation graph.
//!
//! Every operation computes its forward value eagerly and tags the new node
//! with an [`Op`] carrying exactly the data its local gradient rule needs.
//! The backward pass dispatches on that tag; no closures are stored.

use crate::error::{AutodiffError, Result};
use crate::graph::{Graph, NodeId};
use crate::value::Value;
use std::borrow::Cow;

/// Operation tag of a node, selecting its local gradient rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    /// Independent variable or constant.
    Leaf,
    /// `a + b`
    Add,
    /// `-a`
    Negate,
    /// `a * b`
    Multiply,
    /// `a^exponent` for a numeric exponent.
    Power {
        /// The literal exponent
        exponent: f64,
    },
    /// `max(0, a)`
    Relu,
    /// `tanh(a)`
    Tanh {
        /// Cached forward result
        output: f64,
    },
    /// Logistic sigmoid of `a`.
    Sigmoid {
        /// Cached forward result
        output: f64,
    },
}

impl Op {
    /// Returns the display tag of this operation.
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            Self::Leaf => Cow::Borrowed("leaf"),
            Self::Add => Cow::Borrowed("+"),
            Self::Negate => Cow::Borrowed("neg"),
            Self::Multiply => Cow::Borrowed("*"),
            Self::Power { exponent } => Cow::Owned(format!("**{exponent}")),
            Self::Relu => Cow::Borrowed("ReLU"),
            Self::Tanh { .. } => Cow::Borrowed("tanh"),
            Self::Sigmoid { .. } => Cow::Borrowed("sigmoid"),
        }
    }

    /// Number of operands the operation consumes.
    pub fn arity(&self) -> usize {
        match self {
            Self::Leaf => 0,
            Self::Add | Self::Multiply => 2,
            _ => 1,
        }
    }

    /// Checks if this is the leaf tag.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf)
    }

    /// Computes the contribution to each parent's gradient.
    ///
    /// # Arguments
    /// * `parent_values` - Forward values of the parents, in operand order
    /// * `grad` - The gradient accumulated at the node itself
    ///
    /// # Returns
    /// One contribution per parent; slots past [`Op::arity`] are zero.
    pub fn local_gradients(&self, parent_values: &[f64], grad: f64) -> [f64; 2] {
        match *self {
            Self::Leaf => [0.0, 0.0],
            Self::Add => [grad, grad],
            Self::Negate => [-grad, 0.0],
            Self::Multiply => [parent_values[1] * grad, parent_values[0] * grad],
            Self::Power { exponent } => {
                let a = parent_values[0];
                [exponent * a.powf(exponent - 1.0) * grad, 0.0]
            }
            // Subgradient at exactly zero is 0.
            Self::Relu => {
                let mask = if parent_values[0] > 0.0 { 1.0 } else { 0.0 };
                [mask * grad, 0.0]
            }
            Self::Tanh { output } => [(1.0 - output * output) * grad, 0.0],
            Self::Sigmoid { output } => [output * (1.0 - output) * grad, 0.0],
        }
    }
}

/// Exponent argument of [`Graph::pow`].
///
/// Only numeric literals are differentiable exponents; a node exponent is
/// accepted by the type so that it can be rejected with a proper error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Exponent {
    /// Plain number
    Literal(f64),
    /// Another node of the graph (rejected)
    Node(NodeId),
}

impl From<f64> for Exponent {
    fn from(value: f64) -> Self {
        Self::Literal(value)
    }
}

impl From<i32> for Exponent {
    fn from(value: i32) -> Self {
        Self::Literal(f64::from(value))
    }
}

impl From<NodeId> for Exponent {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<Value<'_>> for Exponent {
    fn from(value: Value<'_>) -> Self {
        Self::Node(value.id())
    }
}

/// Logistic sigmoid evaluated without overflowing `exp`.
///
/// Branches on the sign of `x` so that the exponential argument is never
/// positive.
pub fn stable_sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

impl Graph {
    /// Creates `a + b`.
    pub fn add(&self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.check(a)?;
        self.check(b)?;
        Ok(self.record_add(a, b))
    }

    /// Creates `-a`.
    pub fn neg(&self, a: NodeId) -> Result<NodeId> {
        self.check(a)?;
        Ok(self.record_neg(a))
    }

    /// Creates `a - b`, recorded as `a + (-b)`.
    pub fn sub(&self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.check(a)?;
        self.check(b)?;
        Ok(self.record_sub(a, b))
    }

    /// Creates `a * b`.
    pub fn mul(&self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.check(a)?;
        self.check(b)?;
        Ok(self.record_mul(a, b))
    }

    /// Creates `a^exponent`.
    ///
    /// The exponent must be a numeric literal; passing a node yields
    /// [`AutodiffError::InvalidExponent`] and nothing is added to the graph.
    pub fn pow(&self, a: NodeId, exponent: impl Into<Exponent>) -> Result<NodeId> {
        match exponent.into() {
            Exponent::Literal(exponent) => {
                self.check(a)?;
                Ok(self.record_pow(a, exponent))
            }
            Exponent::Node(id) => Err(AutodiffError::invalid_exponent(format!(
                "exponent must be a numeric literal, got {id}"
            ))),
        }
    }

    /// Creates `a / b`, recorded as `a * b^-1`.
    ///
    /// A zero-valued `b` is not special-cased and yields infinities or NaN.
    pub fn div(&self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.check(a)?;
        self.check(b)?;
        Ok(self.record_div(a, b))
    }

    /// Creates `max(0, a)`.
    pub fn relu(&self, a: NodeId) -> Result<NodeId> {
        self.check(a)?;
        Ok(self.record_relu(a))
    }

    /// Creates `tanh(a)`.
    pub fn tanh(&self, a: NodeId) -> Result<NodeId> {
        self.check(a)?;
        Ok(self.record_tanh(a))
    }

    /// Creates the logistic sigmoid of `a`.
    pub fn sigmoid(&self, a: NodeId) -> Result<NodeId> {
        self.check(a)?;
        Ok(self.record_sigmoid(a))
    }

    // The record_* constructors assume their operands belong to this graph.

    pub(crate) fn record_add(&self, a: NodeId, b: NodeId) -> NodeId {
        let value = self.value_of(a) + self.value_of(b);
        self.push(value, Op::Add, vec![a, b])
    }

    pub(crate) fn record_neg(&self, a: NodeId) -> NodeId {
        let value = -self.value_of(a);
        self.push(value, Op::Negate, vec![a])
    }

    pub(crate) fn record_sub(&self, a: NodeId, b: NodeId) -> NodeId {
        let negated = self.record_neg(b);
        self.record_add(a, negated)
    }

    pub(crate) fn record_mul(&self, a: NodeId, b: NodeId) -> NodeId {
        let value = self.value_of(a) * self.value_of(b);
        self.push(value, Op::Multiply, vec![a, b])
    }

    pub(crate) fn record_pow(&self, a: NodeId, exponent: f64) -> NodeId {
        let value = self.value_of(a).powf(exponent);
        self.push(value, Op::Power { exponent }, vec![a])
    }

    pub(crate) fn record_div(&self, a: NodeId, b: NodeId) -> NodeId {
        let reciprocal = self.record_pow(b, -1.0);
        self.record_mul(a, reciprocal)
    }

    pub(crate) fn record_relu(&self, a: NodeId) -> NodeId {
        let x = self.value_of(a);
        let value = if x > 0.0 { x } else { 0.0 };
        self.push(value, Op::Relu, vec![a])
    }

    pub(crate) fn record_tanh(&self, a: NodeId) -> NodeId {
        let output = self.value_of(a).tanh();
        self.push(output, Op::Tanh { output }, vec![a])
    }

    pub(crate) fn record_sigmoid(&self, a: NodeId) -> NodeId {
        let output = stable_sigmoid(self.value_of(a));
        self.push(output, Op::Sigmoid { output }, vec![a])
    }
}
