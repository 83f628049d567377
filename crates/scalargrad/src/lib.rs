//! Reverse-mode automatic differentiation over scalar values.
//!
//! This crate records scalar operations in a dynamically built computation
//! graph and computes exact gradients of an output with respect to every
//! ancestor in a single backward traversal.
//!
//! # Features
//!
//! - **Computation graphs**: arena-backed DAG with shared ancestors
//! - **Reverse mode AD**: iterative topological sort, additive accumulation
//! - **Introspection**: reachable node/edge sets and a bounded text dump
//! - **Gradient checking**: central differences independent of the engine
//!
//! # Architecture
//!
//! 1. **Graph**: owns every node and its value, gradient and operation tag
//! 2. **Operations**: forward values plus one local gradient rule per tag
//! 3. **Backward**: seeds the root and propagates gradients in reverse order
//!
//! # Example
//!
//! ```
//! use scalargrad::prelude::*;
//!
//! let graph = Graph::new();
//! let x = graph.variable(2.0);
//! let y = x.powf(3.0) + 3.0 * x;
//!
//! y.backward();
//! // dy/dx = 3x^2 + 3
//! assert!((x.grad() - 15.0).abs() < 1e-12);
//! ```
//!
//! Gradients accumulate across passes. Zeroing them between independent
//! passes, and updating leaf values from the gradients, is left to the
//! caller:
//!
//! ```
//! use scalargrad::prelude::*;
//!
//! let graph = Graph::new();
//! let w = graph.variable(0.0);
//! for _ in 0..100 {
//!     let loss = (w - 3.0).powf(2.0);
//!     graph.zero_grad_from(loss.id()).unwrap();
//!     loss.backward();
//!     w.set_value(w.value() - 0.1 * w.grad()).unwrap();
//! }
//! assert!((w.value() - 3.0).abs() < 1e-6);
//! ```

pub mod backward;
pub mod error;
pub mod gradcheck;
pub mod graph;
pub mod ops;
pub mod trace;
pub mod value;

// Re-export key types
pub use backward::{backward, topological_order};
pub use error::{AutodiffError, Result};
pub use gradcheck::{check_gradient, numerical_grad, GradCheckConfig, GradientCheckResult, DEFAULT_EPS};
pub use graph::{Graph, Node, NodeId};
pub use ops::{stable_sigmoid, Exponent, Op};
pub use trace::{render, trace, Edge, GraphTrace, DEFAULT_RENDER_CAP};
pub use value::Value;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::backward::{backward, topological_order};
    pub use crate::error::AutodiffError;
    pub use crate::gradcheck::{check_gradient, numerical_grad, GradCheckConfig, DEFAULT_EPS};
    pub use crate::graph::{Graph, NodeId};
    pub use crate::ops::{Exponent, Op};
    pub use crate::trace::{render, trace, DEFAULT_RENDER_CAP};
    pub use crate::value::Value;
}
