//! Error types for graph construction and gradient checking.
//!
//! Numeric edge cases (division by a zero-valued node, overflow inside
//! `pow`, `tanh` or `sigmoid`) are not errors: they propagate IEEE-754
//! infinities and NaNs like ordinary floating-point arithmetic.

use crate::graph::NodeId;
use thiserror::Error;

/// Errors that can occur while building or inspecting a computation graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AutodiffError {
    /// Node id does not belong to this graph.
    ///
    /// Raised when an id minted by another graph (or one that was discarded
    /// by a gradient check) is handed to a graph operation.
    #[error("Unknown node {id}: graph holds {len} nodes")]
    UnknownNode {
        /// The offending id
        id: NodeId,
        /// Number of nodes currently in the graph
        len: usize,
    },

    /// Exponent passed to `pow` is not a numeric literal.
    #[error("Invalid exponent: {reason}")]
    InvalidExponent {
        /// Description of why the exponent was rejected
        reason: String,
    },

    /// Operation requires a leaf but received an internal node.
    #[error("{id} is not a leaf (op: {op})")]
    NotALeaf {
        /// The offending id
        id: NodeId,
        /// Display tag of the node's operation
        op: String,
    },

    /// Invalid argument value.
    #[error("Invalid argument `{parameter}`: {reason}")]
    InvalidArgument {
        /// Name of the parameter
        parameter: String,
        /// Description of the problem
        reason: String,
    },
}

impl AutodiffError {
    /// Create an UnknownNode error.
    pub fn unknown_node(id: NodeId, len: usize) -> Self {
        Self::UnknownNode { id, len }
    }

    /// Create an InvalidExponent error with a custom reason.
    pub fn invalid_exponent<S: Into<String>>(reason: S) -> Self {
        Self::InvalidExponent {
            reason: reason.into(),
        }
    }

    /// Create a NotALeaf error.
    pub fn not_a_leaf<S: Into<String>>(id: NodeId, op: S) -> Self {
        Self::NotALeaf { id, op: op.into() }
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument<S1, S2>(parameter: S1, reason: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::InvalidArgument {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, AutodiffError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    #[test]
    fn test_error_display() {
        let graph = Graph::new();
        let id = graph.leaf(1.0);

        let err = AutodiffError::unknown_node(id, 0);
        assert_eq!(err.to_string(), "Unknown node Node0: graph holds 0 nodes");

        let err = AutodiffError::not_a_leaf(id, "tanh");
        assert_eq!(err.to_string(), "Node0 is not a leaf (op: tanh)");

        let err = AutodiffError::invalid_argument("eps", "must be positive");
        assert_eq!(err.to_string(), "Invalid argument `eps`: must be positive");
    }

    #[test]
    fn test_error_variants() {
        let errors = vec![
            AutodiffError::invalid_exponent("exponent must be a number"),
            AutodiffError::invalid_argument("cap", "too small"),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
        assert!(matches!(
            AutodiffError::invalid_exponent("x"),
            AutodiffError::InvalidExponent { .. }
        ));
    }
}
