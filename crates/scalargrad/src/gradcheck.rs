//! Finite-difference gradient checking.
//!
//! [`numerical_grad`] estimates a derivative by central differences without
//! touching any gradient: it perturbs a leaf, lets the caller rebuild the
//! output from the perturbed value, and restores the graph afterwards.
//! [`check_gradient`] compares that estimate against the backward pass.

use crate::backward;
use crate::error::{AutodiffError, Result};
use crate::graph::{Graph, NodeId};
use log::debug;

/// Default perturbation for central differences.
pub const DEFAULT_EPS: f64 = 1e-6;

/// Configuration for gradient checking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradCheckConfig {
    /// Perturbation applied to the probed leaf
    pub eps: f64,
    /// Maximum absolute difference between analytical and numerical gradients
    pub tolerance: f64,
}

impl Default for GradCheckConfig {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            tolerance: 1e-4,
        }
    }
}

impl GradCheckConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the perturbation.
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Sets the tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn validate(&self) -> Result<()> {
        validate_eps(self.eps)?;
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(AutodiffError::invalid_argument(
                "tolerance",
                format!("must be non-negative, got {}", self.tolerance),
            ));
        }
        Ok(())
    }
}

/// Results from gradient checking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientCheckResult {
    /// Gradient from the backward pass
    pub analytical: f64,
    /// Central-difference estimate
    pub numerical: f64,
    /// `|analytical - numerical|`
    pub abs_error: f64,
    /// Whether the error is within tolerance
    pub passed: bool,
}

/// Puts the graph back the way it was when the guard was created.
///
/// Runs on every exit path, including errors returned by the caller's
/// closure and panics unwinding through it.
struct Restore<'g> {
    graph: &'g Graph,
    len: usize,
    leaf: Option<(NodeId, f64)>,
    grads: Option<Vec<f64>>,
}

impl<'g> Restore<'g> {
    fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            len: graph.len(),
            leaf: None,
            grads: None,
        }
    }
}

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        let Ok(mut nodes) = self.graph.nodes.try_borrow_mut() else {
            return;
        };
        nodes.truncate(self.len);
        if let Some((leaf, value)) = self.leaf {
            nodes[leaf.index()].value = value;
        }
        if let Some(grads) = &self.grads {
            for (node, &grad) in nodes.iter_mut().zip(grads) {
                node.grad = grad;
            }
        }
    }
}

/// Estimates `d f / d x` by central differences.
///
/// `f` rebuilds the output from the current value of `x` and returns the
/// output node. It is evaluated at `x + eps` and `x - eps`; the value of `x`
/// is restored afterwards, and every node `f` created is discarded, so ids
/// obtained inside `f` must not be kept.
///
/// # Arguments
/// * `graph` - The graph owning `x`
/// * `f` - Builds the output node
/// * `x` - The leaf to perturb
/// * `eps` - Positive perturbation, usually [`DEFAULT_EPS`]
pub fn numerical_grad<F>(graph: &Graph, mut f: F, x: NodeId, eps: f64) -> Result<f64>
where
    F: FnMut(&Graph) -> Result<NodeId>,
{
    validate_eps(eps)?;
    graph.ensure_leaf(x)?;
    let original = graph.value_of(x);

    let mut restore = Restore::new(graph);
    restore.leaf = Some((x, original));

    graph.set_value(x, original + eps)?;
    let f_plus = evaluate(graph, &mut f)?;

    graph.set_value(x, original - eps)?;
    let f_minus = evaluate(graph, &mut f)?;

    drop(restore);
    Ok((f_plus - f_minus) / (2.0 * eps))
}

/// Compares the backward-pass gradient of `x` with [`numerical_grad`].
///
/// The graph is left as it was found: nodes built by `f` are discarded and
/// every pre-existing gradient is restored.
pub fn check_gradient<F>(
    graph: &Graph,
    mut f: F,
    x: NodeId,
    config: &GradCheckConfig,
) -> Result<GradientCheckResult>
where
    F: FnMut(&Graph) -> Result<NodeId>,
{
    config.validate()?;
    graph.ensure_leaf(x)?;

    let mut restore = Restore::new(graph);
    restore.grads = Some(graph.nodes.borrow().iter().map(|n| n.grad).collect());

    let root = f(graph)?;
    graph.zero_grad_from(root)?;
    backward::backward(graph, root)?;
    let analytical = graph.grad(x)?;

    let numerical = numerical_grad(graph, &mut f, x, config.eps)?;
    drop(restore);

    let abs_error = (analytical - numerical).abs();
    let passed = abs_error <= config.tolerance;
    debug!("gradient check on {x}: analytical={analytical}, numerical={numerical}, error={abs_error}");

    Ok(GradientCheckResult {
        analytical,
        numerical,
        abs_error,
        passed,
    })
}

fn evaluate<F>(graph: &Graph, f: &mut F) -> Result<f64>
where
    F: FnMut(&Graph) -> Result<NodeId>,
{
    let output = f(graph)?;
    graph.value(output)
}

fn validate_eps(eps: f64) -> Result<()> {
    if eps.is_finite() && eps > 0.0 {
        Ok(())
    } else {
        Err(AutodiffError::invalid_argument(
            "eps",
            format!("must be positive and finite, got {eps}"),
        ))
    }
}
