//! Convergence criteria for the optimizer.
//!
//! This module defines the termination states of a minimization and the
//! tests applied after every accepted step.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Possible termination states for an optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// Converged due to a small relative parameter change.
    ParameterConvergence,

    /// Converged due to a small relative cost change.
    FunctionValueConvergence,

    /// Converged due to a small gradient.
    GradientConvergence,

    /// Terminated after the maximum number of iterations.
    MaxIterationsReached,

    /// Terminated after the wall-clock budget ran out.
    TimeLimitReached,

    /// No step could reduce the cost before lambda hit its maximum.
    LambdaLimitReached,

    /// Terminated due to non-finite residuals or a failed Jacobian.
    NumericalError,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has terminated (either converged or failed).
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::Running => "Optimization is still running",
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => "Converged: small function value change",
            ConvergenceStatus::GradientConvergence => "Converged: small gradient",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::TimeLimitReached => "Terminated: time budget exhausted",
            ConvergenceStatus::LambdaLimitReached => {
                "Terminated: failed to decrease cost, and lambda reached maximum"
            }
            ConvergenceStatus::NumericalError => "Terminated: numerical error",
        }
    }
}

/// Tolerances checked after each accepted step.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Tolerance for relative change in parameter values.
    pub xtol: f64,

    /// Tolerance for relative change in cost.
    pub ftol: f64,

    /// Maximum number of iterations.
    pub max_iterations: usize,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            xtol: 1e-8,
            ftol: 1e-8,
            max_iterations: 200,
        }
    }
}

impl ConvergenceCriteria {
    pub fn new(xtol: f64, ftol: f64, max_iterations: usize) -> Self {
        Self {
            xtol,
            ftol,
            max_iterations,
        }
    }

    /// Classify an accepted step from `params` (cost `cost`) to `new_params`
    /// (cost `new_cost`), `iterations` steps into the run.
    ///
    /// Convergence wins over the iteration limit when both apply.
    pub fn check(
        &self,
        params: &Array1<f64>,
        new_params: &Array1<f64>,
        cost: f64,
        new_cost: f64,
        iterations: usize,
    ) -> ConvergenceStatus {
        if self.step_converged(params, new_params) {
            return ConvergenceStatus::ParameterConvergence;
        }

        let cost_change = (cost - new_cost).abs() / cost.max(1e-10);
        if cost_change < self.ftol {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        if iterations >= self.max_iterations {
            return ConvergenceStatus::MaxIterationsReached;
        }

        ConvergenceStatus::Running
    }

    /// Whether the move from `params` to `new_params` is below `xtol`
    /// relative to the parameter scale.
    pub fn step_converged(&self, params: &Array1<f64>, new_params: &Array1<f64>) -> bool {
        relative_change(params, new_params) < self.xtol
    }
}

/// Largest per-component change, relative to `max(|x|, 1)`.
fn relative_change(params: &Array1<f64>, new_params: &Array1<f64>) -> f64 {
    new_params
        .iter()
        .zip(params.iter())
        .map(|(a, b)| (a - b).abs() / b.abs().max(1.0))
        .fold(0.0, f64::max)
}
