//! Configuration options for the Levenberg-Marquardt algorithm.
//!
//! Convergence tolerances, damping schedule, iteration and wall-clock
//! budgets, and the linear solver used for the step.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Method for solving the linear system in the Levenberg-Marquardt step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecompositionMethod {
    /// Cholesky on the damped normal equations
    Cholesky,

    /// QR on the augmented system `[J; sqrt(lambda) I]`
    QR,

    /// Cholesky, falling back to QR when the normal matrix is not positive definite
    #[default]
    Auto,
}

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of accepted iterations. Default: 200
    pub max_iterations: usize,

    /// Tolerance for relative change in cost. Default: 1e-8
    pub ftol: f64,

    /// Tolerance for relative change in parameter values. Default: 1e-8
    pub xtol: f64,

    /// Tolerance for gradient norm. Default: 1e-8
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-10
    pub min_lambda: f64,

    /// Maximum value for lambda. Default: 1e10
    pub max_lambda: f64,

    /// Method to use for solving the linear system. Default: Auto
    pub decomposition_method: DecompositionMethod,

    /// Wall-clock budget for one minimization. Default: none
    pub max_duration: Option<Duration>,

    /// Whether to calculate and return the Jacobian at the solution. Default: false
    pub calc_jacobian: bool,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-10,
            max_lambda: 1e10,
            decomposition_method: DecompositionMethod::default(),
            max_duration: None,
            calc_jacobian: false,
        }
    }
}
