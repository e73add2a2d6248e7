//! Problem definition trait.
//!
//! This module defines the `Problem` trait, which represents a nonlinear
//! least squares problem to be solved with the Levenberg-Marquardt algorithm.
//! Kinetic fits implement it in [`crate::modeler::residual`].

use crate::error::Result;
use ndarray::{Array1, Array2};

/// A nonlinear least squares problem over an internal parameter vector.
pub trait Problem {
    /// Evaluate the residuals at the given parameters.
    ///
    /// An `Err` from this method at a trial point is treated by the optimizer
    /// according to its kind: ODE failures reject the step, anything else
    /// aborts the fit.
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Evaluate the Jacobian matrix at the given parameters.
    ///
    /// The default implementation uses forward finite differences.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// Check if this problem provides a custom Jacobian implementation.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}
