//! # Uncertainty Calculation
//!
//! Standard errors and correlations for fitted parameters, estimated from
//! the Jacobian at the solution in the same way lmfit-py does:
//! `covar = redchi * inv(J^T J)`, mapped from the optimizer's internal space
//! back to parameter space through the bounds transform.

mod covariance;

pub use covariance::{
    calculate_correlation, calculate_covariance, invert, scale_covariance,
    standard_errors_from_covariance,
};

use crate::parameters::Parameters;
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// Uncertainty estimates for the varying parameters of a fit.
#[derive(Debug, Clone)]
pub struct UncertaintyResult {
    /// Names of the varying parameters, in matrix order
    pub names: Vec<String>,
    /// Covariance matrix in parameter (external) space
    pub covariance: Array2<f64>,
    /// Correlation matrix derived from covariance
    pub correlation: Array2<f64>,
    /// Standard error per varying parameter
    pub standard_errors: BTreeMap<String, f64>,
}

impl UncertaintyResult {
    /// Correlation between two varying parameters.
    pub fn correlation_between(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.correlation[[i, j]])
    }
}

/// Estimate uncertainties for the varying parameters of `params`.
///
/// `jacobian` is taken with respect to the internal values `internal` (one
/// column per varying parameter). Returns `None` when there are no degrees of
/// freedom or `J^T J` is singular.
pub fn uncertainty_from_jacobian(
    jacobian: &Array2<f64>,
    internal: &Array1<f64>,
    params: &Parameters,
    chisqr: f64,
    nfree: usize,
) -> Option<UncertaintyResult> {
    if nfree == 0 || jacobian.ncols() != internal.len() {
        return None;
    }
    let redchi = chisqr / nfree as f64;
    let internal_covar = calculate_covariance(jacobian, redchi)?;

    let varying = params.varying();
    if varying.len() != internal.len() {
        return None;
    }
    let scale: Array1<f64> = varying
        .iter()
        .zip(internal.iter())
        .map(|(p, &x)| p.bounds_transform().derivative(x))
        .collect();

    let covariance = scale_covariance(&internal_covar, &scale);
    let correlation = calculate_correlation(&covariance);
    let errors = standard_errors_from_covariance(&covariance);

    let names: Vec<String> = varying.iter().map(|p| p.name().to_string()).collect();
    let standard_errors = names.iter().cloned().zip(errors.iter().copied()).collect();

    Some(UncertaintyResult {
        names,
        covariance,
        correlation,
        standard_errors,
    })
}
