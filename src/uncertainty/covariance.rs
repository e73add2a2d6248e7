//! # Covariance Matrix Calculations
//!
//! Covariance, correlation and standard errors from the Jacobian at the
//! solution.

use ndarray::{Array1, Array2};

/// Calculate the covariance matrix from a Jacobian matrix.
///
/// For nonlinear least-squares problems the covariance is estimated as
///   covar = redchi * inv(J^T * J)
///
/// Returns `None` when `J^T J` is singular, e.g. when a parameter has no
/// influence on the residuals.
pub fn calculate_covariance(jacobian: &Array2<f64>, redchi: f64) -> Option<Array2<f64>> {
    let jtj = jacobian.t().dot(jacobian);
    let inverse = invert(&jtj)?;
    Some(inverse * redchi)
}

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
pub fn invert(matrix: &Array2<f64>) -> Option<Array2<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return None;
    }

    let scale = matrix.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return if n == 0 { Some(Array2::zeros((0, 0))) } else { None };
    }
    let tolerance = scale * 1e-14;

    let mut a = matrix.clone();
    let mut inv = Array2::<f64>::eye(n);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot_row, col]].abs() <= tolerance {
            return None;
        }
        if pivot_row != col {
            for k in 0..n {
                a.swap([pivot_row, k], [col, k]);
                inv.swap([pivot_row, k], [col, k]);
            }
        }

        let pivot = a[[col, col]];
        for k in 0..n {
            a[[col, k]] /= pivot;
            inv[[col, k]] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                a[[row, k]] -= factor * a[[col, k]];
                inv[[row, k]] -= factor * inv[[col, k]];
            }
        }
    }

    Some(inv)
}

/// Map a covariance matrix from internal to external parameter space.
///
/// `scale[i]` is `d external_i / d internal_i` at the solution.
pub fn scale_covariance(covar: &Array2<f64>, scale: &Array1<f64>) -> Array2<f64> {
    let n = covar.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| covar[[i, j]] * scale[i] * scale[j])
}

/// Calculate correlation matrix from covariance matrix.
///
///   correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    let mut correl = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..n {
            if i == j {
                correl[[i, j]] = 1.0;
            } else {
                let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
                if denom > 0.0 {
                    correl[[i, j]] = covar[[i, j]] / denom;
                }
            }
        }
    }

    correl
}

/// Standard errors are the square roots of the covariance diagonal.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar
        .diag()
        .mapv(|v| if v > 0.0 { v.sqrt() } else { 0.0 })
}
