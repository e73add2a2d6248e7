//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! The minimizer works on an unconstrained internal parameter vector. Trial
//! steps whose residual evaluation fails inside the ODE integrator are
//! rejected like any step that does not reduce the cost.

use log::{debug, warn};
use ndarray::{Array1, Array2};
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{KinFitError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference;
use crate::utils::matrix_convert::{
    faer_to_ndarray, faer_vec_to_ndarray, ndarray_to_faer, ndarray_vec_to_faer,
};

use super::config::{DecompositionMethod, LmConfig};
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted iterations
    pub iterations: usize,

    /// Number of function evaluations
    pub func_evals: usize,

    /// How the run terminated
    pub status: ConvergenceStatus,

    /// Whether the optimization converged
    pub success: bool,

    /// A message describing the result
    pub message: String,

    /// The Jacobian matrix at the solution (if requested)
    pub jacobian: Option<Array2<f64>>,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LmConfig,
}

/// Outcome of one trial evaluation.
enum Trial {
    Accepted(Array1<f64>, f64),
    Rejected,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for relative change in cost.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for relative change in parameter values.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for gradient norm.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set a wall-clock budget; running out is reported as non-convergence.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.config.max_duration = Some(budget);
        self
    }

    /// Set the method used for solving the linear system.
    pub fn with_decomposition_method(mut self, method: DecompositionMethod) -> Self {
        self.config.decomposition_method = method;
        self
    }

    /// Set whether to calculate and return the Jacobian at the solution.
    pub fn with_calc_jacobian(mut self, calc_jacobian: bool) -> Self {
        self.config.calc_jacobian = calc_jacobian;
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// Errors from the problem at the initial point propagate. Afterwards,
    /// a trial point that fails with a numeric instability is rejected and
    /// the damping increased. Running out of iterations, time or damping is
    /// not an error; it is reported through [`LmResult::status`].
    pub fn minimize<P: Problem>(&self, problem: &P, initial_params: Array1<f64>) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(KinFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let started = Instant::now();
        let criteria = ConvergenceCriteria::new(
            self.config.xtol,
            self.config.ftol,
            self.config.max_iterations,
        );

        let mut params = initial_params;
        let mut lambda = self.config.initial_lambda;

        let mut residuals = problem.eval(&params)?;
        let mut cost: f64 = residuals.iter().map(|r| r.powi(2)).sum();
        let mut func_evals = 1;
        let mut iterations = 0;

        debug!(
            "LM start: {} parameters, {} residuals, cost {:.6e}",
            n_params,
            residuals.len(),
            cost
        );

        let status = if !cost.is_finite() {
            warn!("Residuals at the initial point are not finite");
            ConvergenceStatus::NumericalError
        } else if n_params == 0 {
            ConvergenceStatus::GradientConvergence
        } else {
            'outer: loop {
                if self.budget_exhausted(started) {
                    break ConvergenceStatus::TimeLimitReached;
                }
                if iterations >= self.config.max_iterations {
                    break ConvergenceStatus::MaxIterationsReached;
                }

                let jacobian = match self.jacobian(problem, &params, &residuals) {
                    Ok(jac) => jac,
                    Err(e) if e.is_numeric_instability() => {
                        warn!("Jacobian evaluation failed: {}", e);
                        break ConvergenceStatus::NumericalError;
                    }
                    Err(e) => return Err(e),
                };
                if !problem.has_custom_jacobian() {
                    func_evals += n_params;
                }

                let j = ndarray_to_faer(&jacobian);
                let r = ndarray_vec_to_faer(&residuals);

                // Compute gradient g = J^T * r
                let g = j.transpose() * &r;
                let gradient_norm = g.norm_l2();
                if gradient_norm < self.config.gtol {
                    break ConvergenceStatus::GradientConvergence;
                }

                // Normal equations, fixed for this iteration
                let jtj = faer_to_ndarray(&(j.transpose() * &j));
                let jtr = faer_vec_to_ndarray(&g);

                // Raise lambda until a step reduces the cost
                loop {
                    let step = self.calculate_step(&jacobian, &residuals, &jtj, &jtr, lambda);
                    let new_params = &params + &step;

                    let trial = match problem.eval(&new_params) {
                        Ok(new_residuals) => {
                            func_evals += 1;
                            let new_cost: f64 = new_residuals.iter().map(|r| r.powi(2)).sum();
                            if new_cost.is_finite() && new_cost < cost {
                                Trial::Accepted(new_residuals, new_cost)
                            } else {
                                Trial::Rejected
                            }
                        }
                        Err(e) if e.is_numeric_instability() => {
                            func_evals += 1;
                            warn!("Rejecting trial step (lambda = {:.1e}): {}", lambda, e);
                            Trial::Rejected
                        }
                        Err(e) => return Err(e),
                    };

                    match trial {
                        Trial::Accepted(new_residuals, new_cost) => {
                            iterations += 1;
                            let status =
                                criteria.check(&params, &new_params, cost, new_cost, iterations);

                            params = new_params;
                            residuals = new_residuals;
                            cost = new_cost;
                            lambda =
                                (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);

                            if status.is_terminated() {
                                break 'outer status;
                            }
                            break;
                        }
                        Trial::Rejected => {
                            // The damped step no longer moves the parameters
                            if criteria.step_converged(&params, &new_params) {
                                break 'outer ConvergenceStatus::ParameterConvergence;
                            }
                            lambda *= self.config.lambda_up_factor;
                            if lambda > self.config.max_lambda {
                                break 'outer ConvergenceStatus::LambdaLimitReached;
                            }
                            if self.budget_exhausted(started) {
                                break 'outer ConvergenceStatus::TimeLimitReached;
                            }
                        }
                    }
                }
            }
        };

        let success = status.is_converged();
        if success {
            debug!(
                "LM finished after {} iterations ({} evaluations): {}, cost {:.6e}",
                iterations,
                func_evals,
                status.description(),
                cost
            );
        } else {
            warn!(
                "LM did not converge after {} iterations: {}",
                iterations,
                status.description()
            );
        }

        let jacobian = if self.config.calc_jacobian && n_params > 0 && cost.is_finite() {
            match self.jacobian(problem, &params, &residuals) {
                Ok(jac) => Some(jac),
                Err(e) if e.is_numeric_instability() => {
                    warn!("Jacobian at the solution could not be evaluated: {}", e);
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            status,
            success,
            message: status.description().to_string(),
            jacobian,
        })
    }

    fn budget_exhausted(&self, started: Instant) -> bool {
        self.config
            .max_duration
            .map_or(false, |budget| started.elapsed() >= budget)
    }

    fn jacobian<P: Problem>(
        &self,
        problem: &P,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
    ) -> Result<Array2<f64>> {
        if problem.has_custom_jacobian() {
            problem.jacobian(params)
        } else {
            finite_difference::jacobian_at(problem, params, residuals, None)
        }
    }

    /// Calculate the Levenberg-Marquardt step.
    ///
    /// Solves `(J^T J + lambda I) x = J^T r` and returns `-x`.
    fn calculate_step(
        &self,
        j: &Array2<f64>,
        r: &Array1<f64>,
        jtj: &Array2<f64>,
        jtr: &Array1<f64>,
        lambda: f64,
    ) -> Array1<f64> {
        let solution = match self.config.decomposition_method {
            DecompositionMethod::QR => solve_qr(j, r, lambda),
            DecompositionMethod::Cholesky | DecompositionMethod::Auto => {
                let mut a = jtj.clone();
                for i in 0..a.nrows() {
                    a[[i, i]] += lambda;
                }
                cholesky_solve(&a, jtr).unwrap_or_else(|| solve_qr(j, r, lambda))
            }
        };

        -solution
    }
}

/// Solve `a x = b` for symmetric positive definite `a`, or `None` if the
/// factorization breaks down.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for k in 0..n {
        let mut diag = a[[k, k]];
        for p in 0..k {
            diag -= l[[k, p]] * l[[k, p]];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return None;
        }
        let lkk = diag.sqrt();
        l[[k, k]] = lkk;

        for i in k + 1..n {
            let mut value = a[[i, k]];
            for p in 0..k {
                value -= l[[i, p]] * l[[k, p]];
            }
            l[[i, k]] = value / lkk;
        }
    }

    // Forward substitution (L * y = b)
    let mut y = b.clone();
    for i in 0..n {
        for p in 0..i {
            y[i] -= l[[i, p]] * y[p];
        }
        y[i] /= l[[i, i]];
    }

    // Backward substitution (L^T * x = y)
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        x[i] = y[i];
        for p in (i + 1)..n {
            x[i] -= l[[p, i]] * x[p];
        }
        x[i] /= l[[i, i]];
    }

    Some(x)
}

/// Least-squares solve of `[J; sqrt(lambda) I] x = [r; 0]` by modified
/// Gram-Schmidt QR. Rank-deficient directions get a zero step.
fn solve_qr(j: &Array2<f64>, r: &Array1<f64>, lambda: f64) -> Array1<f64> {
    let m = j.nrows();
    let n = j.ncols();
    let rows = m + n;
    let damping = lambda.max(0.0).sqrt();

    let mut q = Array2::<f64>::zeros((rows, n));
    for i in 0..m {
        for k in 0..n {
            q[[i, k]] = j[[i, k]];
        }
    }
    for k in 0..n {
        q[[m + k, k]] = damping;
    }
    let mut rhs = Array1::<f64>::zeros(rows);
    for i in 0..m {
        rhs[i] = r[i];
    }

    let mut upper = Array2::<f64>::zeros((n, n));
    for k in 0..n {
        let norm = q.column(k).dot(&q.column(k)).sqrt();
        upper[[k, k]] = norm;
        if norm > 1e-12 {
            for i in 0..rows {
                q[[i, k]] /= norm;
            }
        } else {
            q.column_mut(k).fill(0.0);
        }
        for c in (k + 1)..n {
            let dot = q.column(k).dot(&q.column(c));
            upper[[k, c]] = dot;
            for i in 0..rows {
                q[[i, c]] -= dot * q[[i, k]];
            }
        }
    }

    let qtb = q.t().dot(&rhs);
    let mut x = Array1::zeros(n);
    for k in (0..n).rev() {
        if upper[[k, k]].abs() <= 1e-12 {
            continue;
        }
        let mut value = qtb[k];
        for c in (k + 1)..n {
            value -= upper[[k, c]] * x[c];
        }
        x[k] = value / upper[[k, k]];
    }
    x
}
