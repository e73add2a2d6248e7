//! Fit orchestration.
//!
//! [`fit_model`] poses a kinetic fit as a least-squares problem, runs
//! Levenberg-Marquardt on it and collects lmfit-style statistics. A fit that
//! does not converge still returns `Ok`; check [`FitResult::success`].

use crate::data::TimeCourse;
use crate::error::Result;
use crate::lm::{ConvergenceStatus, LevenbergMarquardt, LmConfig};
use crate::modeler::residual::{KineticProblem, ResidualVariant};
use crate::ode::{KineticModel, OdeConfig};
use crate::parameters::{ModelLayout, Parameters};
use crate::problem::Problem;
use crate::uncertainty::{uncertainty_from_jacobian, UncertaintyResult};
use log::{debug, warn};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Settings for one kinetic fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub lm: LmConfig,
    pub ode: OdeConfig,
    /// Estimate standard errors from the Jacobian at the solution
    pub compute_uncertainties: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            lm: LmConfig::default(),
            ode: OdeConfig::default(),
            compute_uncertainties: true,
        }
    }
}

/// Fitted parameters plus solver diagnostics for one (reaction, species) pair.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Fitted parameters; varying ones carry a standard error when available
    pub params: Parameters,
    /// Name of the kinetic model
    pub model_name: String,
    pub layout: ModelLayout,
    /// Residual function used
    pub variant: ResidualVariant,
    pub success: bool,
    pub status: ConvergenceStatus,
    pub message: String,
    /// Flattened residuals at the solution
    pub residual: Array1<f64>,
    /// Sum of squared residuals
    pub chisqr: f64,
    /// Square root of `chisqr`
    pub residual_norm: f64,
    pub redchi: f64,
    pub aic: f64,
    pub bic: f64,
    pub ndata: usize,
    pub nvarys: usize,
    pub nfree: usize,
    pub nfev: usize,
    pub iterations: usize,
    pub uncertainty: Option<UncertaintyResult>,
}

impl FitResult {
    /// Fitted value of `name`.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.params.value(name)
    }

    /// Residuals reshaped to `(replicates, time points)`.
    pub fn residual_matrix(&self, n_points: usize) -> Option<Array2<f64>> {
        if n_points == 0 || self.residual.len() % n_points != 0 {
            return None;
        }
        let rows = self.residual.len() / n_points;
        Array2::from_shape_vec((rows, n_points), self.residual.to_vec()).ok()
    }
}

impl AsRef<Parameters> for FitResult {
    fn as_ref(&self) -> &Parameters {
        &self.params
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[[Fit Statistics]]")?;
        writeln!(f, "    # model            = {}", self.model_name)?;
        writeln!(f, "    # residual         = {:?}", self.variant)?;
        writeln!(f, "    # status           = {}", self.message)?;
        writeln!(f, "    # function evals   = {}", self.nfev)?;
        writeln!(f, "    # data points      = {}", self.ndata)?;
        writeln!(f, "    # variables        = {}", self.nvarys)?;
        writeln!(f, "    chi-square         = {:.6e}", self.chisqr)?;
        writeln!(f, "    reduced chi-square = {:.6e}", self.redchi)?;
        writeln!(f, "    Akaike info crit   = {:.4}", self.aic)?;
        writeln!(f, "    Bayesian info crit = {:.4}", self.bic)?;
        writeln!(f, "[[Variables]]")?;
        for param in self.params.iter() {
            if !param.vary() {
                writeln!(f, "    {:<6} {:.6} (fixed)", format!("{}:", param.name()), param.value())?;
                continue;
            }
            match param.stderr() {
                Some(err) if param.value() != 0.0 => writeln!(
                    f,
                    "    {:<6} {:.6} +/- {:.6} ({:.2}%) (init = {:.6})",
                    format!("{}:", param.name()),
                    param.value(),
                    err,
                    (err / param.value()).abs() * 100.0,
                    param.init_value()
                )?,
                Some(err) => writeln!(
                    f,
                    "    {:<6} {:.6} +/- {:.6} (init = {:.6})",
                    format!("{}:", param.name()),
                    param.value(),
                    err,
                    param.init_value()
                )?,
                None => writeln!(
                    f,
                    "    {:<6} {:.6} (init = {:.6})",
                    format!("{}:", param.name()),
                    param.value(),
                    param.init_value()
                )?,
            }
        }
        Ok(())
    }
}

/// Fit `model` to `course`, starting from `params`.
///
/// Dispatches on the parameter set: a `bias` entry selects the bias-aware
/// residual, `v0` a two-state system. Fixed parameters stay constant and
/// bounds are respected through the internal-space transform.
///
/// # Errors
///
/// Structural problems (missing `S0` or model parameters, invalid values)
/// and ODE failure at the starting point. Non-convergence is not an error.
pub fn fit_model<M: KineticModel + ?Sized>(
    course: &TimeCourse,
    params: &Parameters,
    model: &M,
    config: &FitConfig,
) -> Result<FitResult> {
    let problem = KineticProblem::new(model, course, params, config.ode.clone())?;
    let varying: Vec<&str> = params.varying().iter().map(|p| p.name()).collect();
    debug!(
        "Fitting '{}' to {} replicates x {} points ({:?}, {:?}), varying {:?}",
        model.name(),
        course.n_replicates(),
        course.n_points(),
        problem.layout().state,
        problem.variant(),
        varying
    );

    let lm_config = LmConfig {
        calc_jacobian: config.lm.calc_jacobian || config.compute_uncertainties,
        ..config.lm.clone()
    };
    let lm = LevenbergMarquardt::with_config(lm_config);
    let result = lm.minimize(&problem, problem.initial_internal()?)?;

    let mut fitted = problem.parameters_at(&result.params)?;
    let ndata = problem.residual_count();
    let nvarys = problem.parameter_count();
    let nfree = ndata.saturating_sub(nvarys);
    let chisqr = result.cost;

    let uncertainty = if config.compute_uncertainties {
        result.jacobian.as_ref().and_then(|jac| {
            uncertainty_from_jacobian(jac, &result.params, &fitted, chisqr, nfree)
        })
    } else {
        None
    };
    if let Some(unc) = &uncertainty {
        for (name, err) in &unc.standard_errors {
            if let Some(param) = fitted.get_mut(name) {
                param.set_stderr(Some(*err));
            }
        }
    }

    if result.success {
        debug!(
            "Fit of '{}' converged after {} iterations, chi-square {:.6e}",
            model.name(),
            result.iterations,
            chisqr
        );
    } else {
        warn!("Fit of '{}' did not converge: {}", model.name(), result.message);
    }

    let (aic, bic) = information_criteria(chisqr, ndata, nvarys);
    Ok(FitResult {
        params: fitted,
        model_name: model.name().to_string(),
        layout: *problem.layout(),
        variant: problem.variant(),
        success: result.success,
        status: result.status,
        message: result.message,
        residual: result.residuals,
        chisqr,
        residual_norm: chisqr.sqrt(),
        redchi: chisqr / nfree.max(1) as f64,
        aic,
        bic,
        ndata,
        nvarys,
        nfree,
        nfev: result.func_evals,
        iterations: result.iterations,
        uncertainty,
    })
}

/// [`fit_model`] on a bare time vector and replicate matrix.
pub fn fit_arrays<M: KineticModel + ?Sized>(
    t: &Array1<f64>,
    data: &Array2<f64>,
    params: &Parameters,
    model: &M,
    config: &FitConfig,
) -> Result<FitResult> {
    let course = TimeCourse::new(t.clone(), data.clone())?;
    fit_model(&course, params, model, config)
}

/// Akaike and Bayesian information criteria as lmfit computes them.
fn information_criteria(chisqr: f64, ndata: usize, nvarys: usize) -> (f64, f64) {
    let n = ndata.max(1) as f64;
    let neg2_log_likelihood = n * (chisqr.max(1e-250) / n).ln();
    (
        neg2_log_likelihood + 2.0 * nvarys as f64,
        neg2_log_likelihood + n.ln() * nvarys as f64,
    )
}

/// One named dataset in a batch fit.
#[derive(Debug, Clone)]
pub struct FitJob {
    pub name: String,
    pub course: TimeCourse,
    pub params: Parameters,
}

impl FitJob {
    pub fn new(name: impl Into<String>, course: TimeCourse, params: Parameters) -> Self {
        Self {
            name: name.into(),
            course,
            params,
        }
    }
}

/// Fit independent datasets in parallel, one task per job.
///
/// Every job gets its own entry, so one failing dataset does not abort the
/// batch.
pub fn fit_many<M: KineticModel + ?Sized>(
    jobs: &[FitJob],
    model: &M,
    config: &FitConfig,
) -> BTreeMap<String, Result<FitResult>> {
    jobs.par_iter()
        .map(|job| {
            let result = fit_model(&job.course, &job.params, model, config);
            if let Err(e) = &result {
                warn!("Fit '{}' failed: {}", job.name, e);
            }
            (job.name.clone(), result)
        })
        .collect()
}
