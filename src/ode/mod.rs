//! # ODE Integration
//!
//! Integrates a kinetic right-hand side over the measurement time points with
//! an adaptive, error-controlled Dormand-Prince stepper from `ode_solvers`.
//!
//! The state matrix returned by [`solve_ode`] has one row per time point and
//! one column per state variable; row `j` is the state at `t[j]`, and row 0 is
//! the initial state itself.
//!
//! ```
//! use kinfit_rs::ode::{solve_ode, OdeConfig};
//! use kinfit_rs::parameters::Parameters;
//! use ndarray::array;
//!
//! // dS/dt = -k S
//! let decay = |_t: f64, s: &[f64], p: &Parameters, ds: &mut [f64]| {
//!     ds[0] = -p.value("k").unwrap_or(0.0) * s[0];
//! };
//! let mut params = Parameters::new();
//! params.add_param("k", 0.5);
//!
//! let t = array![0.0, 1.0, 2.0];
//! let states = solve_ode(&decay, &t, &[2.0], &params, &OdeConfig::default()).unwrap();
//! assert!((states[[2, 0]] - 2.0 * (-1.0_f64).exp()).abs() < 1e-6);
//! ```

use crate::data::validate_time;
use crate::error::{KinFitError, Result};
use crate::parameters::Parameters;
use ndarray::{Array1, Array2};
use ode_solvers::dop_shared::OutputType;
use ode_solvers::{DVector, Dop853, Dopri5, System};
use serde::{Deserialize, Serialize};

type State = DVector<f64>;

/// Step budget per segment before the integrator gives up.
const MAX_STEPS: u32 = 100_000;
/// Stiffness is tested every this many steps.
const STIFFNESS_CHECK: u32 = 1000;

/// Right-hand side of a kinetic ODE system, `dw/dt = f(t, w, params)`.
///
/// Implementations must be pure: the same inputs always give the same
/// derivatives. Closures with the matching signature implement this trait.
pub trait KineticModel: Sync {
    /// Write `dw/dt` at `(t, state)` into `dstate` (same length as `state`).
    fn derivatives(&self, t: f64, state: &[f64], params: &Parameters, dstate: &mut [f64]);

    /// Parameters `derivatives` reads. Checked once before integrating.
    fn required_parameters(&self) -> &[&str] {
        &[]
    }

    /// Length of the state vector the model works on, if it needs a fixed one.
    fn state_dimension(&self) -> Option<usize> {
        None
    }

    /// Short label used in logs and reports.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> KineticModel for F
where
    F: Fn(f64, &[f64], &Parameters, &mut [f64]) + Sync,
{
    fn derivatives(&self, t: f64, state: &[f64], params: &Parameters, dstate: &mut [f64]) {
        self(t, state, params, dstate)
    }
}

/// Dormand-Prince variant used for integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OdeMethod {
    /// Explicit Runge-Kutta 5(4)
    #[default]
    Dopri5,
    /// Explicit Runge-Kutta 8(5,3), tighter for smooth problems
    Dop853,
}

/// Integrator tolerances and method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdeConfig {
    /// Relative tolerance. Default: 1e-6
    pub rtol: f64,
    /// Absolute tolerance. Default: 1e-9
    pub atol: f64,
    pub method: OdeMethod,
}

impl Default for OdeConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-9,
            method: OdeMethod::Dopri5,
        }
    }
}

impl OdeConfig {
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    pub fn with_method(mut self, method: OdeMethod) -> Self {
        self.method = method;
        self
    }
}

/// Adapts a [`KineticModel`] plus fixed parameters to `ode_solvers::System`.
struct ModelSystem<'a, M: ?Sized> {
    model: &'a M,
    params: &'a Parameters,
}

impl<M: KineticModel + ?Sized> System<f64, State> for ModelSystem<'_, M> {
    fn system(&self, t: f64, y: &State, dy: &mut State) {
        self.model
            .derivatives(t, y.as_slice(), self.params, dy.as_mut_slice());
    }
}

/// Integrate `model` from `w0` at `t[0]` and return the state at every `t[j]`.
///
/// # Errors
///
/// - `InputShape` for an empty, unsorted or negative time vector, an empty `w0`,
///   or a `w0` whose length the model does not accept
/// - `MissingParameter` if `params` lacks a parameter the model requires
/// - `NumericInstability` if the integrator fails or produces non-finite states
pub fn solve_ode<M: KineticModel + ?Sized>(
    model: &M,
    t: &Array1<f64>,
    w0: &[f64],
    params: &Parameters,
    config: &OdeConfig,
) -> Result<Array2<f64>> {
    validate_time(t.view())?;
    if w0.is_empty() {
        return Err(KinFitError::InputShape(
            "initial state must not be empty".to_string(),
        ));
    }
    if let Some(expected) = model.state_dimension() {
        if expected != w0.len() {
            return Err(KinFitError::InputShape(format!(
                "{} integrates {} states, got an initial state of length {}",
                model.name(),
                expected,
                w0.len()
            )));
        }
    }
    for name in model.required_parameters() {
        params.require(name)?;
    }

    let dim = w0.len();
    let mut states = Array2::zeros((t.len(), dim));
    let mut current = State::from_column_slice(w0);
    for (k, value) in current.iter().enumerate() {
        states[[0, k]] = *value;
    }

    let system = ModelSystem { model, params };
    for j in 1..t.len() {
        let next = integrate_segment(&system, t[j - 1], t[j], &current, config)?;
        if next.iter().any(|v| !v.is_finite()) {
            return Err(KinFitError::NumericInstability {
                time: t[j - 1],
                state: current.iter().copied().collect(),
                message: format!("non-finite state at t = {}", t[j]),
            });
        }
        for (k, value) in next.iter().enumerate() {
            states[[j, k]] = *value;
        }
        current = next;
    }

    Ok(states)
}

/// One adaptive integration from `t0` to `t1`, returning the end state.
fn integrate_segment<M: KineticModel + ?Sized>(
    system: &ModelSystem<'_, M>,
    t0: f64,
    t1: f64,
    y0: &State,
    config: &OdeConfig,
) -> Result<State> {
    let failure = |message: String| KinFitError::NumericInstability {
        time: t0,
        state: y0.iter().copied().collect(),
        message,
    };

    // Sparse output keeps only accepted steps; the last one ends at t1
    let model_system = || ModelSystem {
        model: system.model,
        params: system.params,
    };
    let h_max = t1 - t0;
    let y_out = match config.method {
        OdeMethod::Dopri5 => {
            let mut stepper = Dopri5::from_param(
                model_system(),
                t0,
                t1,
                0.0,
                y0.clone(),
                config.rtol,
                config.atol,
                0.9,
                0.04,
                0.2,
                10.0,
                h_max,
                0.0,
                MAX_STEPS,
                STIFFNESS_CHECK,
                OutputType::Sparse,
            );
            stepper
                .integrate()
                .map_err(|e| failure(e.to_string()))?;
            stepper.y_out().last().cloned()
        }
        OdeMethod::Dop853 => {
            let mut stepper = Dop853::from_param(
                model_system(),
                t0,
                t1,
                0.0,
                y0.clone(),
                config.rtol,
                config.atol,
                0.9,
                0.0,
                0.333,
                6.0,
                h_max,
                0.0,
                MAX_STEPS,
                STIFFNESS_CHECK,
                OutputType::Sparse,
            );
            stepper
                .integrate()
                .map_err(|e| failure(e.to_string()))?;
            stepper.y_out().last().cloned()
        }
    };

    y_out.ok_or_else(|| failure("integrator produced no output".to_string()))
}
