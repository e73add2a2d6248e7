//! Built-in kinetic mechanisms.
//!
//! Each mechanism implements [`KineticModel`] and reads its rate constants
//! from the parameter set by name. Any closure with the `KineticModel`
//! signature works equally well; these cover the common cases.

use crate::ode::KineticModel;
use crate::parameters::Parameters;

/// Irreversible Michaelis-Menten substrate depletion.
///
/// State `[S]`: `dS/dt = -vmax * S / (Km + S)`. On a two-state `[v, S]`
/// layout the substrate is the last state and `v` stays constant.
#[derive(Debug, Clone, Copy, Default)]
pub struct MichaelisMenten;

/// Michaelis-Menten with first-order enzyme inactivation.
///
/// State `[e, S]`, where `e` is the active enzyme fraction starting at `v0`:
///
/// ```text
/// de/dt = -a * e
/// dS/dt = -vmax * e * S / (Km + S)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MichaelisMentenInactivation;

/// Michaelis-Menten with an additional first-order substrate loss.
///
/// State `[S]`: `dS/dt = -vmax * S / (Km + S) - a * S`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MichaelisMentenDecay;

fn rate(vmax: f64, km: f64, s: f64) -> f64 {
    let denominator = km + s;
    if denominator == 0.0 {
        0.0
    } else {
        vmax * s / denominator
    }
}

// Required parameters are checked before integration starts.
fn get(params: &Parameters, name: &str) -> f64 {
    params.value(name).unwrap_or(f64::NAN)
}

impl KineticModel for MichaelisMenten {
    fn derivatives(&self, _t: f64, state: &[f64], params: &Parameters, dstate: &mut [f64]) {
        let s = state[state.len() - 1];
        let ds = -rate(get(params, "vmax"), get(params, "Km"), s);
        dstate.iter_mut().for_each(|d| *d = 0.0);
        dstate[state.len() - 1] = ds;
    }

    fn required_parameters(&self) -> &[&str] {
        &["vmax", "Km"]
    }

    fn name(&self) -> &str {
        "michaelis-menten"
    }
}

impl KineticModel for MichaelisMentenInactivation {
    fn derivatives(&self, _t: f64, state: &[f64], params: &Parameters, dstate: &mut [f64]) {
        let (e, s) = (state[0], state[1]);
        dstate[0] = -get(params, "a") * e;
        dstate[1] = -e * rate(get(params, "vmax"), get(params, "Km"), s);
    }

    fn required_parameters(&self) -> &[&str] {
        &["vmax", "Km", "a"]
    }

    fn state_dimension(&self) -> Option<usize> {
        Some(2)
    }

    fn name(&self) -> &str {
        "michaelis-menten-inactivation"
    }
}

impl KineticModel for MichaelisMentenDecay {
    fn derivatives(&self, _t: f64, state: &[f64], params: &Parameters, dstate: &mut [f64]) {
        let s = state[0];
        dstate[0] = -rate(get(params, "vmax"), get(params, "Km"), s) - get(params, "a") * s;
    }

    fn required_parameters(&self) -> &[&str] {
        &["vmax", "Km", "a"]
    }

    fn state_dimension(&self) -> Option<usize> {
        Some(1)
    }

    fn name(&self) -> &str {
        "michaelis-menten-decay"
    }
}
