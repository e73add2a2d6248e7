//! Structural reading of a parameter set.
//!
//! Whether a fit integrates a one-state (`[S]`) or two-state (`[v, S]`)
//! system, and whether a baseline offset is added to the modeled signal, is
//! implied by which parameters exist. `ModelLayout` records that decision once
//! so residual and fit code branch on an explicit tag.

use crate::error::{KinFitError, Result};
use crate::parameters::Parameters;
use serde::{Deserialize, Serialize};

/// Name of the initial substrate concentration parameter.
pub const S0: &str = "S0";
/// Name of the initial velocity state parameter.
pub const V0: &str = "v0";
/// Name of the additive baseline parameter.
pub const BIAS: &str = "bias";

/// Dimension of the integrated state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateLayout {
    /// state = `[S]`
    OneState,
    /// state = `[v, S]`
    TwoState,
}

/// How the modeled substrate curve maps onto the measured signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasMode {
    /// signal = S
    None,
    /// signal = S + bias
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLayout {
    pub state: StateLayout,
    pub bias: BiasMode,
}

impl ModelLayout {
    /// Read the layout off a parameter set. `S0` is always required.
    ///
    /// ```
    /// use kinfit_rs::parameters::{BiasMode, ModelLayout, Parameters, StateLayout};
    ///
    /// let mut params = Parameters::new();
    /// params.add_param("S0", 1.0);
    /// params.add_param("bias", 0.1);
    ///
    /// let layout = ModelLayout::from_parameters(&params).unwrap();
    /// assert_eq!(layout.state, StateLayout::OneState);
    /// assert_eq!(layout.bias, BiasMode::Additive);
    /// ```
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        if !params.contains(S0) {
            return Err(KinFitError::MissingParameter(S0.to_string()));
        }
        let state = if params.contains(V0) {
            StateLayout::TwoState
        } else {
            StateLayout::OneState
        };
        let bias = if params.contains(BIAS) {
            BiasMode::Additive
        } else {
            BiasMode::None
        };
        Ok(Self { state, bias })
    }

    pub fn state_dimension(&self) -> usize {
        match self.state {
            StateLayout::OneState => 1,
            StateLayout::TwoState => 2,
        }
    }

    /// Column of the state matrix holding the substrate concentration.
    pub fn substrate_index(&self) -> usize {
        match self.state {
            StateLayout::OneState => 0,
            StateLayout::TwoState => 1,
        }
    }

    /// Initial state `w0` built from the current parameter values.
    pub fn initial_state(&self, params: &Parameters) -> Result<Vec<f64>> {
        let s0 = params.require(S0)?;
        Ok(match self.state {
            StateLayout::OneState => vec![s0],
            StateLayout::TwoState => vec![params.require(V0)?, s0],
        })
    }
}
