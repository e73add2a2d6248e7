//! A single named fit parameter.
//!
//! A parameter carries its value, whether the optimizer may vary it, its
//! bounds and, after a fit, its standard error.

use crate::parameters::bounds::{Bounds, BoundsError, BoundsTransform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Bounds error: {0}")]
    BoundsError(#[from] BoundsError),

    #[error("Expected {expected} values for varying parameters, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// A parameter for kinetic fits, in the spirit of lmfit's `Parameter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,

    value: f64,

    /// Value the parameter was created with
    init_value: f64,

    /// Whether the optimizer may change this parameter
    vary: bool,

    #[serde(default)]
    bounds: Bounds,

    /// Standard error (set after fitting)
    #[serde(default)]
    stderr: Option<f64>,
}

impl Parameter {
    /// Create a free, unbounded parameter.
    ///
    /// ```
    /// use kinfit_rs::parameters::Parameter;
    ///
    /// let param = Parameter::new("vmax", 0.4);
    /// assert_eq!(param.name(), "vmax");
    /// assert!(param.vary());
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            init_value: value,
            vary: true,
            bounds: Bounds::default(),
            stderr: None,
        }
    }

    /// Create a free parameter constrained to `[min, max]`.
    ///
    /// The value is clamped into the bounds.
    pub fn with_bounds(name: &str, value: f64, min: f64, max: f64) -> Result<Self, ParameterError> {
        let bounds = Bounds::new(min, max)?;
        let value = bounds.clamp(value);
        Ok(Self {
            bounds,
            init_value: value,
            ..Self::new(name, value)
        })
    }

    /// Create a parameter the optimizer holds constant.
    pub fn fixed(name: &str, value: f64) -> Self {
        Self {
            vary: false,
            ..Self::new(name, value)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value, rejecting values outside the bounds.
    pub fn set_value(&mut self, value: f64) -> Result<(), ParameterError> {
        if !self.bounds.contains(value) {
            return Err(ParameterError::BoundsError(BoundsError::ValueOutsideBounds {
                value,
                min: self.bounds.min,
                max: self.bounds.max,
            }));
        }
        self.value = value;
        Ok(())
    }

    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    /// Reset to the initial value, clamped into the current bounds.
    pub fn reset(&mut self) {
        self.value = self.bounds.clamp(self.init_value);
    }

    pub fn vary(&self) -> bool {
        self.vary
    }

    pub fn set_vary(&mut self, vary: bool) {
        self.vary = vary;
    }

    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Replace the bounds; the current value is clamped into them.
    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<(), ParameterError> {
        let bounds = Bounds::new(min, max)?;
        self.bounds = bounds;
        self.value = bounds.clamp(self.value);
        Ok(())
    }

    pub fn stderr(&self) -> Option<f64> {
        self.stderr
    }

    pub fn set_stderr(&mut self, stderr: Option<f64>) {
        self.stderr = stderr;
    }

    pub fn bounds_transform(&self) -> BoundsTransform {
        BoundsTransform::new(self.bounds)
    }

    /// Current value in the optimizer's internal space.
    pub fn to_internal(&self) -> Result<f64, ParameterError> {
        self.bounds_transform()
            .to_internal(self.value)
            .map_err(ParameterError::from)
    }

    /// External value corresponding to an internal optimizer value.
    pub fn from_internal(&self, internal: f64) -> f64 {
        self.bounds_transform().to_external(internal)
    }

    /// Move to the external value of `internal`. Rounding at the bounds is
    /// clamped away.
    pub(crate) fn set_from_internal(&mut self, internal: f64) {
        self.value = self.bounds.clamp(self.from_internal(internal));
    }
}
