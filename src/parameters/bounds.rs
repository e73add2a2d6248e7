//! Parameter bounds and the internal/external transform used by the optimizer.
//!
//! Kinetic constants are physically constrained (concentrations and rates are
//! non-negative), so the optimizer works in an unbounded internal space and
//! maps back through a Minuit-style transform.

use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Value {value} is outside bounds [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Non-finite parameter value is not allowed")]
    NonFiniteValue,
}

/// Closed interval `[min, max]` a parameter must stay within.
///
/// Infinite ends mean "unbounded on that side". In JSON, an infinite end is
/// written as `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Serialize, Deserialize)]
struct BoundsRepr {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        BoundsRepr {
            min: self.min.is_finite().then_some(self.min),
            max: self.max.is_finite().then_some(self.max),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = BoundsRepr::deserialize(deserializer)?;
        let min = repr.min.unwrap_or(NEG_INFINITY);
        let max = repr.max.unwrap_or(INFINITY);
        Bounds::new(min, max).map_err(serde::de::Error::custom)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Bounds {
    /// Create bounds, rejecting `min > max`.
    ///
    /// ```
    /// use kinfit_rs::parameters::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert!(Bounds::new(1.0, 0.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// No constraint on either side.
    pub fn unbounded() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }

    /// Lower bound only.
    pub fn min_only(min: f64) -> Self {
        Self { min, max: INFINITY }
    }

    /// Upper bound only.
    pub fn max_only(max: f64) -> Self {
        Self {
            min: NEG_INFINITY,
            max,
        }
    }

    /// `[0, ∞)`, the usual constraint for concentrations and rate constants.
    pub fn non_negative() -> Self {
        Self::min_only(0.0)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Maps between a bounded external value and an unbounded internal value.
///
/// - both bounds: `x = min + (sin(u) + 1) (max - min) / 2`
/// - lower only:  `x = min - 1 + sqrt(u² + 1)`
/// - upper only:  `x = max + 1 - sqrt(u² + 1)`
/// - neither:     `x = u`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    /// Internal optimizer value to external (bounded) value.
    pub fn to_external(&self, internal: f64) -> f64 {
        let b = &self.bounds;
        match (b.has_lower_bound(), b.has_upper_bound()) {
            (false, false) => internal,
            (true, false) => b.min - 1.0 + (internal * internal + 1.0).sqrt(),
            (false, true) => b.max + 1.0 - (internal * internal + 1.0).sqrt(),
            (true, true) => b.min + (internal.sin() + 1.0) * (b.max - b.min) / 2.0,
        }
    }

    /// External value to internal optimizer value.
    pub fn to_internal(&self, external: f64) -> Result<f64, BoundsError> {
        if !external.is_finite() {
            return Err(BoundsError::NonFiniteValue);
        }
        let b = &self.bounds;
        if !b.contains(external) {
            return Err(BoundsError::ValueOutsideBounds {
                value: external,
                min: b.min,
                max: b.max,
            });
        }

        let internal = match (b.has_lower_bound(), b.has_upper_bound()) {
            (false, false) => external,
            (true, false) => ((external - b.min + 1.0).powi(2) - 1.0).sqrt(),
            (false, true) => ((b.max - external + 1.0).powi(2) - 1.0).sqrt(),
            (true, true) => {
                let range = b.max - b.min;
                if range == 0.0 {
                    0.0
                } else {
                    (2.0 * (external - b.min) / range - 1.0).clamp(-1.0, 1.0).asin()
                }
            }
        };
        Ok(internal)
    }

    /// `d external / d internal` at the given internal value.
    ///
    /// Used to carry the covariance matrix from internal to external space.
    pub fn derivative(&self, internal: f64) -> f64 {
        let b = &self.bounds;
        match (b.has_lower_bound(), b.has_upper_bound()) {
            (false, false) => 1.0,
            (true, false) => internal / (internal * internal + 1.0).sqrt(),
            (false, true) => -internal / (internal * internal + 1.0).sqrt(),
            (true, true) => internal.cos() * (b.max - b.min) / 2.0,
        }
    }
}
