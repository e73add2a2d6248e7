//! Absorbance to concentration by the Beer-Lambert law.
//!
//! Constants are those of pyruvate/NADH assays: molar extinction coefficient
//! 24.8 L/(mol cm) and a 1 cm cuvette. Concentrations come out in mmol/L.

/// Molar extinction coefficient in L/(mol cm).
pub const EXTINCTION_COEFFICIENT: f64 = 24.8;

/// Optical path length in cm.
pub const PATH_LENGTH: f64 = 1.0;

/// `c = A / (epsilon * d) * 1000`
///
/// ```
/// use kinfit_rs::units::absorbance_to_concentration;
///
/// let c = absorbance_to_concentration(1.0);
/// assert!((c - 40.3226).abs() < 1e-4);
/// ```
pub fn absorbance_to_concentration(absorbance: f64) -> f64 {
    absorbance / (EXTINCTION_COEFFICIENT * PATH_LENGTH) * 1000.0
}

/// Inverse of [`absorbance_to_concentration`].
pub fn concentration_to_absorbance(concentration: f64) -> f64 {
    concentration * EXTINCTION_COEFFICIENT * PATH_LENGTH / 1000.0
}
