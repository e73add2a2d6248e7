//! # Kinetics Modeler
//!
//! Turns replicate time courses into fitted kinetic parameters:
//!
//! - [`heuristics`]: cheap initial guesses for `S0`, `bias`, `vmax` and `Km`
//! - [`residual`]: the two residual variants and the least-squares problem
//! - [`fit`]: the Levenberg-Marquardt fit and its statistics, alone or in batches
//!
//! ## Example
//!
//! ```no_run
//! use kinfit_rs::data::TimeCourse;
//! use kinfit_rs::modeler::{fit_model, FitConfig, InitialGuess};
//! use kinfit_rs::models::MichaelisMenten;
//! use ndarray::array;
//!
//! let course = TimeCourse::new(
//!     array![0.0, 1.0, 2.0, 4.0, 8.0],
//!     array![[2.1, 1.6, 1.2, 0.7, 0.3], [2.0, 1.5, 1.2, 0.6, 0.3]],
//! )?;
//! let params = InitialGuess::from_time_course(&course)?.to_parameters(true)?;
//! let result = fit_model(&course, &params, &MichaelisMenten, &FitConfig::default())?;
//! println!("{}", result);
//! # Ok::<(), kinfit_rs::KinFitError>(())
//! ```

pub mod fit;
pub mod heuristics;
pub mod residual;

pub use fit::{fit_arrays, fit_many, fit_model, FitConfig, FitJob, FitResult};
pub use heuristics::{
    gradient_curve, initial_bias, initial_km, initial_s0, initial_vmax, InitialGuess,
};
pub use residual::{residuals, KineticProblem, ResidualVariant};
