//! # kinfit-rs
//!
//! `kinfit-rs` fits enzyme kinetic parameters (`S0`, `bias`, `vmax`, `Km`, `a`)
//! to replicate time-course measurements. A kinetic mechanism is an ODE
//! right-hand side; it is integrated with an adaptive Dormand-Prince solver
//! and fitted by Levenberg-Marquardt over an lmfit-style parameter set.
//!
//! The library provides:
//! - Replicate time courses read from EnzymeML documents ([`document`])
//! - Initial-guess heuristics that seed the fit from raw data ([`modeler::heuristics`])
//! - Plain and bias-aware residuals, chosen from the parameter set ([`modeler::residual`])
//! - Fits with statistics and standard errors, alone or in parallel batches ([`modeler::fit`])
//! - Absorbance to concentration conversion and side-by-side parameter tables
//!
//! ## Basic Usage
//!
//! ```
//! use kinfit_rs::data::TimeCourse;
//! use kinfit_rs::modeler::{fit_model, FitConfig, InitialGuess};
//! use kinfit_rs::models::MichaelisMenten;
//! use kinfit_rs::ode::{solve_ode, OdeConfig};
//! use kinfit_rs::parameters::Parameters;
//! use ndarray::{Array1, Array2};
//!
//! // synthetic substrate depletion: S0 = 4, vmax = 1, Km = 2
//! let mut truth = Parameters::new();
//! truth.add_param("S0", 4.0);
//! truth.add_param("vmax", 1.0);
//! truth.add_param("Km", 2.0);
//!
//! let t = Array1::linspace(0.0, 6.0, 13);
//! let curve = solve_ode(&MichaelisMenten, &t, &[4.0], &truth, &OdeConfig::default())?;
//! let mut data = Array2::zeros((2, t.len()));
//! for mut row in data.rows_mut() {
//!     row.assign(&curve.column(0));
//! }
//! let course = TimeCourse::new(t, data)?;
//!
//! let guess = InitialGuess::from_time_course(&course)?.to_parameters(false)?;
//! let result = fit_model(&course, &guess, &MichaelisMenten, &FitConfig::default())?;
//! assert!((result.value("vmax").unwrap() - 1.0).abs() < 1e-2);
//! # Ok::<(), kinfit_rs::KinFitError>(())
//! ```

pub mod data;
pub mod document;
pub mod error;
pub mod lm;
pub mod models;
pub mod modeler;
pub mod ode;
pub mod parameters;
pub mod problem;
pub mod report;
pub mod uncertainty;
pub mod units;

mod utils;

// Re-exports for convenience
pub use data::TimeCourse;
pub use document::{DocumentAccessor, EnzymeMlDocument};
pub use error::{KinFitError, Result};
pub use lm::LevenbergMarquardt;
pub use modeler::{fit_model, FitConfig, FitResult};
pub use ode::{solve_ode, KineticModel};
pub use parameters::Parameters;
pub use problem::Problem;
pub use report::build_table;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
