//! # Parameter System
//!
//! Named kinetic parameters with bounds and fixed/free flags, similar to
//! lmfit-py's `Parameters`.
//!
//! - [`Parameter`]: one value with bounds, a vary flag and a standard error
//! - [`Parameters`]: an ordered collection, serializable to JSON
//! - [`Bounds`] and [`BoundsTransform`]: bounds handling during optimization
//! - [`ModelLayout`]: the state/bias structure a parameter set implies
//!
//! ## Example Usage
//!
//! ```rust
//! use kinfit_rs::parameters::Parameters;
//!
//! let mut params = Parameters::new();
//! params.add_param_with_bounds("S0", 1.8, 0.0, f64::INFINITY).unwrap();
//! params.add_param_with_bounds("vmax", 0.2, 0.0, f64::INFINITY).unwrap();
//! params.add_param_with_bounds("Km", 0.9, 0.0, f64::INFINITY).unwrap();
//!
//! // Fix the baseline at its initial estimate
//! params.add_fixed("bias", 0.05);
//!
//! let internal = params.varying_internal_values().unwrap();
//! assert_eq!(internal.len(), 3);
//! ```

pub mod bounds;
pub mod layout;
pub mod parameter;
pub mod parameters;

// Re-export key types
pub use bounds::{Bounds, BoundsError, BoundsTransform};
pub use layout::{BiasMode, ModelLayout, StateLayout};
pub use parameter::{Parameter, ParameterError};
pub use parameters::Parameters;
