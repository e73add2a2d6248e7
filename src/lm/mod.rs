//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides the damped least-squares minimizer used by every
//! kinetic fit, together with its configuration and termination states.

pub mod algorithm;
pub mod config;
pub mod convergence;

// Re-export key types
pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::{DecompositionMethod, LmConfig};
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
