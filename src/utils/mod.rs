//! Utility functions shared by the optimizer and uncertainty code.

pub mod finite_difference;
pub mod matrix_convert;
