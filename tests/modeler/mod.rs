//! Integration tests for the kinetics modeler
//!
//! These tests drive heuristics, residuals and fits through the public API.

// Initial-guess heuristics
mod heuristics_tests;


// Fit orchestration and batches
mod fit_tests;
