//! Integration tests for kinfit-rs
//!
//! These tests run the whole pipeline: document, time series, initial
//! guesses, fits and the parameter table.

// Document to table, end to end
pub mod pipeline;
