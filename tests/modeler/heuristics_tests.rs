//! Tests for the initial-guess heuristics.

use approx::assert_relative_eq;
use kinfit_rs::data::TimeCourse;
use kinfit_rs::modeler::{
    gradient_curve, initial_bias, initial_km, initial_s0, initial_vmax, InitialGuess,
};
use kinfit_rs::models::MichaelisMenten;
use kinfit_rs::KinFitError;
use ndarray::{array, Array1, Array2};

use crate::test_helpers::{exact_course, mm_params, noisy_course};

#[test]
fn test_documented_scenario() {
    let t = array![0.0, 1.0, 2.0, 3.0];
    let data = array![[0.0, 1.0, 2.0, 2.0], [0.0, 1.2, 1.8, 2.1]];

    assert_eq!(initial_s0(data.view()).unwrap(), 0.0);
    assert_eq!(initial_bias(data.view()).unwrap(), 2.05);

    // zero-time entry is the plain difference, not a rate
    let v = gradient_curve(t.view(), data.view()).unwrap();
    assert_eq!(v[0], 0.0);
    assert_relative_eq!(initial_vmax(t.view(), data.view()).unwrap(), 1.1, epsilon = 1e-12);
}

#[test]
fn test_s0_and_bias_are_exact_column_means() {
    let data = array![[0.3, 0.2, 0.11], [0.7, 0.4, 0.13], [0.2, 0.1, 0.05]];
    let first = (0.3 + 0.7 + 0.2) / 3.0;
    let last = (0.11 + 0.13 + 0.05) / 3.0;
    assert_eq!(initial_s0(data.view()).unwrap(), first);
    assert_eq!(initial_bias(data.view()).unwrap(), last);
}

#[test]
fn test_constant_replicates() {
    let t = Array1::linspace(0.0, 10.0, 11);
    let data = Array2::from_elem((4, 11), 1.25);
    let v = gradient_curve(t.view(), data.view()).unwrap();
    assert!(v.iter().all(|&x| x == 0.0));
    assert_eq!(initial_vmax(t.view(), data.view()).unwrap(), 0.0);
}

#[test]
fn test_km_never_negative_from_bias() {
    // rising signal: the half-max concentration stays below the plateau
    let t = array![0.0, 1.0, 2.0, 3.0, 4.0];
    let data = array![[0.0, 0.5, 0.9, 1.0, 1.0]];
    let km = initial_km(t.view(), data.view()).unwrap();
    assert!(km >= 0.0);
}

#[test]
fn test_guesses_on_michaelis_menten_curve() {
    let truth = mm_params(5.0, 1.0, 2.0);
    let course = exact_course(
        &MichaelisMenten,
        &truth,
        &[5.0],
        Array1::linspace(0.0, 10.0, 21),
        3,
        0.0,
    );
    let guess = InitialGuess::from_time_course(&course).unwrap();

    assert_eq!(guess.s0, 5.0);
    assert!(guess.bias < 5.0);
    // secant rates never exceed the true initial rate vmax * S0 / (Km + S0)
    assert!(guess.vmax > 0.0);
    assert!(guess.vmax <= 1.0 * 5.0 / 7.0 + 1e-9);
    assert!(guess.km > 0.0);
}

#[test]
fn test_guesses_tolerate_noise() {
    let truth = mm_params(5.0, 1.0, 2.0);
    let course = noisy_course(
        &MichaelisMenten,
        &truth,
        &[5.0],
        Array1::linspace(0.0, 10.0, 21),
        4,
        0.05,
        7,
    );
    let guess = InitialGuess::from_time_course(&course).unwrap();
    assert!(guess.s0.is_finite() && guess.vmax.is_finite() && guess.km.is_finite());
    assert!((guess.s0 - 5.0).abs() < 0.2);

    let params = guess.to_parameters(true).unwrap();
    assert_eq!(params.names(), vec!["S0", "bias", "vmax", "Km"]);
}

#[test]
fn test_shape_mismatch_is_input_error() {
    let t = array![0.0, 1.0, 2.0];
    let data = array![[1.0, 0.5]];
    assert!(matches!(
        initial_vmax(t.view(), data.view()),
        Err(KinFitError::InputShape(_))
    ));
    assert!(matches!(
        initial_km(t.view(), data.view()),
        Err(KinFitError::InputShape(_))
    ));
    assert!(TimeCourse::new(t, data).is_err());
}
