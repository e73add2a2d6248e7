//! Tests for fit orchestration.

use approx::assert_relative_eq;
use kinfit_rs::lm::{ConvergenceStatus, LevenbergMarquardt, LmConfig};
use kinfit_rs::modeler::residual::residuals_with_variant;
use kinfit_rs::modeler::{
    fit_arrays, fit_many, fit_model, FitConfig, FitJob, InitialGuess, KineticProblem,
    ResidualVariant,
};
use kinfit_rs::models::{MichaelisMenten, MichaelisMentenDecay, MichaelisMentenInactivation};
use kinfit_rs::ode::OdeConfig;
use kinfit_rs::parameters::Parameters;
use kinfit_rs::problem::Problem;
use kinfit_rs::{KinFitError, TimeCourse};
use ndarray::{array, Array1};
use std::cell::Cell;
use std::time::Duration;

use crate::test_helpers::{exact_course, mm_params, noisy_course};

fn depletion_times() -> Array1<f64> {
    Array1::linspace(0.0, 10.0, 21)
}

#[test]
fn test_noisy_replicates_recover_parameters() {
    let truth = mm_params(5.0, 1.0, 2.0);
    let course = noisy_course(&MichaelisMenten, &truth, &[5.0], depletion_times(), 4, 0.02, 42);

    let start = InitialGuess::from_time_course(&course)
        .unwrap()
        .to_parameters(false)
        .unwrap();
    let result = fit_model(&course, &start, &MichaelisMenten, &FitConfig::default()).unwrap();

    assert!(result.success, "{}", result);
    assert_eq!(result.variant, ResidualVariant::Plain);
    assert_relative_eq!(result.value("S0").unwrap(), 5.0, epsilon = 0.05);
    assert_relative_eq!(result.value("vmax").unwrap(), 1.0, epsilon = 0.1);
    assert_relative_eq!(result.value("Km").unwrap(), 2.0, epsilon = 0.4);

    // chi-square close to n * sigma^2
    let expected = 84.0 * 0.02 * 0.02;
    assert!(result.chisqr > 0.3 * expected && result.chisqr < 3.0 * expected);

    for name in ["S0", "vmax", "Km"] {
        let stderr = result.params.get(name).unwrap().stderr().unwrap();
        assert!(stderr.is_finite() && stderr > 0.0, "{} stderr {}", name, stderr);
    }
    let unc = result.uncertainty.as_ref().unwrap();
    let corr = unc.correlation_between("vmax", "Km").unwrap();
    assert!(corr > 0.0 && corr < 1.0 + 1e-9);
}

#[test]
fn test_bias_fit_recovers_offset() {
    let mut truth = mm_params(5.0, 1.0, 2.0);
    truth.add_param("bias", 0.2);
    let course = exact_course(&MichaelisMenten, &truth, &[5.0], depletion_times(), 2, 0.2);

    let mut start = mm_params(4.5, 0.8, 1.5);
    start.add_param("bias", 0.0);
    let result = fit_model(&course, &start, &MichaelisMenten, &FitConfig::default()).unwrap();

    assert_eq!(result.variant, ResidualVariant::WithBias);
    assert!(result.success, "{}", result);
    assert_relative_eq!(result.value("bias").unwrap(), 0.2, epsilon = 1e-2);
    assert_relative_eq!(result.value("S0").unwrap(), 5.0, epsilon = 1e-2);
}

/// Classifies every residual vector the optimizer sees by the variant it matches.
struct PathCounter<'a> {
    inner: KineticProblem<'a, MichaelisMenten>,
    course: &'a TimeCourse,
    plain: Cell<usize>,
    with_bias: Cell<usize>,
    evals: Cell<usize>,
}

impl PathCounter<'_> {
    fn matches(a: &Array1<f64>, b: &Array1<f64>) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= 1e-12)
    }
}

impl Problem for PathCounter<'_> {
    fn eval(&self, x: &Array1<f64>) -> kinfit_rs::Result<Array1<f64>> {
        let r = self.inner.eval(x)?;
        let params = self.inner.parameters_at(x)?;
        let ode = OdeConfig::default();
        let plain = residuals_with_variant(
            &MichaelisMenten,
            self.course,
            &params,
            ResidualVariant::Plain,
            &ode,
        )?;
        let with_bias = residuals_with_variant(
            &MichaelisMenten,
            self.course,
            &params,
            ResidualVariant::WithBias,
            &ode,
        )?;
        self.evals.set(self.evals.get() + 1);
        if Self::matches(&r, &plain) {
            self.plain.set(self.plain.get() + 1);
        }
        if Self::matches(&r, &with_bias) {
            self.with_bias.set(self.with_bias.get() + 1);
        }
        Ok(r)
    }

    fn parameter_count(&self) -> usize {
        self.inner.parameter_count()
    }

    fn residual_count(&self) -> usize {
        self.inner.residual_count()
    }
}

#[test]
fn test_bias_parameter_selects_one_residual_path_per_fit() {
    let mut truth = mm_params(5.0, 1.0, 2.0);
    truth.add_param("bias", 0.3);
    let course = exact_course(&MichaelisMenten, &truth, &[5.0], depletion_times(), 2, 0.3);

    // bias bounded away from zero, so the two variants never coincide
    let mut start = mm_params(4.5, 0.8, 1.5);
    start.add_param_with_bounds("bias", 0.2, 0.05, 1.0).unwrap();

    let counter = PathCounter {
        inner: KineticProblem::new(&MichaelisMenten, &course, &start, OdeConfig::default())
            .unwrap(),
        course: &course,
        plain: Cell::new(0),
        with_bias: Cell::new(0),
        evals: Cell::new(0),
    };
    let lm = LevenbergMarquardt::with_config(LmConfig {
        calc_jacobian: true,
        ..LmConfig::default()
    });
    let x0 = counter.inner.initial_internal().unwrap();
    lm.minimize(&counter, x0).unwrap();

    assert!(counter.evals.get() > 0);
    assert_eq!(counter.with_bias.get(), counter.evals.get());
    assert_eq!(counter.plain.get(), 0);

    // the public entry point reports the same single path
    let result = fit_model(&course, &start, &MichaelisMenten, &FitConfig::default()).unwrap();
    assert_eq!(result.variant, ResidualVariant::WithBias);
    let at_fit = |variant| {
        residuals_with_variant(
            &MichaelisMenten,
            &course,
            &result.params,
            variant,
            &OdeConfig::default(),
        )
        .unwrap()
    };
    assert!(PathCounter::matches(&result.residual, &at_fit(ResidualVariant::WithBias)));
    assert!(!PathCounter::matches(&result.residual, &at_fit(ResidualVariant::Plain)));
}

#[test]
fn test_two_state_mechanism_without_v0() {
    let course = exact_course(
        &MichaelisMenten,
        &mm_params(5.0, 1.0, 2.0),
        &[5.0],
        depletion_times(),
        2,
        0.0,
    );
    let mut start = mm_params(5.0, 1.0, 2.0);
    start.add_param("a", 0.1);

    let err = fit_model(&course, &start, &MichaelisMentenInactivation, &FitConfig::default())
        .unwrap_err();
    assert!(matches!(err, KinFitError::MissingParameter(name) if name == "v0"));

    start.add_fixed("v0", 1.0);
    let result =
        fit_model(&course, &start, &MichaelisMentenInactivation, &FitConfig::default()).unwrap();
    assert_eq!(result.model_name, "michaelis-menten-inactivation");
}

#[test]
fn test_decay_model_fit() {
    let mut truth = mm_params(4.0, 0.6, 1.0);
    truth.add_param("a", 0.05);
    let course = exact_course(&MichaelisMentenDecay, &truth, &[4.0], depletion_times(), 2, 0.0);

    let mut start = mm_params(4.0, 0.5, 1.2);
    start.add_param_with_bounds("a", 0.1, 0.0, 1.0).unwrap();
    let result = fit_model(&course, &start, &MichaelisMentenDecay, &FitConfig::default()).unwrap();

    assert!(result.chisqr < 1e-4, "{}", result);
    assert_eq!(result.model_name, "michaelis-menten-decay");
    let a = result.value("a").unwrap();
    assert!((0.0..=1.0).contains(&a));
}

#[test]
fn test_non_convergence_is_reported_not_raised() {
    let truth = mm_params(5.0, 1.0, 2.0);
    let course = exact_course(&MichaelisMenten, &truth, &[5.0], depletion_times(), 2, 0.0);
    let start = mm_params(2.0, 0.2, 5.0);

    let budget = FitConfig {
        lm: LmConfig {
            max_iterations: 2,
            ..LmConfig::default()
        },
        ..FitConfig::default()
    };
    let result = fit_model(&course, &start, &MichaelisMenten, &budget).unwrap();
    assert!(!result.success);
    assert_eq!(result.status, ConvergenceStatus::MaxIterationsReached);

    let timed = FitConfig {
        lm: LmConfig {
            max_duration: Some(Duration::ZERO),
            ..LmConfig::default()
        },
        ..FitConfig::default()
    };
    let result = fit_model(&course, &start, &MichaelisMenten, &timed).unwrap();
    assert!(!result.success);
    assert_eq!(result.status, ConvergenceStatus::TimeLimitReached);
    assert_eq!(result.iterations, 0);
}

#[test]
fn test_fit_without_uncertainties() {
    let truth = mm_params(5.0, 1.0, 2.0);
    let course = exact_course(&MichaelisMenten, &truth, &[5.0], depletion_times(), 2, 0.0);
    let config = FitConfig {
        compute_uncertainties: false,
        ..FitConfig::default()
    };
    let result = fit_model(&course, &mm_params(4.5, 0.8, 1.5), &MichaelisMenten, &config).unwrap();
    assert!(result.uncertainty.is_none());
    assert!(result.params.iter().all(|p| p.stderr().is_none()));
}

#[test]
fn test_fit_arrays_checks_shape() {
    let err = fit_arrays(
        &array![0.0, 1.0, 2.0],
        &array![[1.0, 0.5]],
        &mm_params(1.0, 0.5, 1.0),
        &MichaelisMenten,
        &FitConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, KinFitError::InputShape(_)));
}

#[test]
fn test_closure_model() {
    // first-order decay written inline: dS/dt = -k S
    let decay = |_t: f64, s: &[f64], p: &Parameters, ds: &mut [f64]| {
        ds[0] = -p.value("k").unwrap_or(0.0) * s[0];
    };
    let mut truth = Parameters::new();
    truth.add_param("S0", 2.0);
    truth.add_param("k", 0.3);
    let course = exact_course(&decay, &truth, &[2.0], depletion_times(), 2, 0.0);

    let mut start = Parameters::new();
    start.add_param("S0", 1.5);
    start.add_param("k", 0.1);
    let result = fit_model(&course, &start, &decay, &FitConfig::default()).unwrap();
    assert!(result.success, "{}", result);
    assert_eq!(result.model_name, "custom");
    assert_relative_eq!(result.value("k").unwrap(), 0.3, epsilon = 1e-3);
}

#[test]
fn test_batch_fit() {
    let truth = mm_params(5.0, 1.0, 2.0);
    let mut jobs: Vec<FitJob> = (0..4)
        .map(|seed| {
            let course =
                noisy_course(&MichaelisMenten, &truth, &[5.0], depletion_times(), 3, 0.01, seed);
            let start = InitialGuess::from_time_course(&course)
                .unwrap()
                .to_parameters(false)
                .unwrap();
            FitJob::new(format!("r0/s{}", seed), course, start)
        })
        .collect();

    let mut broken = mm_params(5.0, 1.0, 2.0);
    broken.remove("S0");
    jobs.push(FitJob::new("r1/s0", jobs[0].course.clone(), broken));

    let config = FitConfig {
        ode: OdeConfig::default().with_tolerances(1e-7, 1e-10),
        ..FitConfig::default()
    };
    let results = fit_many(&jobs, &MichaelisMenten, &config);
    assert_eq!(results.len(), 5);
    for seed in 0..4 {
        let fit = results[&format!("r0/s{}", seed)].as_ref().unwrap();
        assert!(fit.success, "{}", fit);
        assert_relative_eq!(fit.value("vmax").unwrap(), 1.0, epsilon = 0.1);
    }
    assert!(matches!(
        results["r1/s0"],
        Err(KinFitError::MissingParameter(_))
    ));
}

#[test]
fn test_fit_config_json() {
    let config = FitConfig {
        compute_uncertainties: false,
        ..FitConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: FitConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);

    let partial: FitConfig = serde_json::from_str(r#"{"compute_uncertainties": false}"#).unwrap();
    assert_eq!(partial, config);
}
