//! Residuals between replicate data and an integrated kinetic model.
//!
//! The residual matrix is `data[i, j] - signal[j]`, flattened row-major
//! (replicate by replicate). The modeled signal is the substrate column of the
//! ODE solution, plus `bias` for the [`ResidualVariant::WithBias`] variant.
//! The model curve does not depend on the replicate, so it is integrated once
//! per evaluation and subtracted from every row.

use crate::data::TimeCourse;
use crate::error::{KinFitError, Result};
use crate::ode::{solve_ode, KineticModel, OdeConfig};
use crate::parameters::layout::{BIAS, V0};
use crate::parameters::{BiasMode, ModelLayout, Parameters, StateLayout};
use crate::problem::Problem;
use ndarray::{Array1, Axis};
use serde::{Deserialize, Serialize};

/// Which residual function a fit uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResidualVariant {
    /// `data - S`
    Plain,
    /// `data - (S + bias)`
    WithBias,
}

impl ResidualVariant {
    pub fn for_layout(layout: &ModelLayout) -> Self {
        match layout.bias {
            BiasMode::None => ResidualVariant::Plain,
            BiasMode::Additive => ResidualVariant::WithBias,
        }
    }

    /// Constant added to the modeled substrate curve.
    fn offset(&self, params: &Parameters) -> Result<f64> {
        match self {
            ResidualVariant::Plain => Ok(0.0),
            ResidualVariant::WithBias => params.require(BIAS),
        }
    }
}

/// Modeled signal at every time point of `course`.
pub fn model_signal<M: KineticModel + ?Sized>(
    model: &M,
    course: &TimeCourse,
    params: &Parameters,
    layout: &ModelLayout,
    variant: ResidualVariant,
    ode: &OdeConfig,
) -> Result<Array1<f64>> {
    let w0 = layout.initial_state(params)?;
    let states = solve_ode(model, course.time(), &w0, params, ode)?;
    let offset = variant.offset(params)?;
    Ok(states
        .column(layout.substrate_index())
        .mapv(|s| s + offset))
}

/// Flattened residuals with the given variant.
pub fn residuals_with_variant<M: KineticModel + ?Sized>(
    model: &M,
    course: &TimeCourse,
    params: &Parameters,
    variant: ResidualVariant,
    ode: &OdeConfig,
) -> Result<Array1<f64>> {
    let layout = ModelLayout::from_parameters(params)?;
    let signal = model_signal(model, course, params, &layout, variant, ode)?;
    Ok(flatten_against(course, &signal))
}

/// Flattened residuals, with the variant chosen by the presence of `bias`.
///
/// ```
/// use kinfit_rs::data::TimeCourse;
/// use kinfit_rs::modeler::residual::residuals;
/// use kinfit_rs::ode::OdeConfig;
/// use kinfit_rs::parameters::Parameters;
/// use ndarray::array;
///
/// let flat = |_t: f64, _s: &[f64], _p: &Parameters, ds: &mut [f64]| ds[0] = 0.0;
/// let course = TimeCourse::new(array![0.0, 1.0], array![[1.5, 1.5], [1.0, 2.0]]).unwrap();
/// let mut params = Parameters::new();
/// params.add_param("S0", 1.0);
/// params.add_param("bias", 0.5);
///
/// let r = residuals(&flat, &course, &params, &OdeConfig::default()).unwrap();
/// assert_eq!(r.to_vec(), vec![0.0, 0.0, -0.5, 0.5]);
/// ```
pub fn residuals<M: KineticModel + ?Sized>(
    model: &M,
    course: &TimeCourse,
    params: &Parameters,
    ode: &OdeConfig,
) -> Result<Array1<f64>> {
    let layout = ModelLayout::from_parameters(params)?;
    let variant = ResidualVariant::for_layout(&layout);
    let signal = model_signal(model, course, params, &layout, variant, ode)?;
    Ok(flatten_against(course, &signal))
}

fn flatten_against(course: &TimeCourse, signal: &Array1<f64>) -> Array1<f64> {
    let diff = course.replicates() - &signal.view().insert_axis(Axis(0));
    diff.iter().copied().collect()
}

/// A kinetic fit posed as a least-squares [`Problem`] over the internal
/// values of the varying parameters.
pub struct KineticProblem<'a, M: KineticModel + ?Sized> {
    model: &'a M,
    course: &'a TimeCourse,
    template: Parameters,
    layout: ModelLayout,
    variant: ResidualVariant,
    ode: OdeConfig,
    n_varying: usize,
}

impl<'a, M: KineticModel + ?Sized> KineticProblem<'a, M> {
    /// Decide the layout and residual variant once from `params`.
    pub fn new(
        model: &'a M,
        course: &'a TimeCourse,
        params: &Parameters,
        ode: OdeConfig,
    ) -> Result<Self> {
        let layout = ModelLayout::from_parameters(params)?;
        match model.state_dimension() {
            Some(2) if layout.state == StateLayout::OneState => {
                return Err(KinFitError::MissingParameter(V0.to_string()));
            }
            Some(dim) if dim != layout.state_dimension() => {
                return Err(KinFitError::InputShape(format!(
                    "{} integrates {} states, the parameters describe {}",
                    model.name(),
                    dim,
                    layout.state_dimension()
                )));
            }
            _ => {}
        }
        for name in model.required_parameters() {
            params.require(name)?;
        }
        Ok(Self {
            model,
            course,
            template: params.clone(),
            layout,
            variant: ResidualVariant::for_layout(&layout),
            ode,
            n_varying: params.varying().len(),
        })
    }

    pub fn layout(&self) -> &ModelLayout {
        &self.layout
    }

    pub fn variant(&self) -> ResidualVariant {
        self.variant
    }

    /// Internal-space starting point for the optimizer.
    pub fn initial_internal(&self) -> Result<Array1<f64>> {
        Ok(Array1::from_vec(self.template.varying_internal_values()?))
    }

    /// Parameter set at an internal-space point.
    pub fn parameters_at(&self, internal: &Array1<f64>) -> Result<Parameters> {
        Ok(self.template.with_internal(&internal.to_vec())?)
    }

    /// Residuals for a full parameter set.
    pub fn residuals_for(&self, params: &Parameters) -> Result<Array1<f64>> {
        let signal = model_signal(
            self.model,
            self.course,
            params,
            &self.layout,
            self.variant,
            &self.ode,
        )?;
        Ok(flatten_against(self.course, &signal))
    }
}

impl<M: KineticModel + ?Sized> Problem for KineticProblem<'_, M> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let current = self.parameters_at(params)?;
        self.residuals_for(&current)
    }

    fn parameter_count(&self) -> usize {
        self.n_varying
    }

    fn residual_count(&self) -> usize {
        self.course.n_replicates() * self.course.n_points()
    }
}
