//! Initial parameter guesses from raw replicate data.
//!
//! These estimates use column means and argmin/argmax only, so they are cheap
//! and tolerate noisy, non-monotonic replicates. They seed the optimizer; they
//! are not fits.

use crate::data::{column_means, validate_shape, TimeCourse};
use crate::error::{KinFitError, Result};
use crate::parameters::layout::{BIAS, S0};
use crate::parameters::Parameters;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Averaged gradient-versus-time curve over all replicates.
///
/// For every replicate the previous value starts at `data[i, 0]` and the
/// previous time at `0`. Where `t[j]` equals the previous time (the first
/// sample when `t[0] == 0`) the entry is the plain signed difference
/// `prev - data[i, j]`; everywhere else it is `|(prev - data[i, j]) / (t[j] - prev_time)|`.
///
/// ```
/// use kinfit_rs::modeler::heuristics::gradient_curve;
/// use ndarray::array;
///
/// let t = array![0.0, 1.0, 2.0, 3.0];
/// let data = array![[0.0, 1.0, 2.0, 2.0], [0.0, 1.2, 1.8, 2.1]];
/// let v = gradient_curve(t.view(), data.view()).unwrap();
/// assert_eq!(v[0], 0.0);
/// assert!((v[1] - 1.1).abs() < 1e-12);
/// ```
pub fn gradient_curve(t: ArrayView1<f64>, data: ArrayView2<f64>) -> Result<Array1<f64>> {
    validate_shape(t, data)?;

    let mut v_all = Array2::<f64>::zeros(data.raw_dim());
    for (i, row) in data.axis_iter(Axis(0)).enumerate() {
        let mut prev_value = row[0];
        let mut prev_time = 0.0;
        for (j, (&time, &value)) in t.iter().zip(row.iter()).enumerate() {
            v_all[[i, j]] = if time == prev_time {
                prev_value - value
            } else {
                ((prev_value - value) / (time - prev_time)).abs()
            };
            prev_value = value;
            prev_time = time;
        }
    }

    column_means(v_all.view())
}

/// Largest value of the averaged gradient curve.
pub fn initial_vmax(t: ArrayView1<f64>, data: ArrayView2<f64>) -> Result<f64> {
    let v = gradient_curve(t, data)?;
    Ok(v.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Km estimate from the half-maximum crossing of the gradient curve.
///
/// From the first index of the maximum gradient onward, the first index whose
/// gradient is closest to half the maximum selects a column-mean
/// concentration. The bias estimate is subtracted only when it is smaller,
/// so Km is never pushed negative by it.
pub fn initial_km(t: ArrayView1<f64>, data: ArrayView2<f64>) -> Result<f64> {
    let v = gradient_curve(t, data)?;
    let vmax = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let idx_max = first_index_of(&v, |x| x == vmax).unwrap_or(0);
    let half = vmax / 2.0;
    let idx_km = v
        .iter()
        .skip(idx_max)
        .map(|x| (x - half).abs())
        .enumerate()
        .fold((0, f64::INFINITY), |best, (k, dist)| {
            if dist < best.1 {
                (k, dist)
            } else {
                best
            }
        })
        .0;

    let means = column_means(data)?;
    let mut km = means[idx_max + idx_km];
    let bias = means[means.len() - 1];
    if km > bias {
        km -= bias;
    }
    Ok(km)
}

/// Mean over replicates of the last time point.
pub fn initial_bias(data: ArrayView2<f64>) -> Result<f64> {
    let means = non_empty_means(data)?;
    Ok(means[means.len() - 1])
}

/// Mean over replicates of the first time point.
pub fn initial_s0(data: ArrayView2<f64>) -> Result<f64> {
    let means = non_empty_means(data)?;
    Ok(means[0])
}

fn non_empty_means(data: ArrayView2<f64>) -> Result<Array1<f64>> {
    if data.nrows() == 0 || data.ncols() == 0 {
        return Err(KinFitError::InputShape(
            "replicate matrix is empty".to_string(),
        ));
    }
    column_means(data)
}

fn first_index_of<F: Fn(f64) -> bool>(v: &Array1<f64>, predicate: F) -> Option<usize> {
    v.iter().position(|&x| predicate(x))
}

/// All heuristic estimates for one time course.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialGuess {
    pub s0: f64,
    pub bias: f64,
    pub vmax: f64,
    pub km: f64,
}

impl InitialGuess {
    pub fn from_time_course(course: &TimeCourse) -> Result<Self> {
        let t = course.time().view();
        let data = course.replicates().view();
        Ok(Self {
            s0: initial_s0(data)?,
            bias: initial_bias(data)?,
            vmax: initial_vmax(t, data)?,
            km: initial_km(t, data)?,
        })
    }

    /// Michaelis-Menten parameter set seeded with these estimates.
    ///
    /// `S0`, `vmax` and `Km` are free and non-negative; `bias` is added only
    /// when `with_bias` is set.
    pub fn to_parameters(&self, with_bias: bool) -> Result<Parameters> {
        let mut params = Parameters::new();
        params.add_param_with_bounds(S0, self.s0.max(0.0), 0.0, f64::INFINITY)?;
        if with_bias {
            params.add_param(BIAS, self.bias);
        }
        params.add_param_with_bounds("vmax", self.vmax.max(0.0), 0.0, f64::INFINITY)?;
        params.add_param_with_bounds("Km", self.km.max(0.0), 0.0, f64::INFINITY)?;
        Ok(params)
    }
}
