//! Replicate time-course measurements.
//!
//! A [`TimeCourse`] pairs one time vector with a replicate matrix
//! (`replicates[[i, j]]` is replicate `i` at time `t[j]`). Construction
//! validates the shape once; every consumer can then rely on it.

use crate::error::{KinFitError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Check that `time` and `data` describe one valid replicate time course.
///
/// Requirements: non-empty, `data.ncols() == time.len()`, at least one
/// replicate, finite measurements, and finite non-negative times that
/// strictly increase.
pub fn validate_shape(time: ArrayView1<f64>, data: ArrayView2<f64>) -> Result<()> {
    validate_time(time)?;
    if data.nrows() == 0 {
        return Err(KinFitError::InputShape(
            "replicate matrix has no rows".to_string(),
        ));
    }
    if data.ncols() != time.len() {
        return Err(KinFitError::InputShape(format!(
            "replicate matrix has {} columns but time vector has {} points",
            data.ncols(),
            time.len()
        )));
    }
    if let Some(((i, j), bad)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(KinFitError::InputShape(format!(
            "replicate {} has non-finite value {} at time index {}",
            i, bad, j
        )));
    }
    Ok(())
}

/// Check a time vector on its own: non-empty, finite, non-negative and
/// strictly increasing.
pub fn validate_time(time: ArrayView1<f64>) -> Result<()> {
    if time.is_empty() {
        return Err(KinFitError::InputShape("time vector is empty".to_string()));
    }
    if let Some(bad) = time.iter().find(|t| !t.is_finite() || **t < 0.0) {
        return Err(KinFitError::InputShape(format!(
            "time points must be finite and non-negative, got {}",
            bad
        )));
    }
    if let Some(j) = (1..time.len()).find(|&j| time[j] <= time[j - 1]) {
        return Err(KinFitError::InputShape(format!(
            "time vector is not strictly increasing at index {} ({} after {})",
            j,
            time[j],
            time[j - 1]
        )));
    }
    Ok(())
}

/// Column-wise mean over replicates (one value per time point).
pub(crate) fn column_means(data: ArrayView2<f64>) -> Result<Array1<f64>> {
    data.mean_axis(Axis(0))
        .ok_or_else(|| KinFitError::InputShape("replicate matrix is empty".to_string()))
}

/// Validated time vector plus replicate matrix for one (reaction, species).
#[derive(Debug, Clone, PartialEq)]
pub struct TimeCourse {
    time: Array1<f64>,
    replicates: Array2<f64>,
}

impl TimeCourse {
    /// ```
    /// use kinfit_rs::data::TimeCourse;
    /// use ndarray::array;
    ///
    /// let course = TimeCourse::new(
    ///     array![0.0, 1.0, 2.0],
    ///     array![[1.0, 0.8, 0.7], [1.1, 0.8, 0.6]],
    /// ).unwrap();
    /// assert_eq!(course.n_replicates(), 2);
    /// assert!(TimeCourse::new(array![0.0, 1.0], array![[1.0, 0.8, 0.7]]).is_err());
    /// ```
    pub fn new(time: Array1<f64>, replicates: Array2<f64>) -> Result<Self> {
        validate_shape(time.view(), replicates.view())?;
        Ok(Self { time, replicates })
    }

    /// Build from row vectors, failing with `MalformedData` on ragged rows.
    pub fn from_rows(time: Vec<f64>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_points = time.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_points) {
            return Err(KinFitError::MalformedData(format!(
                "replicate {} has {} values, expected {}",
                i,
                row.len(),
                n_points
            )));
        }
        let n_rows = rows.len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let replicates = Array2::from_shape_vec((n_rows, n_points), flat)
            .map_err(|e| KinFitError::MalformedData(e.to_string()))?;
        Self::new(Array1::from_vec(time), replicates)
    }

    pub fn time(&self) -> &Array1<f64> {
        &self.time
    }

    pub fn replicates(&self) -> &Array2<f64> {
        &self.replicates
    }

    pub fn n_replicates(&self) -> usize {
        self.replicates.nrows()
    }

    pub fn n_points(&self) -> usize {
        self.time.len()
    }

    /// Mean over replicates at each time point.
    pub fn column_means(&self) -> Array1<f64> {
        // non-empty by construction
        self.replicates
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.time.len()))
    }

    /// Apply `f` to every measurement, e.g. a unit conversion.
    pub fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self {
            time: self.time.clone(),
            replicates: self.replicates.mapv(f),
        }
    }
}
