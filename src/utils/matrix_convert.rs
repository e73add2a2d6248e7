//! Conversions between ndarray and faer.
//!
//! Problems and results use ndarray; the LM solver does its linear algebra
//! in faer.

use faer::{Col, Mat};
use ndarray::{Array1, Array2};

/// Copy an ndarray matrix into a faer `Mat` (row-major to column-major).
pub fn ndarray_to_faer(arr: &Array2<f64>) -> Mat<f64> {
    Mat::from_fn(arr.nrows(), arr.ncols(), |i, j| arr[[i, j]])
}

/// Copy a faer `Mat` into an ndarray matrix.
pub fn faer_to_ndarray(mat: &Mat<f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| *mat.get(i, j))
}

pub fn ndarray_vec_to_faer(arr: &Array1<f64>) -> Col<f64> {
    Col::from_fn(arr.len(), |i| arr[i])
}

pub fn faer_vec_to_ndarray(col: &Col<f64>) -> Array1<f64> {
    Array1::from_shape_fn(col.nrows(), |i| *col.get(i))
}
