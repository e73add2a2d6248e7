use thiserror::Error;

/// Error types for the kinfit-rs library.
///
/// Shape and structural problems fail fast with a specific kind. Optimizer
/// non-convergence is not an error; it is reported on the fit result.
#[derive(Error, Debug)]
pub enum KinFitError {
    /// Time vector and replicate matrix disagree, or the input is empty.
    #[error("Input shape error: {0}")]
    InputShape(String),

    /// ODE integration failed to meet its tolerance.
    #[error("Numeric instability at t = {time}: {message} (last valid state {state:?})")]
    NumericInstability {
        /// Time point where the failing integration segment started
        time: f64,
        /// Last state the integrator produced successfully
        state: Vec<f64>,
        /// Solver message
        message: String,
    },

    /// Reaction or species not present in the document.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Replicate measurements that cannot be arranged into a matrix.
    #[error("Malformed data: {0}")]
    MalformedData(String),

    /// A parameter required by the model or state layout is absent.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// Error for parameter-related problems.
    #[error("Parameter error: {0}")]
    Parameter(String),

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KinFitError {
    /// Whether this error came out of the ODE integrator.
    pub fn is_numeric_instability(&self) -> bool {
        matches!(self, KinFitError::NumericInstability { .. })
    }
}

impl From<crate::parameters::parameter::ParameterError> for KinFitError {
    fn from(err: crate::parameters::parameter::ParameterError) -> Self {
        KinFitError::Parameter(format!("{}", err))
    }
}

impl From<crate::parameters::bounds::BoundsError> for KinFitError {
    fn from(err: crate::parameters::bounds::BoundsError) -> Self {
        KinFitError::Parameter(format!("{}", err))
    }
}

/// Result type alias for kinfit-rs operations.
pub type Result<T> = std::result::Result<T, KinFitError>;
