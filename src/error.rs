use thiserror::Error;

/// Error types for the xrf-fit library.
#[derive(Error, Debug)]
pub enum XrfFitError {
    /// A channel segment reached past the end of the spectrum.
    #[error("Segment [{start}, {start} + {count}) exceeds spectrum length {len}")]
    SegmentOutOfBounds {
        start: usize,
        count: usize,
        len: usize,
    },

    /// Parameter not found.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// Error for parameter-related problems.
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// Error for boundary constraint violations.
    #[error("Bounds error: {0}")]
    BoundsError(String),

    /// A fit was requested in strict mode without an optimizer.
    #[error("No optimizer configured for the fit routine")]
    MissingOptimizer,

    /// Error indicating a mismatch in vector dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error during model evaluation.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// Error indicating optimization failed.
    #[error("Optimization failed: {0}")]
    OptimizationFailure(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<crate::parameters::ParameterError> for XrfFitError {
    fn from(err: crate::parameters::ParameterError) -> Self {
        match err {
            crate::parameters::ParameterError::ParameterNotFound { name } => {
                XrfFitError::ParameterNotFound(name)
            }
            other => XrfFitError::ParameterError(format!("{}", other)),
        }
    }
}

impl From<crate::parameters::BoundsError> for XrfFitError {
    fn from(err: crate::parameters::BoundsError) -> Self {
        XrfFitError::BoundsError(format!("{}", err))
    }
}

/// Result type alias for xrf-fit operations.
pub type Result<T> = std::result::Result<T, XrfFitError>;
