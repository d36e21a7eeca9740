//! Fit parameter definition
//!
//! A [`FitParameter`] is one named scalar of a spectrum model: an element's
//! log10 amplitude, a calibration coefficient, a scatter peak energy or a
//! bookkeeping value written back by the optimizer. Its [`BoundType`]
//! decides whether an optimizer may vary it.

use crate::parameters::bounds::{Bounds, BoundsError, BoundsTransform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lower limit of a log10 element amplitude.
pub const AMPLITUDE_MIN: f64 = -11.0;

/// Upper limit of a log10 element amplitude.
pub const AMPLITUDE_MAX: f64 = 300.0;

/// Step size used for newly seeded amplitudes.
pub const AMPLITUDE_STEP: f64 = 0.1;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Bounds error: {0}")]
    BoundsError(#[from] BoundsError),

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Expected {expected} values for varying parameters, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// How an optimizer treats a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoundType {
    /// Not yet configured; treated like `Fixed`
    #[default]
    NotInit,
    /// Held constant
    Fixed,
    /// Varies between min and max
    LimitedLoHi,
    /// Varies above min
    LimitedLo,
    /// Varies below max
    LimitedHi,
    /// Free fit parameter, kept inside its stored range
    Fit,
}

impl BoundType {
    /// Whether an optimizer may change a parameter of this kind
    pub fn is_varying(self) -> bool {
        !matches!(self, BoundType::NotInit | BoundType::Fixed)
    }
}

/// A named scalar of the fit model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitParameter {
    pub name: String,

    /// Current value; amplitudes are stored as log10
    pub value: f64,

    bounds: Bounds,

    /// Suggested step for optimizers that probe the parameter
    pub step_size: f64,

    pub bound_type: BoundType,
}

impl FitParameter {
    /// A fixed, unbounded parameter
    ///
    /// ```
    /// use xrf_fit::parameters::{BoundType, FitParameter};
    ///
    /// let p = FitParameter::new("energy_offset", 0.012);
    /// assert_eq!(p.value, 0.012);
    /// assert_eq!(p.bound_type, BoundType::Fixed);
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            bounds: Bounds::unbounded(),
            step_size: 1.0e-5,
            bound_type: BoundType::Fixed,
        }
    }

    /// A parameter with explicit limits, step and bound type
    pub fn with_bounds(
        name: &str,
        value: f64,
        min: f64,
        max: f64,
        step_size: f64,
        bound_type: BoundType,
    ) -> Result<Self, ParameterError> {
        Ok(Self {
            name: name.to_string(),
            value,
            bounds: Bounds::new(min, max)?,
            step_size,
            bound_type,
        })
    }

    /// A fitted log10 element amplitude in `[-11, 300]`
    pub fn element_amplitude(name: &str, log_value: f64) -> Self {
        Self {
            name: name.to_string(),
            value: log_value,
            bounds: Bounds {
                min: AMPLITUDE_MIN,
                max: AMPLITUDE_MAX,
            },
            step_size: AMPLITUDE_STEP,
            bound_type: BoundType::Fit,
        }
    }

    /// A fixed value written back by the optimizer (iterations, residual)
    pub fn bookkeeping(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: 0.0,
            bounds: Bounds {
                min: -1.0,
                max: 999_999.0,
            },
            step_size: 1.0e-5,
            bound_type: BoundType::Fixed,
        }
    }

    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<(), ParameterError> {
        self.bounds = Bounds::new(min, max)?;
        Ok(())
    }

    pub fn is_varying(&self) -> bool {
        self.bound_type.is_varying()
    }

    /// Bounds an optimizer should honour for this parameter.
    ///
    /// One-sided bound types drop the opposite limit.
    pub fn effective_bounds(&self) -> Bounds {
        match self.bound_type {
            BoundType::LimitedLo => Bounds {
                min: self.bounds.min,
                max: f64::INFINITY,
            },
            BoundType::LimitedHi => Bounds {
                min: f64::NEG_INFINITY,
                max: self.bounds.max,
            },
            _ => self.bounds,
        }
    }

    pub fn bounds_transform(&self) -> BoundsTransform {
        BoundsTransform::new(self.effective_bounds())
    }

    /// Current value in the optimizer's unbounded coordinate
    pub fn to_internal(&self) -> Result<f64, ParameterError> {
        Ok(self.bounds_transform().to_internal(self.value)?)
    }

    /// Value corresponding to an internal optimizer coordinate
    pub fn from_internal(&self, internal: f64) -> f64 {
        self.bounds_transform().to_external(internal)
    }
}
