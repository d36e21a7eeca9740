//! Parameter bounds
//!
//! Bounds limit the values a fit parameter may take. Optimizers never work on
//! the bounded value directly: [`BoundsTransform`] maps it to an unbounded
//! internal coordinate (Minuit-style) so that any internal step lands back
//! inside `[min, max]`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Non-finite parameter value {0} cannot be mapped to internal coordinates")]
    NonFiniteValue(f64),
}

/// Serialized form of [`Bounds`]; infinite limits are written as `null`
/// because JSON has no representation for them.
#[derive(Serialize, Deserialize)]
struct BoundsRepr {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

impl From<BoundsRepr> for Bounds {
    fn from(repr: BoundsRepr) -> Self {
        Bounds {
            min: repr.min.unwrap_or(f64::NEG_INFINITY),
            max: repr.max.unwrap_or(f64::INFINITY),
        }
    }
}

impl From<Bounds> for BoundsRepr {
    fn from(bounds: Bounds) -> Self {
        BoundsRepr {
            min: bounds.has_lower_bound().then_some(bounds.min),
            max: bounds.has_upper_bound().then_some(bounds.max),
        }
    }
}

/// Lower and upper limits of a fit parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoundsRepr", into = "BoundsRepr")]
pub struct Bounds {
    /// Minimum allowed value
    pub min: f64,

    /// Maximum allowed value
    pub max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Bounds {
    /// Create bounds from a min/max pair
    ///
    /// ```
    /// use xrf_fit::parameters::Bounds;
    ///
    /// let bounds = Bounds::new(-11.0, 300.0).unwrap();
    /// assert_eq!(bounds.min, -11.0);
    /// assert!(Bounds::new(1.0, 0.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// Bounds spanning the whole real line
    pub fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    /// Both limits are finite
    pub fn is_finite(&self) -> bool {
        self.has_lower_bound() && self.has_upper_bound()
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Minuit-style mapping between a bounded (external) value and an unbounded
/// internal coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    /// Map an internal coordinate to a value inside the bounds
    pub fn to_external(&self, internal: f64) -> f64 {
        let b = self.bounds;
        match (b.has_lower_bound(), b.has_upper_bound()) {
            (false, false) => internal,
            (true, false) => b.min - 1.0 + (internal * internal + 1.0).sqrt(),
            (false, true) => b.max + 1.0 - (internal * internal + 1.0).sqrt(),
            (true, true) => b.min + (internal.sin() + 1.0) * (b.max - b.min) / 2.0,
        }
    }

    /// Map a value to its internal coordinate.
    ///
    /// Values outside the bounds are clamped first, so a seed that sits
    /// slightly outside its limits still yields a usable starting point.
    pub fn to_internal(&self, external: f64) -> Result<f64, BoundsError> {
        if !external.is_finite() {
            return Err(BoundsError::NonFiniteValue(external));
        }

        let b = self.bounds;
        let value = b.clamp(external);
        let internal = match (b.has_lower_bound(), b.has_upper_bound()) {
            (false, false) => value,
            (true, false) => ((value - b.min + 1.0).powi(2) - 1.0).sqrt(),
            (false, true) => ((b.max - value + 1.0).powi(2) - 1.0).sqrt(),
            (true, true) => {
                let range = b.max - b.min;
                if range == 0.0 {
                    0.0
                } else {
                    (2.0 * (value - b.min) / range - 1.0).clamp(-1.0, 1.0).asin()
                }
            }
        };
        Ok(internal)
    }
}
