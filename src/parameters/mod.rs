//! # Fit parameter system
//!
//! Named scalar parameters with bounds, step sizes and a bound type that tells
//! optimizers whether they may vary the value.
//!
//! - [`FitParameter`]: one parameter (`value`, `min`, `max`, `step_size`, `bound_type`)
//! - [`FitParameters`]: the keyed collection a single fit owns
//! - [`Bounds`] and [`BoundsTransform`]: limits and their unbounded internal mapping
//! - [`names`]: reserved parameter names (calibration, scatter peaks, bookkeeping)
//!
//! ```rust
//! use xrf_fit::parameters::{names, BoundType, FitParameter, FitParameters};
//!
//! let mut params = FitParameters::new();
//! params.add_parameter(FitParameter::new(names::ENERGY_OFFSET, 0.0));
//! params.add_parameter(FitParameter::new(names::ENERGY_SLOPE, 0.01));
//! params.add_parameter(FitParameter::element_amplitude("Fe", 2.0));
//!
//! assert_eq!(params.varying_names(), vec!["Fe".to_string()]);
//! params.set_all_value(-10.0, BoundType::Fit);
//! assert_eq!(params.value("Fe").unwrap(), -10.0);
//! ```

pub mod bounds;
pub mod names;
pub mod parameter;
pub mod parameters;


pub use bounds::{Bounds, BoundsError, BoundsTransform};
pub use parameter::{BoundType, FitParameter, ParameterError};
pub use parameters::FitParameters;
