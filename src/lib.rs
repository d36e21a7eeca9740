//! # xrf-fit
//!
//! `xrf-fit` fits element amplitudes of an X-ray fluorescence spectrum.
//!
//! The library provides:
//! - Energy to channel mapping and spectrum segment reductions
//! - A fit parameter system with bounds, bound types and JSON round-trips
//! - Amplitude seeding from the spectrum around each element's principal line
//! - A fit routine that drives a swappable [`Optimizer`] over a caller-supplied
//!   [`SpectraModel`]
//! - Levenberg-Marquardt and Differential Evolution optimizers
//!
//! ## Basic Usage
//!
//! ```
//! use ndarray::Array1;
//! use xrf_fit::{
//!     ElementDescriptor, EmissionLine, EnergyRange, FitElementMap, FitParameter,
//!     FitParameters, FitRoutine, ParamOptimizedFitRoutine, SpectraModel, Spectrum,
//! };
//! use xrf_fit::parameters::names;
//!
//! struct Background;
//!
//! impl SpectraModel for Background {
//!     fn fit_parameters(&self) -> FitParameters {
//!         let mut params = FitParameters::new();
//!         params.add_parameter(FitParameter::new(names::ENERGY_OFFSET, 0.0));
//!         params.add_parameter(FitParameter::new(names::ENERGY_SLOPE, 0.01));
//!         params
//!     }
//!
//!     fn model_spectrum(
//!         &self,
//!         _params: &FitParameters,
//!         _elements: &FitElementMap,
//!         range: EnergyRange,
//!     ) -> xrf_fit::Result<Array1<f64>> {
//!         Ok(Array1::zeros(range.count()))
//!     }
//! }
//!
//! let mut elements = FitElementMap::new();
//! elements.insert(
//!     "Fe".to_string(),
//!     ElementDescriptor::new("Fe", "Fe").with_line(6.4, 1.0, EmissionLine::K),
//! );
//!
//! let mut routine = ParamOptimizedFitRoutine::default();
//! routine.set_update_coherent_amplitude_on_fit(false);
//!
//! // No optimizer: counts come straight from the seeds
//! let spectrum = Spectrum::from(vec![100.0; 2000]);
//! let counts = routine.fit_spectra(&Background, &spectrum, &elements).unwrap();
//! assert!((counts["Fe"] - 800.01).abs() < 1e-9);
//! ```

pub mod elements;
pub mod energy;
pub mod error;
pub mod model;
pub mod optimizer;
pub mod parameters;
pub mod problem;
pub mod routine;
pub mod seeding;
pub mod spectrum;
pub mod utils;

// Re-exports for convenience
pub use elements::{ElementDescriptor, EmissionLine, EnergyRatio, FitElementMap};
pub use energy::{get_energy_range, Calibration, EnergyRange};
pub use error::{Result, XrfFitError};
pub use model::SpectraModel;
pub use optimizer::{DifferentialEvolution, LmConfig, LmOptimizer, Optimizer};
pub use parameters::{BoundType, FitParameter, FitParameters};
pub use problem::{Problem, SpectrumProblem};
pub use routine::{FitCounts, FitRoutine, FitRoutineConfig, ParamOptimizedFitRoutine};
pub use spectrum::Spectrum;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
