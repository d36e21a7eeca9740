//! Optimizer capability and its implementations.
//!
//! An [`Optimizer`] takes a seeded parameter collection and mutates it in
//! place towards the best fit of the model to the spectrum. It also writes the
//! `num_iterations` and `residual` bookkeeping parameters.
//!
//! - [`LmOptimizer`]: gradient based Levenberg-Marquardt
//! - [`DifferentialEvolution`]: derivative-free population search

use crate::elements::FitElementMap;
use crate::energy::EnergyRange;
use crate::error::Result;
use crate::model::SpectraModel;
use crate::parameters::{names, FitParameter, FitParameters};
use crate::spectrum::Spectrum;

pub mod config;
pub mod differential_evolution;
pub mod lm;

pub use config::LmConfig;
pub use differential_evolution::{DEStrategy, DifferentialEvolution};
pub use lm::{LmOptimizer, LmResult};

/// A minimizer of the model-vs-spectrum residual.
///
/// Implementations must not keep per-call state in `self`; a single optimizer
/// may be shared between routines.
pub trait Optimizer: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Fit the varying parameters of `params` in place.
    ///
    /// Only channels inside `energy_range` contribute to the residual.
    fn minimize(
        &self,
        params: &mut FitParameters,
        spectrum: &Spectrum,
        elements: &FitElementMap,
        model: &dyn SpectraModel,
        energy_range: EnergyRange,
    ) -> Result<()>;
}

/// Record iteration count and final residual on the collection
pub(crate) fn write_bookkeeping(params: &mut FitParameters, iterations: usize, residual: f64) {
    for (name, value) in [
        (names::NUM_ITERATIONS, iterations as f64),
        (names::RESIDUAL, residual),
    ] {
        match params.get_mut(name) {
            Some(param) => param.value = value,
            None => {
                let mut param = FitParameter::bookkeeping(name);
                param.value = value;
                params.insert(param);
            }
        }
    }
}
