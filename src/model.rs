//! Spectrum model capability.
//!
//! The physical emission model lives outside this crate. Fitting only needs
//! two things from it: the template parameter set and a way to predict
//! counts for a parameter set, which optimizers use to form residuals.

use crate::elements::FitElementMap;
use crate::energy::EnergyRange;
use crate::error::Result;
use crate::parameters::FitParameters;
use ndarray::Array1;

/// A model that predicts an XRF spectrum from fit parameters.
pub trait SpectraModel: Send + Sync {
    /// Base parameters of the model.
    ///
    /// Must include the `energy_offset` and `energy_slope` calibration
    /// parameters. A copy is taken at the start of every fit.
    fn fit_parameters(&self) -> FitParameters;

    /// Predicted counts for channels `energy_range.min..=energy_range.max`.
    ///
    /// Element amplitudes in `params` are log10 values. The returned vector
    /// must have `energy_range.count()` entries.
    fn model_spectrum(
        &self,
        params: &FitParameters,
        elements: &FitElementMap,
        energy_range: EnergyRange,
    ) -> Result<Array1<f64>>;
}
