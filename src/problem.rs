//! Least-squares problem definitions.
//!
//! [`Problem`] is the vector-valued residual interface optimizers iterate on.
//! [`SpectrumProblem`] adapts a spectrum, a model and the varying subset of a
//! fit parameter collection to it.

use crate::elements::FitElementMap;
use crate::energy::EnergyRange;
use crate::error::{Result, XrfFitError};
use crate::model::SpectraModel;
use crate::parameters::FitParameters;
use crate::spectrum::Spectrum;
use ndarray::{Array1, Array2};

/// A nonlinear least-squares problem.
pub trait Problem {
    /// Residual vector at `params`
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    fn parameter_count(&self) -> usize;

    fn residual_count(&self) -> usize;

    /// Jacobian of the residuals, `J[i, j] = d r_i / d p_j`.
    ///
    /// Defaults to forward finite differences.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// Sum of squared residuals at `params`
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

/// Residuals `(observed - predicted) * weight` over a channel range.
///
/// The problem vector holds the varying parameters of the collection in the
/// unbounded internal coordinates of their [`BoundsTransform`](crate::parameters::BoundsTransform),
/// so any vector an optimizer proposes maps back inside the bounds.
pub struct SpectrumProblem<'a> {
    template: FitParameters,
    elements: &'a FitElementMap,
    model: &'a dyn SpectraModel,
    energy_range: EnergyRange,
    observed: Array1<f64>,
    weights: Array1<f64>,
    n_varying: usize,
}

impl<'a> SpectrumProblem<'a> {
    /// Build the problem for `params`.
    ///
    /// `energy_range` is clipped to the spectrum. With `poisson_weights` each
    /// channel is weighted by `1 / sqrt(max(counts, 1))`, otherwise all
    /// weights are one.
    pub fn new(
        params: &FitParameters,
        spectrum: &Spectrum,
        elements: &'a FitElementMap,
        model: &'a dyn SpectraModel,
        energy_range: EnergyRange,
        poisson_weights: bool,
    ) -> Result<Self> {
        if spectrum.is_empty() {
            return Err(XrfFitError::InvalidInput(
                "cannot fit an empty spectrum".to_string(),
            ));
        }

        let energy_range = energy_range.clamp_to(spectrum.len());
        let observed = spectrum
            .segment(energy_range.min, energy_range.count())?
            .to_owned();
        let weights = if poisson_weights {
            observed.mapv(|c| 1.0 / c.max(1.0).sqrt())
        } else {
            Array1::ones(observed.len())
        };

        Ok(Self {
            template: params.clone(),
            elements,
            model,
            energy_range,
            observed,
            weights,
            n_varying: params.varying_count(),
        })
    }

    pub fn energy_range(&self) -> EnergyRange {
        self.energy_range
    }

    /// Parameter collection corresponding to an internal vector
    pub fn parameters_at(&self, internal: &Array1<f64>) -> Result<FitParameters> {
        let mut params = self.template.clone();
        params.update_from_internal(internal)?;
        Ok(params)
    }

    /// Parameter collection with the varying values set directly
    pub fn parameters_with_values(&self, values: &Array1<f64>) -> Result<FitParameters> {
        let mut params = self.template.clone();
        params.update_from_array(values)?;
        Ok(params)
    }

    /// Weighted residuals for a full parameter collection
    pub fn residuals(&self, params: &FitParameters) -> Result<Array1<f64>> {
        let predicted = self
            .model
            .model_spectrum(params, self.elements, self.energy_range)?;
        if predicted.len() != self.observed.len() {
            return Err(XrfFitError::DimensionMismatch(format!(
                "model returned {} channels, expected {}",
                predicted.len(),
                self.observed.len()
            )));
        }
        Ok((&self.observed - &predicted) * &self.weights)
    }

    /// Sum of squared weighted residuals; non-finite costs become infinity
    pub fn cost(&self, params: &FitParameters) -> Result<f64> {
        let cost: f64 = self.residuals(params)?.iter().map(|r| r * r).sum();
        Ok(if cost.is_nan() { f64::INFINITY } else { cost })
    }
}

impl Problem for SpectrumProblem<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.residuals(&self.parameters_at(params)?)
    }

    fn parameter_count(&self) -> usize {
        self.n_varying
    }

    fn residual_count(&self) -> usize {
        self.observed.len()
    }
}
