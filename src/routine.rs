//! Fit orchestration.
//!
//! A fit call copies the model's base parameters, seeds element amplitudes
//! from the spectrum, optionally reseeds the scatter amplitudes, and then
//! either takes the degenerate branch (all-zero spectrum) or hands the
//! collection to the configured optimizer.
//!
//! ```text
//! SEEDING -> (DEGENERATE | OPTIMIZING) -> EXTRACTION
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, warn};

use crate::elements::FitElementMap;
use crate::energy::EnergyRange;
use crate::error::{Result, XrfFitError};
use crate::model::SpectraModel;
use crate::optimizer::Optimizer;
use crate::parameters::{names, BoundType, FitParameter, FitParameters};
use crate::seeding::{add_elements_to_fit_parameters, calc_and_update_coherent_amplitude, EMPTY_SEED};
use crate::spectrum::Spectrum;

/// Element name to estimated photon count, plus the optional
/// `num_iterations` and `residual` entries.
pub type FitCounts = BTreeMap<String, f64>;

/// Value every parameter takes when the spectrum holds no counts.
pub const DEGENERATE_VALUE: f64 = -10.0;

/// Routine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitRoutineConfig {
    /// Channel range handed to the optimizer. Default: 0..=1999
    pub energy_range: EnergyRange,

    /// Reseed the coherent and Compton amplitudes on every fit. Default: true
    pub update_coherent_amplitude_on_fit: bool,

    /// Fail with [`XrfFitError::MissingOptimizer`] instead of returning the
    /// seeded values when no optimizer is set. Default: false
    pub strict_optimizer: bool,

    /// Report `1e-10` counts for an all-zero spectrum instead of the raw
    /// `-10.0` sentinel. Default: false
    pub normalize_degenerate_counts: bool,
}

impl Default for FitRoutineConfig {
    fn default() -> Self {
        Self {
            energy_range: EnergyRange::default(),
            update_coherent_amplitude_on_fit: true,
            strict_optimizer: false,
            normalize_degenerate_counts: false,
        }
    }
}

impl FitRoutineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A routine that fits element counts to a spectrum.
pub trait FitRoutine: Send + Sync {
    fn name(&self) -> &str;

    /// Fit the spectrum and return estimated counts per element.
    fn fit_spectra(
        &self,
        model: &dyn SpectraModel,
        spectrum: &Spectrum,
        elements: &FitElementMap,
    ) -> Result<FitCounts>;

    /// Fit the spectrum and return the full parameter collection, with
    /// amplitudes still on the log10 scale.
    fn fit_spectra_parameters(
        &self,
        model: &dyn SpectraModel,
        spectrum: &Spectrum,
        elements: &FitElementMap,
    ) -> Result<FitParameters>;

    /// Store the channel range used by later fits.
    fn initialize(
        &mut self,
        model: &dyn SpectraModel,
        elements: &FitElementMap,
        energy_range: EnergyRange,
    );
}

/// Fit routine that seeds parameters from the spectrum and refines them with
/// an injected [`Optimizer`].
///
/// Cloning is cheap; clones share the optimizer. Give each concurrent worker
/// its own clone.
#[derive(Clone, Default)]
pub struct ParamOptimizedFitRoutine {
    config: FitRoutineConfig,
    optimizer: Option<Arc<dyn Optimizer>>,
}

impl fmt::Debug for ParamOptimizedFitRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamOptimizedFitRoutine")
            .field("config", &self.config)
            .field("optimizer", &self.optimizer.as_ref().map(|o| o.name()))
            .finish()
    }
}

/// Parameter state after seeding and the optional optimizer pass
enum FitOutcome {
    Degenerate(FitParameters),
    Fitted(FitParameters),
}

impl ParamOptimizedFitRoutine {
    pub fn new(config: FitRoutineConfig) -> Self {
        Self {
            config,
            optimizer: None,
        }
    }

    pub fn with_optimizer(mut self, optimizer: Arc<dyn Optimizer>) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn set_optimizer(&mut self, optimizer: Arc<dyn Optimizer>) {
        self.optimizer = Some(optimizer);
    }

    pub fn optimizer(&self) -> Option<&Arc<dyn Optimizer>> {
        self.optimizer.as_ref()
    }

    pub fn config(&self) -> &FitRoutineConfig {
        &self.config
    }

    pub fn energy_range(&self) -> EnergyRange {
        self.config.energy_range
    }

    pub fn set_update_coherent_amplitude_on_fit(&mut self, enabled: bool) {
        self.config.update_coherent_amplitude_on_fit = enabled;
    }

    fn run(
        &self,
        model: &dyn SpectraModel,
        spectrum: &Spectrum,
        elements: &FitElementMap,
    ) -> Result<FitOutcome> {
        let mut params = model.fit_parameters();
        params.add_parameter(FitParameter::bookkeeping(names::NUM_ITERATIONS));
        add_elements_to_fit_parameters(&mut params, Some(spectrum), elements)?;

        if self.config.update_coherent_amplitude_on_fit {
            calc_and_update_coherent_amplitude(&mut params, spectrum)?;
        }

        if spectrum.sum() == 0.0 {
            debug!("spectrum has no counts, skipping optimization");
            params.set_all_value(DEGENERATE_VALUE, BoundType::Fit);
            return Ok(FitOutcome::Degenerate(params));
        }

        match &self.optimizer {
            Some(optimizer) => {
                debug!(optimizer = optimizer.name(), varying = params.varying_count(), "minimizing");
                optimizer.minimize(
                    &mut params,
                    spectrum,
                    elements,
                    model,
                    self.config.energy_range,
                )?;
            }
            None if self.config.strict_optimizer => return Err(XrfFitError::MissingOptimizer),
            None => warn!("no optimizer configured, returning seeded parameters"),
        }

        Ok(FitOutcome::Fitted(params))
    }
}

impl FitRoutine for ParamOptimizedFitRoutine {
    fn name(&self) -> &str {
        "Param Optimized"
    }

    fn fit_spectra(
        &self,
        model: &dyn SpectraModel,
        spectrum: &Spectrum,
        elements: &FitElementMap,
    ) -> Result<FitCounts> {
        let span = debug_span!("fit_spectra", elements = elements.len(), channels = spectrum.len());
        let _enter = span.enter();

        let params = match self.run(model, spectrum, elements)? {
            FitOutcome::Degenerate(_) => {
                let value = if self.config.normalize_degenerate_counts {
                    EMPTY_SEED
                } else {
                    DEGENERATE_VALUE
                };
                return Ok(elements.keys().map(|name| (name.clone(), value)).collect());
            }
            FitOutcome::Fitted(params) => params,
        };

        let mut counts = FitCounts::new();
        for name in elements.keys() {
            counts.insert(name.clone(), 10f64.powf(params.value(name)?));
        }
        for bookkeeping in [names::NUM_ITERATIONS, names::RESIDUAL] {
            if let Some(param) = params.get(bookkeeping) {
                counts.insert(bookkeeping.to_string(), param.value);
            }
        }

        debug!(entries = counts.len(), "extracted counts");
        Ok(counts)
    }

    fn fit_spectra_parameters(
        &self,
        model: &dyn SpectraModel,
        spectrum: &Spectrum,
        elements: &FitElementMap,
    ) -> Result<FitParameters> {
        let span = debug_span!(
            "fit_spectra_parameters",
            elements = elements.len(),
            channels = spectrum.len()
        );
        let _enter = span.enter();

        match self.run(model, spectrum, elements)? {
            FitOutcome::Degenerate(params) | FitOutcome::Fitted(params) => Ok(params),
        }
    }

    fn initialize(
        &mut self,
        _model: &dyn SpectraModel,
        _elements: &FitElementMap,
        energy_range: EnergyRange,
    ) {
        self.config.energy_range = energy_range;
    }
}
