//! Fit routine behaviour: degenerate spectra, seed round-trips, bookkeeping
//! and configuration.

use std::sync::Arc;

use approx::assert_relative_eq;
use ndarray::Array1;
use xrf_fit::parameters::names;
use xrf_fit::{
    BoundType, EnergyRange, FitElementMap, FitParameter, FitParameters, FitRoutine,
    FitRoutineConfig, LmOptimizer, Optimizer, ParamOptimizedFitRoutine, SpectraModel, Spectrum,
    XrfFitError,
};

use crate::test_helpers::{fe_zn_elements, synthetic_spectrum, GaussianLineModel};

/// Optimizer that accepts the seeds as the fit result
struct NoOpOptimizer;

impl Optimizer for NoOpOptimizer {
    fn name(&self) -> &str {
        "no-op"
    }

    fn minimize(
        &self,
        _params: &mut FitParameters,
        _spectrum: &Spectrum,
        _elements: &FitElementMap,
        _model: &dyn SpectraModel,
        _energy_range: EnergyRange,
    ) -> xrf_fit::Result<()> {
        Ok(())
    }
}

/// Model whose base parameters carry values left over from an earlier fit
struct StaleModel(GaussianLineModel);

impl SpectraModel for StaleModel {
    fn fit_parameters(&self) -> FitParameters {
        let mut params = self.0.fit_parameters();
        let mut itr = FitParameter::bookkeeping(names::NUM_ITERATIONS);
        itr.value = 57.0;
        params.insert(itr);
        params.insert(FitParameter::new(names::RESIDUAL, 123.0));
        params
    }

    fn model_spectrum(
        &self,
        params: &FitParameters,
        elements: &FitElementMap,
        energy_range: EnergyRange,
    ) -> xrf_fit::Result<Array1<f64>> {
        self.0.model_spectrum(params, elements, energy_range)
    }
}

#[test]
fn test_all_zero_spectrum_returns_sentinel() {
    let routine = ParamOptimizedFitRoutine::default().with_optimizer(Arc::new(LmOptimizer::new()));
    let model = GaussianLineModel::default();
    let elements = fe_zn_elements();
    let spectrum = Spectrum::zeros(2000);

    let counts = routine.fit_spectra(&model, &spectrum, &elements).unwrap();
    assert_eq!(counts.len(), elements.len());
    for name in elements.keys() {
        assert_eq!(counts[name], -10.0);
    }

    let params = routine
        .fit_spectra_parameters(&model, &spectrum, &elements)
        .unwrap();
    assert!(params.contains(names::COMPTON_AMPLITUDE));
    for (_, param) in params.iter() {
        assert_eq!(param.value, -10.0);
        assert_eq!(param.bound_type, BoundType::Fit);
    }
}

#[test]
fn test_no_op_optimizer_round_trips_seeds() {
    let model = GaussianLineModel::default();
    let elements = fe_zn_elements();
    let spectrum = synthetic_spectrum(3.0, 2.5, 2.0, 1.5);

    let routine = ParamOptimizedFitRoutine::default().with_optimizer(Arc::new(NoOpOptimizer));
    let seeded = routine
        .fit_spectra_parameters(&model, &spectrum, &elements)
        .unwrap();
    let counts = routine.fit_spectra(&model, &spectrum, &elements).unwrap();

    for name in elements.keys() {
        let seed = seeded.value(name).unwrap();
        assert_relative_eq!(counts[name], 10f64.powf(seed), max_relative = 1e-12);
    }
    assert_eq!(counts[names::NUM_ITERATIONS], 0.0);
    assert_eq!(counts[names::RESIDUAL], 0.0);
}

#[test]
fn test_bookkeeping_reset_every_fit() {
    let model = StaleModel(GaussianLineModel::default());
    let spectrum = synthetic_spectrum(3.0, 2.5, 2.0, 1.5);

    let routine = ParamOptimizedFitRoutine::default();
    let params = routine
        .fit_spectra_parameters(&model, &spectrum, &fe_zn_elements())
        .unwrap();
    assert_eq!(params.value(names::NUM_ITERATIONS).unwrap(), 0.0);
    assert_eq!(params.value(names::RESIDUAL).unwrap(), 0.0);
}

#[test]
fn test_strict_mode_requires_optimizer() {
    let config = FitRoutineConfig::from_json(r#"{ "strict_optimizer": true }"#).unwrap();
    let mut routine = ParamOptimizedFitRoutine::new(config);
    let model = GaussianLineModel::default();
    let spectrum = synthetic_spectrum(3.0, 2.5, 2.0, 1.5);

    let err = routine
        .fit_spectra(&model, &spectrum, &fe_zn_elements())
        .unwrap_err();
    assert!(matches!(err, XrfFitError::MissingOptimizer));

    // The degenerate branch never reaches the optimizer
    assert!(routine
        .fit_spectra(&model, &Spectrum::zeros(2000), &fe_zn_elements())
        .is_ok());

    routine.set_optimizer(Arc::new(NoOpOptimizer));
    assert!(routine.fit_spectra(&model, &spectrum, &fe_zn_elements()).is_ok());
}

#[test]
fn test_missing_coherent_energy_is_reported() {
    struct Bare;

    impl SpectraModel for Bare {
        fn fit_parameters(&self) -> FitParameters {
            [
                FitParameter::new(names::ENERGY_OFFSET, 0.0),
                FitParameter::new(names::ENERGY_SLOPE, 0.01),
            ]
            .into_iter()
            .collect()
        }

        fn model_spectrum(
            &self,
            _params: &FitParameters,
            _elements: &FitElementMap,
            energy_range: EnergyRange,
        ) -> xrf_fit::Result<Array1<f64>> {
            Ok(Array1::zeros(energy_range.count()))
        }
    }

    let spectrum = synthetic_spectrum(3.0, 2.5, 2.0, 1.5);
    let mut routine = ParamOptimizedFitRoutine::default();
    let err = routine
        .fit_spectra(&Bare, &spectrum, &fe_zn_elements())
        .unwrap_err();
    assert!(
        matches!(err, XrfFitError::ParameterNotFound(ref name) if name == names::COHERENT_SCT_ENERGY)
    );

    routine.set_update_coherent_amplitude_on_fit(false);
    assert!(routine.fit_spectra(&Bare, &spectrum, &fe_zn_elements()).is_ok());
}

#[test]
fn test_routine_clones_fit_concurrently() {
    let routine = ParamOptimizedFitRoutine::default().with_optimizer(Arc::new(LmOptimizer::new()));
    let model = GaussianLineModel::default();
    let elements = fe_zn_elements();
    let spectra: Vec<Spectrum> = [2.0, 2.5, 3.0]
        .iter()
        .map(|&fe| synthetic_spectrum(fe, 2.5, 2.0, 1.5))
        .collect();

    let results: Vec<f64> = std::thread::scope(|scope| {
        let handles: Vec<_> = spectra
            .iter()
            .map(|spectrum| {
                let worker = routine.clone();
                let model = &model;
                let elements = &elements;
                scope.spawn(move || worker.fit_spectra(model, spectrum, elements).unwrap()["Fe"])
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (fitted, expected) in results.iter().zip([100.0, 10f64.powf(2.5), 1000.0]) {
        assert_relative_eq!(*fitted, expected, max_relative = 1e-3);
    }
}
