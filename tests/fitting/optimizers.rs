//! Optimizers recovering known amplitudes from noise-free synthetic spectra.

use std::sync::Arc;

use approx::assert_relative_eq;
use xrf_fit::optimizer::{DEStrategy, LmConfig};
use xrf_fit::parameters::names;
use xrf_fit::{
    DifferentialEvolution, EnergyRange, FitParameter, FitParameters, FitRoutine, LmOptimizer,
    Optimizer, ParamOptimizedFitRoutine, Problem, SpectraModel, SpectrumProblem,
};

use crate::test_helpers::{fe_zn_elements, synthetic_spectrum, GaussianLineModel};

const FE: f64 = 3.0;
const ZN: f64 = 2.5;
const COHERENT: f64 = 2.0;
const COMPTON: f64 = 1.5;

fn assert_recovered(params: &FitParameters, tolerance: f64) {
    for (name, expected) in [
        ("Fe", FE),
        ("Zn", ZN),
        (names::COHERENT_SCT_AMPLITUDE, COHERENT),
        (names::COMPTON_AMPLITUDE, COMPTON),
    ] {
        assert_relative_eq!(params.value(name).unwrap(), expected, epsilon = tolerance);
    }
}

#[test]
fn test_lm_recovers_amplitudes() {
    let model = GaussianLineModel::default();
    let spectrum = synthetic_spectrum(FE, ZN, COHERENT, COMPTON);
    let routine = ParamOptimizedFitRoutine::default().with_optimizer(Arc::new(LmOptimizer::new()));

    let params = routine
        .fit_spectra_parameters(&model, &spectrum, &fe_zn_elements())
        .unwrap();
    assert_recovered(&params, 1e-4);
    assert!(params.value(names::NUM_ITERATIONS).unwrap() > 0.0);
    assert!(params.value(names::RESIDUAL).unwrap() < 1e-6);

    let counts = routine
        .fit_spectra(&model, &spectrum, &fe_zn_elements())
        .unwrap();
    assert_relative_eq!(counts["Fe"], 1000.0, max_relative = 1e-3);
    assert_relative_eq!(counts["Zn"], 10f64.powf(ZN), max_relative = 1e-3);
}

#[test]
fn test_lm_unweighted_residuals() {
    let model = GaussianLineModel::default();
    let spectrum = synthetic_spectrum(FE, ZN, COHERENT, COMPTON);
    let config = LmConfig {
        poisson_weights: false,
        ..LmConfig::default()
    };
    let routine =
        ParamOptimizedFitRoutine::default().with_optimizer(Arc::new(LmOptimizer::with_config(config)));

    let params = routine
        .fit_spectra_parameters(&model, &spectrum, &fe_zn_elements())
        .unwrap();
    assert_recovered(&params, 1e-4);
}

#[test]
fn test_energy_range_limits_the_fit() {
    let model = GaussianLineModel::default();
    let elements = fe_zn_elements();
    let spectrum = synthetic_spectrum(FE, ZN, COHERENT, COMPTON);

    let seeded = ParamOptimizedFitRoutine::default()
        .fit_spectra_parameters(&model, &spectrum, &elements)
        .unwrap();

    // 5.5 .. 7.8 keV holds both iron lines and nothing of zinc
    let mut routine =
        ParamOptimizedFitRoutine::default().with_optimizer(Arc::new(LmOptimizer::new()));
    routine.initialize(&model, &elements, EnergyRange::new(550, 780));
    let params = routine
        .fit_spectra_parameters(&model, &spectrum, &elements)
        .unwrap();

    assert_relative_eq!(params.value("Fe").unwrap(), FE, epsilon = 1e-4);
    assert_relative_eq!(
        params.value("Zn").unwrap(),
        seeded.value("Zn").unwrap(),
        epsilon = 1e-6
    );
}

#[test]
fn test_lm_without_varying_parameters() {
    let model = GaussianLineModel::default();
    let elements = fe_zn_elements();
    let spectrum = synthetic_spectrum(FE, ZN, COHERENT, COMPTON);

    let mut params = model.fit_parameters();
    for (name, value) in [("Fe", FE), ("Zn", ZN)] {
        params.insert(FitParameter::new(name, value));
    }

    LmOptimizer::new()
        .minimize(&mut params, &spectrum, &elements, &model, EnergyRange::new(0, 1999))
        .unwrap();

    assert_eq!(params.value("Fe").unwrap(), FE);
    assert_eq!(params.value(names::NUM_ITERATIONS).unwrap(), 0.0);
    // Scatter peaks are absent from the model, so their counts remain
    assert!(params.value(names::RESIDUAL).unwrap() > 0.0);
}

#[test]
fn test_spectrum_problem_jacobian_shape() {
    let model = GaussianLineModel::default();
    let elements = fe_zn_elements();
    let spectrum = synthetic_spectrum(FE, ZN, COHERENT, COMPTON);

    let mut params = model.fit_parameters();
    params.insert(FitParameter::element_amplitude("Fe", FE));
    params.insert(FitParameter::element_amplitude("Zn", ZN));

    let problem = SpectrumProblem::new(
        &params,
        &spectrum,
        &elements,
        &model,
        EnergyRange::new(600, 900),
        true,
    )
    .unwrap();

    let x = params.to_internal_array().unwrap();
    let jacobian = problem.jacobian(&x).unwrap();
    assert_eq!(jacobian.dim(), (301, 2));

    // Raising an amplitude lowers the residual near its line
    assert!(jacobian[[40, 0]] < 0.0);
    assert!(jacobian[[264, 1]] < 0.0);
}

#[test]
fn test_differential_evolution_recovers_amplitudes() {
    let model = GaussianLineModel::default();
    let spectrum = synthetic_spectrum(FE, ZN, COHERENT, COMPTON);
    let de = DifferentialEvolution::new()
        .with_seed(7)
        .with_max_generations(400)
        .with_max_no_improvement(60);
    let routine = ParamOptimizedFitRoutine::default().with_optimizer(Arc::new(de));

    let params = routine
        .fit_spectra_parameters(&model, &spectrum, &fe_zn_elements())
        .unwrap();
    assert_recovered(&params, 0.02);
    assert!(params.value(names::NUM_ITERATIONS).unwrap() > 0.0);
}

#[test]
fn test_differential_evolution_is_reproducible() {
    let model = GaussianLineModel::default();
    let spectrum = synthetic_spectrum(FE, ZN, COHERENT, COMPTON);
    let fit = |seed: u64| {
        let de = DifferentialEvolution::new()
            .with_seed(seed)
            .with_strategy(DEStrategy::Best1)
            .with_max_generations(30);
        ParamOptimizedFitRoutine::default()
            .with_optimizer(Arc::new(de))
            .fit_spectra_parameters(&model, &spectrum, &fe_zn_elements())
            .unwrap()
    };

    let first = fit(11);
    assert_eq!(first, fit(11));

    // Never worse than the seeds it started from
    let seeded = ParamOptimizedFitRoutine::default()
        .fit_spectra_parameters(&model, &spectrum, &fe_zn_elements())
        .unwrap();
    let elements = fe_zn_elements();
    let problem = SpectrumProblem::new(
        &seeded,
        &spectrum,
        &elements,
        &model,
        EnergyRange::default(),
        true,
    )
    .unwrap();
    assert!(first.value(names::RESIDUAL).unwrap() <= problem.cost(&seeded).unwrap());
}
