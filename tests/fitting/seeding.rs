//! Seeding of element and scatter amplitudes against synthetic spectra.

use approx::assert_relative_eq;
use ndarray::Array1;
use xrf_fit::parameters::names;
use xrf_fit::seeding::{
    add_elements_to_fit_parameters, amplitude_seed, calc_and_update_coherent_amplitude,
};
use xrf_fit::{
    get_energy_range, BoundType, ElementDescriptor, FitElementMap, FitParameter, FitParameters,
    SpectraModel, Spectrum,
};

use crate::test_helpers::{fe_zn_elements, synthetic_spectrum, GaussianLineModel};

#[test]
fn test_seed_matches_window_mean() {
    let model = GaussianLineModel::default();
    let spectrum = synthetic_spectrum(3.0, 2.5, 2.0, 1.5);
    let mut params = model.fit_parameters();

    add_elements_to_fit_parameters(&mut params, Some(&spectrum), &fe_zn_elements()).unwrap();

    for (name, energy) in [("Fe", 6.404), ("Zn", 8.639)] {
        let range = get_energy_range(energy - 0.1, energy + 0.1, spectrum.len(), 0.0, 0.01);
        let mean = spectrum.segment_sum(range.min, range.count()).unwrap() / range.count() as f64;
        let param = params.get(name).unwrap();
        assert_relative_eq!(param.value, (mean * 8.0 + 0.01).max(1.0).log10(), epsilon = 1e-12);
        assert_eq!(param.bound_type, BoundType::Fit);
    }
}

#[test]
fn test_documented_window_example() {
    // 2000 channels, 10 eV per channel, 100 counts in 10.0..=10.2 keV
    let mut counts = Array1::zeros(2000);
    for c in 1000..=1020 {
        counts[c] = 100.0;
    }
    let spectrum = Spectrum::new(counts);

    let range = get_energy_range(10.0, 10.2, spectrum.len(), 0.0, 0.01);
    assert_eq!((range.min, range.max), (1000, 1020));

    let mut params = GaussianLineModel::default().fit_parameters();
    let mut elements = FitElementMap::new();
    elements.insert(
        "Ge".to_string(),
        ElementDescriptor::new("Ge", "Ge").with_line(10.1, 1.0, Default::default()),
    );
    add_elements_to_fit_parameters(&mut params, Some(&spectrum), &elements).unwrap();
    assert_relative_eq!(params.value("Ge").unwrap(), 2.903, epsilon = 1e-3);
}

#[test]
fn test_preexisting_parameters_survive() {
    let model = GaussianLineModel::default();
    let spectrum = synthetic_spectrum(3.0, 2.5, 2.0, 1.5);

    let mut params = model.fit_parameters();
    let preset =
        FitParameter::with_bounds("Zn", 1.25, -2.0, 4.0, 0.05, BoundType::LimitedLoHi).unwrap();
    params.insert(preset.clone());

    add_elements_to_fit_parameters(&mut params, Some(&spectrum), &fe_zn_elements()).unwrap();
    assert_eq!(params.get("Zn"), Some(&preset));
    assert!(params.value("Fe").unwrap() > 1.0);
}

#[test]
fn test_scatter_amplitudes_share_seed() {
    let model = GaussianLineModel::default();
    let spectrum = synthetic_spectrum(3.0, 2.5, 2.0, 1.5);
    let mut params = model.fit_parameters();

    calc_and_update_coherent_amplitude(&mut params, &spectrum).unwrap();

    let range = get_energy_range(14.6, 15.4, spectrum.len(), 0.0, 0.01);
    let mean = spectrum.segment_sum(range.min, range.count()).unwrap() / range.count() as f64;
    let coherent = params.value(names::COHERENT_SCT_AMPLITUDE).unwrap();
    assert_relative_eq!(coherent, amplitude_seed(mean), epsilon = 1e-12);
    assert_eq!(params.value(names::COMPTON_AMPLITUDE).unwrap(), coherent);
}

#[test]
fn test_bookkeeping_present_after_seeding() {
    let mut params = FitParameters::new();
    add_elements_to_fit_parameters(&mut params, None, &fe_zn_elements()).unwrap();

    assert_eq!(params.len(), 4);
    assert_eq!(params.value("Fe").unwrap(), -10.0);
    assert_eq!(params.get(names::NUM_ITERATIONS).unwrap().bound_type, BoundType::Fixed);
    assert_eq!(params.get(names::RESIDUAL).unwrap().bound_type, BoundType::Fixed);
    assert_eq!(params.varying_names(), vec!["Fe", "Zn"]);
}
