//! Initial parameter estimates taken directly from the spectrum.
//!
//! Every element gets a log10 amplitude seed derived from the mean count in
//! a narrow window around its principal line. The elastic and Compton
//! scatter amplitudes can be reseeded the same way around the coherent
//! scatter energy.

use crate::elements::FitElementMap;
use crate::energy::{get_energy_range, Calibration};
use crate::error::Result;
use crate::parameters::{names, FitParameter, FitParameters};
use crate::spectrum::Spectrum;
use tracing::{debug, trace};

/// Multiplier applied to the window mean count.
pub const SEED_FACTOR: f64 = 8.0;

/// Added to the scaled window mean before taking the floor.
pub const SEED_OFFSET: f64 = 0.01;

/// Smallest linear amplitude a window seed may take.
pub const SEED_FLOOR: f64 = 1.0;

/// Linear amplitude used when an element cannot be seeded from the spectrum.
pub const EMPTY_SEED: f64 = 1.0e-10;

/// Half width in keV of the window around an element's principal line.
pub const ELEMENT_HALF_WINDOW: f64 = 0.1;

/// Half width in keV of the window around the coherent scatter energy.
pub const SCATTER_HALF_WINDOW: f64 = 0.4;

/// log10 amplitude seed for a window mean count.
///
/// The floor keeps the result finite and non-negative for any non-negative
/// mean.
///
/// ```
/// use xrf_fit::seeding::amplitude_seed;
///
/// assert!((amplitude_seed(100.0) - 800.01_f64.log10()).abs() < 1e-12);
/// assert_eq!(amplitude_seed(0.0), 0.0);
/// ```
pub fn amplitude_seed(window_mean: f64) -> f64 {
    (window_mean * SEED_FACTOR + SEED_OFFSET)
        .max(SEED_FLOOR)
        .log10()
}

/// Calibration read from the `energy_offset` / `energy_slope` parameters
pub fn calibration(params: &FitParameters) -> Result<Calibration> {
    Ok(Calibration::new(
        params.value(names::ENERGY_OFFSET)?,
        params.value(names::ENERGY_SLOPE)?,
    ))
}

/// Mean count in the keV window `center ± half_width`
pub fn window_mean(
    spectrum: &Spectrum,
    center: f64,
    half_width: f64,
    calibration: Calibration,
) -> Result<f64> {
    let range = get_energy_range(
        center - half_width,
        center + half_width,
        spectrum.len(),
        calibration.offset,
        calibration.slope,
    );
    spectrum.segment_mean(range.min, range.count())
}

/// Add an amplitude parameter for every element not yet in `params`, then
/// make sure the iteration and residual bookkeeping parameters exist and are
/// reset to zero.
///
/// Parameters that are already present are left untouched. Without a
/// (non-empty) spectrum, or for an element without lines, the seed is
/// `log10(1e-10)`.
pub fn add_elements_to_fit_parameters(
    params: &mut FitParameters,
    spectrum: Option<&Spectrum>,
    elements: &FitElementMap,
) -> Result<()> {
    let spectrum = spectrum.filter(|s| !s.is_empty());

    for (name, element) in elements {
        if params.contains(name) {
            trace!(element = %name, "keeping existing amplitude parameter");
            continue;
        }

        let seed = match (spectrum, element.principal_energy()) {
            (Some(spectrum), Some(energy)) => {
                let mean = window_mean(
                    spectrum,
                    energy,
                    ELEMENT_HALF_WINDOW,
                    calibration(params)?,
                )?;
                amplitude_seed(mean)
            }
            _ => EMPTY_SEED.log10(),
        };

        debug!(element = %name, seed, "seeded element amplitude");
        params.insert(FitParameter::element_amplitude(name, seed));
    }

    for bookkeeping in [names::NUM_ITERATIONS, names::RESIDUAL] {
        params.add_parameter(FitParameter::bookkeeping(bookkeeping));
        params.set_value(bookkeeping, 0.0)?;
    }

    Ok(())
}

/// Reseed the coherent and Compton scatter amplitudes from the mean count
/// around the coherent scatter energy.
///
/// Both amplitudes receive the same log10 value. Missing amplitude
/// parameters are created with the element amplitude defaults; a missing
/// coherent scatter energy is an error. Nothing happens for an empty
/// spectrum.
pub fn calc_and_update_coherent_amplitude(
    params: &mut FitParameters,
    spectrum: &Spectrum,
) -> Result<()> {
    if spectrum.is_empty() {
        return Ok(());
    }

    let energy = params.value(names::COHERENT_SCT_ENERGY)?;
    let mean = window_mean(spectrum, energy, SCATTER_HALF_WINDOW, calibration(params)?)?;
    let seed = amplitude_seed(mean);

    for amplitude in [names::COMPTON_AMPLITUDE, names::COHERENT_SCT_AMPLITUDE] {
        match params.get_mut(amplitude) {
            Some(param) => param.value = seed,
            None => {
                params.insert(FitParameter::element_amplitude(amplitude, seed));
            }
        }
    }

    debug!(energy, seed, "reseeded scatter amplitudes");
    Ok(())
}
