//! Reserved parameter names shared between models, the seeder and optimizers.

/// Calibration offset in keV (channel 0 energy).
pub const ENERGY_OFFSET: &str = "energy_offset";

/// Calibration slope in keV per channel.
pub const ENERGY_SLOPE: &str = "energy_slope";

/// Iterations spent by the optimizer, written back after minimization.
pub const NUM_ITERATIONS: &str = "num_iterations";

/// Final residual of the fit, written back after minimization.
pub const RESIDUAL: &str = "residual";

/// Elastic (coherent) scatter peak energy in keV.
pub const COHERENT_SCT_ENERGY: &str = "coherent_sct_energy";

/// log10 amplitude of the elastic (coherent) scatter peak.
pub const COHERENT_SCT_AMPLITUDE: &str = "coherent_sct_amplitude";

/// log10 amplitude of the inelastic (Compton) scatter peak.
pub const COMPTON_AMPLITUDE: &str = "compton_amplitude";
