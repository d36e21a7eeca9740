//! Energy calibration and keV-to-channel mapping.
//!
//! A spectrum channel `c` sits at `offset + slope * c` keV. Seeding and
//! optimizers work on channel index ranges, resolved here from keV windows.

use serde::{Deserialize, Serialize};

/// Inclusive channel index range `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyRange {
    pub min: usize,
    pub max: usize,
}

impl Default for EnergyRange {
    fn default() -> Self {
        Self { min: 0, max: 1999 }
    }
}

impl EnergyRange {
    /// Build a range, ordering the endpoints if they arrive reversed
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Number of channels covered, always at least one
    pub fn count(&self) -> usize {
        self.max - self.min + 1
    }

    /// Clip to a spectrum of `len` channels
    pub fn clamp_to(&self, len: usize) -> Self {
        let last = len.saturating_sub(1);
        Self::new(self.min.min(last), self.max.min(last))
    }
}

/// Linear channel-to-keV calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub offset: f64,
    pub slope: f64,
}

impl Calibration {
    pub fn new(offset: f64, slope: f64) -> Self {
        Self { offset, slope }
    }

    /// Energy in keV at channel `channel`
    pub fn energy(&self, channel: usize) -> f64 {
        self.offset + self.slope * channel as f64
    }

    /// Nearest channel to `energy`, clamped to `[0, len - 1]`
    pub fn channel(&self, energy: f64, len: usize) -> usize {
        let last = len.saturating_sub(1);
        let channel = ((energy - self.offset) / self.slope).round();
        if channel.is_nan() {
            return 0;
        }
        channel.clamp(0.0, last as f64) as usize
    }
}

/// Resolve the keV window `[min_energy, max_energy]` to a channel range of a
/// spectrum with `spectrum_length` channels.
///
/// Both ends are rounded to the nearest channel and clamped into the
/// spectrum, and the result is ordered, so `min <= max` holds for any window
/// and calibration.
///
/// ```
/// use xrf_fit::energy::get_energy_range;
///
/// let range = get_energy_range(10.0, 10.2, 2000, 0.0, 0.01);
/// assert_eq!((range.min, range.max), (1000, 1020));
/// assert_eq!(range.count(), 21);
/// ```
pub fn get_energy_range(
    min_energy: f64,
    max_energy: f64,
    spectrum_length: usize,
    offset: f64,
    slope: f64,
) -> EnergyRange {
    let calibration = Calibration::new(offset, slope);
    EnergyRange::new(
        calibration.channel(min_energy, spectrum_length),
        calibration.channel(max_energy, spectrum_length),
    )
}
