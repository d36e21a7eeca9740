//! Measured spectrum and segment reductions.

use crate::error::{Result, XrfFitError};
use ndarray::{s, Array1, ArrayView1};

/// Photon counts per detector channel
///
/// Read-only to the fitting code; callers own the spectrum and may share it
/// across concurrent fits.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    counts: Array1<f64>,
}

impl Spectrum {
    pub fn new(counts: Array1<f64>) -> Self {
        Self { counts }
    }

    /// A spectrum of `len` channels with no counts
    pub fn zeros(len: usize) -> Self {
        Self::new(Array1::zeros(len))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn counts(&self) -> ArrayView1<'_, f64> {
        self.counts.view()
    }

    /// Total counts over all channels
    pub fn sum(&self) -> f64 {
        self.counts.sum()
    }

    /// View of `count` channels starting at `start`.
    ///
    /// Fails instead of clamping when the segment runs past the end; callers
    /// resolve channel ranges through [`get_energy_range`](crate::energy::get_energy_range) first.
    pub fn segment(&self, start: usize, count: usize) -> Result<ArrayView1<'_, f64>> {
        let end = start
            .checked_add(count)
            .filter(|&end| end <= self.len())
            .ok_or(XrfFitError::SegmentOutOfBounds {
                start,
                count,
                len: self.len(),
            })?;
        Ok(self.counts.slice(s![start..end]))
    }

    /// Sum of counts over `[start, start + count)`
    pub fn segment_sum(&self, start: usize, count: usize) -> Result<f64> {
        Ok(self.segment(start, count)?.sum())
    }

    /// Mean count over `[start, start + count)`; zero for an empty segment
    pub fn segment_mean(&self, start: usize, count: usize) -> Result<f64> {
        let sum = self.segment_sum(start, count)?;
        if count == 0 {
            return Ok(0.0);
        }
        Ok(sum / count as f64)
    }
}

impl From<Array1<f64>> for Spectrum {
    fn from(counts: Array1<f64>) -> Self {
        Self::new(counts)
    }
}

impl From<Vec<f64>> for Spectrum {
    fn from(counts: Vec<f64>) -> Self {
        Self::new(Array1::from_vec(counts))
    }
}
