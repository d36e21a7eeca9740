//! Element descriptors: characteristic emission lines of the elements to fit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Emission line family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmissionLine {
    #[default]
    K,
    L,
    M,
    Other,
}

/// One characteristic line: energy in keV and intensity relative to the
/// element's strongest line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyRatio {
    pub energy: f64,
    pub ratio: f64,
    #[serde(default)]
    pub line: EmissionLine,
}

impl EnergyRatio {
    pub fn new(energy: f64, ratio: f64, line: EmissionLine) -> Self {
        Self { energy, ratio, line }
    }
}

/// An element (or element line family) taking part in a fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    /// Full name, e.g. `Fe` or `Pb_L`
    pub name: String,

    /// Atomic symbol
    pub symbol: String,

    /// Lines ordered with the principal line first
    #[serde(default)]
    pub energy_ratios: Vec<EnergyRatio>,
}

impl ElementDescriptor {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            energy_ratios: Vec::new(),
        }
    }

    /// Append a line; the first line added is the principal one
    pub fn with_line(mut self, energy: f64, ratio: f64, line: EmissionLine) -> Self {
        self.energy_ratios.push(EnergyRatio::new(energy, ratio, line));
        self
    }

    /// Energy of the principal line, if the element has any lines
    pub fn principal_energy(&self) -> Option<f64> {
        self.energy_ratios.first().map(|r| r.energy)
    }
}

/// Elements to fit, keyed by the name used for their amplitude parameter
pub type FitElementMap = BTreeMap<String, ElementDescriptor>;

/// Build a [`FitElementMap`] keyed by each descriptor's name
pub fn element_map<I>(elements: I) -> FitElementMap
where
    I: IntoIterator<Item = ElementDescriptor>,
{
    elements.into_iter().map(|e| (e.name.clone(), e)).collect()
}
