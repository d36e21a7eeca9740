//! Fit parameter collection
//!
//! [`FitParameters`] is the keyed set of parameters one fit works on. A fresh
//! collection is copied from the model for every fit, extended by the seeder,
//! mutated in place by the optimizer and finally read back by the routine.

use crate::parameters::parameter::{BoundType, FitParameter, ParameterError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A collection of fit parameters keyed by name
///
/// Iteration is ordered by name, which also fixes the layout of the
/// varying-parameter vectors handed to optimizers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FitParameters {
    params: BTreeMap<String, FitParameter>,
}

impl FitParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter unless one with the same name is already present.
    ///
    /// Returns `true` when the parameter was inserted.
    ///
    /// ```
    /// use xrf_fit::parameters::{FitParameter, FitParameters};
    ///
    /// let mut params = FitParameters::new();
    /// assert!(params.add_parameter(FitParameter::new("energy_offset", 0.0)));
    /// assert!(!params.add_parameter(FitParameter::new("energy_offset", 1.0)));
    /// assert_eq!(params.value("energy_offset").unwrap(), 0.0);
    /// ```
    pub fn add_parameter(&mut self, param: FitParameter) -> bool {
        if self.params.contains_key(&param.name) {
            return false;
        }
        self.params.insert(param.name.clone(), param);
        true
    }

    /// Insert a parameter, replacing any existing one of the same name
    pub fn insert(&mut self, param: FitParameter) -> Option<FitParameter> {
        self.params.insert(param.name.clone(), param)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FitParameter> {
        self.params.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FitParameter> {
        self.params.get_mut(name)
    }

    /// Like [`get`](Self::get) but reports a missing parameter as an error
    pub fn at(&self, name: &str) -> Result<&FitParameter, ParameterError> {
        self.params
            .get(name)
            .ok_or_else(|| ParameterError::ParameterNotFound {
                name: name.to_string(),
            })
    }

    pub fn value(&self, name: &str) -> Result<f64, ParameterError> {
        self.at(name).map(|p| p.value)
    }

    /// Overwrite the value of an existing parameter
    pub fn set_value(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        let param = self
            .params
            .get_mut(name)
            .ok_or_else(|| ParameterError::ParameterNotFound {
                name: name.to_string(),
            })?;
        param.value = value;
        Ok(())
    }

    /// Set every parameter to `value` with the given bound type
    pub fn set_all_value(&mut self, value: f64, bound_type: BoundType) {
        for param in self.params.values_mut() {
            param.value = value;
            param.bound_type = bound_type;
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<FitParameter> {
        self.params.remove(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.params.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FitParameter)> {
        self.params.iter()
    }

    /// Names of the parameters an optimizer may vary, in vector order
    pub fn varying_names(&self) -> Vec<String> {
        self.params
            .values()
            .filter(|p| p.is_varying())
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn varying_count(&self) -> usize {
        self.params.values().filter(|p| p.is_varying()).count()
    }

    /// Values of the varying parameters
    pub fn to_array(&self) -> Array1<f64> {
        self.params
            .values()
            .filter(|p| p.is_varying())
            .map(|p| p.value)
            .collect()
    }

    /// Varying parameters mapped to the optimizer's unbounded coordinates
    pub fn to_internal_array(&self) -> Result<Array1<f64>, ParameterError> {
        let values = self
            .params
            .values()
            .filter(|p| p.is_varying())
            .map(|p| p.to_internal())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Array1::from_vec(values))
    }

    /// Overwrite the varying parameters from a value vector
    pub fn update_from_array(&mut self, values: &Array1<f64>) -> Result<(), ParameterError> {
        self.check_varying_len(values.len())?;
        for (param, &value) in self
            .params
            .values_mut()
            .filter(|p| p.is_varying())
            .zip(values.iter())
        {
            param.value = value;
        }
        Ok(())
    }

    /// Overwrite the varying parameters from internal optimizer coordinates
    pub fn update_from_internal(&mut self, internal: &Array1<f64>) -> Result<(), ParameterError> {
        self.check_varying_len(internal.len())?;
        for (param, &x) in self
            .params
            .values_mut()
            .filter(|p| p.is_varying())
            .zip(internal.iter())
        {
            param.value = param.from_internal(x);
        }
        Ok(())
    }

    /// `(min, max)` limits of the varying parameters
    pub fn varying_bounds(&self) -> Vec<(f64, f64)> {
        self.params
            .values()
            .filter(|p| p.is_varying())
            .map(|p| {
                let b = p.effective_bounds();
                (b.min, b.max)
            })
            .collect()
    }

    /// Lower bounds of the varying parameters
    pub fn min_array(&self) -> Array1<f64> {
        self.varying_bounds().iter().map(|&(min, _)| min).collect()
    }

    /// Upper bounds of the varying parameters
    pub fn max_array(&self) -> Array1<f64> {
        self.varying_bounds().iter().map(|&(_, max)| max).collect()
    }

    fn check_varying_len(&self, actual: usize) -> Result<(), ParameterError> {
        let expected = self.varying_count();
        if expected != actual {
            return Err(ParameterError::LengthMismatch { expected, actual });
        }
        Ok(())
    }

    /// Serialize the collection to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a collection from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl FromIterator<FitParameter> for FitParameters {
    fn from_iter<I: IntoIterator<Item = FitParameter>>(iter: I) -> Self {
        let mut params = FitParameters::new();
        for param in iter {
            params.insert(param);
        }
        params
    }
}
