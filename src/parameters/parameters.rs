//! Ordered parameter collection.
//!
//! `Parameters` keeps insertion order so that the optimizer's parameter vector
//! and reports are stable from run to run.

use crate::error::{KinFitError, Result};
use crate::parameters::parameter::{Parameter, ParameterError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A named, ordered set of fit parameters (`S0`, `bias`, `vmax`, `Km`, ...).
///
/// # Example
///
/// ```
/// use kinfit_rs::parameters::Parameters;
///
/// let mut params = Parameters::new();
/// params.add_param("S0", 1.2);
/// params.add_param_with_bounds("Km", 0.5, 0.0, 10.0).unwrap();
/// params.add_fixed("v0", 1.0);
///
/// assert_eq!(params.names(), vec!["S0", "Km", "v0"]);
/// assert_eq!(params.varying().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    params: Vec<Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter. A parameter with the same name is replaced in place.
    pub fn add(&mut self, param: Parameter) {
        match self.params.iter_mut().find(|p| p.name() == param.name()) {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
    }

    pub fn add_param(&mut self, name: &str, value: f64) {
        self.add(Parameter::new(name, value));
    }

    pub fn add_param_with_bounds(
        &mut self,
        name: &str,
        value: f64,
        min: f64,
        max: f64,
    ) -> std::result::Result<(), ParameterError> {
        self.add(Parameter::with_bounds(name, value, min, max)?);
        Ok(())
    }

    pub fn add_fixed(&mut self, name: &str, value: f64) {
        self.add(Parameter::fixed(name, value));
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Value of `name`, if present.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.get(name).map(Parameter::value)
    }

    /// Value of `name`, or `MissingParameter`.
    pub fn require(&self, name: &str) -> Result<f64> {
        self.value(name)
            .ok_or_else(|| KinFitError::MissingParameter(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        let index = self.params.iter().position(|p| p.name() == name)?;
        Some(self.params.remove(index))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(Parameter::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Name → value for every parameter.
    pub fn values_dict(&self) -> BTreeMap<String, f64> {
        self.params
            .iter()
            .map(|p| (p.name().to_string(), p.value()))
            .collect()
    }

    /// Parameters the optimizer may vary, in insertion order.
    pub fn varying(&self) -> Vec<&Parameter> {
        self.params.iter().filter(|p| p.vary()).collect()
    }

    /// Parameters held constant during a fit.
    pub fn fixed(&self) -> Vec<&Parameter> {
        self.params.iter().filter(|p| !p.vary()).collect()
    }

    /// Internal-space values of the varying parameters, in insertion order.
    pub fn varying_internal_values(&self) -> std::result::Result<Vec<f64>, ParameterError> {
        self.params
            .iter()
            .filter(|p| p.vary())
            .map(Parameter::to_internal)
            .collect()
    }

    /// Update the varying parameters from internal-space values.
    pub fn update_from_internal(&mut self, values: &[f64]) -> std::result::Result<(), ParameterError> {
        let expected = self.params.iter().filter(|p| p.vary()).count();
        if values.len() != expected {
            return Err(ParameterError::LengthMismatch {
                expected,
                actual: values.len(),
            });
        }

        for (param, &internal) in self.params.iter_mut().filter(|p| p.vary()).zip(values) {
            param.set_from_internal(internal);
        }
        Ok(())
    }

    /// Copy of these parameters with the varying ones set from internal values.
    pub fn with_internal(&self, values: &[f64]) -> std::result::Result<Self, ParameterError> {
        let mut updated = self.clone();
        updated.update_from_internal(values)?;
        Ok(updated)
    }

    /// Reset every parameter to its initial value.
    pub fn reset(&mut self) {
        for param in &mut self.params {
            param.reset();
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl AsRef<Parameters> for Parameters {
    fn as_ref(&self) -> &Parameters {
        self
    }
}

impl FromIterator<Parameter> for Parameters {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for param in iter {
            params.add(param);
        }
        params
    }
}
