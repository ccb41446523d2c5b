//! Node parameters: declared specs and runtime values
//!
//! Each node kind declares its parameters up front - name, type, default,
//! optional bounds, optional enumerated value set, and an optional
//! enable/disable dependency on another (boolean) parameter. The declarations
//! are plain serde types so a node's parameter surface can be exported with
//! its manifest; the UI/description layer that renders them is a separate
//! collaborator.
//!
//! Setting a value marks the set dirty; the lifecycle driver flushes dirty
//! parameters into the node via its refresh hook before they influence
//! processing.

use std::collections::HashMap;

use frameflow_common::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// A typed parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Text(_) => "text",
        }
    }
}

/// Enable/disable dependency between parameters
///
/// The dependent parameter only accepts writes while `param` (a boolean
/// parameter) currently equals `when`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDependency {
    pub param: String,
    pub when: bool,
}

/// Declared shape of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,

    /// One-line description for the parameter-registry collaborator
    pub description: String,

    pub default: ParamValue,

    /// Inclusive numeric bounds; ignored for bool/text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Allowed values for text parameters; empty means unrestricted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,

    /// Optional enable/disable dependency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_by: Option<ParamDependency>,
}

impl ParamSpec {
    #[must_use]
    pub fn new(name: &str, description: &str, default: ParamValue) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            default,
            min: None,
            max: None,
            choices: Vec::new(),
            enabled_by: None,
        }
    }

    #[must_use]
    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    #[must_use]
    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn enabled_by(mut self, param: &str, when: bool) -> Self {
        self.enabled_by = Some(ParamDependency {
            param: param.to_string(),
            when,
        });
        self
    }
}

/// Runtime parameter store for one node instance
#[derive(Debug, Clone)]
pub struct ParamSet {
    specs: Vec<ParamSpec>,
    values: HashMap<String, ParamValue>,
    dirty: bool,
}

impl ParamSet {
    #[must_use]
    pub fn new(specs: Vec<ParamSpec>) -> Self {
        let values = specs
            .iter()
            .map(|s| (s.name.clone(), s.default.clone()))
            .collect();
        Self {
            specs,
            values,
            dirty: true,
        }
    }

    #[must_use]
    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    fn spec(&self, name: &str) -> Result<&ParamSpec> {
        self.specs
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| PipelineError::Parameter {
                name: name.to_string(),
                reason: "no such parameter".to_string(),
            })
    }

    /// Whether a parameter is currently enabled per its dependency
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        let Ok(spec) = self.spec(name) else {
            return false;
        };
        match &spec.enabled_by {
            None => true,
            Some(dep) => matches!(self.values.get(&dep.param), Some(ParamValue::Bool(b)) if *b == dep.when),
        }
    }

    /// Set a parameter value
    ///
    /// Numeric values are clamped into the declared bounds; text values must
    /// belong to the declared choice set when one exists; writes to disabled
    /// parameters and type mismatches are rejected.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Parameter`] on unknown name, type mismatch,
    /// disallowed choice, or a currently disabled parameter.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<()> {
        let spec = self.spec(name)?.clone();

        if !self.is_enabled(name) {
            return Err(PipelineError::Parameter {
                name: name.to_string(),
                reason: "parameter is disabled by its dependency".to_string(),
            });
        }
        if std::mem::discriminant(&spec.default) != std::mem::discriminant(&value) {
            return Err(PipelineError::Parameter {
                name: name.to_string(),
                reason: format!(
                    "expected {}, got {}",
                    spec.default.type_name(),
                    value.type_name()
                ),
            });
        }

        let value = match value {
            ParamValue::Int(v) => {
                let lo = spec.min.map_or(v, |m| v.max(m as i64));
                let hi = spec.max.map_or(lo, |m| lo.min(m as i64));
                ParamValue::Int(hi)
            }
            ParamValue::Float(v) => {
                let lo = spec.min.map_or(v, |m| v.max(m));
                let hi = spec.max.map_or(lo, |m| lo.min(m));
                ParamValue::Float(hi)
            }
            ParamValue::Text(v) => {
                if !spec.choices.is_empty() && !spec.choices.iter().any(|c| c == &v) {
                    return Err(PipelineError::Parameter {
                        name: name.to_string(),
                        reason: format!("'{v}' is not one of {:?}", spec.choices),
                    });
                }
                ParamValue::Text(v)
            }
            other => other,
        };

        self.values.insert(name.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// # Errors
    ///
    /// [`PipelineError::Parameter`] if missing or not a bool.
    pub fn bool(&self, name: &str) -> Result<bool> {
        match self.values.get(name) {
            Some(ParamValue::Bool(b)) => Ok(*b),
            _ => Err(self.type_error(name, "bool")),
        }
    }

    /// # Errors
    ///
    /// [`PipelineError::Parameter`] if missing or not an int.
    pub fn int(&self, name: &str) -> Result<i64> {
        match self.values.get(name) {
            Some(ParamValue::Int(v)) => Ok(*v),
            _ => Err(self.type_error(name, "int")),
        }
    }

    /// # Errors
    ///
    /// [`PipelineError::Parameter`] if missing or not a float.
    pub fn float(&self, name: &str) -> Result<f64> {
        match self.values.get(name) {
            Some(ParamValue::Float(v)) => Ok(*v),
            _ => Err(self.type_error(name, "float")),
        }
    }

    /// # Errors
    ///
    /// [`PipelineError::Parameter`] if missing or not text.
    pub fn text(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(ParamValue::Text(v)) => Ok(v),
            _ => Err(self.type_error(name, "text")),
        }
    }

    fn type_error(&self, name: &str, expected: &str) -> PipelineError {
        PipelineError::Parameter {
            name: name.to_string(),
            reason: format!("expected {expected}"),
        }
    }

    /// Consume the dirty flag; true if any value changed since the last take
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> ParamSet {
        ParamSet::new(vec![
            ParamSpec::new(
                "duration",
                "accumulation window",
                ParamValue::Float(25.0),
            )
            .with_bounds(0.1, 1000.0),
            ParamSpec::new("unit", "time axis unit", ParamValue::Text("frames".into()))
                .with_choices(&["frames", "seconds"]),
            ParamSpec::new("random_color", "pick trail color", ParamValue::Bool(false)),
            ParamSpec::new("color_delay", "re-roll delay", ParamValue::Int(10))
                .with_bounds(1.0, 100.0)
                .enabled_by("random_color", true),
        ])
    }

    #[test]
    fn defaults_are_populated() {
        let set = sample_set();
        assert_eq!(set.float("duration").unwrap(), 25.0);
        assert_eq!(set.text("unit").unwrap(), "frames");
    }

    #[test]
    fn numeric_values_clamp_to_bounds() {
        let mut set = sample_set();
        set.set("duration", ParamValue::Float(-4.0)).unwrap();
        assert_eq!(set.float("duration").unwrap(), 0.1);
    }

    #[test]
    fn choice_values_are_validated() {
        let mut set = sample_set();
        assert!(set.set("unit", ParamValue::Text("ticks".into())).is_err());
        assert!(set.set("unit", ParamValue::Text("seconds".into())).is_ok());
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut set = sample_set();
        assert!(set.set("duration", ParamValue::Int(3)).is_err());
    }

    #[test]
    fn dependency_gates_writes() {
        let mut set = sample_set();
        assert!(!set.is_enabled("color_delay"));
        assert!(set.set("color_delay", ParamValue::Int(5)).is_err());

        set.set("random_color", ParamValue::Bool(true)).unwrap();
        assert!(set.is_enabled("color_delay"));
        set.set("color_delay", ParamValue::Int(5)).unwrap();
        assert_eq!(set.int("color_delay").unwrap(), 5);
    }

    #[test]
    fn dirty_flag_tracks_writes() {
        let mut set = sample_set();
        assert!(set.take_dirty());
        assert!(!set.take_dirty());
        set.set("duration", ParamValue::Float(1.0)).unwrap();
        assert!(set.take_dirty());
    }
}
