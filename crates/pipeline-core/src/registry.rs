//! Node registry: kind names to factories and manifests
//!
//! The registry is the central dispatcher table for the graph builder: each
//! node kind registers a manifest describing its ports and parameters plus a
//! factory producing fresh instances. Manifests are serde types and can be
//! exported/ingested as YAML for the external parameter-description layer.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::node::Node;
use crate::params::ParamSpec;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no node kind registered as '{0}'")]
    UnknownKind(String),

    #[error("node kind '{0}' is already registered")]
    DuplicateKind(String),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Declared port of a node kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDecl {
    pub name: String,

    /// Required inputs make `initialize` fail when unconnected; outputs are
    /// always present
    #[serde(default)]
    pub required: bool,
}

impl PortDecl {
    #[must_use]
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
        }
    }

    #[must_use]
    pub fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: false,
        }
    }
}

/// Static description of a node kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeManifest {
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<PortDecl>,
    #[serde(default)]
    pub outputs: Vec<PortDecl>,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

impl NodeManifest {
    /// Load a manifest from a YAML file
    ///
    /// # Errors
    ///
    /// IO or YAML parse failures.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Serialize the manifest to YAML
    ///
    /// # Errors
    ///
    /// YAML serialization failures.
    pub fn to_yaml(&self) -> Result<String, RegistryError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Factory producing a fresh node instance with the given instance name
pub type NodeFactory = fn(name: &str) -> Box<dyn Node>;

/// Kind-name dispatcher table
#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, NodeFactory>,
    manifests: HashMap<String, NodeManifest>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node kind
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateKind`] when the kind name is taken.
    pub fn register(
        &mut self,
        manifest: NodeManifest,
        factory: NodeFactory,
    ) -> Result<(), RegistryError> {
        let kind = manifest.kind.clone();
        if self.factories.contains_key(&kind) {
            return Err(RegistryError::DuplicateKind(kind));
        }
        info!("registering node kind: {kind}");
        self.factories.insert(kind.clone(), factory);
        self.manifests.insert(kind, manifest);
        Ok(())
    }

    /// Instantiate a node of the given kind
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownKind`] when nothing is registered under
    /// `kind`.
    pub fn create(&self, kind: &str, name: &str) -> Result<Box<dyn Node>, RegistryError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| RegistryError::UnknownKind(kind.to_string()))?;
        Ok(factory(name))
    }

    #[must_use]
    pub fn manifest(&self, kind: &str) -> Option<&NodeManifest> {
        self.manifests.get(kind)
    }

    /// Registered kind names, sorted for stable listings
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamSpec, ParamValue};

    fn sample_manifest() -> NodeManifest {
        NodeManifest {
            kind: "threshold".to_string(),
            description: "binary threshold on a gray input".to_string(),
            inputs: vec![PortDecl::required("image")],
            outputs: vec![PortDecl::optional("mask")],
            params: vec![
                ParamSpec::new("level", "cut-off value", ParamValue::Int(128))
                    .with_bounds(0.0, 255.0),
            ],
        }
    }

    #[test]
    fn manifest_yaml_round_trip() {
        let manifest = sample_manifest();
        let yaml = manifest.to_yaml().unwrap();
        let parsed: NodeManifest = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let registry = Registry::new();
        assert!(matches!(
            registry.create("nope", "n"),
            Err(RegistryError::UnknownKind(_))
        ));
    }
}
