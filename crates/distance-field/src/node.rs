//! Pipeline node wrapper for the distance-field normalizer

use frameflow_common::{PipelineError, Result};
use frameflow_core::node::Node;
use frameflow_core::params::{ParamSet, ParamSpec, ParamValue};
use frameflow_core::port::{InputPort, OutputPort};
use frameflow_core::registry::{NodeManifest, PortDecl};

use crate::{
    distance_transform, normalize_field, DistanceFieldConfig, DistanceMetric, Neighborhood,
};

/// Registry kind name
pub const KIND: &str = "distance-field";

const IN_MASK: &str = "mask";
const OUT_DISTANCE: &str = "distance";
const OUT_GRAY: &str = "gray";

/// Distance-field node: mask in, float field + optional normalized view out
pub struct DistanceFieldNode {
    name: String,
    mask_in: InputPort,
    distance_out: OutputPort,
    gray_out: OutputPort,
    params: ParamSet,
    config: DistanceFieldConfig,
}

impl DistanceFieldNode {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mask_in: InputPort::new(IN_MASK),
            distance_out: OutputPort::new(OUT_DISTANCE),
            gray_out: OutputPort::new(OUT_GRAY),
            params: ParamSet::new(Self::param_specs()),
            config: DistanceFieldConfig::default(),
        }
    }

    /// Factory with the registry's expected signature
    #[must_use]
    pub fn create(name: &str) -> Box<dyn Node> {
        Box::new(Self::new(name))
    }

    fn param_specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::new(
                "metric",
                "distance metric for the transform",
                ParamValue::Text("l2".to_string()),
            )
            .with_choices(&["l1", "l2", "chebyshev"]),
            ParamSpec::new(
                "neighborhood",
                "chamfer scan neighborhood",
                ParamValue::Text("3x3".to_string()),
            )
            .with_choices(&["3x3", "5x5"]),
            ParamSpec::new(
                "invert",
                "map the gray view to [255, 0]",
                ParamValue::Bool(false),
            ),
        ]
    }

    /// Static description for the registry
    #[must_use]
    pub fn manifest() -> NodeManifest {
        NodeManifest {
            kind: KIND.to_string(),
            description: "distance-to-nearest-zero transform with per-frame normalization"
                .to_string(),
            inputs: vec![PortDecl::required(IN_MASK)],
            outputs: vec![
                PortDecl::optional(OUT_DISTANCE),
                PortDecl::optional(OUT_GRAY),
            ],
            params: Self::param_specs(),
        }
    }
}

impl Node for DistanceFieldNode {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn input_names(&self) -> &'static [&'static str] {
        &[IN_MASK]
    }

    fn output_names(&self) -> &'static [&'static str] {
        &[OUT_DISTANCE, OUT_GRAY]
    }

    fn input_mut(&mut self, name: &str) -> Option<&mut InputPort> {
        (name == IN_MASK).then_some(&mut self.mask_in)
    }

    fn output(&self, name: &str) -> Option<&OutputPort> {
        match name {
            OUT_DISTANCE => Some(&self.distance_out),
            OUT_GRAY => Some(&self.gray_out),
            _ => None,
        }
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn refresh_params(&mut self) -> Result<()> {
        let metric = self.params.text("metric")?;
        let metric = DistanceMetric::parse(metric).ok_or_else(|| PipelineError::Parameter {
            name: "metric".to_string(),
            reason: format!("unknown metric '{metric}'"),
        })?;
        let neighborhood = self.params.text("neighborhood")?;
        let neighborhood =
            Neighborhood::parse(neighborhood).ok_or_else(|| PipelineError::Parameter {
                name: "neighborhood".to_string(),
                reason: format!("unknown neighborhood '{neighborhood}'"),
            })?;
        self.config = DistanceFieldConfig {
            metric,
            neighborhood,
            invert_gray: self.params.bool("invert")?,
        };
        Ok(())
    }

    fn setup(&mut self) -> Result<()> {
        if !self.mask_in.is_connected() {
            return Err(PipelineError::Connectivity {
                node: self.name.clone(),
                port: IN_MASK.to_string(),
            });
        }
        Ok(())
    }

    fn process(&mut self, _tick: u64) -> Result<()> {
        // inputs first, then outputs in declared order
        let mask = self.mask_in.read(&self.name)?;
        let mut field = self.distance_out.lock();
        let mut gray = self.gray_out.lock();

        distance_transform(&mask, self.config, &mut field)?;

        if self.gray_out.readers() > 0 {
            if let Some(f) = field.as_ref() {
                normalize_field(f, self.config.invert_gray, &mut gray);
            }
        }
        Ok(())
    }

    fn teardown(&mut self) {}
}
