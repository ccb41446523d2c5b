//! Pipeline node wrapper for the motion energy compositor

use frameflow_common::{PipelineError, Result};
use frameflow_core::node::Node;
use frameflow_core::params::ParamSet;
use frameflow_core::port::{InputPort, OutputPort};
use frameflow_core::registry::{NodeManifest, PortDecl};

use crate::{composite, EnergyMode};

/// Registry kind name
pub const KIND: &str = "motion-energy";

const IN_MASK: &str = "mask";
const IN_SOURCE: &str = "source";
const OUT_ENERGY: &str = "energy";

/// Motion energy node: mask (+ optional color source) in, trail buffer out
pub struct MotionEnergyNode {
    name: String,
    mask_in: InputPort,
    source_in: InputPort,
    energy_out: OutputPort,
    params: ParamSet,
    last_mode: Option<EnergyMode>,
}

impl MotionEnergyNode {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mask_in: InputPort::new(IN_MASK),
            source_in: InputPort::new(IN_SOURCE),
            energy_out: OutputPort::new(OUT_ENERGY),
            params: ParamSet::new(Vec::new()),
            last_mode: None,
        }
    }

    /// Factory with the registry's expected signature
    #[must_use]
    pub fn create(name: &str) -> Box<dyn Node> {
        Box::new(Self::new(name))
    }

    /// Static description for the registry
    #[must_use]
    pub fn manifest() -> NodeManifest {
        NodeManifest {
            kind: KIND.to_string(),
            description:
                "cumulative masked-overwrite trail, silhouette or color-masked by connectivity"
                    .to_string(),
            inputs: vec![PortDecl::required(IN_MASK), PortDecl::optional(IN_SOURCE)],
            outputs: vec![PortDecl::optional(OUT_ENERGY)],
            params: Vec::new(),
        }
    }

    /// Mode chosen by the most recent pass
    #[must_use]
    pub fn last_mode(&self) -> Option<EnergyMode> {
        self.last_mode
    }
}

impl Node for MotionEnergyNode {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn input_names(&self) -> &'static [&'static str] {
        &[IN_MASK, IN_SOURCE]
    }

    fn output_names(&self) -> &'static [&'static str] {
        &[OUT_ENERGY]
    }

    fn input_mut(&mut self, name: &str) -> Option<&mut InputPort> {
        match name {
            IN_MASK => Some(&mut self.mask_in),
            IN_SOURCE => Some(&mut self.source_in),
            _ => None,
        }
    }

    fn output(&self, name: &str) -> Option<&OutputPort> {
        (name == OUT_ENERGY).then_some(&self.energy_out)
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
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
        // inputs first, in declared order; source connectivity decides the
        // mode fresh on every tick
        let mask = self.mask_in.read(&self.name)?;
        let source = if self.source_in.is_connected() {
            Some(self.source_in.read(&self.name)?)
        } else {
            None
        };
        let mut energy = self.energy_out.lock();

        let mode = composite(&mask, source.as_deref(), &mut energy)?;
        self.last_mode = Some(mode);
        Ok(())
    }

    fn teardown(&mut self) {
        self.last_mode = None;
    }
}
