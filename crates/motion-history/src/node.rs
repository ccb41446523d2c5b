//! Pipeline node wrapper for the motion history accumulator

use frameflow_common::{PipelineError, Result};
use frameflow_core::node::Node;
use frameflow_core::params::{ParamSet, ParamSpec, ParamValue};
use frameflow_core::port::{InputPort, OutputPort};
use frameflow_core::registry::{NodeManifest, PortDecl};

use crate::{MotionHistory, MotionHistoryConfig, TimeUnit};

/// Registry kind name
pub const KIND: &str = "motion-history";

const IN_MASK: &str = "mask";
const OUT_HISTORY: &str = "history";
const OUT_GRAY: &str = "gray";

/// Motion history node: mask in, float history + optional gray view out
///
/// The gray view is only produced while something is connected to the
/// `gray` port; the float history is always maintained.
pub struct MotionHistoryNode {
    name: String,
    mask_in: InputPort,
    history_out: OutputPort,
    gray_out: OutputPort,
    params: ParamSet,
    accum: MotionHistory,
}

impl MotionHistoryNode {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mask_in: InputPort::new(IN_MASK),
            history_out: OutputPort::new(OUT_HISTORY),
            gray_out: OutputPort::new(OUT_GRAY),
            params: ParamSet::new(Self::param_specs()),
            accum: MotionHistory::new(MotionHistoryConfig::default()),
        }
    }

    /// Factory with the registry's expected signature
    #[must_use]
    pub fn create(name: &str) -> Box<dyn Node> {
        Box::new(Self::new(name))
    }

    fn param_specs() -> Vec<ParamSpec> {
        let defaults = MotionHistoryConfig::default();
        vec![
            ParamSpec::new(
                "unit",
                "time axis unit for the accumulation",
                ParamValue::Text("frames".to_string()),
            )
            .with_choices(&["frames", "seconds"]),
            ParamSpec::new(
                "duration",
                "window mapped onto the gray view, in time-axis units",
                ParamValue::Float(f64::from(defaults.duration_window)),
            )
            .with_bounds(0.1, 100_000.0),
        ]
    }

    /// Static description for the registry
    #[must_use]
    pub fn manifest() -> NodeManifest {
        NodeManifest {
            kind: KIND.to_string(),
            description: "per-pixel most-recent-activity timestamps with a normalized gray view"
                .to_string(),
            inputs: vec![PortDecl::required(IN_MASK)],
            outputs: vec![PortDecl::optional(OUT_HISTORY), PortDecl::optional(OUT_GRAY)],
            params: Self::param_specs(),
        }
    }
}

impl Node for MotionHistoryNode {
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
        &[OUT_HISTORY, OUT_GRAY]
    }

    fn input_mut(&mut self, name: &str) -> Option<&mut InputPort> {
        (name == IN_MASK).then_some(&mut self.mask_in)
    }

    fn output(&self, name: &str) -> Option<&OutputPort> {
        match name {
            OUT_HISTORY => Some(&self.history_out),
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
        let unit = self.params.text("unit")?;
        let unit = TimeUnit::parse(unit).ok_or_else(|| PipelineError::Parameter {
            name: "unit".to_string(),
            reason: format!("unknown time unit '{unit}'"),
        })?;
        let duration = self.params.float("duration")? as f32;
        self.accum.set_config(MotionHistoryConfig {
            unit,
            duration_window: duration,
        });
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
        // lock order: inputs, then outputs in declared order
        let mask = self.mask_in.read(&self.name)?;
        let mut history = self.history_out.lock();
        let mut gray = self.gray_out.lock();

        let recreated = self.accum.update(&mask, &mut history)?;
        if recreated {
            gray.take();
        }

        if self.gray_out.readers() > 0 {
            if let Some(h) = history.as_ref() {
                self.accum.render_gray(h, &mut gray);
            }
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.accum.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frameflow_common::{Channels, ColorModel, FrameBuffer, PixelDepth};
    use frameflow_core::node::NodeDriver;

    #[test]
    fn initialize_fails_without_mask() {
        let mut driver = NodeDriver::new(MotionHistoryNode::create("mh"));
        let err = driver.initialize().unwrap_err();
        assert!(matches!(err, PipelineError::Connectivity { .. }));
    }

    #[test]
    fn manifest_names_both_outputs() {
        let manifest = MotionHistoryNode::manifest();
        assert_eq!(manifest.kind, KIND);
        assert_eq!(manifest.outputs.len(), 2);
        assert!(manifest.inputs[0].required);
    }

    #[test]
    fn gray_is_skipped_without_readers() {
        let upstream = OutputPort::new("ext");
        *upstream.lock() = Some(FrameBuffer::zeroed(
            2,
            2,
            Channels::One,
            PixelDepth::U8,
            ColorModel::Gray,
        ));

        let mut node = MotionHistoryNode::new("mh");
        node.input_mut(IN_MASK).unwrap().connect(&upstream);
        node.setup().unwrap();
        node.process(0).unwrap();

        assert!(node.output(OUT_HISTORY).unwrap().slot().read().is_some());
        assert!(node.output(OUT_GRAY).unwrap().slot().read().is_none());
    }
}
