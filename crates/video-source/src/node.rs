//! Pipeline node wrapper for the video frame sequencer

use frameflow_common::{PipelineError, Result};
use frameflow_core::node::{MaxTicks, Node};
use frameflow_core::params::{ParamSet, ParamSpec, ParamValue};
use frameflow_core::port::{InputPort, OutputPort};
use frameflow_core::registry::{NodeManifest, PortDecl};
use tracing::warn;

use crate::{DecodePath, FrameDecoder, FrameSequencer};

/// Registry kind name
pub const KIND: &str = "video-source";

const OUT_FRAME: &str = "frame";

/// Video source node: decoder-backed frame generator with loop semantics
///
/// Owns a [`FrameDecoder`] and a [`FrameSequencer`]; each tick is treated as
/// a requested frame index. Reports the source's native rate to the pipeline
/// clock and a bounded max-tick hint unless looping.
pub struct VideoSourceNode {
    name: String,
    frame_out: OutputPort,
    params: ParamSet,
    decoder: Box<dyn FrameDecoder>,
    sequencer: Option<FrameSequencer>,
}

impl VideoSourceNode {
    #[must_use]
    pub fn new(name: &str, decoder: Box<dyn FrameDecoder>) -> Self {
        Self {
            name: name.to_string(),
            frame_out: OutputPort::new(OUT_FRAME),
            params: ParamSet::new(Self::param_specs()),
            decoder,
            sequencer: None,
        }
    }

    fn param_specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::new("loop", "wrap past the last frame", ParamValue::Bool(false)),
            ParamSpec::new(
                "trailing_frame_guard",
                "treat the reported length as one past the last valid index",
                ParamValue::Bool(true),
            ),
        ]
    }

    /// Static description for the registry
    #[must_use]
    pub fn manifest() -> NodeManifest {
        NodeManifest {
            kind: KIND.to_string(),
            description: "frame-accurate video source with sequential/seek decode paths"
                .to_string(),
            inputs: Vec::new(),
            outputs: vec![PortDecl::optional(OUT_FRAME)],
            params: Self::param_specs(),
        }
    }

    /// Usable frame count after the trailing-frame guard
    #[must_use]
    pub fn frame_count(&self) -> Option<u64> {
        self.sequencer.as_ref().map(FrameSequencer::frame_count)
    }

    /// Decode path chosen by the most recent pass
    #[must_use]
    pub fn last_decode_path(&self) -> Option<DecodePath> {
        self.sequencer.as_ref().and_then(FrameSequencer::last_path)
    }
}

impl Node for VideoSourceNode {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn input_names(&self) -> &'static [&'static str] {
        &[]
    }

    fn output_names(&self) -> &'static [&'static str] {
        &[OUT_FRAME]
    }

    fn input_mut(&mut self, _name: &str) -> Option<&mut InputPort> {
        None
    }

    fn output(&self, name: &str) -> Option<&OutputPort> {
        (name == OUT_FRAME).then_some(&self.frame_out)
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn refresh_params(&mut self) -> Result<()> {
        let looping = self.params.bool("loop")?;
        if let Some(seq) = self.sequencer.as_mut() {
            seq.set_looping(looping);
        }
        Ok(())
    }

    fn setup(&mut self) -> Result<()> {
        let reported = self.decoder.reported_frame_count();
        let guard = self.params.bool("trailing_frame_guard")?;
        let usable = if guard {
            if reported > 1 {
                reported - 1
            } else {
                warn!(
                    node = %self.name,
                    reported,
                    "source too short for the trailing-frame guard; using reported length"
                );
                reported
            }
        } else {
            reported
        };

        // decoder position must match the fresh sequencer state
        self.decoder.seek(0)?;
        self.sequencer = Some(FrameSequencer::new(usable, self.params.bool("loop")?)?);
        Ok(())
    }

    fn process(&mut self, tick: u64) -> Result<()> {
        let name = self.name.clone();
        let seq = self
            .sequencer
            .as_mut()
            .ok_or(PipelineError::State {
                node: name,
                operation: "process".to_string(),
                state: "not initialized".to_string(),
            })?;

        let decoded = seq.advance(tick, self.decoder.as_mut())?;
        if let Some(frame) = decoded {
            // the freshly decoded frame replaces the output under lock
            let mut out = self.frame_out.lock();
            *out = Some(frame);
        }
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(seq) = self.sequencer.as_mut() {
            seq.invalidate();
        }
        self.sequencer = None;
    }

    fn rate_hint(&self) -> Option<f64> {
        Some(self.decoder.frame_rate())
    }

    fn max_ticks(&self) -> MaxTicks {
        match self.sequencer.as_ref() {
            Some(seq) if !seq.looping() => MaxTicks::Bounded(seq.frame_count()),
            _ => MaxTicks::Unbounded,
        }
    }
}
