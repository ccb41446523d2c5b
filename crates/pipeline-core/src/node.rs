//! Node capability trait and the generic lifecycle driver
//!
//! A node implements the domain hooks of [`Node`]; the state machine around
//! them lives once, in [`NodeDriver`], instead of being re-implemented per
//! kind. The driver enforces the transition contract:
//!
//! ```text
//! Created -> Initialized -> Running <-> Paused -> Stopped
//!                 ^                                  |
//!                 +-------------- reset -------------+
//! ```
//!
//! `reset` is legal from any state and returns the node to Created with all
//! owned buffers released. `initialize` validates connectivity and runs one
//! full processing pass for tick 0 so downstream buffer shapes exist before
//! the pipeline is declared ready.

use frameflow_common::{PipelineError, Result};
use tracing::{debug, info};

use crate::params::ParamSet;
use crate::port::{InputPort, OutputPort};

/// Lifecycle states a node moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initialized,
    Running,
    Paused,
    Stopped,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Created => "created",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Running => "running",
            LifecycleState::Paused => "paused",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Upper bound on the ticks a node can usefully process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxTicks {
    /// The node can run forever (generators, loopers)
    Unbounded,
    /// The node runs out of content after this many ticks
    Bounded(u64),
}

/// Capability interface every processing node implements
///
/// Implementations own their ports and cross-frame state. `process` is the
/// only hook invoked per tick; inside it the node must lock all inputs before
/// all outputs (declared port order) and let the guards release in reverse,
/// error path included.
pub trait Node: Send {
    /// Stable kind identifier (registry key)
    fn kind(&self) -> &'static str;

    /// Instance name used in error messages
    fn name(&self) -> &str;

    fn input_names(&self) -> &'static [&'static str];

    fn output_names(&self) -> &'static [&'static str];

    fn input_mut(&mut self, name: &str) -> Option<&mut InputPort>;

    fn output(&self, name: &str) -> Option<&OutputPort>;

    fn params(&self) -> &ParamSet;

    fn params_mut(&mut self) -> &mut ParamSet;

    /// Pull current parameter values into typed node state
    ///
    /// Invoked by the driver before parameters influence processing: once at
    /// initialize and again before the next `process` after any `set`.
    fn refresh_params(&mut self) -> Result<()> {
        Ok(())
    }

    /// Validate mandatory connections and claim resources
    fn setup(&mut self) -> Result<()>;

    /// One processing pass for the given tick
    fn process(&mut self, tick: u64) -> Result<()>;

    /// Release every owned buffer and zero cross-frame state
    fn teardown(&mut self);

    /// Bookkeeping hooks; no buffer mutation allowed
    fn on_start(&mut self) {}
    fn on_pause(&mut self) {}
    fn on_stop(&mut self) {}

    /// Native rate hint for the pipeline clock, if the node has one
    fn rate_hint(&self) -> Option<f64> {
        None
    }

    /// How many ticks this node can serve
    fn max_ticks(&self) -> MaxTicks {
        MaxTicks::Unbounded
    }
}

/// Owns a node and enforces the lifecycle transition contract around it
pub struct NodeDriver {
    node: Box<dyn Node>,
    state: LifecycleState,
}

impl NodeDriver {
    #[must_use]
    pub fn new(node: Box<dyn Node>) -> Self {
        Self {
            node,
            state: LifecycleState::Created,
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    #[must_use]
    pub fn node(&self) -> &dyn Node {
        self.node.as_ref()
    }

    pub fn node_mut(&mut self) -> &mut dyn Node {
        self.node.as_mut()
    }

    fn illegal(&self, operation: &str) -> PipelineError {
        PipelineError::State {
            node: self.node.name().to_string(),
            operation: operation.to_string(),
            state: self.state.to_string(),
        }
    }

    /// Validate connections and run the tick-0 pass
    ///
    /// Idempotent after `reset`; calling it while the node is live is a
    /// state error.
    ///
    /// # Errors
    ///
    /// Any connectivity/shape failure from the node's `setup` or first
    /// `process` pass, or [`PipelineError::State`] from a live state.
    pub fn initialize(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Created => {}
            LifecycleState::Initialized => return Ok(()),
            _ => return Err(self.illegal("initialize")),
        }

        self.node.refresh_params()?;
        self.node.params_mut().take_dirty();
        self.node.setup()?;
        self.node.process(0)?;

        info!(node = self.node.name(), kind = self.node.kind(), "node initialized");
        self.state = LifecycleState::Initialized;
        Ok(())
    }

    /// Arm per-run counters; no buffer mutation
    ///
    /// # Errors
    ///
    /// [`PipelineError::State`] unless Initialized or Paused.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Initialized | LifecycleState::Paused => {
                self.node.on_start();
                self.state = LifecycleState::Running;
                Ok(())
            }
            _ => Err(self.illegal("start")),
        }
    }

    /// Run one tick; legal only while Running
    ///
    /// Dirty parameters are flushed into the node first so a `set_param`
    /// between ticks takes effect on the next pass.
    ///
    /// # Errors
    ///
    /// [`PipelineError::State`] when not Running, otherwise whatever the
    /// node's pass reports. Failures leave buffers in their last consistent
    /// state; the caller decides whether to halt or skip.
    pub fn process(&mut self, tick: u64) -> Result<()> {
        if self.state != LifecycleState::Running {
            return Err(self.illegal("process"));
        }
        if self.node.params_mut().take_dirty() {
            debug!(node = self.node.name(), "flushing parameter changes");
            self.node.refresh_params()?;
        }
        self.node.process(tick)
    }

    /// # Errors
    ///
    /// [`PipelineError::State`] unless Running.
    pub fn pause(&mut self) -> Result<()> {
        if self.state != LifecycleState::Running {
            return Err(self.illegal("pause"));
        }
        self.node.on_pause();
        self.state = LifecycleState::Paused;
        Ok(())
    }

    /// # Errors
    ///
    /// [`PipelineError::State`] unless Running or Paused.
    pub fn stop(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Running | LifecycleState::Paused => {
                self.node.on_stop();
                self.state = LifecycleState::Stopped;
                Ok(())
            }
            _ => Err(self.illegal("stop")),
        }
    }

    /// Release owned buffers and return to Created; safe in any state
    pub fn reset(&mut self) {
        self.node.teardown();
        for name in self.node.output_names() {
            if let Some(port) = self.node.output(name) {
                port.clear();
            }
        }
        debug!(node = self.node.name(), "node reset");
        self.state = LifecycleState::Created;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamSpec, ParamValue};
    use frameflow_common::{Channels, ColorModel, FrameBuffer, PixelDepth};

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Minimal generator node: writes a 2x2 gray frame each tick
    struct TestSource {
        out: OutputPort,
        params: ParamSet,
        refreshes: Arc<AtomicUsize>,
        processed: Vec<u64>,
    }

    impl TestSource {
        fn new() -> Self {
            Self::with_counter(Arc::new(AtomicUsize::new(0)))
        }

        fn with_counter(refreshes: Arc<AtomicUsize>) -> Self {
            Self {
                out: OutputPort::new("frame"),
                params: ParamSet::new(vec![ParamSpec::new(
                    "level",
                    "fill level",
                    ParamValue::Int(0),
                )]),
                refreshes,
                processed: Vec::new(),
            }
        }
    }

    impl Node for TestSource {
        fn kind(&self) -> &'static str {
            "test-source"
        }

        fn name(&self) -> &str {
            "src"
        }

        fn input_names(&self) -> &'static [&'static str] {
            &[]
        }

        fn output_names(&self) -> &'static [&'static str] {
            &["frame"]
        }

        fn input_mut(&mut self, _name: &str) -> Option<&mut InputPort> {
            None
        }

        fn output(&self, name: &str) -> Option<&OutputPort> {
            (name == "frame").then_some(&self.out)
        }

        fn params(&self) -> &ParamSet {
            &self.params
        }

        fn params_mut(&mut self) -> &mut ParamSet {
            &mut self.params
        }

        fn refresh_params(&mut self) -> Result<()> {
            self.refreshes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn setup(&mut self) -> Result<()> {
            Ok(())
        }

        fn process(&mut self, tick: u64) -> Result<()> {
            self.processed.push(tick);
            *self.out.lock() = Some(FrameBuffer::zeroed(
                2,
                2,
                Channels::One,
                PixelDepth::U8,
                ColorModel::Gray,
            ));
            Ok(())
        }

        fn teardown(&mut self) {
            self.processed.clear();
        }
    }

    #[test]
    fn initialize_runs_tick_zero_pass() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let mut driver = NodeDriver::new(Box::new(TestSource::new()));
        driver.initialize().unwrap();
        assert_eq!(driver.state(), LifecycleState::Initialized);
        assert!(driver.node().output("frame").unwrap().slot().read().is_some());
    }

    #[test]
    fn process_requires_running() {
        let mut driver = NodeDriver::new(Box::new(TestSource::new()));
        driver.initialize().unwrap();
        let err = driver.process(1).unwrap_err();
        assert!(matches!(err, PipelineError::State { .. }));

        driver.start().unwrap();
        driver.process(1).unwrap();
    }

    #[test]
    fn pause_resume_cycle() {
        let mut driver = NodeDriver::new(Box::new(TestSource::new()));
        driver.initialize().unwrap();
        driver.start().unwrap();
        driver.pause().unwrap();
        assert!(driver.process(2).is_err());
        driver.start().unwrap();
        driver.process(2).unwrap();
        driver.stop().unwrap();
        assert_eq!(driver.state(), LifecycleState::Stopped);
    }

    #[test]
    fn reset_releases_buffers_and_allows_reinitialize() {
        let mut driver = NodeDriver::new(Box::new(TestSource::new()));
        driver.initialize().unwrap();
        driver.start().unwrap();
        driver.process(1).unwrap();

        driver.reset();
        assert_eq!(driver.state(), LifecycleState::Created);
        assert!(driver.node().output("frame").unwrap().slot().read().is_none());

        driver.initialize().unwrap();
        assert_eq!(driver.state(), LifecycleState::Initialized);
    }

    #[test]
    fn dirty_params_are_flushed_before_next_tick() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let mut driver = NodeDriver::new(Box::new(TestSource::with_counter(Arc::clone(&refreshes))));
        driver.initialize().unwrap();
        driver.start().unwrap();
        driver.process(1).unwrap();
        assert_eq!(refreshes.load(Ordering::Relaxed), 1);

        driver
            .node_mut()
            .params_mut()
            .set("level", ParamValue::Int(7))
            .unwrap();
        driver.process(2).unwrap();
        assert_eq!(refreshes.load(Ordering::Relaxed), 2);

        // clean ticks do not re-refresh
        driver.process(3).unwrap();
        assert_eq!(refreshes.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn initialize_twice_is_idempotent() {
        let mut driver = NodeDriver::new(Box::new(TestSource::new()));
        driver.initialize().unwrap();
        driver.initialize().unwrap();
        assert_eq!(driver.state(), LifecycleState::Initialized);

        driver.start().unwrap();
        assert!(driver.initialize().is_err());
    }
}
