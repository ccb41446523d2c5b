//! Minimal tick scheduler over an ordered set of node drivers
//!
//! The surrounding application owns the real scheduler; this one drives the
//! same contract for tests and embedding: nodes are processed in a fixed
//! global order once per tick, and a per-tick failure either halts the whole
//! tick or is surfaced and skipped, per [`TickPolicy`]. Nodes never retry
//! internally.

use frameflow_common::{PipelineError, Result};
use tracing::warn;

use crate::node::{MaxTicks, NodeDriver};

/// What a node failure during a tick does to the rest of that tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPolicy {
    /// Abort the tick on the first failing node
    Halt,
    /// Skip the failing node, keep processing, report all failures
    Skip,
}

/// Failures collected by a skip-policy tick
#[derive(Debug)]
pub struct TickReport {
    pub tick: u64,
    pub failures: Vec<(String, PipelineError)>,
}

/// Ordered node set driven by a shared tick counter
pub struct Pipeline {
    nodes: Vec<NodeDriver>,
    policy: TickPolicy,
    tick: u64,
}

impl Pipeline {
    #[must_use]
    pub fn new(policy: TickPolicy) -> Self {
        Self {
            nodes: Vec::new(),
            policy,
            tick: 0,
        }
    }

    /// Append a node; returns its index for later access
    pub fn push(&mut self, driver: NodeDriver) -> usize {
        self.nodes.push(driver);
        self.nodes.len() - 1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, index: usize) -> Option<&NodeDriver> {
        self.nodes.get(index)
    }

    pub fn node_mut(&mut self, index: usize) -> Option<&mut NodeDriver> {
        self.nodes.get_mut(index)
    }

    /// Current tick counter (next tick to be processed is `current + 1`)
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Smallest bounded max-tick hint across nodes, if any
    #[must_use]
    pub fn max_ticks(&self) -> MaxTicks {
        let mut bound: Option<u64> = None;
        for driver in &self.nodes {
            if let MaxTicks::Bounded(n) = driver.node().max_ticks() {
                bound = Some(bound.map_or(n, |b| b.min(n)));
            }
        }
        bound.map_or(MaxTicks::Unbounded, MaxTicks::Bounded)
    }

    /// Initialize every node in order
    ///
    /// # Errors
    ///
    /// The first node failure aborts initialization; already initialized
    /// nodes keep their state.
    pub fn initialize(&mut self) -> Result<()> {
        for driver in &mut self.nodes {
            driver.initialize()?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// First start failure aborts.
    pub fn start(&mut self) -> Result<()> {
        for driver in &mut self.nodes {
            driver.start()?;
        }
        Ok(())
    }

    /// Advance the shared counter and process every node once
    ///
    /// # Errors
    ///
    /// Under [`TickPolicy::Halt`], the first node failure. Under
    /// [`TickPolicy::Skip`] the call succeeds and failures are in the
    /// report.
    pub fn tick(&mut self) -> Result<TickReport> {
        self.tick += 1;
        let tick = self.tick;
        let mut failures = Vec::new();

        for driver in &mut self.nodes {
            if let Err(err) = driver.process(tick) {
                match self.policy {
                    TickPolicy::Halt => return Err(err),
                    TickPolicy::Skip => {
                        warn!(node = driver.node().name(), tick, %err, "node failed; skipping");
                        failures.push((driver.node().name().to_string(), err));
                    }
                }
            }
        }
        Ok(TickReport { tick, failures })
    }

    /// # Errors
    ///
    /// First pause failure aborts.
    pub fn pause(&mut self) -> Result<()> {
        for driver in &mut self.nodes {
            driver.pause()?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// First stop failure aborts.
    pub fn stop(&mut self) -> Result<()> {
        for driver in &mut self.nodes {
            driver.stop()?;
        }
        Ok(())
    }

    /// Reset every node and zero the tick counter
    pub fn reset(&mut self) {
        for driver in &mut self.nodes {
            driver.reset();
        }
        self.tick = 0;
    }
}
