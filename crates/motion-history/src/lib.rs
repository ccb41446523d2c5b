//! Motion history accumulation
//!
//! Maintains a float buffer of per-pixel "most recent activity" timestamps:
//! each tick, every pixel flagged by the input mask is stamped with the
//! current time-axis value, while unflagged pixels keep their old stamp. As
//! the time axis moves forward, stationary stamps recede into the past,
//! which is what gives the characteristic fading motion trails once the
//! float buffer is rescaled into a gray view.
//!
//! # Features
//! - Frame-count or wall-clock time axis, switchable at runtime
//! - Automatic buffer recreation on upstream shape changes
//! - On-demand normalized 8-bit gray view over a sliding window
//!
//! # Example
//! ```
//! use frameflow_common::{Channels, ColorModel, FrameBuffer, PixelDepth};
//! use frameflow_motion_history::{MotionHistory, MotionHistoryConfig, TimeUnit};
//!
//! # fn main() -> Result<(), frameflow_common::PipelineError> {
//! let mut accum = MotionHistory::new(MotionHistoryConfig {
//!     unit: TimeUnit::FrameCount,
//!     duration_window: 2.0,
//! });
//! let mask = FrameBuffer::zeroed(4, 4, Channels::One, PixelDepth::U8, ColorModel::Gray);
//! let mut history = None;
//! accum.update(&mask, &mut history)?;
//! assert_eq!(accum.elapsed(), 1.0);
//! # Ok(())
//! # }
//! ```

pub mod node;

use std::time::Instant;

use frameflow_common::{
    Channels, ColorModel, FrameBuffer, PipelineError, PixelDepth, Result,
};
use tracing::debug;

pub use node::MotionHistoryNode;

/// Unit of the accumulation time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// One unit per processed frame
    FrameCount,
    /// Wall-clock seconds since accumulation started
    Seconds,
}

impl TimeUnit {
    /// Parse the parameter-facing name (`"frames"` / `"seconds"`)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "frames" => Some(TimeUnit::FrameCount),
            "seconds" => Some(TimeUnit::Seconds),
            _ => None,
        }
    }
}

/// Motion history configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionHistoryConfig {
    /// Time-axis unit
    pub unit: TimeUnit,

    /// Width of the window mapped onto the gray view, in time-axis units;
    /// must be positive
    pub duration_window: f32,
}

impl Default for MotionHistoryConfig {
    fn default() -> Self {
        Self {
            unit: TimeUnit::FrameCount,
            duration_window: 25.0,
        }
    }
}

/// Per-pixel recency-of-change accumulator
///
/// Owns the scalar clock state; the timestamp buffer itself lives in the
/// node's output slot so cross-context readers synchronize on the port lock.
#[derive(Debug)]
pub struct MotionHistory {
    config: MotionHistoryConfig,
    /// Unit the current accumulation was built with
    active_unit: TimeUnit,
    /// Current time-axis value
    elapsed: f32,
    /// Processed frames since the last reset (frame-count mode)
    frames: u64,
    /// Wall-clock origin (seconds mode); armed lazily
    timer: Option<Instant>,
}

impl MotionHistory {
    #[must_use]
    pub fn new(config: MotionHistoryConfig) -> Self {
        Self {
            config,
            active_unit: config.unit,
            elapsed: 0.0,
            frames: 0,
            timer: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> MotionHistoryConfig {
        self.config
    }

    /// Replace the configuration; a unit change takes effect (and resets the
    /// accumulation) on the next `update`
    pub fn set_config(&mut self, config: MotionHistoryConfig) {
        self.config = config;
    }

    /// Current time-axis value
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    fn reset_clock(&mut self) {
        self.elapsed = 0.0;
        self.frames = 0;
        self.timer = None;
    }

    /// Zero all scalar state (teardown path; the buffers live in the ports)
    pub fn reset(&mut self) {
        self.reset_clock();
        self.active_unit = self.config.unit;
    }

    /// Advance the time axis and stamp mask-active pixels
    ///
    /// Returns `true` when the history buffer was recreated (shape change),
    /// in which case the caller must discard dependent views in the same
    /// locked section.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ShapeMismatch`] unless the mask is 1-channel U8.
    pub fn update(
        &mut self,
        mask: &FrameBuffer,
        history: &mut Option<FrameBuffer>,
    ) -> Result<bool> {
        if mask.channels() != Channels::One || mask.depth() != PixelDepth::U8 {
            return Err(PipelineError::ShapeMismatch {
                port: "mask".to_string(),
                expected: "1-channel U8 mask".to_string(),
                actual: mask.signature().to_string(),
            });
        }

        let mut recreated = false;
        let needs_new = match history.as_ref() {
            Some(h) => !h.same_extent(mask),
            None => true,
        };
        if needs_new {
            debug!(
                width = mask.width(),
                height = mask.height(),
                "recreating motion history buffer"
            );
            *history = Some(FrameBuffer::zeroed(
                mask.width(),
                mask.height(),
                Channels::One,
                PixelDepth::F32,
                ColorModel::Unspecified,
            ));
            self.reset_clock();
            recreated = true;
        }

        let buf = history.as_mut().expect("created above");

        if self.config.unit != self.active_unit {
            if let Some(ts) = buf.floats_mut() {
                ts.fill(0.0);
            }
            self.reset_clock();
            self.active_unit = self.config.unit;
        }

        match self.active_unit {
            TimeUnit::FrameCount => {
                self.frames += 1;
                self.elapsed = self.frames as f32;
            }
            TimeUnit::Seconds => {
                let origin = self.timer.get_or_insert_with(Instant::now);
                self.elapsed = origin.elapsed().as_secs_f32();
            }
        }

        let now = self.elapsed;
        let mask_px = mask.expect_u8("mask")?;
        let ts = buf
            .floats_mut()
            .expect("history buffer is always F32");
        for (stamp, &m) in ts.iter_mut().zip(mask_px) {
            if m != 0 {
                *stamp = now;
            }
        }

        Ok(recreated)
    }

    /// Rescale the history into an 8-bit gray view
    ///
    /// Maps `elapsed - duration_window` to 0 and `elapsed` to 255, clamping
    /// outside the window. Deliberately does nothing until the time axis has
    /// passed the window once (`elapsed <= duration_window`): the view keeps
    /// its last computed state during the initial accumulation, matching the
    /// long-standing observable behavior. Returns whether the view was
    /// refreshed.
    pub fn render_gray(&self, history: &FrameBuffer, gray: &mut Option<FrameBuffer>) -> bool {
        let window = self.config.duration_window;
        if self.elapsed <= window {
            return false;
        }

        let needs_new = match gray.as_ref() {
            Some(g) => !g.same_extent(history),
            None => true,
        };
        if needs_new {
            *gray = Some(FrameBuffer::zeroed(
                history.width(),
                history.height(),
                Channels::One,
                PixelDepth::U8,
                ColorModel::Gray,
            ));
        }

        let Some(ts) = history.floats() else {
            return false;
        };
        let out = gray
            .as_mut()
            .and_then(FrameBuffer::bytes_mut)
            .expect("gray view is always U8");

        let floor = self.elapsed - window;
        let scale = 255.0 / window;
        for (g, &stamp) in out.iter_mut().zip(ts) {
            let v = (stamp - floor) * scale;
            *g = v.clamp(0.0, 255.0) as u8;
        }
        true
    }
}
