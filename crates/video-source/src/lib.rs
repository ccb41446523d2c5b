//! Frame-accurate video frame sequencing
//!
//! Tracks the current decode position against the requested frame index and
//! picks the cheapest way to honour each request: nothing at all when the
//! frame is already decoded, a sequential decode-advance for the immediate
//! next frame, or an explicit positional seek for anything else. Optional
//! wraparound looping maps requests past the end back onto the clip via
//! modulo.
//!
//! Codec internals stay behind the [`FrameDecoder`] trait; this crate only
//! owns the position bookkeeping and the loop semantics. A deterministic
//! [`SyntheticDecoder`] is included for tests and embedding without a real
//! media stack.

pub mod node;

use frameflow_common::{
    Channels, ColorModel, FrameBuffer, PipelineError, PixelDepth, Result,
};
use tracing::debug;

pub use node::VideoSourceNode;

/// Decoder abstraction the sequencer drives
///
/// Implementations wrap a container/codec pair (or a synthetic generator);
/// positions are 0-based frame indices.
pub trait FrameDecoder: Send {
    /// Frame count as reported by the container
    ///
    /// Some decoders report one frame past the last decodable index; the
    /// sequencer's trailing-frame guard exists for exactly that case.
    fn reported_frame_count(&self) -> u64;

    /// Native frame rate of the source
    fn frame_rate(&self) -> f64;

    /// Decode the frame at the current position and advance by one
    ///
    /// # Errors
    ///
    /// [`PipelineError::Resource`] at end of stream or on a corrupt frame.
    fn decode_next(&mut self) -> Result<FrameBuffer>;

    /// Reposition so the next `decode_next` yields frame `index`
    ///
    /// # Errors
    ///
    /// [`PipelineError::Resource`] when the position cannot be reached.
    fn seek(&mut self, index: u64) -> Result<()>;
}

/// How a request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePath {
    /// Requested frame is the one already decoded; nothing to do
    Cached,
    /// Cheap decode-advance, no positional seek
    Sequential,
    /// Explicit positional seek followed by a decode
    Seek,
}

/// Position state of one video source
#[derive(Debug)]
pub struct FrameSequencer {
    /// Index of the currently decoded frame; `None` until the first decode
    /// or after a decode failure
    current: Option<u64>,
    frame_count: u64,
    looping: bool,
    last_path: Option<DecodePath>,
}

impl FrameSequencer {
    /// # Errors
    ///
    /// [`PipelineError::Resource`] for an empty source.
    pub fn new(frame_count: u64, looping: bool) -> Result<Self> {
        if frame_count == 0 {
            return Err(PipelineError::Resource(
                "video source reports no decodable frames".to_string(),
            ));
        }
        Ok(Self {
            current: None,
            frame_count,
            looping,
            last_path: None,
        })
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[must_use]
    pub fn current(&self) -> Option<u64> {
        self.current
    }

    #[must_use]
    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Decode path chosen by the most recent `advance`
    #[must_use]
    pub fn last_path(&self) -> Option<DecodePath> {
        self.last_path
    }

    /// Map a requested tick onto a target frame and a decode path
    ///
    /// # Errors
    ///
    /// [`PipelineError::Resource`] for an index past the end while looping
    /// is disabled.
    pub fn resolve(&self, requested: u64) -> Result<(u64, DecodePath)> {
        let target = if self.looping {
            requested % self.frame_count
        } else if requested >= self.frame_count {
            return Err(PipelineError::Resource(format!(
                "requested frame {requested} past end of a {}-frame source",
                self.frame_count
            )));
        } else {
            requested
        };

        // With no known position (fresh sequencer, or after a failure that
        // left the decoder somewhere arbitrary) only a seek re-aligns the
        // decoder with the request.
        let path = if self.current == Some(target) {
            DecodePath::Cached
        } else if self.current.is_some_and(|c| target == c + 1) {
            DecodePath::Sequential
        } else {
            DecodePath::Seek
        };
        Ok((target, path))
    }

    /// Satisfy a request against the decoder
    ///
    /// Returns the freshly decoded frame, or `None` when the request hit the
    /// already-decoded frame. A decode/seek failure clears the position so
    /// the next successful call starts from an explicit seek.
    ///
    /// # Errors
    ///
    /// Out-of-range requests and decoder failures; both are fatal for the
    /// calling `process` pass.
    pub fn advance(
        &mut self,
        requested: u64,
        decoder: &mut dyn FrameDecoder,
    ) -> Result<Option<FrameBuffer>> {
        let (target, path) = self.resolve(requested)?;
        debug!(requested, target, ?path, "sequencer advance");

        let outcome = match path {
            DecodePath::Cached => Ok(None),
            DecodePath::Sequential => decoder.decode_next().map(Some),
            DecodePath::Seek => decoder
                .seek(target)
                .and_then(|()| decoder.decode_next())
                .map(Some),
        };
        match outcome {
            Ok(frame) => {
                self.current = Some(target);
                self.last_path = Some(path);
                Ok(frame)
            }
            Err(err) => {
                self.current = None;
                self.last_path = Some(path);
                Err(err)
            }
        }
    }

    /// Forget the position (teardown path)
    pub fn invalidate(&mut self) {
        self.current = None;
        self.last_path = None;
    }
}

/// Deterministic in-memory decoder
///
/// Produces 1-channel U8 frames where every sample equals the frame index
/// modulo 256, so tests can assert which frame a buffer came from.
#[derive(Debug)]
pub struct SyntheticDecoder {
    width: u32,
    height: u32,
    reported: u64,
    fps: f64,
    position: u64,
}

impl SyntheticDecoder {
    #[must_use]
    pub fn new(width: u32, height: u32, reported_frame_count: u64, fps: f64) -> Self {
        Self {
            width,
            height,
            reported: reported_frame_count,
            fps,
            position: 0,
        }
    }
}

impl FrameDecoder for SyntheticDecoder {
    fn reported_frame_count(&self) -> u64 {
        self.reported
    }

    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn decode_next(&mut self) -> Result<FrameBuffer> {
        if self.position >= self.reported {
            return Err(PipelineError::Resource(format!(
                "end of stream at frame {}",
                self.position
            )));
        }
        let mut frame = FrameBuffer::zeroed(
            self.width,
            self.height,
            Channels::One,
            PixelDepth::U8,
            ColorModel::Gray,
        );
        if let Some(px) = frame.bytes_mut() {
            px.fill((self.position % 256) as u8);
        }
        self.position += 1;
        Ok(frame)
    }

    fn seek(&mut self, index: u64) -> Result<()> {
        if index >= self.reported {
            return Err(PipelineError::Resource(format!(
                "seek to frame {index} beyond reported count {}",
                self.reported
            )));
        }
        self.position = index;
        Ok(())
    }
}
