//! Common types for the frameflow processing graph
//!
//! This crate holds the two things every node crate needs: the owned
//! [`FrameBuffer`] pixel container and the shared [`PipelineError`] taxonomy.
//! Everything else (ports, lifecycle, parameters) lives in `frameflow-core`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Processing errors shared across the pipeline
///
/// Every failure is synchronous and names the node/port it came from; nodes
/// never retry internally - the scheduler decides whether a failed tick halts
/// the pipeline or is skipped.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("node '{node}': required input port '{port}' is not connected")]
    Connectivity { node: String, port: String },

    #[error("port '{port}': expected {expected}, got {actual}")]
    ShapeMismatch {
        port: String,
        expected: String,
        actual: String,
    },

    #[error("resource error: {0}")]
    Resource(String),

    #[error("node '{node}': {operation} not valid in state {state}")]
    State {
        node: String,
        operation: String,
        state: String,
    },

    #[error("invalid parameter '{name}': {reason}")]
    Parameter { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image processing error: {0}")]
    Image(String),

    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        PipelineError::Image(err.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Number of interleaved samples per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
    One,
    Three,
    Four,
}

impl Channels {
    /// Samples per pixel
    #[must_use]
    pub fn count(self) -> usize {
        match self {
            Channels::One => 1,
            Channels::Three => 3,
            Channels::Four => 4,
        }
    }
}

/// Bit depth of a single sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelDepth {
    /// 8-bit unsigned
    U8,
    /// 32-bit float
    F32,
}

impl PixelDepth {
    #[must_use]
    pub fn bytes_per_sample(self) -> usize {
        match self {
            PixelDepth::U8 => 1,
            PixelDepth::F32 => 4,
        }
    }
}

/// Semantic color model tag carried alongside the raw samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorModel {
    Gray,
    Rgb,
    Unspecified,
}

/// Owned, contiguous sample storage
///
/// The variant fixes the bit depth; a depth change is a whole-buffer
/// replacement, never an in-place conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    F32(Vec<f32>),
}

impl PixelData {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::F32(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shape/depth signature of a buffer, used to detect upstream changes
///
/// Two buffers with equal signatures are layout-compatible: same spatial
/// size, channel count and sample depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSignature {
    pub width: u32,
    pub height: u32,
    pub channels: Channels,
    pub depth: PixelDepth,
}

impl std::fmt::Display for FrameSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}x{} {:?}",
            self.width,
            self.height,
            self.channels.count(),
            self.depth
        )
    }
}

/// An owned 2-D pixel buffer with shape, depth and color-model metadata
///
/// Invariant: `data.len() == width * height * channels`. A buffer is never
/// resized in place - a dimension or depth change replaces the whole value,
/// which drops the old storage in one move (no paired alloc/release to get
/// wrong).
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    channels: Channels,
    color: ColorModel,
    data: PixelData,
}

impl FrameBuffer {
    /// Create a zero-filled buffer of the given shape
    #[must_use]
    pub fn zeroed(
        width: u32,
        height: u32,
        channels: Channels,
        depth: PixelDepth,
        color: ColorModel,
    ) -> Self {
        let samples = width as usize * height as usize * channels.count();
        let data = match depth {
            PixelDepth::U8 => PixelData::U8(vec![0u8; samples]),
            PixelDepth::F32 => PixelData::F32(vec![0.0f32; samples]),
        };
        Self {
            width,
            height,
            channels,
            color,
            data,
        }
    }

    /// Create a buffer from existing samples
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ShapeMismatch`] if the sample count does not
    /// match `width * height * channels`.
    pub fn from_data(
        width: u32,
        height: u32,
        channels: Channels,
        color: ColorModel,
        data: PixelData,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * channels.count();
        if data.len() != expected {
            return Err(PipelineError::ShapeMismatch {
                port: "<buffer>".to_string(),
                expected: format!("{expected} samples"),
                actual: format!("{} samples", data.len()),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            color,
            data,
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn channels(&self) -> Channels {
        self.channels
    }

    #[must_use]
    pub fn color(&self) -> ColorModel {
        self.color
    }

    #[must_use]
    pub fn depth(&self) -> PixelDepth {
        match self.data {
            PixelData::U8(_) => PixelDepth::U8,
            PixelData::F32(_) => PixelDepth::F32,
        }
    }

    #[must_use]
    pub fn signature(&self) -> FrameSignature {
        FrameSignature {
            width: self.width,
            height: self.height,
            channels: self.channels,
            depth: self.depth(),
        }
    }

    /// True if the spatial dimensions match (channels/depth ignored)
    #[must_use]
    pub fn same_extent(&self, other: &FrameBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Total samples in the buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat sample index of pixel `(x, y)` channel 0
    #[must_use]
    pub fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels.count()
    }

    /// Borrow the samples as bytes; `None` if the buffer is F32
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.data {
            PixelData::U8(v) => Some(v),
            PixelData::F32(_) => None,
        }
    }

    #[must_use]
    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.data {
            PixelData::U8(v) => Some(v),
            PixelData::F32(_) => None,
        }
    }

    /// Borrow the samples as floats; `None` if the buffer is U8
    #[must_use]
    pub fn floats(&self) -> Option<&[f32]> {
        match &self.data {
            PixelData::U8(_) => None,
            PixelData::F32(v) => Some(v),
        }
    }

    #[must_use]
    pub fn floats_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.data {
            PixelData::U8(_) => None,
            PixelData::F32(v) => Some(v),
        }
    }

    /// Borrow as bytes or fail with a shape error naming `port`
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ShapeMismatch`] if the buffer is not U8.
    pub fn expect_u8(&self, port: &str) -> Result<&[u8]> {
        self.bytes().ok_or_else(|| PipelineError::ShapeMismatch {
            port: port.to_string(),
            expected: "8-bit unsigned samples".to_string(),
            actual: self.signature().to_string(),
        })
    }

    /// Borrow as floats or fail with a shape error naming `port`
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ShapeMismatch`] if the buffer is not F32.
    pub fn expect_f32(&self, port: &str) -> Result<&[f32]> {
        self.floats().ok_or_else(|| PipelineError::ShapeMismatch {
            port: port.to_string(),
            expected: "32-bit float samples".to_string(),
            actual: self.signature().to_string(),
        })
    }

    /// Convert a single-channel U8 buffer into an `image` grayscale image
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ShapeMismatch`] for any other layout.
    pub fn to_gray_image(&self) -> Result<image::GrayImage> {
        match (&self.data, self.channels) {
            (PixelData::U8(v), Channels::One) => {
                image::GrayImage::from_raw(self.width, self.height, v.clone()).ok_or_else(|| {
                    PipelineError::Image("buffer does not fit image dimensions".to_string())
                })
            }
            _ => Err(PipelineError::ShapeMismatch {
                port: "<buffer>".to_string(),
                expected: "1-channel U8".to_string(),
                actual: self.signature().to_string(),
            }),
        }
    }

    /// Wrap an `image` grayscale image as a 1-channel U8 buffer
    #[must_use]
    pub fn from_gray_image(img: &image::GrayImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            channels: Channels::One,
            color: ColorModel::Gray,
            data: PixelData::U8(img.as_raw().clone()),
        }
    }

    /// Wrap an `image` RGB image as a 3-channel U8 buffer
    #[must_use]
    pub fn from_rgb_image(img: &image::RgbImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            channels: Channels::Three,
            color: ColorModel::Rgb,
            data: PixelData::U8(img.as_raw().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_buffer_respects_size_invariant() {
        let buf = FrameBuffer::zeroed(4, 3, Channels::Three, PixelDepth::U8, ColorModel::Rgb);
        assert_eq!(buf.len(), 4 * 3 * 3);
        assert_eq!(buf.depth(), PixelDepth::U8);
        assert!(buf.floats().is_none());
        assert_eq!(buf.bytes().map(<[u8]>::len), Some(36));
    }

    #[test]
    fn from_data_rejects_wrong_sample_count() {
        let res = FrameBuffer::from_data(
            2,
            2,
            Channels::One,
            ColorModel::Gray,
            PixelData::U8(vec![0; 3]),
        );
        assert!(matches!(res, Err(PipelineError::ShapeMismatch { .. })));
    }

    #[test]
    fn signature_detects_depth_change() {
        let a = FrameBuffer::zeroed(8, 8, Channels::One, PixelDepth::U8, ColorModel::Gray);
        let b = FrameBuffer::zeroed(8, 8, Channels::One, PixelDepth::F32, ColorModel::Gray);
        assert_ne!(a.signature(), b.signature());
        assert!(a.same_extent(&b));
    }

    #[test]
    fn gray_image_round_trip() {
        let img = image::GrayImage::from_fn(3, 2, |x, y| image::Luma([(x + y * 3) as u8]));
        let buf = FrameBuffer::from_gray_image(&img);
        assert_eq!(buf.pixel_index(2, 1), 5);
        let back = buf.to_gray_image().unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn expect_helpers_name_the_port() {
        let buf = FrameBuffer::zeroed(2, 2, Channels::One, PixelDepth::F32, ColorModel::Gray);
        let err = buf.expect_u8("mask").unwrap_err();
        assert!(err.to_string().contains("mask"));
    }
}
