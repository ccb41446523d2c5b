//! Motion energy compositing
//!
//! Builds a persistent buffer that is progressively overwritten wherever the
//! input mask is active, leaving untouched pixels at their previous value -
//! the cumulative "trail" of everything that ever moved. Two modes:
//!
//! - **silhouette**: no color source connected; the mask itself is copied at
//!   active pixels into a 1-channel buffer
//! - **color-masked**: a color/gray source of matching spatial size is
//!   connected; its full pixel content is copied at active pixels
//!
//! The mode is decided from source connectivity fresh on every tick, never
//! cached, so connecting or disconnecting the color input between ticks
//! switches behavior (and recreates the output) on the next pass.

pub mod node;

use frameflow_common::{
    Channels, FrameBuffer, PipelineError, PixelDepth, Result,
};
use tracing::debug;

pub use node::MotionEnergyNode;

/// Operating mode, derived from connectivity per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyMode {
    /// Mask copied onto itself: binary silhouette accumulation
    Silhouette,
    /// Color source copied where the mask selects
    ColorMasked,
}

/// Masked-overwrite compositor
///
/// Stateless apart from the output buffer, which persists in the node's
/// output slot between ticks; this function recreates it whenever the
/// governing upstream signature changes.
///
/// Returns the mode used for this pass.
///
/// # Errors
///
/// [`PipelineError::ShapeMismatch`] when the mask is not 1-channel U8, or a
/// connected source's spatial size differs from the mask's.
pub fn composite(
    mask: &FrameBuffer,
    source: Option<&FrameBuffer>,
    out: &mut Option<FrameBuffer>,
) -> Result<EnergyMode> {
    if mask.channels() != Channels::One || mask.depth() != PixelDepth::U8 {
        return Err(PipelineError::ShapeMismatch {
            port: "mask".to_string(),
            expected: "1-channel U8 mask".to_string(),
            actual: mask.signature().to_string(),
        });
    }

    let mode = match source {
        Some(src) => {
            if !src.same_extent(mask) {
                return Err(PipelineError::ShapeMismatch {
                    port: "source".to_string(),
                    expected: format!("{}x{} to match mask", mask.width(), mask.height()),
                    actual: format!("{}x{}", src.width(), src.height()),
                });
            }
            EnergyMode::ColorMasked
        }
        None => EnergyMode::Silhouette,
    };

    // the governing upstream fixes the output signature
    let governing = source.unwrap_or(mask);
    let needs_new = match out.as_ref() {
        Some(buf) => buf.signature() != governing.signature(),
        None => true,
    };
    if needs_new {
        debug!(signature = %governing.signature(), ?mode, "recreating motion energy buffer");
        *out = Some(FrameBuffer::zeroed(
            governing.width(),
            governing.height(),
            governing.channels(),
            governing.depth(),
            governing.color(),
        ));
    }
    let out = out.as_mut().expect("created above");

    let mask_px = mask.expect_u8("mask")?;
    let stride = governing.channels().count();

    match governing.depth() {
        PixelDepth::U8 => {
            let src = governing.expect_u8("source")?;
            let dst = out.bytes_mut().expect("signature matches governing");
            for (pixel, &m) in mask_px.iter().enumerate() {
                if m != 0 {
                    let at = pixel * stride;
                    dst[at..at + stride].copy_from_slice(&src[at..at + stride]);
                }
            }
        }
        PixelDepth::F32 => {
            let src = governing.expect_f32("source")?;
            let dst = out.floats_mut().expect("signature matches governing");
            for (pixel, &m) in mask_px.iter().enumerate() {
                if m != 0 {
                    let at = pixel * stride;
                    dst[at..at + stride].copy_from_slice(&src[at..at + stride]);
                }
            }
        }
    }

    Ok(mode)
}
