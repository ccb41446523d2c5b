//! Distance-field computation with dynamic normalization
//!
//! Computes, for every pixel of a binary mask, the chamfer-approximated
//! distance to the nearest zero-valued pixel, then optionally rescales the
//! float field into a displayable 8-bit view using the *current frame's*
//! min/max only - the normalization window is never smoothed or carried
//! across frames, so the view always reflects exactly one field.
//!
//! The transform is the classic two-pass chamfer: a forward raster scan
//! propagating distances from the top-left, then a mirrored backward scan.
//! Metric and neighborhood choose the weights; L1 and Chebyshev are exact
//! under a 3x3 neighborhood, L2 uses the standard chamfer approximations.

pub mod node;

use frameflow_common::{
    Channels, ColorModel, FrameBuffer, PipelineError, PixelDepth, Result,
};
use tracing::debug;

pub use node::DistanceFieldNode;

/// Distance metric for the transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    /// City-block distance (exact)
    L1,
    /// Euclidean distance (chamfer approximation)
    L2,
    /// Chessboard distance (exact)
    Chebyshev,
}

impl DistanceMetric {
    /// Parse the parameter-facing name
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "l1" => Some(DistanceMetric::L1),
            "l2" => Some(DistanceMetric::L2),
            "chebyshev" => Some(DistanceMetric::Chebyshev),
            _ => None,
        }
    }
}

/// Scan neighborhood for the chamfer passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    ThreeByThree,
    FiveByFive,
}

impl Neighborhood {
    /// Parse the parameter-facing name (`"3x3"` / `"5x5"`)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "3x3" => Some(Neighborhood::ThreeByThree),
            "5x5" => Some(Neighborhood::FiveByFive),
            _ => None,
        }
    }
}

/// Distance field configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceFieldConfig {
    pub metric: DistanceMetric,
    pub neighborhood: Neighborhood,
    /// Map the gray view to [255, 0] instead of [0, 255]
    pub invert_gray: bool,
}

impl Default for DistanceFieldConfig {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::L2,
            neighborhood: Neighborhood::ThreeByThree,
            invert_gray: false,
        }
    }
}

/// Chamfer weights `(orthogonal, diagonal, knight)` for a metric/neighborhood
///
/// L1 and Chebyshev are exact with a 3x3 pass regardless of the requested
/// neighborhood; the knight weight only exists for L2 5x5.
#[must_use]
fn chamfer_weights(metric: DistanceMetric, neighborhood: Neighborhood) -> (f32, f32, Option<f32>) {
    match (metric, neighborhood) {
        (DistanceMetric::L1, _) => (1.0, 2.0, None),
        (DistanceMetric::Chebyshev, _) => (1.0, 1.0, None),
        (DistanceMetric::L2, Neighborhood::ThreeByThree) => (0.955, 1.3693, None),
        (DistanceMetric::L2, Neighborhood::FiveByFive) => (1.0, 1.4, Some(2.1969)),
    }
}

/// Compute the distance-to-nearest-zero transform of a binary mask
///
/// The float field in `field` is recreated whenever the mask's spatial shape
/// changes; its content is fully rewritten every call.
///
/// # Errors
///
/// [`PipelineError::ShapeMismatch`] unless the mask is 1-channel U8.
pub fn distance_transform(
    mask: &FrameBuffer,
    config: DistanceFieldConfig,
    field: &mut Option<FrameBuffer>,
) -> Result<()> {
    if mask.channels() != Channels::One || mask.depth() != PixelDepth::U8 {
        return Err(PipelineError::ShapeMismatch {
            port: "mask".to_string(),
            expected: "1-channel U8 mask".to_string(),
            actual: mask.signature().to_string(),
        });
    }

    let needs_new = match field.as_ref() {
        Some(f) => !f.same_extent(mask),
        None => true,
    };
    if needs_new {
        debug!(
            width = mask.width(),
            height = mask.height(),
            "recreating distance field buffer"
        );
        *field = Some(FrameBuffer::zeroed(
            mask.width(),
            mask.height(),
            Channels::One,
            PixelDepth::F32,
            ColorModel::Unspecified,
        ));
    }

    let width = mask.width() as i64;
    let height = mask.height() as i64;
    let mask_px = mask.expect_u8("mask")?;
    let d = field
        .as_mut()
        .and_then(FrameBuffer::floats_mut)
        .expect("field buffer is always F32");

    for (out, &m) in d.iter_mut().zip(mask_px) {
        *out = if m == 0 { 0.0 } else { f32::INFINITY };
    }

    let (orth, diag, knight) = chamfer_weights(config.metric, config.neighborhood);

    // neighbor offsets already visited by the forward raster scan
    let mut forward: Vec<(i64, i64, f32)> = vec![
        (-1, 0, orth),
        (0, -1, orth),
        (-1, -1, diag),
        (1, -1, diag),
    ];
    if let Some(k) = knight {
        forward.extend_from_slice(&[(-1, -2, k), (1, -2, k), (-2, -1, k), (2, -1, k)]);
    }
    let backward: Vec<(i64, i64, f32)> = forward
        .iter()
        .map(|&(dx, dy, w)| (-dx, -dy, w))
        .collect();

    let relax = |d: &mut [f32], x: i64, y: i64, offsets: &[(i64, i64, f32)]| {
        let at = (y * width + x) as usize;
        let mut best = d[at];
        for &(dx, dy, w) in offsets {
            let nx = x + dx;
            let ny = y + dy;
            if nx >= 0 && nx < width && ny >= 0 && ny < height {
                let candidate = d[(ny * width + nx) as usize] + w;
                if candidate < best {
                    best = candidate;
                }
            }
        }
        d[at] = best;
    };

    for y in 0..height {
        for x in 0..width {
            relax(d, x, y, &forward);
        }
    }
    for y in (0..height).rev() {
        for x in (0..width).rev() {
            relax(d, x, y, &backward);
        }
    }

    Ok(())
}

/// Rescale a distance field into an 8-bit gray view
///
/// Uses the field's own min/max for this frame only. If the field is
/// entirely zero the view is left exactly as it was (no divide-by-zero, no
/// garbage); a uniform non-zero field renders at full scale. Returns whether
/// the view was refreshed.
pub fn normalize_field(
    field: &FrameBuffer,
    invert: bool,
    gray: &mut Option<FrameBuffer>,
) -> bool {
    let Some(d) = field.floats() else {
        return false;
    };

    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in d {
        min = min.min(v);
        max = max.max(v);
    }
    if min == 0.0 && max == 0.0 {
        return false;
    }

    let needs_new = match gray.as_ref() {
        Some(g) => !g.same_extent(field),
        None => true,
    };
    if needs_new {
        *gray = Some(FrameBuffer::zeroed(
            field.width(),
            field.height(),
            Channels::One,
            PixelDepth::U8,
            ColorModel::Gray,
        ));
    }
    let out = gray
        .as_mut()
        .and_then(FrameBuffer::bytes_mut)
        .expect("gray view is always U8");

    if max > min {
        let scale = 255.0 / (max - min);
        for (g, &v) in out.iter_mut().zip(d) {
            let scaled = ((v - min) * scale).clamp(0.0, 255.0) as u8;
            *g = if invert { 255 - scaled } else { scaled };
        }
    } else {
        // uniform non-zero field: full scale everywhere
        out.fill(if invert { 0 } else { 255 });
    }
    true
}
