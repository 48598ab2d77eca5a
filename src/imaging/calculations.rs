//! Pure calculation functions for variant geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Fit;

/// Safety margin applied on top of the area ratio when shrinking an
/// oversized variant, so one pass usually lands under the ceiling.
pub const SHRINK_MARGIN: f64 = 1.2;

/// Whether `source` already fits inside `target` on both axes.
pub fn fits_within(source: (u32, u32), target: (u32, u32)) -> bool {
    source.0 <= target.0 && source.1 <= target.1
}

/// Calculate dimensions that fit inside a target box (resize without crop).
///
/// The constraining axis matches the box exactly; the other axis is scaled by
/// the same factor and may fall short. Never exceeds the box.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Bounding box (width, height)
///
/// # Examples
/// ```
/// # use edge_resize::imaging::calculate_inside_dimensions;
/// // 4:3 source into a square box is width-limited → 800x600
/// assert_eq!(calculate_inside_dimensions((1600, 1200), (800, 800)), (800, 600));
/// ```
pub fn calculate_inside_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let scale_w = tgt_w as f64 / src_w as f64;
    let scale_h = tgt_h as f64 / src_h as f64;

    if scale_w <= scale_h {
        // Width is the constraining axis
        let h = (src_h as f64 * scale_w).round() as u32;
        (tgt_w, h.clamp(1, tgt_h.max(1)))
    } else {
        // Height is the constraining axis
        let w = (src_w as f64 * scale_h).round() as u32;
        (w.clamp(1, tgt_w.max(1)), tgt_h)
    }
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w.max(tgt_w), h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h.max(tgt_h))
    }
}

/// Offset of a centered crop window along one axis.
pub fn center_offset(full: u32, window: u32) -> u32 {
    full.saturating_sub(window) / 2
}

/// Shrink ratio for a payload of `encoded_len` against `ceiling`.
///
/// Payload size scales with pixel area, so the linear ratio is the square
/// root of the size ratio, padded by [`SHRINK_MARGIN`].
pub fn shrink_ratio(encoded_len: usize, ceiling: usize) -> f64 {
    (encoded_len as f64 / ceiling as f64).sqrt() * SHRINK_MARGIN
}

/// Divide both axes by `ratio` (floored), never going below `min_dimension`.
pub fn shrink_dimensions(current: (u32, u32), ratio: f64, min_dimension: u32) -> (u32, u32) {
    let floor = min_dimension.max(1);
    let w = (current.0 as f64 / ratio).floor() as u32;
    let h = (current.1 as f64 / ratio).floor() as u32;
    (w.max(floor), h.max(floor))
}

/// Largest buffer, in pixels, a resize pass allocates.
///
/// `outside` and `cover` both materialize the fill geometry (cover crops it
/// afterwards); `inside` only ever produces its final geometry.
pub fn resize_pixels(source: (u32, u32), target: (u32, u32), fit: Fit) -> u64 {
    let (w, h) = match fit {
        Fit::Inside => calculate_inside_dimensions(source, target),
        Fit::Outside | Fit::Cover => calculate_fill_dimensions(source, target),
    };
    u64::from(w) * u64::from(h)
}
