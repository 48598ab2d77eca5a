//! High-level variant operations.
//!
//! These functions combine calculations with backend execution: the resize
//! planner decides which passes a variant needs, and the size-bounded encoder
//! runs them, shrinking the geometry until the base64 payload fits the
//! response ceiling.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{fits_within, resize_pixels, shrink_dimensions, shrink_ratio};
use super::params::{Fit, Quality, ResizeParams};
use crate::request::ResizeSpec;
use crate::types::VariantFormat;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum VariantError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(
        "variant still {encoded_len} base64 bytes after {iterations} shrink passes (ceiling {ceiling})"
    )]
    SizeUnresolvable {
        iterations: u32,
        encoded_len: usize,
        ceiling: usize,
    },
}

/// Result type for variant operations.
pub type Result<T> = std::result::Result<T, VariantError>;

/// Resize decision for one source against one requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePlan {
    /// Source already fits; serve the normalized source.
    Keep { crop: bool },
    /// Crop-to-cover: an `outside` pass, then an exact `cover` pass.
    Crop { width: u32, height: u32 },
    /// Single `inside` pass, no crop.
    Inside { width: u32, height: u32 },
}

impl ResizePlan {
    /// Resize passes to run, in order.
    pub fn passes(self) -> Vec<ResizeParams> {
        match self {
            ResizePlan::Keep { .. } => Vec::new(),
            // A direct cover resize is unstable on some sources with odd
            // aspect ratios; outside-then-cover is reproducible.
            ResizePlan::Crop { width, height } => vec![
                ResizeParams::new(width, height, Fit::Outside),
                ResizeParams::new(width, height, Fit::Cover),
            ],
            ResizePlan::Inside { width, height } => {
                vec![ResizeParams::new(width, height, Fit::Inside)]
            }
        }
    }

    /// Fit mode used when the encoded result has to shrink.
    pub fn shrink_fit(self) -> Fit {
        match self {
            ResizePlan::Crop { .. } | ResizePlan::Keep { crop: true } => Fit::Cover,
            ResizePlan::Keep { crop: false } | ResizePlan::Inside { .. } => Fit::Inside,
        }
    }
}

/// Decide how a source of `source` dimensions becomes the requested variant.
pub fn plan_resize(source: Dimensions, target: (u32, u32), crop: bool) -> ResizePlan {
    let (width, height) = target;
    if fits_within(source.as_tuple(), target) {
        ResizePlan::Keep { crop }
    } else if crop {
        ResizePlan::Crop { width, height }
    } else {
        ResizePlan::Inside { width, height }
    }
}

/// Limits and encoding settings for variant production.
#[derive(Debug, Clone)]
pub struct VariantConfig {
    pub quality: Quality,
    /// Ceiling on the base64 length of the response body.
    pub max_body_bytes: usize,
    /// Maximum number of shrink passes before giving up.
    pub max_iterations: u32,
    /// Geometry floor for shrink passes.
    pub min_dimension: u32,
    /// Ceiling on the pixel buffer any single resize pass may allocate.
    pub max_output_pixels: u64,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            max_body_bytes: 1_000_000,
            max_iterations: 10,
            min_dimension: 1,
            max_output_pixels: 100_000_000,
        }
    }
}

/// An encoded variant, ready for the cache write and the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: VariantFormat,
    /// Number of shrink passes the size ceiling forced.
    pub shrink_passes: u32,
}

impl Variant {
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }
}

/// Length of `len` bytes once base64-encoded with padding.
pub fn base64_len(len: usize) -> usize {
    base64::encoded_len(len, true).unwrap_or(usize::MAX)
}

/// Run one resize pass, failing before any allocation when the pass would
/// need more than `max_pixels`.
fn resize_bounded<B: ImageBackend>(
    backend: &B,
    image: &B::Image,
    params: &ResizeParams,
    max_pixels: u64,
) -> Result<B::Image> {
    let source = backend.dimensions(image);
    let pixels = resize_pixels(source.as_tuple(), (params.width, params.height), params.fit);
    if pixels > max_pixels {
        return Err(BackendError::ProcessingFailed(format!(
            "{:?} resize of {}x{} to {}x{} needs {pixels} pixels (limit {max_pixels})",
            params.fit, source.width, source.height, params.width, params.height
        ))
        .into());
    }
    Ok(backend.resize(image, params)?)
}

/// Produce the variant described by `spec` from raw source bytes.
///
/// Orients the source, applies the [`ResizePlan`], then shrinks until the
/// payload fits `config.max_body_bytes` or the iteration cap is hit.
pub fn render_variant<B: ImageBackend>(
    backend: &B,
    source: &[u8],
    spec: &ResizeSpec,
    config: &VariantConfig,
) -> Result<Variant> {
    if spec.format.is_vector() {
        let encoded_len = base64_len(source.len());
        if encoded_len >= config.max_body_bytes {
            return Err(VariantError::SizeUnresolvable {
                iterations: 0,
                encoded_len,
                ceiling: config.max_body_bytes,
            });
        }
        return Ok(Variant {
            bytes: source.to_vec(),
            width: spec.width,
            height: spec.height,
            format: spec.format,
            shrink_passes: 0,
        });
    }

    let decoded = backend.decode(source)?;
    let oriented = backend.auto_orient(decoded, source);
    let source_dims = backend.dimensions(&oriented.image);
    let plan = plan_resize(source_dims, (spec.width, spec.height), spec.crop);
    debug!(
        source_width = source_dims.width,
        source_height = source_dims.height,
        ?plan,
        "planned resize"
    );

    let mut current: Option<B::Image> = None;
    for params in plan.passes() {
        let next = resize_bounded(
            backend,
            current.as_ref().unwrap_or(&oriented.image),
            &params,
            config.max_output_pixels,
        )?;
        current = Some(next);
    }

    let (mut dims, mut bytes) = match (&current, oriented.transformed) {
        // Upright and already small enough: the source bytes are the variant.
        (None, false) => (source_dims, source.to_vec()),
        (None, true) => (
            source_dims,
            backend.encode(&oriented.image, spec.format, config.quality)?,
        ),
        (Some(image), _) => (
            backend.dimensions(image),
            backend.encode(image, spec.format, config.quality)?,
        ),
    };

    let mut iterations = 0;
    loop {
        let encoded_len = base64_len(bytes.len());
        if encoded_len < config.max_body_bytes {
            return Ok(Variant {
                bytes,
                width: dims.width,
                height: dims.height,
                format: spec.format,
                shrink_passes: iterations,
            });
        }

        let ratio = shrink_ratio(encoded_len, config.max_body_bytes);
        let (width, height) = shrink_dimensions(dims.as_tuple(), ratio, config.min_dimension);
        if iterations >= config.max_iterations || (width, height) == dims.as_tuple() {
            return Err(VariantError::SizeUnresolvable {
                iterations,
                encoded_len,
                ceiling: config.max_body_bytes,
            });
        }
        iterations += 1;
        warn!(
            encoded_len,
            width, height, iterations, "response over ceiling, resizing with lower resolution"
        );

        let resized = resize_bounded(
            backend,
            &oriented.image,
            &ResizeParams::new(width, height, plan.shrink_fit()),
            config.max_output_pixels,
        )?;
        dims = backend.dimensions(&resized);
        bytes = backend.encode(&resized, spec.format, config.quality)?;
    }
}
