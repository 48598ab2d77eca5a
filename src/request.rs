//! Request decoding: from a variant URI to a [`ResizeSpec`].
//!
//! Variant paths carry their geometry as the last dash-separated segment of
//! the file name, right before the extension:
//!
//! ```text
//! assets/images/photo-800x600c.jpg
//!               ^^^^^ ^^^^^^^^ ^^^
//!               base  token    extension
//! ```
//!
//! - `800x600`: target box, width then height, base 10
//! - `c`: optional crop marker (crop-to-cover instead of fit-inside)
//! - a `0` on either axis means "unbounded", i.e. the configured default max
//!
//! The canonical source lives at the path with the token removed
//! (`assets/images/photo.jpg`). The variant is cached at the requested path.

use crate::config::ResizeConfig;
use crate::types::VariantFormat;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Unsupported URI: {0}")]
    UnsupportedUri(String),
    #[error("Unsupported image type: {0:?}")]
    UnsupportedImageType(String),
}

/// Everything the pipeline needs to know about a requested variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResizeSpec {
    /// Storage key of the canonical source image.
    pub base_key: String,
    /// Storage key the variant is written to (the request path).
    pub requested_key: String,
    pub width: u32,
    pub height: u32,
    pub crop: bool,
    pub format: VariantFormat,
}

/// Structural split of a variant path, before any validation of the format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPath<'a> {
    /// Path up to (not including) the `-<token>` segment.
    pub base: &'a str,
    /// `.ext` including the dot, or empty when the name has no extension.
    pub suffix: &'a str,
    /// Extension text as written (no dot).
    pub extension: &'a str,
    pub width: u32,
    pub height: u32,
    pub crop: bool,
}

/// Split `path` (no leading `/`) into base, size token, and extension.
///
/// Returns `None` when the file name has no well-formed size token, or when
/// a dimension does not fit in `u32`.
pub fn split_variant_path(path: &str) -> Option<VariantPath<'_>> {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    let name = &path[name_start..];
    let stem_end = name.rfind('.').map_or(path.len(), |dot| name_start + dot);

    let dash = name_start + path[name_start..stem_end].rfind('-')?;
    if dash == name_start {
        // Nothing left of the token to name a source
        return None;
    }
    let (width, height, crop) = parse_size_token(&path[dash + 1..stem_end])?;

    let suffix = &path[stem_end..];
    Some(VariantPath {
        base: &path[..dash],
        suffix,
        extension: suffix.strip_prefix('.').unwrap_or(""),
        width,
        height,
        crop,
    })
}

/// Parse `<digits>x<digits>` with an optional trailing `c`.
fn parse_size_token(token: &str) -> Option<(u32, u32, bool)> {
    let (dims, crop) = match token.strip_suffix('c') {
        Some(dims) => (dims, true),
        None => (token, false),
    };
    let (w, h) = dims.split_once('x')?;
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !is_number(w) || !is_number(h) {
        return None;
    }
    Some((w.parse().ok()?, h.parse().ok()?, crop))
}

/// Resolve an extension against the supported set.
///
/// Lowercases first; `jpg` and `tif` resolve to their long names.
pub fn validate_format(
    extension: &str,
    supported: &[VariantFormat],
) -> Result<VariantFormat, RequestError> {
    let name = extension.to_ascii_lowercase();
    VariantFormat::from_name(&name)
        .filter(|format| supported.contains(format))
        .ok_or(RequestError::UnsupportedImageType(name))
}

/// Decode a request URI into a [`ResizeSpec`].
///
/// The token is checked before the extension, so a path that is wrong on
/// both counts reports [`RequestError::UnsupportedUri`].
pub fn decode_request(uri: &str, config: &ResizeConfig) -> Result<ResizeSpec, RequestError> {
    let path = uri.strip_prefix('/').unwrap_or(uri);
    let parts =
        split_variant_path(path).ok_or_else(|| RequestError::UnsupportedUri(uri.to_string()))?;
    let format = validate_format(parts.extension, &config.formats)?;

    Ok(ResizeSpec {
        base_key: format!("{}{}", parts.base, parts.suffix),
        requested_key: path.to_string(),
        width: or_default(parts.width, config.default_max_width),
        height: or_default(parts.height, config.default_max_height),
        crop: parts.crop,
        format,
    })
}

fn or_default(value: u32, default: u32) -> u32 {
    if value == 0 { default } else { value }
}
