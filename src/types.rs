//! Shared types used across pipeline stages.
//!
//! [`VariantFormat`] is derived by the request decoder, checked by the format
//! validator, passed to the codec for encoding, and rendered into the
//! `content-type` of both the cache write and the response.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Encodings a variant can be requested in.
///
/// The file extension of the requested path decides the format; there is no
/// conversion between formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantFormat {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Gif,
    Webp,
    Svg,
    #[serde(alias = "tif")]
    Tiff,
}

impl VariantFormat {
    pub const ALL: [VariantFormat; 6] = [
        VariantFormat::Jpeg,
        VariantFormat::Png,
        VariantFormat::Gif,
        VariantFormat::Webp,
        VariantFormat::Svg,
        VariantFormat::Tiff,
    ];

    /// Map a format name (already lowercased) to a format.
    ///
    /// Accepts the same aliases as the config (`jpg`, `tif`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "svg" => Some(Self::Svg),
            "tiff" | "tif" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Svg => "svg",
            Self::Tiff => "tiff",
        }
    }

    /// MIME type used for the cache write and the response.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Svg => "image/svg+xml",
            Self::Tiff => "image/tiff",
        }
    }

    /// Vector formats have no pixel geometry to resize.
    pub fn is_vector(self) -> bool {
        matches!(self, Self::Svg)
    }
}

impl fmt::Display for VariantFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
