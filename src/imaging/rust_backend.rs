//! Pure Rust image codec backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image::ImageReader` with format sniffing |
//! | Orientation | `kamadak-exif` tag `0x0112`, applied with flips/rotations |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Cover crop | fill-resize then `crop_imm` centered |
//! | Encode | `JpegEncoder` with quality; `write_to` for the lossless formats |

use super::backend::{BackendError, Dimensions, ImageBackend, Oriented};
use super::calculations::{
    calculate_fill_dimensions, calculate_inside_dimensions, center_offset,
};
use super::params::{Fit, Quality, ResizeParams};
use crate::types::VariantFormat;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the EXIF orientation tag from raw source bytes.
///
/// Returns 1 (upright) when there is no EXIF block or no orientation tag.
pub fn read_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let exif = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(_) => return 1,
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply an EXIF orientation value (1–8) to a decoded image.
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Convert to a pixel layout the target encoder accepts.
///
/// JPEG has no alpha channel; the palette/lossless encoders take 8-bit RGB(A).
/// PNG keeps its depth except for float buffers.
fn encodable(img: &DynamicImage, format: VariantFormat) -> DynamicImage {
    match format {
        VariantFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        VariantFormat::Png => match img {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                DynamicImage::ImageRgba8(img.to_rgba8())
            }
            other => other.clone(),
        },
        _ if img.color().has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}

fn raster_format(format: VariantFormat) -> Option<ImageFormat> {
    match format {
        VariantFormat::Jpeg => Some(ImageFormat::Jpeg),
        VariantFormat::Png => Some(ImageFormat::Png),
        VariantFormat::Gif => Some(ImageFormat::Gif),
        VariantFormat::Webp => Some(ImageFormat::WebP),
        VariantFormat::Tiff => Some(ImageFormat::Tiff),
        VariantFormat::Svg => None,
    }
}

impl ImageBackend for RustBackend {
    type Image = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn auto_orient(&self, image: DynamicImage, source: &[u8]) -> Oriented<DynamicImage> {
        let orientation = read_orientation(source);
        Oriented {
            image: apply_orientation(image, orientation),
            transformed: (2..=8).contains(&orientation),
        }
    }

    fn dimensions(&self, image: &DynamicImage) -> Dimensions {
        let (width, height) = image.dimensions();
        Dimensions { width, height }
    }

    fn resize(
        &self,
        image: &DynamicImage,
        params: &ResizeParams,
    ) -> Result<DynamicImage, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Invalid resize target {}x{}",
                params.width, params.height
            )));
        }
        let source = image.dimensions();
        let target = (params.width, params.height);

        let resized = match params.fit {
            Fit::Inside => {
                let (w, h) = calculate_inside_dimensions(source, target);
                image.resize_exact(w, h, FilterType::Lanczos3)
            }
            Fit::Outside => {
                let (w, h) = calculate_fill_dimensions(source, target);
                image.resize_exact(w, h, FilterType::Lanczos3)
            }
            Fit::Cover => {
                // Fill-resize then center-crop to exact dimensions
                let (fill_w, fill_h) = calculate_fill_dimensions(source, target);
                let filled = if (fill_w, fill_h) == source {
                    image.clone()
                } else {
                    image.resize_exact(fill_w, fill_h, FilterType::Lanczos3)
                };
                filled.crop_imm(
                    center_offset(fill_w, params.width),
                    center_offset(fill_h, params.height),
                    params.width,
                    params.height,
                )
            }
        };
        Ok(resized)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: VariantFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let image_format =
            raster_format(format).ok_or(BackendError::UnsupportedEncoding(format))?;
        let pixels = encodable(image, format);
        let mut buf = Vec::new();

        if image_format == ImageFormat::Jpeg {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
            pixels
                .write_with_encoder(encoder)
                .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
        } else {
            pixels
                .write_to(&mut Cursor::new(&mut buf), image_format)
                .map_err(|e| {
                    BackendError::ProcessingFailed(format!("{format} encode failed: {e}"))
                })?;
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        gradient_image, jpeg_bytes, noise_png_bytes, png_bytes, with_exif_orientation,
    };

    #[test]
    fn decode_synthetic_jpeg() {
        let backend = RustBackend::new();
        let image = backend.decode(&jpeg_bytes(200, 150)).unwrap();
        assert_eq!(backend.dimensions(&image), Dimensions::new(200, 150));
    }

    #[test]
    fn decode_garbage_errors() {
        let backend = RustBackend::new();
        let result = backend.decode(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn orientation_defaults_to_upright_without_exif() {
        assert_eq!(read_orientation(&jpeg_bytes(10, 10)), 1);
        assert_eq!(read_orientation(b"no exif here"), 1);
    }

    #[test]
    fn orientation_read_from_exif_segment() {
        for orientation in [1u16, 3, 6, 8] {
            let bytes = with_exif_orientation(&jpeg_bytes(10, 10), orientation);
            assert_eq!(read_orientation(&bytes), u32::from(orientation));
        }
    }

    #[test]
    fn auto_orient_rotates_tagged_jpeg() {
        let backend = RustBackend::new();
        let bytes = with_exif_orientation(&jpeg_bytes(40, 20), 6);
        let image = backend.decode(&bytes).unwrap();
        let oriented = backend.auto_orient(image, &bytes);
        assert!(oriented.transformed);
        assert_eq!(backend.dimensions(&oriented.image), Dimensions::new(20, 40));
    }

    #[test]
    fn png_keeps_alpha_channel() {
        let backend = RustBackend::new();
        let image = backend.decode(&noise_png_bytes(8, 8)).unwrap();
        let bytes = backend.encode(&image, VariantFormat::Png, Quality::default()).unwrap();
        assert!(backend.decode(&bytes).unwrap().color().has_alpha());
    }

    #[test]
    fn auto_orient_without_exif_is_untransformed() {
        let backend = RustBackend::new();
        let bytes = jpeg_bytes(40, 20);
        let image = backend.decode(&bytes).unwrap();
        let oriented = backend.auto_orient(image, &bytes);
        assert!(!oriented.transformed);
        assert_eq!(backend.dimensions(&oriented.image), Dimensions::new(40, 20));
    }

    #[test]
    fn quarter_turn_orientations_swap_axes() {
        for orientation in [5, 6, 7, 8] {
            let rotated = apply_orientation(gradient_image(40, 20), orientation);
            assert_eq!(rotated.dimensions(), (20, 40), "orientation {orientation}");
        }
        for orientation in [1, 2, 3, 4] {
            let kept = apply_orientation(gradient_image(40, 20), orientation);
            assert_eq!(kept.dimensions(), (40, 20), "orientation {orientation}");
        }
    }

    #[test]
    fn resize_inside_fits_box() {
        let backend = RustBackend::new();
        let resized = backend
            .resize(
                &gradient_image(400, 300),
                &ResizeParams::new(100, 100, Fit::Inside),
            )
            .unwrap();
        assert_eq!(resized.dimensions(), (100, 75));
    }

    #[test]
    fn resize_outside_covers_box() {
        let backend = RustBackend::new();
        let resized = backend
            .resize(
                &gradient_image(400, 300),
                &ResizeParams::new(100, 100, Fit::Outside),
            )
            .unwrap();
        assert_eq!(resized.dimensions(), (133, 100));
    }

    #[test]
    fn resize_cover_is_exact() {
        let backend = RustBackend::new();
        for (w, h) in [(100, 100), (50, 120), (399, 1)] {
            let resized = backend
                .resize(&gradient_image(400, 300), &ResizeParams::new(w, h, Fit::Cover))
                .unwrap();
            assert_eq!(resized.dimensions(), (w, h));
        }
    }

    #[test]
    fn resize_rejects_zero_target() {
        let backend = RustBackend::new();
        let result = backend.resize(&gradient_image(10, 10), &ResizeParams::new(0, 5, Fit::Inside));
        assert!(result.is_err());
    }

    #[test]
    fn encode_every_raster_format() {
        let backend = RustBackend::new();
        let image = gradient_image(32, 24);
        for format in [
            VariantFormat::Jpeg,
            VariantFormat::Png,
            VariantFormat::Gif,
            VariantFormat::Webp,
            VariantFormat::Tiff,
        ] {
            let bytes = backend.encode(&image, format, Quality::default()).unwrap();
            let decoded = backend.decode(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (32, 24), "{format}");
        }
    }

    #[test]
    fn encode_jpeg_drops_alpha() {
        let backend = RustBackend::new();
        let image = backend.decode(&png_bytes(16, 16)).unwrap();
        let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
        let bytes = backend
            .encode(&rgba, VariantFormat::Jpeg, Quality::new(90))
            .unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn encode_svg_is_unsupported() {
        let backend = RustBackend::new();
        let result = backend.encode(&gradient_image(4, 4), VariantFormat::Svg, Quality::default());
        assert!(matches!(
            result,
            Err(BackendError::UnsupportedEncoding(VariantFormat::Svg))
        ));
    }

    #[test]
    fn encode_is_deterministic() {
        let backend = RustBackend::new();
        let image = gradient_image(64, 48);
        let a = backend.encode(&image, VariantFormat::Jpeg, Quality::default()).unwrap();
        let b = backend.encode(&image, VariantFormat::Jpeg, Quality::default()).unwrap();
        assert_eq!(a, b);
    }
}
