//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the codec capability the pipeline needs:
//! decode, auto-orient, measure, resize with a fit mode, and encode. Images
//! stay in the backend's own representation between calls (an associated
//! type), so the planner never touches pixels.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and statically
//! linked.

use super::params::{Quality, ResizeParams};
use crate::types::VariantFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to decode source image: {0}")]
    Decode(String),
    #[error("Cannot encode {0} variants")]
    UnsupportedEncoding(VariantFormat),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel geometry of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Result of auto-orientation.
///
/// `transformed` is false when the source was already upright, which lets the
/// planner serve untouched sources byte for byte.
#[derive(Debug, Clone)]
pub struct Oriented<I> {
    pub image: I,
    pub transformed: bool,
}

/// Trait for image codec backends.
pub trait ImageBackend: Sync {
    /// Backend-native decoded image.
    type Image;

    /// Decode raw source bytes.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Image, BackendError>;

    /// Apply the orientation recorded in the source's embedded metadata.
    fn auto_orient(&self, image: Self::Image, source: &[u8]) -> Oriented<Self::Image>;

    /// Current pixel geometry.
    fn dimensions(&self, image: &Self::Image) -> Dimensions;

    /// Produce a resized copy according to `params.fit`.
    fn resize(&self, image: &Self::Image, params: &ResizeParams)
    -> Result<Self::Image, BackendError>;

    /// Encode into the requested format.
    fn encode(
        &self,
        image: &Self::Image,
        format: VariantFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::calculations::{calculate_fill_dimensions, calculate_inside_dimensions};
    use crate::imaging::params::Fit;
    use std::sync::Mutex;

    /// Mock backend whose images are pure geometry.
    ///
    /// Encoded size is `width * height * bytes_per_pixel + overhead`, which
    /// makes the size-bounded loop deterministic. Uses Mutex (not RefCell) so
    /// it is Sync like the real backend.
    pub struct MockBackend {
        pub source: Dimensions,
        /// When true, auto-orient swaps the axes (EXIF 90° rotation).
        pub rotated: bool,
        pub bytes_per_pixel: f64,
        pub overhead: usize,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(usize),
        AutoOrient { transformed: bool },
        Resize { width: u32, height: u32, fit: Fit },
        Encode { width: u32, height: u32, format: VariantFormat },
    }

    impl MockBackend {
        pub fn with_dimensions(width: u32, height: u32) -> Self {
            Self {
                source: Dimensions::new(width, height),
                rotated: false,
                bytes_per_pixel: 0.1,
                overhead: 0,
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn rotated(mut self) -> Self {
            self.rotated = true;
            self
        }

        pub fn bytes_per_pixel(mut self, bpp: f64) -> Self {
            self.bytes_per_pixel = bpp;
            self
        }

        pub fn overhead(mut self, bytes: usize) -> Self {
            self.overhead = bytes;
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn resizes(&self) -> Vec<RecordedOp> {
            self.get_operations()
                .into_iter()
                .filter(|op| matches!(op, RecordedOp::Resize { .. }))
                .collect()
        }

        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }
    }

    impl ImageBackend for MockBackend {
        type Image = Dimensions;

        fn decode(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
            self.record(RecordedOp::Decode(bytes.len()));
            Ok(self.source)
        }

        fn auto_orient(&self, image: Dimensions, _source: &[u8]) -> Oriented<Dimensions> {
            self.record(RecordedOp::AutoOrient {
                transformed: self.rotated,
            });
            let image = if self.rotated {
                Dimensions::new(image.height, image.width)
            } else {
                image
            };
            Oriented {
                image,
                transformed: self.rotated,
            }
        }

        fn dimensions(&self, image: &Dimensions) -> Dimensions {
            *image
        }

        fn resize(
            &self,
            image: &Dimensions,
            params: &ResizeParams,
        ) -> Result<Dimensions, BackendError> {
            self.record(RecordedOp::Resize {
                width: params.width,
                height: params.height,
                fit: params.fit,
            });
            let target = (params.width, params.height);
            let (w, h) = match params.fit {
                Fit::Inside => calculate_inside_dimensions(image.as_tuple(), target),
                Fit::Outside => calculate_fill_dimensions(image.as_tuple(), target),
                Fit::Cover => target,
            };
            Ok(Dimensions::new(w, h))
        }

        fn encode(
            &self,
            image: &Dimensions,
            format: VariantFormat,
            _quality: Quality,
        ) -> Result<Vec<u8>, BackendError> {
            self.record(RecordedOp::Encode {
                width: image.width,
                height: image.height,
                format,
            });
            let pixels = image.width as f64 * image.height as f64;
            let len = (pixels * self.bytes_per_pixel) as usize + self.overhead;
            Ok(vec![0u8; len])
        }
    }

    #[test]
    fn mock_records_decode_and_orient() {
        let backend = MockBackend::with_dimensions(800, 600).rotated();

        let image = backend.decode(&[1, 2, 3]).unwrap();
        let oriented = backend.auto_orient(image, &[1, 2, 3]);
        assert_eq!(oriented.image, Dimensions::new(600, 800));
        assert!(oriented.transformed);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], RecordedOp::Decode(3)));
    }

    #[test]
    fn mock_resize_follows_fit_mode() {
        let backend = MockBackend::with_dimensions(1600, 1200);
        let source = Dimensions::new(1600, 1200);

        let inside = backend
            .resize(&source, &ResizeParams::new(800, 800, Fit::Inside))
            .unwrap();
        assert_eq!(inside, Dimensions::new(800, 600));

        let outside = backend
            .resize(&source, &ResizeParams::new(800, 800, Fit::Outside))
            .unwrap();
        assert_eq!(outside, Dimensions::new(1067, 800));

        let cover = backend
            .resize(&source, &ResizeParams::new(800, 800, Fit::Cover))
            .unwrap();
        assert_eq!(cover, Dimensions::new(800, 800));
    }

    #[test]
    fn mock_encode_size_scales_with_area() {
        let backend = MockBackend::with_dimensions(100, 100)
            .bytes_per_pixel(2.0)
            .overhead(10);
        let bytes = backend
            .encode(
                &Dimensions::new(100, 50),
                VariantFormat::Png,
                Quality::default(),
            )
            .unwrap();
        assert_eq!(bytes.len(), 10_010);
    }
}
