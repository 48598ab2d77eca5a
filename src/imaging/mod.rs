//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with format sniffing |
//! | **Orientation** | `kamadak-exif` orientation tag |
//! | **Resize** | Lanczos3 `resize_exact`, centered `crop_imm` for cover |
//! | **Encode** | `JpegEncoder` with quality, `write_to` for lossless formats |
//! | **Size ceiling** | iterative shrink measured on the base64 length |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Resize planning and the size-bounded encoder

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, Oriented};
pub use calculations::{calculate_fill_dimensions, calculate_inside_dimensions};
pub use operations::{
    ResizePlan, Variant, VariantConfig, VariantError, base64_len, plan_resize, render_variant,
};
pub use params::{Fit, Quality, ResizeParams};
pub use rust_backend::RustBackend;
