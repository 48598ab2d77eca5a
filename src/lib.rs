//! # Edge Resize
//!
//! On-demand image variants for a CDN. Only canonical images are uploaded;
//! every other size is generated the first time somebody asks for it.
//!
//! # How a Variant Comes to Exist
//!
//! A viewer requests `/photo-800x600c.jpg`. The CDN misses its cache, asks
//! the origin bucket, and the bucket answers 403/404 because nobody ever
//! stored that file. The origin-response hook hands that miss to the
//! resizer:
//!
//! ```text
//! 1. Gate      status 403/404?           otherwise pass the response through
//! 2. Decode    photo-800x600c.jpg      →  source photo.jpg, box 800x600, crop
//! 3. Fetch     photo.jpg from the bucket
//! 4. Render    orient → resize → encode, shrinking until the body fits
//! 5. Cache     write photo-800x600c.jpg back to the bucket
//! 6. Respond   200 with the variant as a base64 body
//! ```
//!
//! The next request for the same URI is a plain bucket hit.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | The [`Resizer`](pipeline::Resizer): gate, stages, error taxonomy, fail-open boundary |
//! | [`request`] | URI → [`ResizeSpec`](request::ResizeSpec): size token parsing and format validation |
//! | [`imaging`] | Resize planning, size-bounded encoding, the [`ImageBackend`](imaging::ImageBackend) trait |
//! | [`storage`] | [`BlobStore`](storage::BlobStore) trait with filesystem and in-memory stores |
//! | [`event`] | Trigger event envelope (CloudFront origin-response shape) |
//! | [`response`] | Response builder: image, 403 and 404 bodies |
//! | [`config`] | `config.toml` loading, validation, and merging over stock defaults |
//! | [`batch`] | Parallel replay of a directory of event files |
//! | [`types`] | Variant formats and their content types |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Fail Open
//!
//! Anything that goes wrong after the request has been accepted (a storage
//! outage, a corrupt source, an image that will not fit the response
//! ceiling) returns the origin's own miss response. The viewer sees the 404
//! they would have seen without the resizer, and the log has the key. Only
//! requests that can never succeed get a rewritten 403/404.
//!
//! ## Response Size Ceiling
//!
//! Edge hooks cap the size of a generated body, and the body is base64. The
//! encoder measures the base64 length and downsizes by
//! `sqrt(len / ceiling) * 1.2` per pass until it fits, with a floor and an
//! iteration cap so a pathological codec cannot loop forever.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resizing and encoding use the `image` crate (Lanczos3), with
//! EXIF orientation read by `kamadak-exif`. No system libraries: the binary
//! runs as-is in any sandbox the edge provides.

pub mod batch;
pub mod config;
pub mod event;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
