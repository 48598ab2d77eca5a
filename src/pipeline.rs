//! The resize pipeline: one trigger event in, one response out.
//!
//! ```text
//! status gate → decode/validate → fetch source → render variant → cache write → response
//! ```
//!
//! [`Resizer::process`] runs the stages and maps client-visible failures to
//! 403/404 responses. Everything else comes back as a [`ResizeError`];
//! [`Resizer::handle`] is the fail-open boundary that logs it and serves the
//! origin response untouched.

use crate::config::ResizerConfig;
use crate::event::{Request, Response};
use crate::imaging::{
    BackendError, ImageBackend, Variant, VariantConfig, VariantError, render_variant,
};
use crate::request::{RequestError, ResizeSpec, decode_request};
use crate::response::{UNSUPPORTED_IMAGE_TYPE, UNSUPPORTED_URI};
use crate::storage::{BlobStore, PutObject, StoreError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("unsupported URI: {0}")]
    UnsupportedUri(String),
    #[error("unsupported image type: {0:?}")]
    UnsupportedImageType(String),
    #[error("source image does not exist: {0}")]
    SourceNotFound(String),
    #[error("failed to fetch source {key}: {source}")]
    SourceFetch {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("imaging failed: {0}")]
    Imaging(#[from] BackendError),
    #[error(
        "variant still {encoded_len} base64 bytes after {iterations} shrink passes (ceiling {ceiling})"
    )]
    EncodingSizeUnresolvable {
        iterations: u32,
        encoded_len: usize,
        ceiling: usize,
    },
    #[error("failed to cache variant {key}: {source}")]
    CacheWrite {
        key: String,
        #[source]
        source: StoreError,
    },
}

impl From<RequestError> for ResizeError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::UnsupportedUri(uri) => ResizeError::UnsupportedUri(uri),
            RequestError::UnsupportedImageType(ext) => ResizeError::UnsupportedImageType(ext),
        }
    }
}

impl From<VariantError> for ResizeError {
    fn from(err: VariantError) -> Self {
        match err {
            VariantError::Backend(e) => ResizeError::Imaging(e),
            VariantError::SizeUnresolvable {
                iterations,
                encoded_len,
                ceiling,
            } => ResizeError::EncodingSizeUnresolvable {
                iterations,
                encoded_len,
                ceiling,
            },
        }
    }
}

/// Outcome of a successful render.
#[derive(Debug)]
pub struct Resized {
    pub spec: ResizeSpec,
    pub variant: Variant,
    /// False when the write was skipped or failed.
    pub cached: bool,
}

/// Pipeline over an image backend and a blob store.
pub struct Resizer<B: ImageBackend, S: BlobStore> {
    backend: B,
    store: S,
    config: ResizerConfig,
    variant_config: VariantConfig,
}

impl<B: ImageBackend, S: BlobStore> Resizer<B, S> {
    pub fn new(backend: B, store: S, config: ResizerConfig) -> Self {
        let variant_config = config.variant_config();
        Self {
            backend,
            store,
            config,
            variant_config,
        }
    }

    pub fn config(&self) -> &ResizerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether an origin status means the variant has not been generated yet.
    pub fn is_cache_miss(&self, status: u16) -> bool {
        self.config.response.cache_miss_statuses.contains(&status)
    }

    /// Handle one event. Never fails: on any unexpected error the origin
    /// response is returned as received.
    pub fn handle(&self, request: &Request, response: Response) -> Response {
        match self.process(request, response.clone()) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                let key = decode_request(&request.uri, &self.config.resize)
                    .map(|spec| spec.base_key)
                    .unwrap_or_default();
                error!(uri = %request.uri, %key, error = %e, "resize failed, serving origin response");
                response
            }
        }
    }

    /// Run the pipeline, rewriting `response` for the cases the requester
    /// should see (variant, 403, 404).
    pub fn process(&self, request: &Request, response: Response) -> Result<Response, ResizeError> {
        if !self.is_cache_miss(response.status) {
            debug!(uri = %request.uri, status = response.status, "not a cache miss, passing through");
            return Ok(response);
        }
        info!(uri = %request.uri, status = response.status, "cache miss");

        match self.resize(&request.uri) {
            Ok(resized) => Ok(response.with_image(&resized.variant)),
            Err(ResizeError::UnsupportedUri(uri)) => {
                warn!(%uri, "no size token in path");
                Ok(response.forbidden(UNSUPPORTED_URI))
            }
            Err(ResizeError::UnsupportedImageType(ext)) => {
                warn!(uri = %request.uri, extension = %ext, "unsupported image type");
                Ok(response.forbidden(UNSUPPORTED_IMAGE_TYPE))
            }
            Err(ResizeError::SourceNotFound(key)) => {
                warn!(%key, "source image does not exist");
                Ok(response.not_found())
            }
            Err(e) => Err(e),
        }
    }

    /// Decode `uri`, render the variant, and write it back to the store.
    ///
    /// A failed cache write is logged and reported through
    /// [`Resized::cached`]; it never fails the call.
    pub fn resize(&self, uri: &str) -> Result<Resized, ResizeError> {
        let spec = decode_request(uri, &self.config.resize)?;
        let source = self.fetch_source(&spec.base_key)?;
        let variant = render_variant(&self.backend, &source, &spec, &self.variant_config)?;
        info!(
            key = %spec.requested_key,
            width = variant.width,
            height = variant.height,
            bytes = variant.byte_size(),
            shrink_passes = variant.shrink_passes,
            "rendered variant"
        );

        let cached = if variant.byte_size() == source.len() {
            debug!(key = %spec.requested_key, "variant unchanged from source, not caching");
            false
        } else {
            match self.save(&spec, &variant) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "cache write failed");
                    false
                }
            }
        };

        Ok(Resized {
            spec,
            variant,
            cached,
        })
    }

    fn fetch_source(&self, key: &str) -> Result<Vec<u8>, ResizeError> {
        match self.store.get(key) {
            Ok(bytes) if bytes.is_empty() => Err(ResizeError::SourceNotFound(key.to_string())),
            Ok(bytes) => Ok(bytes),
            Err(StoreError::NotFound(_)) => Err(ResizeError::SourceNotFound(key.to_string())),
            Err(source) => Err(ResizeError::SourceFetch {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn save(&self, spec: &ResizeSpec, variant: &Variant) -> Result<(), ResizeError> {
        let object = PutObject {
            body: variant.bytes.clone(),
            content_type: variant.format.content_type().to_string(),
            cache_control: self.config.storage.cache_control(),
            storage_class: self.config.storage.storage_class.clone(),
        };
        self.store
            .put(&spec.requested_key, object)
            .map_err(|source| ResizeError::CacheWrite {
                key: spec.requested_key.clone(),
                source,
            })?;
        info!(key = %spec.requested_key, "saved variant");
        Ok(())
    }
}
