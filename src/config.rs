//! Resizer configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by whatever the user file specifies; everything else keeps its
//! default.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! bucket = "images"             # Bucket / store identifier
//! root = "store"                # Directory holding the local blob store
//! cache_max_age = 15552000      # Cache-Control max-age of written variants (180 days)
//! storage_class = "STANDARD"    # Storage class of written variants
//!
//! [resize]
//! default_max_width = 3840      # Width used when the request says 0
//! default_max_height = 2160     # Height used when the request says 0
//! formats = ["jpeg", "png", "gif", "webp", "svg", "tiff"]
//! quality = 80                  # JPEG quality (1-100)
//! max_output_pixels = 100000000 # Largest buffer one resize pass may allocate
//!
//! [response]
//! max_body_bytes = 1000000      # Ceiling on the base64 response body
//! max_iterations = 10           # Shrink passes before giving up
//! min_dimension = 1             # Geometry floor while shrinking
//! cache_miss_statuses = [403, 404]
//!
//! [processing]
//! max_processes = 4             # Batch workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Quality, VariantConfig};
use crate::types::VariantFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Resizer configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizerConfig {
    /// Blob store location and write attributes.
    pub storage: StorageConfig,
    /// Request decoding defaults and accepted formats.
    pub resize: ResizeConfig,
    /// Status gate and response size ceiling.
    pub response: ResponseConfig,
    /// Parallel batch settings.
    pub processing: ProcessingConfig,
}

impl ResizerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.bucket must not be empty".into(),
            ));
        }
        if self.storage.storage_class.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.storage_class must not be empty".into(),
            ));
        }
        if self.resize.default_max_width == 0 || self.resize.default_max_height == 0 {
            return Err(ConfigError::Validation(
                "resize.default_max_width and default_max_height must be non-zero".into(),
            ));
        }
        if self.resize.formats.is_empty() {
            return Err(ConfigError::Validation(
                "resize.formats must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&self.resize.quality) {
            return Err(ConfigError::Validation(
                "resize.quality must be 1-100".into(),
            ));
        }
        if self.resize.max_output_pixels == 0 {
            return Err(ConfigError::Validation(
                "resize.max_output_pixels must be non-zero".into(),
            ));
        }
        if self.response.max_body_bytes == 0 {
            return Err(ConfigError::Validation(
                "response.max_body_bytes must be non-zero".into(),
            ));
        }
        if self.response.min_dimension == 0 {
            return Err(ConfigError::Validation(
                "response.min_dimension must be at least 1".into(),
            ));
        }
        if self.response.cache_miss_statuses.is_empty() {
            return Err(ConfigError::Validation(
                "response.cache_miss_statuses must not be empty".into(),
            ));
        }
        if let Some(status) = self
            .response
            .cache_miss_statuses
            .iter()
            .find(|s| !(100..=599).contains(*s))
        {
            return Err(ConfigError::Validation(format!(
                "response.cache_miss_statuses: {status} is not an HTTP status"
            )));
        }
        Ok(())
    }

    /// Settings for the size-bounded encoder.
    pub fn variant_config(&self) -> VariantConfig {
        VariantConfig {
            quality: Quality::new(self.resize.quality),
            max_body_bytes: self.response.max_body_bytes,
            max_iterations: self.response.max_iterations,
            min_dimension: self.response.min_dimension,
            max_output_pixels: self.resize.max_output_pixels,
        }
    }
}

/// Blob store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Bucket holding both canonical sources and variants.
    pub bucket: String,
    /// Root directory of the filesystem store; the bucket is a directory under it.
    pub root: String,
    /// `Cache-Control: max-age` seconds attached to written variants.
    pub cache_max_age: u64,
    /// Storage class attached to written variants.
    pub storage_class: String,
}

impl StorageConfig {
    /// `Cache-Control` value for written variants.
    pub fn cache_control(&self) -> String {
        format!("max-age={}", self.cache_max_age)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "images".to_string(),
            root: "store".to_string(),
            cache_max_age: 15_552_000,
            storage_class: "STANDARD".to_string(),
        }
    }
}

/// Request decoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    /// Box width used when a request asks for width 0.
    pub default_max_width: u32,
    /// Box height used when a request asks for height 0.
    pub default_max_height: u32,
    /// Formats a variant may be requested in.
    pub formats: Vec<VariantFormat>,
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Pixel ceiling for the buffer of a single resize pass.
    pub max_output_pixels: u64,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            default_max_width: 3840,
            default_max_height: 2160,
            formats: VariantFormat::ALL.to_vec(),
            quality: 80,
            max_output_pixels: 100_000_000,
        }
    }
}

/// Status gate and response size settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResponseConfig {
    /// Ceiling on the base64-encoded response body, in bytes.
    pub max_body_bytes: usize,
    /// Shrink passes allowed before the variant is given up on.
    pub max_iterations: u32,
    /// Smallest width/height a shrink pass may produce.
    pub min_dimension: u32,
    /// Origin statuses that mean "variant not generated yet".
    pub cache_miss_statuses: Vec<u16>,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1_000_000,
            max_iterations: 10,
            min_dimension: 1,
            cache_miss_statuses: vec![403, 404],
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ResizerConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ResizerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ResizerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the TOML file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<ResizerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# edge-resize Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Blob store
# ---------------------------------------------------------------------------
[storage]
# Bucket holding canonical sources and generated variants.
bucket = "images"

# Root directory of the local store. Objects live under <root>/<bucket>/.
root = "store"

# Cache-Control max-age (seconds) attached to written variants. 180 days.
cache_max_age = 15552000

# Storage class attached to written variants.
storage_class = "STANDARD"

# ---------------------------------------------------------------------------
# Request decoding
# ---------------------------------------------------------------------------
[resize]
# Box used for an axis requested as 0 (e.g. photo-0x600.jpg).
default_max_width = 3840
default_max_height = 2160

# Formats a variant may be requested in. "jpg" is accepted for "jpeg".
formats = ["jpeg", "png", "gif", "webp", "svg", "tiff"]

# JPEG encoding quality (1 = worst, 100 = best).
quality = 80

# Largest pixel buffer a single resize pass may allocate (width x height).
# Requests needing more (e.g. photo-4000000000x10c.jpg) fail open.
max_output_pixels = 100000000

# ---------------------------------------------------------------------------
# Response
# ---------------------------------------------------------------------------
[response]
# Ceiling on the base64-encoded response body, in bytes.
max_body_bytes = 1000000

# Shrink passes allowed when a variant is over the ceiling.
max_iterations = 10

# Smallest width/height a shrink pass may produce.
min_dimension = 1

# Origin statuses that trigger variant generation.
cache_miss_statuses = [403, 404]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for the batch command.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
