//! Blob store: the only durable state of the resizer.
//!
//! Storage is an opaque key/value store keyed by path string, overwrite-only.
//! Canonical sources and generated variants live side by side in one bucket;
//! a variant key is its source key plus the size token.
//!
//! Two implementations ship with the crate:
//!
//! - [`FsBlobStore`]: one directory per bucket, object bodies as plain files,
//!   write attributes (content type, cache control, storage class) in a
//!   `<key>.meta.json` sidecar.
//! - [`MemoryBlobStore`]: an in-process map, for embedding and tests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

/// Suffix of the attribute sidecar written next to each object.
const META_SUFFIX: &str = ".meta.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid object key: {0:?}")]
    InvalidKey(String),
    #[error("IO error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("object metadata error on {key}: {source}")]
    Metadata {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A write request: body plus the attributes stored with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
    pub storage_class: String,
}

/// Attributes persisted with an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub content_type: String,
    pub cache_control: String,
    pub storage_class: String,
    pub content_length: usize,
}

impl PutObject {
    fn meta(&self) -> ObjectMeta {
        ObjectMeta {
            content_type: self.content_type.clone(),
            cache_control: self.cache_control.clone(),
            storage_class: self.storage_class.clone(),
            content_length: self.body.len(),
        }
    }
}

/// Key/value blob storage.
///
/// `get` returns [`StoreError::NotFound`] for a missing key; every other
/// error is a transport/storage failure.
pub trait BlobStore: Sync {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    fn put(&self, key: &str, object: PutObject) -> Result<(), StoreError>;
}

// =============================================================================
// Filesystem store
// =============================================================================

/// Blob store backed by a directory tree: `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl AsRef<Path>, bucket: &str) -> Self {
        Self {
            dir: root.as_ref().join(bucket),
        }
    }

    /// Directory holding the bucket's objects.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a key to a path inside the bucket.
    ///
    /// Keys are relative paths; anything that could escape the bucket
    /// directory is rejected.
    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && !key.ends_with(META_SUFFIX)
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(relative))
    }

    /// Read the attributes stored with `key`.
    pub fn meta(&self, key: &str) -> Result<ObjectMeta, StoreError> {
        let path = sidecar_path(&self.object_path(key)?);
        let content = std::fs::read(&path).map_err(|e| io_error(key, e))?;
        serde_json::from_slice(&content).map_err(|source| StoreError::Metadata {
            key: key.to_string(),
            source,
        })
    }
}

fn sidecar_path(object: &Path) -> PathBuf {
    let mut name = object.as_os_str().to_os_string();
    name.push(META_SUFFIX);
    PathBuf::from(name)
}

fn io_error(key: &str, source: io::Error) -> StoreError {
    if source.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(key.to_string())
    } else {
        StoreError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(key)?;
        std::fs::read(&path).map_err(|e| io_error(key, e))
    }

    fn put(&self, key: &str, object: PutObject) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                key: key.to_string(),
                source,
            })?;
        }
        let meta = serde_json::to_vec_pretty(&object.meta()).map_err(|source| {
            StoreError::Metadata {
                key: key.to_string(),
                source,
            }
        })?;
        std::fs::write(&path, &object.body).map_err(|source| StoreError::Io {
            key: key.to_string(),
            source,
        })?;
        std::fs::write(sidecar_path(&path), meta).map_err(|source| StoreError::Io {
            key: key.to_string(),
            source,
        })
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Blob store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, (Vec<u8>, Option<ObjectMeta>)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without attributes (e.g. a canonical upload).
    pub fn insert(&self, key: &str, body: Vec<u8>) {
        self.objects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), (body, None));
    }

    /// Attributes of an object written through [`BlobStore::put`].
    pub fn meta(&self, key: &str) -> Option<ObjectMeta> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .and_then(|(_, meta)| meta.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .map(|(body, _)| body.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, object: PutObject) -> Result<(), StoreError> {
        let meta = object.meta();
        self.objects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), (object.body, Some(meta)));
        Ok(())
    }
}
