//! Response builder.
//!
//! Rewrites the origin response into what the edge should serve. Every
//! builder method consumes the response and returns the rewritten value;
//! fields it does not touch (e.g. unrelated headers) carry over.

use crate::event::{BodyEncoding, HeaderEntry, Response};
use crate::imaging::Variant;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

pub const TEXT_PLAIN: &str = "text/plain";

/// Body of the 403 for a path without a size token.
pub const UNSUPPORTED_URI: &str = "Unsupported URI";
/// Body of the 403 for an extension outside the accepted set.
pub const UNSUPPORTED_IMAGE_TYPE: &str = "Unsupported image type";
/// Body of the 404 for a missing or empty source.
pub const IMAGE_NOT_FOUND: &str = "The image does not exist.";

impl Response {
    /// First value of header `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|entries| entries.first())
            .map(|entry| entry.value.as_str())
    }

    /// Replace header `name` with a single value.
    ///
    /// The map key is the lowercase name; the entry keeps `name` as given.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(
            name.to_ascii_lowercase(),
            vec![HeaderEntry {
                key: Some(name.to_string()),
                value: value.to_string(),
            }],
        );
        self
    }

    /// Plain-text body with the given status line.
    pub fn with_text(mut self, status: u16, description: &str, body: &str) -> Self {
        self.status = status;
        self.status_description = description.to_string();
        self.body = Some(body.to_string());
        self.body_encoding = None;
        self.with_header("Content-Type", TEXT_PLAIN)
    }

    pub fn forbidden(self, body: &str) -> Self {
        self.with_text(403, "Forbidden", body)
    }

    pub fn not_found(self) -> Self {
        self.with_text(404, "Not Found", IMAGE_NOT_FOUND)
    }

    /// `200 OK` carrying the variant as a base64 body.
    pub fn with_image(mut self, variant: &Variant) -> Self {
        self.status = 200;
        self.status_description = "OK".to_string();
        self.body = Some(STANDARD.encode(&variant.bytes));
        self.body_encoding = Some(BodyEncoding::Base64);
        self.with_header("Content-Type", variant.format.content_type())
            .with_header("ETag", &etag(&variant.bytes))
    }
}

/// Strong entity tag: quoted hex SHA-256 of the body.
pub fn etag(bytes: &[u8]) -> String {
    format!("\"{:x}\"", Sha256::digest(bytes))
}
