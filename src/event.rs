//! Trigger event envelope.
//!
//! The resizer runs as an origin-response hook: the edge hands over the
//! viewer's request and the origin's response, and expects a (possibly
//! rewritten) response back. The JSON shape follows the CloudFront
//! origin-response event:
//!
//! ```json
//! {
//!   "Records": [{
//!     "cf": {
//!       "request": { "uri": "/photo-800x600c.jpg" },
//!       "response": {
//!         "status": "404",
//!         "statusDescription": "Not Found",
//!         "headers": { "content-type": [{ "key": "Content-Type", "value": "text/html" }] }
//!       }
//!     }
//!   }]
//! }
//! ```
//!
//! Unknown request/response fields are ignored on input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event has no records")]
    NoRecords,
}

/// Header map keyed by lowercase header name.
pub type Headers = BTreeMap<String, Vec<HeaderEntry>>;

/// One header value with its original-case name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

/// The viewer request that missed the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    Text,
    Base64,
}

/// The origin response, and the value the resizer hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(with = "status_code")]
    pub status: u16,
    #[serde(default)]
    pub status_description: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_encoding: Option<BodyEncoding>,
}

impl Response {
    pub fn new(status: u16, status_description: &str) -> Self {
        Self {
            status,
            status_description: status_description.to_string(),
            headers: Headers::new(),
            body: None,
            body_encoding: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfPayload {
    pub request: Request,
    pub response: Response,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub cf: CfPayload,
}

/// Full trigger event as delivered by the edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "Records")]
    pub records: Vec<EventRecord>,
}

impl TriggerEvent {
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Request and response of the first record; the edge sends exactly one.
    pub fn into_parts(self) -> Result<(Request, Response), EventError> {
        let record = self.records.into_iter().next().ok_or(EventError::NoRecords)?;
        Ok((record.cf.request, record.cf.response))
    }
}

/// Status codes arrive as strings (`"404"`) from the edge but are numbers
/// everywhere else. Accept both, emit the string form.
mod status_code {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(status: &u16, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&status.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u16),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        }
    }
}
