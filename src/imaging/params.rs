//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what geometry a variant needs) and the
//! [`backend`](super::backend) (which does the actual pixel work). This
//! separation allows swapping backends (e.g. for testing with a mock) without
//! changing the planning logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`Fit`]: How a resize relates the source aspect ratio to the target box.
//! - [`ResizeParams`]: Target box plus fit mode for a single resize pass.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Fit mode of a resize pass. All modes preserve the source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fit {
    /// Both axes end up `<=` the box; one may fall short.
    Inside,
    /// Both axes end up `>=` the box; one may overshoot.
    Outside,
    /// Exactly the box; the overshooting axis is center-cropped.
    Cover,
}

/// Parameters for a single resize pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
    pub fit: Fit,
}

impl ResizeParams {
    pub fn new(width: u32, height: u32, fit: Fit) -> Self {
        Self { width, height, fit }
    }
}
