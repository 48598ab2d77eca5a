//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `String`/`Vec<String>`) for
//! testability; `main` does the printing. Format functions are pure.
//!
//! # Batch
//!
//! One line per event as it completes, then a summary:
//!
//! ```text
//! served     200  /photo-800x600c.jpg        (events/photo.json)
//! rejected   403  /photo.bmp                 (events/bmp.json)
//! passed     404  /missing-10x10.jpg         (events/missing.json)
//! failed          events/broken.json: JSON error: expected value at line 1 column 1
//!
//! 4 events: 1 served, 1 rejected, 1 passed through, 1 failed
//! ```
//!
//! A failed-open event reports `passed`: the origin response went back
//! untouched. The reason is in the log.

use crate::batch::{BatchSummary, EventReport, Outcome};
use std::path::Path;

fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Served => "served",
        Outcome::Rejected => "rejected",
        Outcome::PassedThrough => "passed",
        Outcome::Failed(_) => "failed",
    }
}

fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// One progress line for a completed event. Paths are shown relative to `root`.
pub fn format_event_report(report: &EventReport, root: &Path) -> String {
    let label = outcome_label(&report.outcome);
    let path = display_path(&report.event_path, root);
    match &report.outcome {
        Outcome::Failed(reason) => format!("{label:<10} {:<4} {path}: {reason}", ""),
        _ => {
            let status = report.status.map(|s| s.to_string()).unwrap_or_default();
            let uri = report.uri.as_deref().unwrap_or("");
            format!("{label:<10} {status:<4} {uri:<26} ({path})")
        }
    }
}

pub fn format_batch_summary(summary: &BatchSummary) -> String {
    let noun = if summary.total() == 1 { "event" } else { "events" };
    format!(
        "{} {noun}: {} served, {} rejected, {} passed through, {} failed",
        summary.total(),
        summary.served,
        summary.rejected,
        summary.passed_through,
        summary.failed
    )
}
