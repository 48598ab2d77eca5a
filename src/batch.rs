//! Batch replay of trigger events.
//!
//! Walks a directory for `*.json` event files, runs each through the
//! [`Resizer`] on the rayon pool, and writes the resulting response next to
//! the event as `<name>.response.json`.
//!
//! ```text
//! events/
//! ├── photo-800x600c.json             # input event
//! ├── photo-800x600c.response.json    # written by the batch
//! └── nested/thumb-0x200.json
//! ```
//!
//! Each event is independent; one unreadable or malformed file is reported
//! and the rest of the batch carries on.

use crate::event::{EventError, Response, TriggerEvent};
use crate::imaging::ImageBackend;
use crate::pipeline::Resizer;
use crate::storage::BlobStore;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

const RESPONSE_SUFFIX: &str = ".response.json";

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to walk event directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the resizer did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A variant was rendered and returned.
    Served,
    /// Rewritten to a 403/404.
    Rejected,
    /// Origin response returned as received (not a miss, or failed open).
    PassedThrough,
    /// The event file itself could not be processed.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct EventReport {
    pub event_path: PathBuf,
    pub uri: Option<String>,
    pub status: Option<u16>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub served: usize,
    pub rejected: usize,
    pub passed_through: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Served => self.served += 1,
            Outcome::Rejected => self.rejected += 1,
            Outcome::PassedThrough => self.passed_through += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.served + self.rejected + self.passed_through + self.failed
    }
}

/// Event files under `dir`, sorted. Previously written responses are skipped.
pub fn collect_events(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut events = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.ends_with(".json") && !name.ends_with(RESPONSE_SUFFIX) {
            events.push(entry.into_path());
        }
    }
    events.sort();
    Ok(events)
}

/// Path the response for `event_path` is written to.
pub fn response_path(event_path: &Path) -> PathBuf {
    let stem = event_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    event_path.with_file_name(format!("{stem}{RESPONSE_SUFFIX}"))
}

fn classify(original: &Response, rewritten: &Response) -> Outcome {
    if original == rewritten {
        Outcome::PassedThrough
    } else if rewritten.status == 200 {
        Outcome::Served
    } else {
        Outcome::Rejected
    }
}

/// Parse one event file, run it, and write the response file.
pub fn handle_event_file<B: ImageBackend, S: BlobStore>(
    resizer: &Resizer<B, S>,
    event_path: &Path,
) -> Result<(String, Response, Outcome), BatchError> {
    let json = std::fs::read_to_string(event_path)?;
    let (request, response) = TriggerEvent::from_json(&json)?.into_parts()?;
    let rewritten = resizer.handle(&request, response.clone());
    let outcome = classify(&response, &rewritten);
    std::fs::write(
        response_path(event_path),
        serde_json::to_string_pretty(&rewritten)?,
    )?;
    Ok((request.uri, rewritten, outcome))
}

/// Run every event in parallel. Reports stream through `progress` as they
/// complete; the summary counts all of them.
pub fn run_batch<B: ImageBackend, S: BlobStore>(
    resizer: &Resizer<B, S>,
    events: &[PathBuf],
    progress: Option<Sender<EventReport>>,
) -> BatchSummary {
    let reports: Vec<EventReport> = events
        .par_iter()
        .map_with(progress, |progress, path| {
            let report = match handle_event_file(resizer, path) {
                Ok((uri, response, outcome)) => EventReport {
                    event_path: path.clone(),
                    uri: Some(uri),
                    status: Some(response.status),
                    outcome,
                },
                Err(e) => EventReport {
                    event_path: path.clone(),
                    uri: None,
                    status: None,
                    outcome: Outcome::Failed(e.to_string()),
                },
            };
            if let Some(tx) = progress {
                // Receiver gone only means nobody is printing
                let _ = tx.send(report.clone());
            }
            report
        })
        .collect();

    let mut summary = BatchSummary::default();
    for report in &reports {
        summary.record(&report.outcome);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResizerConfig;
    use crate::imaging::RustBackend;
    use crate::storage::MemoryBlobStore;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn event_json(uri: &str, status: u16) -> String {
        format!(
            r#"{{"Records":[{{"cf":{{"request":{{"uri":"{uri}"}},"response":{{"status":"{status}","statusDescription":"","headers":{{}}}}}}}}]}}"#
        )
    }

    fn resizer() -> Resizer<RustBackend, MemoryBlobStore> {
        let store = MemoryBlobStore::new();
        store.insert("photo.jpg", jpeg_bytes(320, 240));
        Resizer::new(RustBackend::new(), store, ResizerConfig::default())
    }

    #[test]
    fn collect_skips_responses_and_other_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("b.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("a.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("a.response.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "").unwrap();
        std::fs::write(tmp.path().join("nested/c.json"), "{}").unwrap();

        let events = collect_events(tmp.path()).unwrap();
        let names: Vec<_> = events
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json", "nested/c.json"]);
    }

    #[test]
    fn response_path_replaces_extension() {
        assert_eq!(
            response_path(Path::new("/tmp/ev/photo-1x1.json")),
            PathBuf::from("/tmp/ev/photo-1x1.response.json")
        );
    }

    #[test]
    fn batch_writes_responses_and_counts_outcomes() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("served.json"), event_json("/photo-100x100c.jpg", 404)).unwrap();
        std::fs::write(dir.join("rejected.json"), event_json("/photo.jpg", 404)).unwrap();
        std::fs::write(dir.join("hit.json"), event_json("/photo-100x100.jpg", 200)).unwrap();
        std::fs::write(dir.join("broken.json"), "not json").unwrap();

        let resizer = resizer();
        let events = collect_events(dir).unwrap();
        let summary = run_batch(&resizer, &events, None);

        assert_eq!(
            summary,
            BatchSummary {
                served: 1,
                rejected: 1,
                passed_through: 1,
                failed: 1,
            }
        );
        assert_eq!(summary.total(), 4);

        let written = std::fs::read_to_string(dir.join("served.response.json")).unwrap();
        let response: Response = serde_json::from_str(&written).unwrap();
        assert_eq!(response.status, 200);
        assert!(!dir.join("broken.response.json").exists());
    }

    #[test]
    fn batch_streams_reports() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("one.json"), event_json("/photo-10x10.jpg", 403)).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        let events = collect_events(tmp.path()).unwrap();
        run_batch(&resizer(), &events, Some(tx));

        let reports: Vec<EventReport> = rx.into_iter().collect();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].uri.as_deref(), Some("/photo-10x10.jpg"));
        assert_eq!(reports[0].outcome, Outcome::Served);
    }
}
