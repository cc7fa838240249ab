//! Run progress accounting.
//!
//! [`ProgressTracker`] keeps the counters for one run; [`RunObserver`] lets a
//! frontend follow along without the orchestrator knowing how progress is
//! displayed.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::ErrorKind;
use crate::types::{ScrapeResult, ScrapeStatus};

/// Immutable copy of the run counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Municipalities planned for this run.
    pub total: usize,
    pub attempted: usize,
    pub succeeded: usize,
    /// Municipalities where an ethics chapter was located, whatever happened
    /// afterwards.
    pub found: usize,
    pub not_found: usize,
    pub errors_by_kind: BTreeMap<ErrorKind, usize>,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(
    elapsed: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64((elapsed.as_secs_f64() * 10.0).round() / 10.0)
}

impl ProgressSnapshot {
    /// Total errors across kinds.
    #[must_use]
    pub fn errors(&self) -> usize {
        self.errors_by_kind.values().sum()
    }

    /// Errors of one kind.
    #[must_use]
    pub fn errors_of(&self, kind: ErrorKind) -> usize {
        self.errors_by_kind.get(&kind).copied().unwrap_or(0)
    }
}

/// Sequential per-run counters.
///
/// Only the processing thread updates the tracker, so no locking is needed.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    attempted: usize,
    succeeded: usize,
    found: usize,
    not_found: usize,
    errors_by_kind: BTreeMap<ErrorKind, usize>,
    started: Instant,
}

impl ProgressTracker {
    /// Log a status line every this many recorded municipalities.
    pub const LOG_EVERY: usize = 10;

    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            attempted: 0,
            succeeded: 0,
            found: 0,
            not_found: 0,
            errors_by_kind: BTreeMap::new(),
            started: Instant::now(),
        }
    }

    /// Account for one recorded outcome.
    pub fn record(&mut self, result: &ScrapeResult) {
        self.attempted += 1;
        if result.chapter.is_some() {
            self.found += 1;
        }
        match result.status {
            ScrapeStatus::Success => self.succeeded += 1,
            ScrapeStatus::NotFound => self.not_found += 1,
            ScrapeStatus::Error(kind) => *self.errors_by_kind.entry(kind).or_insert(0) += 1,
        }

        if self.attempted % Self::LOG_EVERY == 0 {
            tracing::info!(
                attempted = self.attempted,
                total = self.total,
                succeeded = self.succeeded,
                found = self.found,
                errors = self.errors_by_kind.values().sum::<usize>(),
                "Progress"
            );
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total,
            attempted: self.attempted,
            succeeded: self.succeeded,
            found: self.found,
            not_found: self.not_found,
            errors_by_kind: self.errors_by_kind.clone(),
            elapsed: self.started.elapsed(),
        }
    }
}

/// Follows a run as it happens. Frontends implement this to surface status.
pub trait RunObserver {
    /// Called once the municipality list is known.
    fn begin(&mut self, _total: usize) {}

    /// Called after every recorded outcome.
    fn recorded(&mut self, _result: &ScrapeResult, _progress: &ProgressSnapshot) {}

    /// Called at the end, completed or stopped.
    fn finish(&mut self, _progress: &ProgressSnapshot) {}
}

/// A no-op observer.
pub struct NullObserver;
impl RunObserver for NullObserver {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChapterRef, PlatformTag};
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn chapter() -> ChapterRef {
        ChapterRef {
            title: "Ethics".to_string(),
            locator_url: "https://a.example/ethics".to_string(),
            document_order_index: 0,
        }
    }

    #[test]
    fn test_record_partitions_outcomes() {
        let mut tracker = ProgressTracker::new(5);
        tracker.record(&ScrapeResult::success(
            "UT-a",
            PlatformTag::Municode,
            chapter(),
            BTreeSet::new(),
            PathBuf::from("a.html"),
        ));
        tracker.record(&ScrapeResult::not_found("UT-b", PlatformTag::Municode));
        tracker.record(
            &ScrapeResult::error("UT-c", PlatformTag::Municode, ErrorKind::Render, "disk")
                .with_chapter(chapter()),
        );
        tracker.record(&ScrapeResult::error(
            "UT-d",
            PlatformTag::Unknown,
            ErrorKind::Classification,
            "no extractor",
        ));
        tracker.record(&ScrapeResult::error(
            "UT-e",
            PlatformTag::Unknown,
            ErrorKind::Classification,
            "no extractor",
        ));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.total, 5);
        assert_eq!(snapshot.attempted, 5);
        assert_eq!(snapshot.succeeded, 1);
        assert_eq!(snapshot.found, 2);
        assert_eq!(snapshot.not_found, 1);
        assert_eq!(snapshot.errors(), 3);
        assert_eq!(snapshot.errors_of(ErrorKind::Classification), 2);
        assert_eq!(snapshot.errors_of(ErrorKind::Extraction), 0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut tracker = ProgressTracker::new(2);
        let before = tracker.snapshot();
        tracker.record(&ScrapeResult::not_found("UT-a", PlatformTag::Amlegal));
        assert_eq!(before.attempted, 0);
        assert_eq!(tracker.snapshot().attempted, 1);
    }

    #[test]
    fn test_snapshot_serializes_elapsed_secs() {
        let tracker = ProgressTracker::new(0);
        let value = serde_json::to_value(tracker.snapshot()).unwrap();
        assert!(value.get("elapsed_secs").is_some());
        assert!(value.get("errors_by_kind").is_some());
    }
}
