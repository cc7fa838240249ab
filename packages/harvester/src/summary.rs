//! End-of-run summary artifact.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::progress::ProgressSnapshot;
use crate::types::ScrapeResult;
use crate::writer::write_atomic;

/// File name of the run summary inside the output directory.
pub const SUMMARY_FILE: &str = "run_summary.yaml";

/// Everything a run produced besides the rendered documents.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// States processed, in order.
    pub states: Vec<String>,
    /// Whether a stop signal ended the run early.
    pub stopped: bool,
    pub progress: ProgressSnapshot,
    /// One entry per municipality, in processing order.
    pub results: Vec<ScrapeResult>,
}

impl RunReport {
    /// Borrowed view of the report.
    #[must_use]
    pub fn view(&self) -> ReportView<'_> {
        ReportView {
            states: &self.states,
            stopped: self.stopped,
            progress: &self.progress,
            results: &self.results,
        }
    }
}

/// A [`RunReport`] assembled from borrowed parts, for checkpoints taken
/// while the run is still going. Serializes exactly like the report.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReportView<'a> {
    pub states: &'a [String],
    pub stopped: bool,
    pub progress: &'a ProgressSnapshot,
    pub results: &'a [ScrapeResult],
}

/// Write the report as YAML to `<output_dir>/run_summary.yaml`.
///
/// # Returns
/// Path of the written file
pub fn write_summary(output_dir: &Path, report: &RunReport) -> Result<PathBuf> {
    write_view(output_dir, &report.view())
}

/// Write a report view as YAML to `<output_dir>/run_summary.yaml`.
pub fn write_view(output_dir: &Path, report: &ReportView<'_>) -> Result<PathBuf> {
    let path = output_dir.join(SUMMARY_FILE);
    let yaml = serde_yaml_ng::to_string(report)?;
    let content = format!("---\n{yaml}");
    write_atomic(&path, content.as_bytes())?;
    tracing::debug!(path = %path.display(), results = report.results.len(), "Wrote run summary");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::progress::ProgressTracker;
    use crate::types::PlatformTag;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_write_summary() {
        let dir = tempdir().unwrap();
        let results = vec![
            ScrapeResult::not_found("UT-provo", PlatformTag::GeneralCode),
            ScrapeResult::error(
                "UT-alta",
                PlatformTag::Unknown,
                ErrorKind::Classification,
                "No extractor registered for platform 'unknown'",
            ),
        ];
        let mut tracker = ProgressTracker::new(results.len());
        for result in &results {
            tracker.record(result);
        }
        let report = RunReport {
            states: vec!["UT".to_string()],
            stopped: false,
            progress: tracker.snapshot(),
            results,
        };

        let path = write_summary(dir.path(), &report).unwrap();
        let content = fs::read_to_string(&path).unwrap();

        assert_eq!(path, dir.path().join(SUMMARY_FILE));
        assert!(content.starts_with("---\n"));
        assert!(content.contains("municipality_id: UT-provo"));
        assert!(content.contains("status: not_found"));
        assert!(content.contains("classification: 1"));
    }

    #[test]
    fn test_view_serializes_like_report() {
        let results = vec![ScrapeResult::not_found("UT-provo", PlatformTag::GeneralCode)];
        let mut tracker = ProgressTracker::new(2);
        tracker.record(&results[0]);
        let report = RunReport {
            states: vec!["UT".to_string()],
            stopped: true,
            progress: tracker.snapshot(),
            results,
        };

        assert_eq!(
            serde_yaml_ng::to_string(&report).unwrap(),
            serde_yaml_ng::to_string(&report.view()).unwrap()
        );
    }
}
