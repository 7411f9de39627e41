// crates/subjects-conformance-core/src/report.rs
// ============================================================================
// Module: Suite Report
// Description: Aggregated scenario results and report artifacts.
// Purpose: Decide the aggregate verdict and write JSON/Markdown summaries.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`SuiteReport`] holds every [`ScenarioResult`] of one execution plus
//! per-status counts. The suite succeeds when nothing failed or errored;
//! skips do not count against it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::scenario::ScenarioResult;
use crate::scenario::ScenarioStatus;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the JSON report.
pub const REPORT_JSON_NAME: &str = "summary.json";
/// File name of the Markdown report.
pub const REPORT_MARKDOWN_NAME: &str = "summary.md";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Per-status scenario counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Passed scenarios.
    pub passed: usize,
    /// Failed scenarios.
    pub failed: usize,
    /// Errored scenarios.
    pub errored: usize,
    /// Skipped scenarios.
    pub skipped: usize,
}

/// Results of one suite execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    /// Completion time (milliseconds since epoch).
    pub finished_at_ms: u128,
    /// Per-status counts.
    pub counts: StatusCounts,
    /// Individual results in execution order.
    pub results: Vec<ScenarioResult>,
}

impl SuiteReport {
    /// Builds a report from results and tallies the counts.
    #[must_use]
    pub fn from_results(results: Vec<ScenarioResult>) -> Self {
        let mut counts = StatusCounts::default();
        for result in &results {
            match result.status {
                ScenarioStatus::Passed => counts.passed += 1,
                ScenarioStatus::Failed => counts.failed += 1,
                ScenarioStatus::Errored => counts.errored += 1,
                ScenarioStatus::Skipped => counts.skipped += 1,
            }
        }
        Self {
            finished_at_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
            counts,
            results,
        }
    }

    /// Returns true when no scenario failed or errored.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.counts.failed == 0 && self.counts.errored == 0
    }

    /// One-line count summary, e.g. `4 passed, 1 failed, 0 errored, 2 skipped`.
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "{} passed, {} failed, {} errored, {} skipped",
            self.counts.passed, self.counts.failed, self.counts.errored, self.counts.skipped
        )
    }

    /// Renders the Markdown summary.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Subjects Conformance Summary\n\n");
        out.push_str("## Status\n\n");
        let verdict = if self.success() { "passed" } else { "failed" };
        out.push_str(&format!("- Verdict: {verdict}\n"));
        out.push_str(&format!("- Scenarios: {}\n", self.summary_line()));
        out.push_str("\n## Scenarios\n\n");
        if self.results.is_empty() {
            out.push_str("- None\n");
        }
        for result in &self.results {
            out.push_str(&format!(
                "- `{}`: {} ({} ms)\n",
                result.scenario,
                result.status.label(),
                result.duration_ms
            ));
            if let Some(message) = &result.message {
                out.push_str(&format!("  - {message}\n"));
            }
            if let Some(schema) = &result.schema {
                for violation in &schema.violations {
                    out.push_str(&format!(
                        "  - data[{}]: {} `{}`\n",
                        violation.index, violation.reason, violation.record
                    ));
                }
            }
        }
        out
    }

    /// Writes `summary.json` and `summary.md` into `dir`, creating it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory or files cannot be written.
    pub fn write_to_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let json_path = dir.join(REPORT_JSON_NAME);
        let bytes = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
        fs::write(&json_path, bytes)?;
        let markdown_path = dir.join(REPORT_MARKDOWN_NAME);
        fs::write(&markdown_path, self.to_markdown().as_bytes())?;
        Ok(vec![json_path, markdown_path])
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::indexing_slicing,
        reason = "Test assertions use expect/unwrap for clarity."
    )]

    use super::SuiteReport;
    use crate::scenario::ScenarioId;
    use crate::scenario::ScenarioResult;
    use crate::scenario::ScenarioStatus;

    fn result(scenario: ScenarioId, status: ScenarioStatus) -> ScenarioResult {
        ScenarioResult {
            scenario,
            status,
            message: (status != ScenarioStatus::Passed).then(|| format!("{scenario} note")),
            schema: None,
            duration_ms: 3,
        }
    }

    #[test]
    fn skips_do_not_fail_the_suite() {
        let report = SuiteReport::from_results(vec![
            result(ScenarioId::AuthorizedFetch, ScenarioStatus::Passed),
            result(ScenarioId::SslV2Rejected, ScenarioStatus::Skipped),
        ]);
        assert!(report.success());
        assert_eq!(report.summary_line(), "1 passed, 0 failed, 0 errored, 1 skipped");
    }

    #[test]
    fn errors_and_failures_fail_the_suite() {
        let errored = SuiteReport::from_results(vec![result(
            ScenarioId::TlsV1Accepted,
            ScenarioStatus::Errored,
        )]);
        assert!(!errored.success());
        let failed = SuiteReport::from_results(vec![result(
            ScenarioId::UnauthorizedFetch,
            ScenarioStatus::Failed,
        )]);
        assert!(!failed.success());
        assert!(failed.to_markdown().contains("- Verdict: failed"));
    }

    #[test]
    fn write_to_dir_emits_json_and_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let report = SuiteReport::from_results(vec![result(
            ScenarioId::LatencyBound,
            ScenarioStatus::Passed,
        )]);
        let written = report.write_to_dir(&dir.path().join("out")).unwrap();
        assert_eq!(written.len(), 2);
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&written[0]).unwrap()).unwrap();
        assert_eq!(json["counts"]["passed"], 1);
        assert_eq!(json["results"][0]["scenario"], "latency_bound");
        assert_eq!(json["results"][0]["status"], "passed");
        let markdown = std::fs::read_to_string(&written[1]).unwrap();
        assert!(markdown.contains("`latency_bound`: passed"));
    }
}
