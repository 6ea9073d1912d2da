//! Evaluation report: per-target outcome, write-back results and warnings
//!
//! Rendered either as a human-readable summary (optionally with a bucket
//! table) or as JSON for CI consumption.

use crate::grouping::ResultEntry;
use crate::persist::PersistFailure;
use crate::regression::{Classification, FindingBucket};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Value of the `format` field in JSON reports
pub const REPORT_FORMAT: &str = "umbral-report-v1";

/// Terminal stage reached by one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetStatus {
    /// No regression; the threshold was advanced to the latest result
    Passed,
    /// Regression; the threshold was left where it was
    Failed,
    /// Only one result; it was recorded as the provisional threshold
    InsufficientData,
    /// Nothing could be compared
    Unresolved,
}

impl TargetStatus {
    fn icon(&self) -> &'static str {
        match self {
            TargetStatus::Passed => "✅",
            TargetStatus::Failed | TargetStatus::Unresolved => "❌",
            TargetStatus::InsufficientData => "⚠️ ",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TargetStatus::Passed => "PASSED",
            TargetStatus::Failed => "REGRESSION DETECTED",
            TargetStatus::InsufficientData => "INSUFFICIENT DATA",
            TargetStatus::Unresolved => "UNRESOLVED",
        }
    }
}

/// Identity of a result as shown in reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub uuid: String,
    pub artifact: String,
    pub start: String,
}

impl From<&ResultEntry> for ResultSummary {
    fn from(entry: &ResultEntry) -> Self {
        Self {
            uuid: entry.location.uuid.clone(),
            artifact: entry.location.artifact_id.clone(),
            start: entry.result.start.to_string(),
        }
    }
}

/// Outcome for one target
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub target: String,
    pub status: TargetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<ResultSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<ResultSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

impl TargetReport {
    pub fn unresolved(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            status: TargetStatus::Unresolved,
            threshold: None,
            latest: None,
            reason: Some(reason.into()),
            classification: None,
        }
    }
}

/// Everything one evaluation run produced
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub format: &'static str,
    pub passed: bool,
    pub targets: Vec<TargetReport>,
    pub persisted: Vec<PathBuf>,
    pub persist_failures: Vec<PersistFailure>,
    pub warnings: Vec<String>,
}

impl Default for EvaluationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationReport {
    pub fn new() -> Self {
        Self {
            format: REPORT_FORMAT,
            passed: true,
            targets: Vec::new(),
            persisted: Vec::new(),
            persist_failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push_target(&mut self, target: TargetReport) {
        if matches!(
            target.status,
            TargetStatus::Failed | TargetStatus::Unresolved
        ) {
            self.passed = false;
        }
        self.targets.push(target);
    }

    /// No target regressed or was left unresolved
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Process exit code: 0 pass, 1 regression or unresolved, 3 write-back failed
    pub fn exit_code(&self) -> i32 {
        if !self.passed {
            1
        } else if !self.persist_failures.is_empty() {
            3
        } else {
            0
        }
    }

    /// Human-readable report; `summary` appends the bucket table per target
    pub fn to_text(&self, summary: bool) -> String {
        let mut out = String::new();

        for target in &self.targets {
            let _ = writeln!(
                out,
                "{} {}: {}",
                target.status.icon(),
                target.target,
                target.status.label()
            );
            match (&target.threshold, &target.latest) {
                (Some(threshold), Some(latest)) => {
                    let _ = writeln!(
                        out,
                        "   threshold {} ({}) -> latest {} ({})",
                        threshold.uuid, threshold.start, latest.uuid, latest.start
                    );
                }
                (None, Some(latest)) => {
                    let _ = writeln!(out, "   latest {} ({})", latest.uuid, latest.start);
                }
                _ => {}
            }
            if let Some(reason) = &target.reason {
                let _ = writeln!(out, "   Reason: {reason}");
            }
            if let Some(classification) = &target.classification {
                for bucket in FindingBucket::ALL {
                    let findings = classification.bucket(bucket);
                    if findings.is_empty() {
                        continue;
                    }
                    let _ = writeln!(out, "   {} ({}):", bucket, findings.len());
                    for finding in findings {
                        let _ = writeln!(out, "     - {} [{}]", finding.target_id(), finding.state());
                    }
                }
                if summary {
                    out.push_str(&bucket_table(classification));
                }
            }
        }

        if !self.warnings.is_empty() {
            let _ = writeln!(out, "\n⚠️  Warnings ({}):", self.warnings.len());
            for warning in &self.warnings {
                let _ = writeln!(out, "  - {warning}");
            }
        }
        for path in &self.persisted {
            let _ = writeln!(out, "💾 Updated {}", path.display());
        }
        for failure in &self.persist_failures {
            let _ = writeln!(out, "❌ {}", failure.error);
        }

        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

const TABLE_HEADERS: [&str; 4] = ["BUCKET", "TARGET-ID", "STATE", "FINDING"];

/// Fixed-width table of every classified finding
fn bucket_table(classification: &Classification) -> String {
    let rows: Vec<[String; 4]> = FindingBucket::ALL
        .iter()
        .flat_map(|bucket| {
            classification.bucket(*bucket).iter().map(move |finding| {
                [
                    bucket.to_string(),
                    finding.target_id().to_string(),
                    finding.state().to_string(),
                    finding
                        .title
                        .clone()
                        .or_else(|| finding.uuid.clone())
                        .unwrap_or_else(|| "-".to_string()),
                ]
            })
        })
        .collect();

    let mut widths = TABLE_HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    table_line(&mut out, TABLE_HEADERS, &widths);
    for row in &rows {
        table_line(
            &mut out,
            [row[0].as_str(), row[1].as_str(), row[2].as_str(), row[3].as_str()],
            &widths,
        );
    }
    if rows.is_empty() {
        let _ = writeln!(out, "   (no changes)");
    }
    out
}

fn table_line(out: &mut String, cells: [&str; 4], widths: &[usize; 4]) {
    let _ = writeln!(
        out,
        "   {:<w0$}  {:<w1$}  {:<w2$}  {}",
        cells[0],
        cells[1],
        cells[2],
        cells[3],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
    );
}

/// One row of `umbral targets`
#[derive(Debug, Clone, Serialize)]
pub struct TargetInventory {
    pub target: String,
    pub results: usize,
    pub marked: usize,
    pub threshold: Option<ResultSummary>,
    pub latest: Option<ResultSummary>,
}

/// Render the target inventory as a fixed-width table
pub fn inventory_table(inventory: &[TargetInventory]) -> String {
    let target_width = inventory
        .iter()
        .map(|t| t.target.chars().count())
        .chain(std::iter::once("TARGET".len()))
        .max()
        .unwrap_or(0);
    let describe = |summary: &Option<ResultSummary>| {
        summary
            .as_ref()
            .map(|s| format!("{} ({})", s.uuid, s.start))
            .unwrap_or_else(|| "-".to_string())
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<target_width$}  {:>7}  {:>6}  {:<40}  LATEST",
        "TARGET", "RESULTS", "MARKED", "THRESHOLD"
    );
    for row in inventory {
        let _ = writeln!(
            out,
            "{:<target_width$}  {:>7}  {:>6}  {:<40}  {}",
            row.target,
            row.results,
            row.marked,
            describe(&row.threshold),
            describe(&row.latest)
        );
    }
    out
}
