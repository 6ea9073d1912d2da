//! Evaluation pipeline
//!
//! One run, per target:
//!
//! ```text
//! Collecting -> Resolving -> { InsufficientData | Comparing } -> { Passed | Failed } -> Persisting -> Done
//! ```
//!
//! Grouping and resolution never touch the loaded artifacts. Every marker
//! change is queued as a [`PropertyUpdate`] and the whole queue is applied
//! once, in order, after all targets are decided. Write-back happens last and
//! only for artifacts whose content actually changed.

use crate::artifact::ArtifactFile;
use crate::config::EngineConfig;
use crate::error::{EvalError, Result};
use crate::grouping::{group_results, EvalResult};
use crate::persist::persist_modified;
use crate::properties::{apply_updates, PropertyUpdate};
use crate::regression;
use crate::report::{EvaluationReport, ResultSummary, TargetInventory, TargetReport, TargetStatus};
use crate::resolver::{resolve, Resolution};
use std::collections::BTreeSet;
use std::path::Path;

/// Per-target pipeline stage, logged as the run advances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Collecting,
    Resolving,
    InsufficientData,
    Comparing,
    Passed,
    Failed,
    Persisting,
    Done,
}

fn enter(target: &str, stage: Stage) {
    tracing::debug!(bucket = target, ?stage, "stage");
}

/// Options for one evaluation run
#[derive(Debug, Clone, Default)]
pub struct EvaluateOptions {
    /// Only resolve and mutate these targets; empty means all
    pub targets: Vec<String>,
    /// Decide everything but write nothing
    pub dry_run: bool,
}

/// Decision for one target plus the marker changes it requires
struct TargetOutcome {
    report: TargetReport,
    updates: Vec<PropertyUpdate>,
    warnings: Vec<String>,
}

/// Threshold evaluation engine
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read and decode artifacts concurrently
    ///
    /// Any unreadable or malformed artifact fails the whole load; the first
    /// error in argument order is returned.
    pub fn load_artifacts<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Result<Vec<ArtifactFile>> {
        let loaded = crossbeam::scope(|scope| {
            let handles: Vec<_> = paths
                .iter()
                .map(|path| scope.spawn(move |_| ArtifactFile::load(path)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(EvalError::Io(std::io::Error::other("artifact reader panicked")))
                    })
                })
                .collect::<Vec<_>>()
        })
        .map_err(|_| EvalError::Io(std::io::Error::other("artifact reader panicked")))?;

        let files = loaded.into_iter().collect::<Result<Vec<_>>>()?;
        tracing::debug!(artifacts = files.len(), "artifacts loaded");
        Ok(files)
    }

    /// Full run: load, evaluate, write back
    pub fn run<P: AsRef<Path> + Sync>(
        &self,
        paths: &[P],
        options: &EvaluateOptions,
    ) -> Result<EvaluationReport> {
        let mut files = self.load_artifacts(paths)?;
        let mut report = self.evaluate(&mut files, options);

        if options.dry_run {
            tracing::info!("dry run, skipping write-back");
        } else {
            self.write_back(&files, &mut report);
        }
        enter("*", Stage::Done);
        Ok(report)
    }

    /// Persist every modified artifact and record the outcome on `report`
    pub fn write_back(&self, files: &[ArtifactFile], report: &mut EvaluationReport) {
        let summary = persist_modified(files, self.config.evaluation.stamp_last_modified);
        report.persisted = summary.written;
        report.persist_failures = summary.failures;
    }

    /// Decide every selected target and apply the resulting marker changes
    /// to `files` in memory
    pub fn evaluate(&self, files: &mut [ArtifactFile], options: &EvaluateOptions) -> EvaluationReport {
        let keys = &self.config.properties;
        let mut report = EvaluationReport::new();

        enter("*", Stage::Collecting);
        let buckets = group_results(files.iter().map(|f| (f.id.as_str(), &f.artifact)), keys);

        let selected: Vec<String> = if options.targets.is_empty() {
            buckets.keys().cloned().collect()
        } else {
            let mut seen = BTreeSet::new();
            options
                .targets
                .iter()
                .filter(|t| seen.insert(t.as_str()))
                .cloned()
                .collect()
        };

        if selected.is_empty() {
            report.push_target(TargetReport::unresolved(
                keys.default_target.as_str(),
                "no data: no result carries any findings",
            ));
            return report;
        }

        let empty = EvalResult::default();
        let mut updates = Vec::new();
        for target in &selected {
            let bucket = buckets.get(target).unwrap_or(&empty);
            let outcome = self.evaluate_target(target, bucket);
            updates.extend(outcome.updates);
            report.warnings.extend(outcome.warnings);
            report.push_target(outcome.report);
        }

        enter("*", Stage::Persisting);
        let changed = apply_updates(files, &updates, &keys.namespace);
        tracing::debug!(queued = updates.len(), changed, "marker updates applied");
        report
    }

    fn evaluate_target(&self, target: &str, bucket: &EvalResult) -> TargetOutcome {
        let keys = &self.config.properties;

        enter(target, Stage::Resolving);
        let resolved = resolve(target, bucket, keys, self.config.collision_policy());
        let mut outcome = TargetOutcome {
            report: TargetReport::unresolved(target, "no data"),
            updates: bucket.pending.clone(),
            warnings: resolved.warnings,
        };
        outcome.updates.extend(resolved.updates);

        match resolved.resolution {
            Resolution::NoData => {
                tracing::warn!(bucket = target, "no results to evaluate");
            }
            Resolution::Collision { marked } => {
                // Markers are left untouched for the operator to fix.
                outcome.updates.clear();
                outcome.report.reason = Some(format!(
                    "{marked} results are marked as threshold and collisions are rejected"
                ));
            }
            Resolution::LatestIsThreshold { latest } => {
                outcome.report.reason = Some(format!(
                    "latest result {} is already the threshold",
                    latest.location.uuid
                ));
                outcome.report.latest = Some(ResultSummary::from(latest.as_ref()));
            }
            Resolution::Bootstrap { latest } => {
                enter(target, Stage::InsufficientData);
                tracing::info!(
                    bucket = target,
                    result = %latest.location.uuid,
                    "single result recorded as provisional threshold"
                );
                outcome
                    .updates
                    .push(PropertyUpdate::threshold(&latest.location, keys, true));
                outcome.report = TargetReport {
                    target: target.to_string(),
                    status: TargetStatus::InsufficientData,
                    threshold: None,
                    latest: Some(ResultSummary::from(latest.as_ref())),
                    reason: Some(
                        "only one result available; recorded as the provisional threshold"
                            .to_string(),
                    ),
                    classification: None,
                };
            }
            Resolution::Ready { threshold, latest } => {
                enter(target, Stage::Comparing);
                outcome.report.threshold = Some(ResultSummary::from(threshold.as_ref()));
                outcome.report.latest = Some(ResultSummary::from(latest.as_ref()));

                match regression::evaluate(&threshold.result, &latest.result) {
                    Err(e) => {
                        tracing::warn!(bucket = target, "cannot compare: {}", e);
                        outcome.report.reason = Some(e.to_string());
                    }
                    Ok(classification) if classification.passed => {
                        enter(target, Stage::Passed);
                        tracing::info!(
                            bucket = target,
                            from = %threshold.location.uuid,
                            to = %latest.location.uuid,
                            "advancing threshold"
                        );
                        outcome
                            .updates
                            .push(PropertyUpdate::threshold(&threshold.location, keys, false));
                        outcome
                            .updates
                            .push(PropertyUpdate::threshold(&latest.location, keys, true));
                        outcome.report.status = TargetStatus::Passed;
                        outcome.report.reason = None;
                        outcome.report.classification = Some(classification);
                    }
                    Ok(classification) => {
                        enter(target, Stage::Failed);
                        tracing::info!(
                            bucket = target,
                            regressed = classification
                                .bucket(regression::FindingBucket::NoLongerSatisfied)
                                .len(),
                            "regression detected, threshold kept"
                        );
                        outcome.report.status = TargetStatus::Failed;
                        outcome.report.reason = None;
                        outcome.report.classification = Some(classification);
                    }
                }
            }
        }

        outcome
    }

    /// Per-target overview without resolving or mutating anything
    pub fn inspect(&self, files: &[ArtifactFile]) -> Vec<TargetInventory> {
        let buckets = group_results(
            files.iter().map(|f| (f.id.as_str(), &f.artifact)),
            &self.config.properties,
        );
        buckets
            .into_iter()
            .map(|(target, bucket)| TargetInventory {
                results: bucket.results.len(),
                marked: bucket.marked_count(),
                threshold: bucket.threshold.as_ref().map(ResultSummary::from),
                latest: bucket
                    .results
                    .iter()
                    .max_by(|a, b| a.result.start.cmp(&b.result.start))
                    .map(ResultSummary::from),
                target,
            })
            .collect()
    }
}
