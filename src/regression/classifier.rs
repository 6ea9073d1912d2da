// Regression classification between a baseline result and the latest result
//
// Every target-id seen on either side lands in at most one bucket:
// - no-longer-satisfied:  was satisfied and now is not, or disappeared entirely
// - new-passing-findings: was not-satisfied and now is satisfied, or is new and satisfied
// - new-failing-findings: is new and not-satisfied
//
// Unchanged target-ids are dropped. The verdict passes iff no-longer-satisfied
// stays empty.

use crate::artifact::{AssessmentResult, Finding, FindingState};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;

/// Outcome bucket for a single target-id
///
/// The set is closed at these three. Unchanged target-ids (still satisfied,
/// still failing) get no bucket and never appear in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FindingBucket {
    #[serde(rename = "no-longer-satisfied")]
    NoLongerSatisfied,
    #[serde(rename = "new-passing-findings")]
    NewPassing,
    #[serde(rename = "new-failing-findings")]
    NewFailing,
}

impl FindingBucket {
    pub const ALL: [FindingBucket; 3] = [
        FindingBucket::NoLongerSatisfied,
        FindingBucket::NewPassing,
        FindingBucket::NewFailing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FindingBucket::NoLongerSatisfied => "no-longer-satisfied",
            FindingBucket::NewPassing => "new-passing-findings",
            FindingBucket::NewFailing => "new-failing-findings",
        }
    }
}

impl std::fmt::Display for FindingBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why two results could not be compared
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("threshold result {0} has no findings")]
    EmptyThreshold(String),

    #[error("latest result {0} has no findings")]
    EmptyLatest(String),
}

/// Classified comparison of threshold vs latest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub passed: bool,
    #[serde(serialize_with = "serialize_buckets")]
    pub buckets: BTreeMap<FindingBucket, Vec<Finding>>,
}

impl Classification {
    /// Findings in one bucket, ordered by target-id
    pub fn bucket(&self, bucket: FindingBucket) -> &[Finding] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Target-ids in one bucket
    pub fn target_ids(&self, bucket: FindingBucket) -> Vec<&str> {
        self.bucket(bucket).iter().map(Finding::target_id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    fn push(&mut self, bucket: FindingBucket, finding: &Finding) {
        self.buckets.entry(bucket).or_default().push(finding.clone());
    }
}

// Every bucket is always present in serialized output, even when empty.
fn serialize_buckets<S: Serializer>(
    buckets: &BTreeMap<FindingBucket, Vec<Finding>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let full: BTreeMap<&str, &[Finding]> = FindingBucket::ALL
        .iter()
        .map(|b| {
            (
                b.as_str(),
                buckets.get(b).map(Vec::as_slice).unwrap_or(&[]),
            )
        })
        .collect();
    full.serialize(serializer)
}

/// Deduplicate findings into a target-id map
///
/// When one result reports the same target-id more than once, a
/// `not-satisfied` entry wins over a `satisfied` one; among equal states the
/// first entry is kept.
pub fn findings_by_target(result: &AssessmentResult) -> BTreeMap<&str, &Finding> {
    let mut map: BTreeMap<&str, &Finding> = BTreeMap::new();
    for finding in &result.findings {
        let seen = map.get(finding.target_id()).map(|f| f.state());
        match seen {
            None => {
                map.insert(finding.target_id(), finding);
            }
            Some(state) => {
                tracing::warn!(
                    result = %result.uuid,
                    target_id = finding.target_id(),
                    "duplicate finding for target-id"
                );
                if state == FindingState::Satisfied && finding.state() == FindingState::NotSatisfied {
                    map.insert(finding.target_id(), finding);
                }
            }
        }
    }
    map
}

/// Compare `threshold` against `latest`
///
/// # Example
/// ```
/// use umbral::artifact::{AssessmentResult, Finding, FindingState, Timestamp};
/// use umbral::regression::{evaluate, FindingBucket};
///
/// let mk = |uuid: &str, findings: Vec<Finding>| AssessmentResult {
///     uuid: uuid.to_string(),
///     title: None,
///     description: String::new(),
///     start: Timestamp::parse("2024-01-01T00:00:00Z").unwrap(),
///     end: None,
///     props: vec![],
///     observations: vec![],
///     findings,
///     extra: Default::default(),
/// };
/// let threshold = mk("t", vec![Finding::new("ac-1", FindingState::Satisfied)]);
/// let latest = mk("l", vec![Finding::new("ac-1", FindingState::NotSatisfied)]);
///
/// let outcome = evaluate(&threshold, &latest).unwrap();
/// assert!(!outcome.passed);
/// assert_eq!(outcome.target_ids(FindingBucket::NoLongerSatisfied), vec!["ac-1"]);
/// ```
pub fn evaluate(
    threshold: &AssessmentResult,
    latest: &AssessmentResult,
) -> Result<Classification, ClassifyError> {
    if threshold.findings.is_empty() {
        return Err(ClassifyError::EmptyThreshold(threshold.uuid.clone()));
    }
    if latest.findings.is_empty() {
        return Err(ClassifyError::EmptyLatest(latest.uuid.clone()));
    }

    let before = findings_by_target(threshold);
    let mut after = findings_by_target(latest);
    let mut outcome = Classification {
        passed: true,
        buckets: BTreeMap::new(),
    };

    for (target_id, old) in &before {
        let Some(new) = after.remove(target_id) else {
            // A tracked control vanished: always a regression.
            outcome.push(FindingBucket::NoLongerSatisfied, old);
            outcome.passed = false;
            continue;
        };
        match (old.state(), new.state()) {
            (FindingState::Satisfied, FindingState::NotSatisfied) => {
                outcome.push(FindingBucket::NoLongerSatisfied, new);
                outcome.passed = false;
            }
            (FindingState::NotSatisfied, FindingState::Satisfied) => {
                outcome.push(FindingBucket::NewPassing, new);
            }
            _ => {}
        }
    }

    for new in after.values() {
        let bucket = match new.state() {
            FindingState::NotSatisfied => FindingBucket::NewFailing,
            FindingState::Satisfied => FindingBucket::NewPassing,
        };
        outcome.push(bucket, new);
    }

    // Transitions and new ids were pushed in two passes; keep each bucket sorted.
    for findings in outcome.buckets.values_mut() {
        findings.sort_by(|a, b| a.target_id().cmp(b.target_id()));
    }

    tracing::debug!(
        threshold = %threshold.uuid,
        latest = %latest.uuid,
        passed = outcome.passed,
        "classified"
    );
    Ok(outcome)
}
