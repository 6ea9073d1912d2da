//! Partition results from many artifacts into per-target buckets
//!
//! Each bucket remembers the most recent result marked as threshold. Older
//! marked results are displaced: their flip to `threshold=false` is recorded as
//! a pending update on the bucket instead of being written into the shared
//! artifact, so nothing is mutated until resolution has finished.

use crate::artifact::{Artifact, AssessmentResult};
use crate::properties::{PropertyKeys, PropertyUpdate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Where a result lives: artifact identifier, position, uuid
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResultRef {
    pub artifact_id: String,
    pub index: usize,
    pub uuid: String,
}

/// A result together with its location and baseline marker
#[derive(Debug, Clone)]
pub struct ResultEntry {
    pub location: ResultRef,
    pub result: AssessmentResult,
    pub marked: bool,
}

impl ResultEntry {
    /// Same stored result, or a copy of it carried in another artifact
    pub fn is_same_result(&self, other: &ResultEntry) -> bool {
        self.location == other.location || self.location.uuid == other.location.uuid
    }
}

/// Working set for one target, rebuilt on every run
#[derive(Debug, Clone, Default)]
pub struct EvalResult {
    /// Most recent result marked `threshold=true`
    pub threshold: Option<ResultEntry>,
    /// Marked results that lost to a more recent marked one
    pub displaced: Vec<ResultEntry>,
    /// Every findings-bearing result of the target, in input order
    pub results: Vec<ResultEntry>,
    /// Flips queued for displaced markers
    pub pending: Vec<PropertyUpdate>,
}

impl EvalResult {
    /// Number of results that carried a `threshold=true` marker
    pub fn marked_count(&self) -> usize {
        self.displaced.len() + usize::from(self.threshold.is_some())
    }

    fn record(&mut self, entry: ResultEntry, keys: &PropertyKeys) {
        if entry.marked {
            let displaced = match self.threshold.take() {
                // Strictly later wins; on a tie the first one seen stays.
                Some(current) if entry.result.start > current.result.start => {
                    self.threshold = Some(entry.clone());
                    Some(current)
                }
                Some(current) => {
                    self.threshold = Some(current);
                    Some(entry.clone())
                }
                None => {
                    self.threshold = Some(entry.clone());
                    None
                }
            };
            if let Some(old) = displaced {
                tracing::debug!(
                    result = %old.location.uuid,
                    artifact = %old.location.artifact_id,
                    "displacing stale threshold marker"
                );
                self.pending
                    .push(PropertyUpdate::threshold(&old.location, keys, false));
                self.displaced.push(old);
            }
        }
        self.results.push(entry);
    }
}

/// Group every findings-bearing result by its target property
///
/// `artifacts` yields `(artifact identifier, artifact)` pairs; the identifier
/// is carried into every [`ResultRef`].
pub fn group_results<'a, I>(artifacts: I, keys: &PropertyKeys) -> BTreeMap<String, EvalResult>
where
    I: IntoIterator<Item = (&'a str, &'a Artifact)>,
{
    let mut buckets: BTreeMap<String, EvalResult> = BTreeMap::new();

    for (artifact_id, artifact) in artifacts {
        for (index, result) in artifact.results.iter().enumerate() {
            if result.findings.is_empty() {
                tracing::debug!(result = %result.uuid, artifact = %artifact_id, "skipping result without findings");
                continue;
            }
            let entry = ResultEntry {
                location: ResultRef {
                    artifact_id: artifact_id.to_string(),
                    index,
                    uuid: result.uuid.clone(),
                },
                result: result.clone(),
                marked: keys.is_threshold(result),
            };
            buckets
                .entry(keys.target_of(result))
                .or_default()
                .record(entry, keys);
        }
    }

    buckets
}
