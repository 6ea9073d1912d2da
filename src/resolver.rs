//! Pick the baseline ("threshold") and the latest result for one target
//!
//! Decision table over a target bucket, results ordered by `start`:
//!
//! | marked | results | outcome                                                   |
//! |--------|---------|-----------------------------------------------------------|
//! | 0      | 0       | no data                                                   |
//! | any    | 1       | bootstrap: the only result becomes the provisional baseline |
//! | 0      | >= 2    | threshold = second-to-last, latest = last                 |
//! | 1      | >= 2    | threshold = marked; fails if it is the latest             |
//! | >= 2   | >= 2    | threshold = newest marked, falling back to the next newest when it is the latest |

use crate::grouping::{EvalResult, ResultEntry};
use crate::properties::{PropertyKeys, PropertyUpdate};

/// What to do about more than two threshold markers on one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Resolve as usual and report a data-integrity warning
    #[default]
    Warn,
    /// Refuse to resolve the target
    Reject,
}

/// Resolver decision for one target
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Threshold and latest are distinct and can be compared
    Ready {
        threshold: Box<ResultEntry>,
        latest: Box<ResultEntry>,
    },
    /// Exactly one result: nothing to compare against yet
    Bootstrap { latest: Box<ResultEntry> },
    /// No comparable results at all
    NoData,
    /// The only marked threshold is also the newest result
    LatestIsThreshold { latest: Box<ResultEntry> },
    /// Too many markers and the policy says not to guess
    Collision { marked: usize },
}

/// Resolution plus the marker flips and warnings it produced
#[derive(Debug, Clone)]
pub struct Resolved {
    pub resolution: Resolution,
    pub updates: Vec<PropertyUpdate>,
    pub warnings: Vec<String>,
}

impl Resolved {
    fn plain(resolution: Resolution) -> Self {
        Self {
            resolution,
            updates: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Resolve one target bucket
///
/// The bucket's own pending updates are not included in the returned list;
/// callers apply `bucket.pending` first and then `updates`.
pub fn resolve(
    target: &str,
    bucket: &EvalResult,
    keys: &PropertyKeys,
    policy: CollisionPolicy,
) -> Resolved {
    let mut ordered: Vec<&ResultEntry> = bucket.results.iter().collect();
    ordered.sort_by(|a, b| a.result.start.cmp(&b.result.start));

    let latest = match ordered.as_slice() {
        [] => return Resolved::plain(Resolution::NoData),
        [only] => {
            return Resolved::plain(Resolution::Bootstrap {
                latest: Box::new((*only).clone()),
            })
        }
        [.., last] => *last,
    };

    let marked = bucket.marked_count();
    let Some(threshold) = bucket.threshold.as_ref() else {
        let previous = ordered[ordered.len() - 2];
        tracing::debug!(bucket = target, threshold = %previous.location.uuid, "no marker, using second-to-last result");
        return Resolved::plain(Resolution::Ready {
            threshold: Box::new(previous.clone()),
            latest: Box::new(latest.clone()),
        });
    };

    let mut resolved = Resolved::plain(Resolution::NoData);

    if marked > 2 {
        let warning = format!(
            "target '{target}' has {marked} results marked as threshold; only one is expected"
        );
        tracing::warn!("{}", warning);
        resolved.warnings.push(warning);
        if policy == CollisionPolicy::Reject {
            resolved.resolution = Resolution::Collision { marked };
            return resolved;
        }
    }

    if !threshold.is_same_result(latest) {
        resolved.resolution = Resolution::Ready {
            threshold: Box::new(threshold.clone()),
            latest: Box::new(latest.clone()),
        };
        return resolved;
    }

    // The newest marked result is the latest one.
    let fallback = bucket
        .displaced
        .iter()
        .filter(|d| !d.is_same_result(latest))
        .max_by(|a, b| a.result.start.cmp(&b.result.start));

    match fallback {
        Some(fallback) if marked >= 2 => {
            let warning = format!(
                "target '{target}': latest result {} is already marked as threshold, \
                 falling back to {}",
                latest.location.uuid, fallback.location.uuid
            );
            tracing::warn!("{}", warning);
            resolved.warnings.push(warning);
            // The fallback keeps its marker; the latest gives its marker up
            // until the comparison says otherwise.
            resolved
                .updates
                .push(PropertyUpdate::threshold(&fallback.location, keys, true));
            resolved
                .updates
                .push(PropertyUpdate::threshold(&latest.location, keys, false));
            resolved.resolution = Resolution::Ready {
                threshold: Box::new(fallback.clone()),
                latest: Box::new(latest.clone()),
            };
        }
        _ => {
            resolved.resolution = Resolution::LatestIsThreshold {
                latest: Box::new(latest.clone()),
            };
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, AssessmentResult, Finding, FindingState, Property, Timestamp};
    use crate::grouping::group_results;
    use crate::properties::CURRENT_NAMESPACE;
    use serde_json::Map;

    fn result(uuid: &str, day: u32, marked: Option<bool>) -> AssessmentResult {
        let props = marked
            .map(|m| vec![Property::new("threshold", CURRENT_NAMESPACE, m.to_string())])
            .unwrap_or_default();
        AssessmentResult {
            uuid: uuid.to_string(),
            title: None,
            description: String::new(),
            start: Timestamp::parse(&format!("2024-01-{day:02}T00:00:00Z")).unwrap(),
            end: None,
            props,
            observations: Vec::new(),
            findings: vec![Finding::new("ac-1", FindingState::Satisfied)],
            extra: Map::new(),
        }
    }

    fn bucket(results: Vec<AssessmentResult>) -> EvalResult {
        let artifact = Artifact {
            uuid: "a".to_string(),
            metadata: Default::default(),
            results,
            extra: Map::new(),
        };
        group_results([("a", &artifact)], &PropertyKeys::default())
            .remove("default")
            .unwrap_or_default()
    }

    fn uuids(resolution: &Resolution) -> (String, String) {
        match resolution {
            Resolution::Ready { threshold, latest } => {
                (threshold.location.uuid.clone(), latest.location.uuid.clone())
            }
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    fn resolve_default(bucket: &EvalResult) -> Resolved {
        resolve("default", bucket, &PropertyKeys::default(), CollisionPolicy::Warn)
    }

    #[test]
    fn test_empty_bucket_is_no_data() {
        let resolved = resolve_default(&EvalResult::default());
        assert!(matches!(resolved.resolution, Resolution::NoData));
    }

    #[test]
    fn test_single_result_bootstraps() {
        for marker in [None, Some(true), Some(false)] {
            let resolved = resolve_default(&bucket(vec![result("only", 1, marker)]));
            match resolved.resolution {
                Resolution::Bootstrap { latest } => assert_eq!(latest.location.uuid, "only"),
                other => panic!("expected Bootstrap, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unmarked_uses_second_to_last() {
        let b = bucket(vec![result("r3", 3, None), result("r1", 1, None), result("r2", 2, None)]);
        assert_eq!(
            uuids(&resolve_default(&b).resolution),
            ("r2".to_string(), "r3".to_string())
        );
    }

    #[test]
    fn test_single_marker_is_threshold() {
        let b = bucket(vec![
            result("r1", 1, Some(true)),
            result("r2", 2, None),
            result("r3", 3, Some(false)),
        ]);
        let resolved = resolve_default(&b);
        assert_eq!(uuids(&resolved.resolution), ("r1".to_string(), "r3".to_string()));
        assert!(resolved.updates.is_empty());
    }

    #[test]
    fn test_single_marker_on_latest_fails() {
        let b = bucket(vec![result("r1", 1, None), result("r2", 2, Some(true))]);
        assert!(matches!(
            resolve_default(&b).resolution,
            Resolution::LatestIsThreshold { .. }
        ));
    }

    #[test]
    fn test_two_markers_pick_newest() {
        let b = bucket(vec![
            result("t1", 1, Some(true)),
            result("t2", 2, Some(true)),
            result("t3", 3, Some(false)),
        ]);
        let resolved = resolve_default(&b);
        assert_eq!(uuids(&resolved.resolution), ("t2".to_string(), "t3".to_string()));
        assert_eq!(b.pending.len(), 1);
        assert_eq!(b.pending[0].location.uuid, "t1");
    }

    #[test]
    fn test_two_markers_fall_back_when_newest_is_latest() {
        let b = bucket(vec![
            result("t1", 1, Some(true)),
            result("t2", 2, None),
            result("t3", 3, Some(true)),
        ]);
        let resolved = resolve_default(&b);
        assert_eq!(uuids(&resolved.resolution), ("t1".to_string(), "t3".to_string()));
        assert_eq!(resolved.warnings.len(), 1);
        let flips: Vec<(&str, &str)> = resolved
            .updates
            .iter()
            .map(|u| (u.location.uuid.as_str(), u.value.as_str()))
            .collect();
        assert_eq!(flips, vec![("t1", "true"), ("t3", "false")]);
    }

    #[test]
    fn test_third_marker_warns() {
        let b = bucket(vec![
            result("t1", 1, Some(true)),
            result("t2", 2, Some(true)),
            result("t3", 3, Some(true)),
            result("t4", 4, None),
        ]);
        let resolved = resolve_default(&b);
        assert_eq!(uuids(&resolved.resolution), ("t3".to_string(), "t4".to_string()));
        assert!(resolved.warnings[0].contains("3 results marked"));
    }

    #[test]
    fn test_third_marker_rejected_by_policy() {
        let b = bucket(vec![
            result("t1", 1, Some(true)),
            result("t2", 2, Some(true)),
            result("t3", 3, Some(true)),
        ]);
        let resolved = resolve("default", &b, &PropertyKeys::default(), CollisionPolicy::Reject);
        assert!(matches!(
            resolved.resolution,
            Resolution::Collision { marked: 3 }
        ));
    }
}
