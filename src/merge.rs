//! Combine two evidence artifacts
//!
//! Same identity means same logical document: the incoming copy simply wins.
//! Different identities are unioned into a new document whose results are
//! ordered newest first.

use crate::artifact::{Artifact, Timestamp};
use std::collections::HashSet;
use uuid::Uuid;

/// Merge `incoming` into `original`
///
/// # Example
/// ```
/// use umbral::artifact::Artifact;
/// use umbral::merge::merge;
///
/// let a: Artifact = serde_json::from_str(r#"{"uuid": "a", "results": []}"#).unwrap();
/// assert_eq!(merge(&a, &a), a);
/// ```
pub fn merge(original: &Artifact, incoming: &Artifact) -> Artifact {
    merge_stamped(
        original,
        incoming,
        Uuid::new_v4().to_string(),
        Timestamp::now(),
    )
}

/// [`merge`] with the identity and timestamp of a new document supplied
pub fn merge_stamped(
    original: &Artifact,
    incoming: &Artifact,
    uuid: String,
    stamped_at: Timestamp,
) -> Artifact {
    if original.uuid == incoming.uuid {
        return incoming.clone();
    }

    // A result present on both sides is the same run; keep the incoming copy.
    let incoming_ids: HashSet<&str> = incoming.results.iter().map(|r| r.uuid.as_str()).collect();
    let mut results: Vec<_> = incoming
        .results
        .iter()
        .chain(
            original
                .results
                .iter()
                .filter(|r| !incoming_ids.contains(r.uuid.as_str())),
        )
        .cloned()
        .collect();
    results.sort_by(|a, b| b.start.cmp(&a.start));

    let mut merged = original.clone();
    merged.uuid = uuid;
    merged.metadata.last_modified = Some(stamped_at);
    merged.results = results;

    tracing::debug!(
        original = %original.uuid,
        incoming = %incoming.uuid,
        merged = %merged.uuid,
        results = merged.results.len(),
        "merged artifacts"
    );
    merged
}
