//! Namespaced property store for result annotations
//!
//! Two properties drive the engine: `target` (which results are comparable)
//! and `threshold` (which result is the accepted baseline). Older artifacts
//! were written under a legacy namespace; reads accept either spelling, writes
//! only ever emit the current one.

use crate::artifact::{ArtifactFile, AssessmentResult, Property};
use crate::grouping::ResultRef;
use serde::{Deserialize, Serialize};

/// Namespace written by this tool
pub const CURRENT_NAMESPACE: &str =
    "https://oscal-compass.github.io/compliance-trestle/schemas/oscal";

/// Namespace written by older producers
pub const LEGACY_NAMESPACE: &str = "https://ibm.github.io/compliance-trestle/schemas/oscal";

/// (current, legacy) spellings of the same namespace
const NAMESPACE_MIGRATIONS: &[(&str, &str)] = &[(CURRENT_NAMESPACE, LEGACY_NAMESPACE)];

/// Map a legacy namespace onto its current spelling
pub fn canonical_namespace(ns: &str) -> &str {
    NAMESPACE_MIGRATIONS
        .iter()
        .find(|(_, legacy)| *legacy == ns)
        .map(|(current, _)| *current)
        .unwrap_or(ns)
}

fn matches(prop: &Property, name: &str, namespace: &str) -> bool {
    prop.name == name
        && prop
            .ns
            .as_deref()
            .is_some_and(|ns| canonical_namespace(ns) == canonical_namespace(namespace))
}

/// Look up a property value by name under `namespace` or its legacy alias
pub fn get_property<'a>(name: &str, namespace: &str, props: &'a [Property]) -> Option<&'a str> {
    props
        .iter()
        .find(|p| matches(p, name, namespace))
        .map(|p| p.value.as_str())
}

/// Set a property, normalizing any legacy namespace on the way
///
/// Every existing match is updated in place; if nothing matches, a new
/// property is appended under the current namespace. Returns whether the
/// property list changed.
pub fn upsert_property(name: &str, namespace: &str, value: &str, props: &mut Vec<Property>) -> bool {
    let namespace = canonical_namespace(namespace);
    let mut changed = false;
    let mut found = false;

    for prop in props.iter_mut().filter(|p| matches(p, name, namespace)) {
        found = true;
        if prop.value != value {
            prop.value = value.to_string();
            changed = true;
        }
        if prop.ns.as_deref() != Some(namespace) {
            prop.ns = Some(namespace.to_string());
            changed = true;
        }
    }

    if !found {
        props.push(Property::new(name, namespace, value));
        changed = true;
    }
    changed
}

/// Which properties mark targets and baselines, and under which namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropertyKeys {
    pub namespace: String,
    pub target: String,
    pub threshold: String,
    pub default_target: String,
}

impl Default for PropertyKeys {
    fn default() -> Self {
        Self {
            namespace: CURRENT_NAMESPACE.to_string(),
            target: "target".to_string(),
            threshold: "threshold".to_string(),
            default_target: "default".to_string(),
        }
    }
}

impl PropertyKeys {
    /// Target name of a result; results written before multi-target support
    /// fall into the default target
    pub fn target_of(&self, result: &AssessmentResult) -> String {
        get_property(&self.target, &self.namespace, &result.props)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.default_target.as_str())
            .to_string()
    }

    /// Whether the result carries `threshold=true`
    pub fn is_threshold(&self, result: &AssessmentResult) -> bool {
        get_property(&self.threshold, &self.namespace, &result.props)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

/// A deferred property write against one result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyUpdate {
    pub location: ResultRef,
    pub name: String,
    pub value: String,
}

impl PropertyUpdate {
    pub fn threshold(location: &ResultRef, keys: &PropertyKeys, marked: bool) -> Self {
        Self {
            location: location.clone(),
            name: keys.threshold.clone(),
            value: marked.to_string(),
        }
    }
}

/// Apply pending updates in order (later writes win) and report how many
/// actually changed a property list
pub fn apply_updates(files: &mut [ArtifactFile], updates: &[PropertyUpdate], namespace: &str) -> usize {
    let mut changed = 0;
    for update in updates {
        let Some(file) = files.iter_mut().find(|f| f.id == update.location.artifact_id) else {
            tracing::warn!(artifact = %update.location.artifact_id, "update targets unknown artifact");
            continue;
        };
        let Some(result) = file
            .artifact
            .results
            .get_mut(update.location.index)
            .filter(|r| r.uuid == update.location.uuid)
        else {
            tracing::warn!(
                artifact = %update.location.artifact_id,
                result = %update.location.uuid,
                "update targets a result that is no longer at its recorded position"
            );
            continue;
        };
        if upsert_property(&update.name, namespace, &update.value, &mut result.props) {
            tracing::debug!(
                result = %update.location.uuid,
                name = %update.name,
                value = %update.value,
                "property updated"
            );
            changed += 1;
        }
    }
    changed
}
