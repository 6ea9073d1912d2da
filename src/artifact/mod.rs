//! Evidence artifact model (OSCAL assessment-results layout)
//!
//! The typed structs below are the view the engine works with. Every struct
//! keeps the keys it does not model in `extra`, so nothing is lost when an
//! artifact is serialized again.

mod codec;
mod timestamp;

pub use codec::{decode_document, ArtifactFile, Decoded, DocumentFormat, ASSESSMENT_RESULTS_KEY};
pub use timestamp::Timestamp;

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One persisted evidence document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Artifact {
    pub uuid: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub results: Vec<AssessmentResult>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One evaluation run: findings, observations and annotations at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AssessmentResult {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    pub start: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<Property>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<Observation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Namespaced annotation on a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ns: Option<String>,
    #[serde(deserialize_with = "scalar_as_string")]
    pub value: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Property {
    pub fn new(name: impl Into<String>, ns: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ns: Some(ns.into()),
            value: value.into(),
            extra: Map::new(),
        }
    }
}

/// Accept `value: true` or `value: 3` from hand-edited YAML as their text
fn scalar_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "property value must be a string, got {other}"
        ))),
    }
}

/// Supporting evidence; carried along, never compared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Observation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_evidence: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single target's verdict within a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Finding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub target: FindingTarget,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Finding {
    /// Minimal finding, mostly useful for tests and synthetic producers
    pub fn new(target_id: impl Into<String>, state: FindingState) -> Self {
        Self {
            uuid: None,
            title: None,
            description: None,
            target: FindingTarget {
                kind: Some("objective-id".to_string()),
                target_id: target_id.into(),
                status: FindingStatus {
                    state,
                    extra: Map::new(),
                },
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target.target_id
    }

    pub fn state(&self) -> FindingState {
        self.target.status.state
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FindingTarget {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub target_id: String,
    pub status: FindingStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingStatus {
    pub state: FindingState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingState {
    Satisfied,
    NotSatisfied,
}

impl FindingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingState::Satisfied => "satisfied",
            FindingState::NotSatisfied => "not-satisfied",
        }
    }
}

impl std::fmt::Display for FindingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
