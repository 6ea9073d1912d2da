// Evidence fixtures shared by the integration suites
#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const CURRENT_NS: &str = "https://oscal-compass.github.io/compliance-trestle/schemas/oscal";
pub const LEGACY_NS: &str = "https://ibm.github.io/compliance-trestle/schemas/oscal";

/// One assessment result in a fixture
#[derive(Debug, Clone)]
pub struct Run {
    pub uuid: String,
    pub start: String,
    pub target: Option<String>,
    pub threshold: Option<bool>,
    pub namespace: &'static str,
    pub findings: Vec<(String, &'static str)>,
}

impl Run {
    /// A result started on the given day of January 2024
    pub fn new(uuid: &str, day: u32) -> Self {
        Self {
            uuid: uuid.to_string(),
            start: format!("2024-01-{day:02}T08:00:00Z"),
            target: None,
            threshold: None,
            namespace: CURRENT_NS,
            findings: Vec::new(),
        }
    }

    pub fn target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn threshold(mut self, marked: bool) -> Self {
        self.threshold = Some(marked);
        self
    }

    pub fn legacy(mut self) -> Self {
        self.namespace = LEGACY_NS;
        self
    }

    pub fn satisfied(mut self, id: &str) -> Self {
        self.findings.push((id.to_string(), "satisfied"));
        self
    }

    pub fn not_satisfied(mut self, id: &str) -> Self {
        self.findings.push((id.to_string(), "not-satisfied"));
        self
    }

    fn to_value(&self) -> Value {
        let mut props = Vec::new();
        if let Some(target) = &self.target {
            props.push(json!({"name": "target", "ns": self.namespace, "value": target}));
        }
        if let Some(marked) = self.threshold {
            props.push(json!({"name": "threshold", "ns": self.namespace, "value": marked.to_string()}));
        }
        let findings: Vec<Value> = self
            .findings
            .iter()
            .enumerate()
            .map(|(i, (id, state))| {
                json!({
                    "uuid": format!("{}-f{}", self.uuid, i),
                    "title": format!("Finding for {id}"),
                    "target": {
                        "type": "objective-id",
                        "target-id": id,
                        "status": {"state": state},
                    },
                })
            })
            .collect();
        json!({
            "uuid": self.uuid,
            "title": format!("Nightly scan {}", self.uuid),
            "description": "Automated policy scan",
            "start": self.start,
            "props": props,
            "observations": [{
                "uuid": format!("{}-o1", self.uuid),
                "description": "kube-bench check output",
                "methods": ["TEST-AUTOMATED"],
                "relevant-evidence": [{"href": "https://ci.example.com/run/42", "description": "raw log"}],
            }],
            "findings": findings,
        })
    }
}

/// A wrapped assessment-results document
pub fn document(uuid: &str, runs: &[Run]) -> Value {
    json!({
        "assessment-results": {
            "uuid": uuid,
            "metadata": {
                "title": "Cluster compliance evidence",
                "last-modified": "2024-01-01T00:00:00Z",
                "version": "1.0",
                "oscal-version": "1.1.2",
            },
            "import-ap": {"href": "./assessment-plan.json"},
            "results": runs.iter().map(Run::to_value).collect::<Vec<_>>(),
        }
    })
}

pub fn write_yaml(dir: &Path, name: &str, uuid: &str, runs: &[Run]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_yaml::to_string(&document(uuid, runs)).unwrap()).unwrap();
    path
}

pub fn write_json(dir: &Path, name: &str, uuid: &str, runs: &[Run]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(&document(uuid, runs)).unwrap()).unwrap();
    path
}

/// Parse a fixture back into a JSON tree regardless of its format
pub fn read_tree(path: &Path) -> Value {
    let text = fs::read_to_string(path).unwrap();
    if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&text).unwrap()
    } else {
        serde_yaml::from_str(&text).unwrap()
    }
}

/// The `threshold` prop of a result as (namespace, value)
pub fn marker(path: &Path, result_uuid: &str) -> Option<(String, String)> {
    let tree = read_tree(path);
    let results = tree["assessment-results"]["results"].as_array().unwrap().clone();
    let result = results.into_iter().find(|r| r["uuid"] == result_uuid)?;
    result["props"]
        .as_array()?
        .iter()
        .find(|p| p["name"] == "threshold")
        .map(|p| {
            (
                p["ns"].as_str().unwrap_or_default().to_string(),
                p["value"].as_str().unwrap_or_default().to_string(),
            )
        })
}

pub fn marker_value(path: &Path, result_uuid: &str) -> Option<String> {
    marker(path, result_uuid).map(|(_, value)| value)
}
