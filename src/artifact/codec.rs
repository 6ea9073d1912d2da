//! Reading and writing evidence documents (YAML or JSON)
//!
//! Documents are parsed into a raw `serde_json::Value` tree first so the
//! top-level shape can be checked before the typed view is built. The raw tree
//! is kept: when only props or `last-modified` changed, write-back patches
//! them inside that tree, leaving every other key where it was.

use super::{Artifact, AssessmentResult};
use crate::error::{EvalError, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Wrapper key used by OSCAL assessment-results documents
pub const ASSESSMENT_RESULTS_KEY: &str = "assessment-results";

/// Serialization format of an evidence document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Format implied by the file extension, if any
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(DocumentFormat::Json),
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            _ => None,
        }
    }

    /// Guess from content: JSON documents open with `{`
    pub fn sniff(text: &str) -> Self {
        if text.trim_start().starts_with('{') {
            DocumentFormat::Json
        } else {
            DocumentFormat::Yaml
        }
    }

    pub fn detect(path: &Path, text: &str) -> Self {
        Self::from_extension(path).unwrap_or_else(|| Self::sniff(text))
    }

    fn parse(&self, text: &str) -> Result<Value> {
        Ok(match self {
            DocumentFormat::Json => serde_json::from_str(text)?,
            DocumentFormat::Yaml => serde_yaml::from_str(text)?,
        })
    }

    /// Render a document tree in this format
    pub fn render(&self, value: &Value) -> Result<String> {
        Ok(match self {
            DocumentFormat::Json => {
                let mut out = serde_json::to_string_pretty(value)?;
                out.push('\n');
                out
            }
            DocumentFormat::Yaml => serde_yaml::to_string(value)?,
        })
    }
}

/// A decoded document: raw tree, wrapping style and typed artifact
#[derive(Debug, Clone)]
pub struct Decoded {
    pub root: Value,
    pub wrapped: bool,
    pub artifact: Artifact,
}

/// Parse and validate one evidence document
///
/// Rejects anything that does not parse, has no recognizable `results` list,
/// or carries results/findings the engine cannot compare.
pub fn decode_document(text: &str, format: DocumentFormat, source_id: &str) -> Result<Decoded> {
    let root = format
        .parse(text)
        .map_err(|e| EvalError::malformed(source_id, e.to_string()))?;

    let (inner, wrapped) = match root.get(ASSESSMENT_RESULTS_KEY) {
        Some(inner) if inner.is_object() => (inner, true),
        Some(_) => {
            return Err(EvalError::malformed(
                source_id,
                format!("'{ASSESSMENT_RESULTS_KEY}' is not an object"),
            ))
        }
        None => (&root, false),
    };

    match inner.get("results") {
        Some(Value::Array(_)) => {}
        Some(_) => return Err(EvalError::malformed(source_id, "'results' is not a list")),
        None => {
            return Err(EvalError::malformed(
                source_id,
                "no recognizable list of results",
            ))
        }
    }

    let artifact: Artifact = serde_json::from_value(inner.clone())
        .map_err(|e| EvalError::malformed(source_id, e.to_string()))?;
    validate(&artifact, source_id)?;

    Ok(Decoded {
        root,
        wrapped,
        artifact,
    })
}

fn validate(artifact: &Artifact, source_id: &str) -> Result<()> {
    if artifact.uuid.trim().is_empty() {
        return Err(EvalError::malformed(source_id, "artifact uuid is empty"));
    }
    for (idx, result) in artifact.results.iter().enumerate() {
        if result.uuid.trim().is_empty() {
            return Err(EvalError::malformed(
                source_id,
                format!("result #{idx} has an empty uuid"),
            ));
        }
        if let Some(finding) = result.findings.iter().find(|f| f.target_id().is_empty()) {
            return Err(EvalError::malformed(
                source_id,
                format!(
                    "result {} has a finding without target-id ({})",
                    result.uuid,
                    finding.uuid.as_deref().unwrap_or("no uuid")
                ),
            ));
        }
    }
    Ok(())
}

/// An artifact bound to the file it came from
#[derive(Debug, Clone)]
pub struct ArtifactFile {
    /// Identifier used in reports and grouping (the path as given)
    pub id: String,
    pub path: PathBuf,
    pub format: DocumentFormat,
    wrapped: bool,
    root: Value,
    original: Artifact,
    /// Working copy; the engine mutates only props and metadata on it
    pub artifact: Artifact,
}

impl ArtifactFile {
    /// Read and decode an artifact from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::from_text(path, &text)
    }

    /// Decode an artifact whose content has already been read
    pub fn from_text(path: impl AsRef<Path>, text: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let id = path.display().to_string();
        let format = DocumentFormat::detect(&path, text);
        let decoded = decode_document(text, format, &id)?;
        tracing::debug!(
            artifact = %id,
            results = decoded.artifact.results.len(),
            ?format,
            "decoded artifact"
        );
        Ok(Self {
            id,
            path,
            format,
            wrapped: decoded.wrapped,
            root: decoded.root,
            original: decoded.artifact.clone(),
            artifact: decoded.artifact,
        })
    }

    /// The artifact exactly as it was read
    pub fn original(&self) -> &Artifact {
        &self.original
    }

    pub fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    /// Whether the working copy differs from what was read
    pub fn is_modified(&self) -> bool {
        self.artifact != self.original
    }

    /// Render `artifact` for this file's location and format
    ///
    /// When only props or `last-modified` changed, the raw tree is patched in
    /// place. Anything else (a new identity, or an incoming copy of the same
    /// document with other edits) is serialized from the typed view.
    pub fn render(&self, artifact: &Artifact) -> Result<String> {
        let tree = if self.same_shape(artifact) {
            self.patched_tree(artifact)?
        } else {
            let inner = serde_json::to_value(artifact)?;
            if self.wrapped {
                let mut root = serde_json::Map::new();
                root.insert(ASSESSMENT_RESULTS_KEY.to_string(), inner);
                Value::Object(root)
            } else {
                inner
            }
        };
        self.format.render(&tree)
    }

    /// Write `artifact` back to this file's path
    pub fn write(&self, artifact: &Artifact) -> Result<()> {
        self.write_to(&self.path, artifact)
    }

    /// Write `artifact` to another path, keeping this file's format and wrapping
    pub fn write_to(&self, path: &Path, artifact: &Artifact) -> Result<()> {
        let rendered = self.render(artifact)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    /// Only props and `last-modified` differ from what was read
    fn same_shape(&self, artifact: &Artifact) -> bool {
        let original = &self.original;
        artifact.uuid == original.uuid
            && artifact.extra == original.extra
            && artifact.metadata.title == original.metadata.title
            && artifact.metadata.extra == original.metadata.extra
            && artifact.results.len() == original.results.len()
            && artifact
                .results
                .iter()
                .zip(&original.results)
                .all(|(a, b)| same_apart_from_props(a, b))
    }

    fn patched_tree(&self, artifact: &Artifact) -> Result<Value> {
        let mut root = self.root.clone();
        let inner = if self.wrapped {
            root.get_mut(ASSESSMENT_RESULTS_KEY)
        } else {
            Some(&mut root)
        }
        .and_then(Value::as_object_mut)
        .ok_or_else(|| EvalError::malformed(&self.id, "document shape changed"))?;

        if artifact.metadata.last_modified != self.original.metadata.last_modified {
            let metadata = inner
                .entry("metadata")
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if let Some(metadata) = metadata.as_object_mut() {
                metadata.insert(
                    "last-modified".to_string(),
                    serde_json::to_value(&artifact.metadata.last_modified)?,
                );
            }
        }

        if let Some(Value::Array(raw_results)) = inner.get_mut("results") {
            for ((raw, updated), original) in raw_results
                .iter_mut()
                .zip(&artifact.results)
                .zip(&self.original.results)
            {
                if updated.props == original.props {
                    continue;
                }
                if let Some(raw) = raw.as_object_mut() {
                    raw.insert("props".to_string(), serde_json::to_value(&updated.props)?);
                }
            }
        }

        Ok(root)
    }
}

fn same_apart_from_props(a: &AssessmentResult, b: &AssessmentResult) -> bool {
    a.uuid == b.uuid
        && a.title == b.title
        && a.description == b.description
        && a.start == b.start
        && a.end == b.end
        && a.observations == b.observations
        && a.findings == b.findings
        && a.extra == b.extra
}
