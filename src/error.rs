//! Error types for the evaluation engine
//!
//! Only genuinely exceptional conditions live here: unreadable or malformed
//! evidence, bad configuration, failed write-back. Regressions and
//! insufficient data are outcomes, not errors (see [`crate::engine`]).

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, validating or persisting evidence
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed artifact {source_id}: {reason}")]
    Malformed { source_id: String, reason: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: Box<EvalError>,
    },
}

impl EvalError {
    /// Shorthand for a malformed-input error tied to an artifact identifier
    pub fn malformed(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        EvalError::Malformed {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = EvalError::malformed("ar.yaml", "missing results");
        assert_eq!(
            err.to_string(),
            "Malformed artifact ar.yaml: missing results"
        );
    }

    #[test]
    fn test_persist_display_includes_path() {
        let err = EvalError::Persist {
            path: PathBuf::from("/tmp/ar.json"),
            source: Box::new(EvalError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            ))),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/ar.json"));
        assert!(msg.contains("denied"));
    }
}
