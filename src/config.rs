//! Engine configuration
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file) behaves like the stock OSCAL compass conventions.
//!
//! ```toml
//! [properties]
//! namespace = "https://oscal-compass.github.io/compliance-trestle/schemas/oscal"
//! target = "target"
//! threshold = "threshold"
//! default_target = "default"
//!
//! [evaluation]
//! reject_threshold_collisions = false
//! stamp_last_modified = true
//! ```

use crate::error::{EvalError, Result};
use crate::properties::PropertyKeys;
use crate::resolver::CollisionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration for an evaluation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Property names and namespace used for markers
    pub properties: PropertyKeys,

    /// Evaluation behaviour
    pub evaluation: EvaluationSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationSettings {
    /// Refuse to resolve a target carrying more than two threshold markers
    ///
    /// Default: false (resolve and report a data-integrity warning)
    pub reject_threshold_collisions: bool,

    /// Restamp `metadata.last-modified` on every artifact that is rewritten
    ///
    /// Default: true
    pub stamp_last_modified: bool,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            reject_threshold_collisions: false,
            stamp_last_modified: true,
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            EvalError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(path = %path.display(), "loaded engine configuration");
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(contents).map_err(|e| EvalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        if self.evaluation.reject_threshold_collisions {
            CollisionPolicy::Reject
        } else {
            CollisionPolicy::Warn
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let keys = &self.properties;
        for (field, value) in [
            ("properties.namespace", &keys.namespace),
            ("properties.target", &keys.target),
            ("properties.threshold", &keys.threshold),
            ("properties.default_target", &keys.default_target),
        ] {
            if value.trim().is_empty() {
                return Err(EvalError::Config(format!("{field} must not be empty")));
            }
        }
        if keys.target == keys.threshold {
            return Err(EvalError::Config(format!(
                "properties.target and properties.threshold must differ, both are '{}'",
                keys.target
            )));
        }
        Ok(())
    }
}
