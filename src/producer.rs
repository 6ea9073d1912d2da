//! Sources of evidence
//!
//! The engine does not care how a result was produced (policy engine, REST
//! probe, hand-written file); it only needs something that yields an artifact.

use crate::artifact::{Artifact, ArtifactFile};
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Anything that can yield an evidence artifact
pub trait EvidenceProducer {
    fn produce(&self) -> Result<Artifact>;
}

/// Evidence read from a YAML or JSON file
#[derive(Debug, Clone)]
pub struct FileEvidence {
    path: PathBuf,
}

impl FileEvidence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EvidenceProducer for FileEvidence {
    fn produce(&self) -> Result<Artifact> {
        ArtifactFile::load(&self.path).map(|file| file.artifact)
    }
}

/// In-memory evidence
impl EvidenceProducer for Artifact {
    fn produce(&self) -> Result<Artifact> {
        Ok(self.clone())
    }
}
