//! Write touched artifacts back to where they came from
//!
//! Each artifact is written independently: a failure on one file is recorded
//! and the remaining files are still attempted.

use crate::artifact::{ArtifactFile, Timestamp};
use crate::error::EvalError;
use crate::merge::merge;
use serde::Serialize;
use std::path::PathBuf;

/// One artifact that could not be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistFailure {
    pub path: PathBuf,
    pub error: String,
}

/// What happened during write-back
#[derive(Debug, Clone, Default, Serialize)]
pub struct PersistSummary {
    pub written: Vec<PathBuf>,
    pub failures: Vec<PersistFailure>,
}

impl PersistSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Write every modified artifact back to its source path
///
/// Unmodified artifacts are skipped and stay byte-identical on disk.
pub fn persist_modified(files: &[ArtifactFile], stamp_last_modified: bool) -> PersistSummary {
    let mut summary = PersistSummary::default();

    for file in files.iter().filter(|f| f.is_modified()) {
        let mut updated = file.artifact.clone();
        if stamp_last_modified {
            updated.metadata.last_modified = Some(Timestamp::now());
        }
        let merged = merge(file.original(), &updated);

        match file.write(&merged) {
            Ok(()) => {
                tracing::info!(path = %file.path.display(), "artifact written");
                summary.written.push(file.path.clone());
            }
            Err(source) => {
                let err = EvalError::Persist {
                    path: file.path.clone(),
                    source: Box::new(source),
                };
                tracing::error!("{}", err);
                summary.failures.push(PersistFailure {
                    path: file.path.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Property;
    use crate::properties::CURRENT_NAMESPACE;
    use std::fs;

    const DOC: &str = r#"{
  "assessment-results": {
    "uuid": "ar-1",
    "metadata": {"title": "t", "last-modified": "2024-01-01T00:00:00Z"},
    "results": [
      {"uuid": "r-1", "description": "d", "start": "2024-01-01T00:00:00Z",
       "findings": [{"target": {"target-id": "ac-1", "status": {"state": "satisfied"}}}]}
    ]
  }
}"#;

    fn load(dir: &tempfile::TempDir, name: &str) -> ArtifactFile {
        let path = dir.path().join(name);
        fs::write(&path, DOC).unwrap();
        ArtifactFile::load(&path).unwrap()
    }

    fn mark(file: &mut ArtifactFile) {
        file.artifact.results[0]
            .props
            .push(Property::new("threshold", CURRENT_NAMESPACE, "true"));
    }

    #[test]
    fn test_unmodified_files_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let file = load(&dir, "ar.json");
        let summary = persist_modified(&[file], true);
        assert!(summary.written.is_empty());
        assert_eq!(fs::read_to_string(dir.path().join("ar.json")).unwrap(), DOC);
    }

    #[test]
    fn test_modified_file_rewritten_with_stamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = load(&dir, "ar.json");
        mark(&mut file);

        let summary = persist_modified(std::slice::from_ref(&file), true);

        assert!(summary.is_clean());
        assert_eq!(summary.written, vec![file.path.clone()]);
        let reread = ArtifactFile::load(&file.path).unwrap();
        assert_eq!(reread.artifact.uuid, "ar-1");
        assert_eq!(reread.artifact.results[0].props[0].value, "true");
        assert_ne!(
            reread.artifact.metadata.last_modified,
            file.original().metadata.last_modified
        );
    }

    #[test]
    fn test_failure_reported_per_file_and_others_still_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut good = load(&dir, "good.json");
        let mut bad = load(&dir, "bad.json");
        mark(&mut good);
        mark(&mut bad);
        // Replace the target with a directory so the write fails.
        fs::remove_file(&bad.path).unwrap();
        fs::create_dir(&bad.path).unwrap();

        let summary = persist_modified(&[bad.clone(), good.clone()], false);

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].path, bad.path);
        assert!(summary.failures[0].error.contains("bad.json"));
        assert_eq!(summary.written, vec![good.path.clone()]);
    }
}
