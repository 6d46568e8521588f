use std::collections::BTreeSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use tracing::warn;

use crate::domain::{Accession, QueryMode, parse_artifact_name};
use crate::error::TaxoError;

/// One JSON artifact per accession per suffix family, all in a single flat
/// directory. Presence of a file IS completion; there is no separate index.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: Utf8PathBuf,
}

impl ArtifactStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<(), TaxoError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| TaxoError::Filesystem(err.to_string()))
    }

    pub fn artifact_path(&self, accession: &Accession, mode: QueryMode) -> Utf8PathBuf {
        self.root.join(mode.file_name(accession))
    }

    /// Presence check only; a prior partial or corrupt write would pass. The
    /// orchestrator guards against that by validating JSON before any write.
    pub fn exists(&self, accession: &Accession, mode: QueryMode) -> bool {
        self.artifact_path(accession, mode).as_std_path().exists()
    }

    /// Serializes pretty-printed JSON to a `.tmp` sibling and renames it into
    /// place, so no partially written artifact is ever visible.
    pub fn write(
        &self,
        accession: &Accession,
        mode: QueryMode,
        value: &Value,
    ) -> Result<Utf8PathBuf, TaxoError> {
        let path = self.artifact_path(accession, mode);
        let content =
            serde_json::to_vec_pretty(value).map_err(|err| TaxoError::Decode(err.to_string()))?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| TaxoError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| TaxoError::Filesystem(err.to_string()))?;
        Ok(path)
    }

    pub fn read_value(&self, accession: &Accession, mode: QueryMode) -> Result<Value, TaxoError> {
        let path = self.artifact_path(accession, mode);
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| TaxoError::Filesystem(err.to_string()))?;
        serde_json::from_str(&content).map_err(|err| TaxoError::Decode(err.to_string()))
    }

    /// Accessions with an artifact in the given family, derived through the
    /// filename codec so the `_taxonomy` family never claims
    /// `*_taxonomy_by_cellorg.json` files. An unreadable root degrades to an
    /// empty set with a warning; reconciliation then reports zero completed
    /// instead of crashing.
    pub fn list_completed(&self, mode: QueryMode) -> BTreeSet<Accession> {
        let entries = match fs::read_dir(self.root.as_std_path()) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(root = %self.root, cause = %err, "store directory unreadable, treating as empty");
                return BTreeSet::new();
            }
        };

        let mut completed = BTreeSet::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some((accession, file_mode)) = parse_artifact_name(name) {
                if file_mode == mode {
                    completed.insert(accession);
                }
            }
        }
        completed
    }

    /// Paths of all artifacts in one family, sorted by file name.
    pub fn list_artifact_paths(&self, mode: QueryMode) -> Vec<Utf8PathBuf> {
        let mut paths: Vec<Utf8PathBuf> = self
            .list_completed(mode)
            .iter()
            .map(|acc| self.artifact_path(acc, mode))
            .collect();
        paths.sort();
        paths
    }
}
