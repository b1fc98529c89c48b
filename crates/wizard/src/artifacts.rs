use crate::error::Result;
use folio_viz::{ChartData, ChartSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Serialized form of a generated chart: enough to re-render or export it
/// later without recomputing the merged dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub spec: ChartSpec,
    pub data: ChartData,
    pub markup: String,
}

/// Filesystem store for chart artifacts, keyed by principal and artifact id.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(ArtifactStore { root })
    }

    fn path_for(&self, principal: &str, id: &str) -> PathBuf {
        self.root.join(principal).join(format!("{id}.json"))
    }

    /// Persist one artifact.
    pub fn save(&self, principal: &str, id: &str, artifact: &StoredArtifact) -> Result<()> {
        let path = self.path_for(principal, id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, serde_json::to_vec(artifact)?)?;
        Ok(())
    }

    /// Load an artifact; `None` when the backing file is missing.
    ///
    /// Staged artifacts are reclaimable scratch — a missing file is a
    /// reportable condition for the caller, not a panic.
    pub fn load(&self, principal: &str, id: &str) -> Result<Option<StoredArtifact>> {
        match fs::read(self.path_for(principal, id)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the backing file for an artifact still exists.
    #[must_use]
    pub fn exists(&self, principal: &str, id: &str) -> bool {
        self.path_for(principal, id).exists()
    }

    /// Remove one artifact's backing file.
    pub fn remove(&self, principal: &str, id: &str) {
        let path = self.path_for(principal, id);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact");
            }
        }
    }

    /// Delete every artifact the principal owns.
    pub fn clear(&self, principal: &str) {
        let dir = self.root.join(principal);
        if dir.exists() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to clear artifact dir");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_viz::{Aggregation, ChartKind};
    use tempfile::tempdir;

    fn artifact() -> StoredArtifact {
        StoredArtifact {
            spec: ChartSpec {
                kind: ChartKind::Bar,
                x_column: "Data".to_string(),
                y_column: "Valor".to_string(),
                aggregation: Aggregation::Identity,
                title: "Valor by Data".to_string(),
            },
            data: ChartData {
                labels: vec!["a".to_string()],
                values: vec![1.0],
            },
            markup: "<html></html>".to_string(),
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("charts")).unwrap();

        store.save("u1", "chart_1", &artifact()).unwrap();
        let loaded = store.load("u1", "chart_1").unwrap().unwrap();
        assert_eq!(loaded, artifact());
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("charts")).unwrap();

        assert!(store.load("u1", "chart_9").unwrap().is_none());
    }

    #[test]
    fn test_clear_removes_backing_files() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("charts")).unwrap();

        store.save("u1", "chart_1", &artifact()).unwrap();
        store.save("u1", "chart_2", &artifact()).unwrap();
        assert!(store.exists("u1", "chart_1"));

        store.clear("u1");
        assert!(!store.exists("u1", "chart_1"));
        assert!(!store.exists("u1", "chart_2"));
    }
}
