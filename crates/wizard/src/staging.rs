use crate::error::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A workbook written to the staging area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedWorkbook {
    /// Original upload filename; tags merged rows via the `Ficheiro` column.
    pub filename: String,
    /// Sanitized key the file is stored under.
    pub key: String,
    /// Where the staged bytes live on disk.
    pub path: PathBuf,
    /// Catalog result: sheet names in workbook order.
    pub sheets: Vec<String>,
}

/// Filesystem staging area for uploaded workbooks.
///
/// Files are scratch space keyed by principal and sanitized filename; they
/// are removed wholesale on reset, never relied on as durable storage.
#[derive(Debug, Clone)]
pub struct Staging {
    root: PathBuf,
}

impl Staging {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Staging { root })
    }

    /// Write uploaded bytes under the principal's directory.
    pub fn stage(&self, principal: &str, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.root.join(principal);
        fs::create_dir_all(&dir)?;
        let path = dir.join(key);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Remove one staged file, e.g. after its catalog pass failed.
    pub fn discard(&self, principal: &str, key: &str) {
        let path = self.root.join(principal).join(key);
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to discard staged file");
        }
    }

    /// Delete the principal's entire staging directory.
    pub fn clear(&self, principal: &str) {
        let dir = self.root.join(principal);
        if dir.exists() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to clear staging dir");
            }
        }
    }
}

/// Reduce an upload filename to a safe storage key.
///
/// Path components are dropped and anything outside `[A-Za-z0-9._-]`
/// becomes `_`. Returns `None` when nothing usable remains.
#[must_use]
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let base = Path::new(filename).file_name()?.to_str()?;
    let key: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let meaningful = key.chars().any(|c| c.is_ascii_alphanumeric());
    meaningful.then_some(key)
}
