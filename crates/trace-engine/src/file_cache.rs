//! Content-addressed cache for completed trace files.

use std::path::{Path, PathBuf};

use profd_common::error::{ProfdError, ProfdResult};

/// Completed traces live at `<root>/complete/<key>`.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn complete_dir(&self) -> PathBuf {
        self.root.join("complete")
    }

    pub fn complete_path(&self, key: &str) -> PathBuf {
        self.complete_dir().join(key)
    }

    /// Move `source` into the complete cache under `key`, replacing any
    /// previous entry. Falls back to copy-and-remove across filesystems.
    pub fn move_to_complete_cache(&self, key: &str, source: &Path) -> ProfdResult<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(ProfdError::file_cache(format!("Invalid cache key {key:?}")));
        }
        if !source.is_file() {
            return Err(ProfdError::FileNotFound {
                path: source.to_path_buf(),
            });
        }

        std::fs::create_dir_all(self.complete_dir())?;
        let destination = self.complete_path(key);
        if std::fs::rename(source, &destination).is_err() {
            std::fs::copy(source, &destination).map_err(|e| {
                ProfdError::file_cache(format!(
                    "Failed to copy {} to {}: {e}",
                    source.display(),
                    destination.display()
                ))
            })?;
            std::fs::remove_file(source)?;
        }
        tracing::debug!(key, path = %destination.display(), "Trace moved to complete cache");
        Ok(destination)
    }
}
