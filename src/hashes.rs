//! Fingerprint store: content hashes recorded after each successful patch.
//!
//! A stored fingerprint that matches the live file content proves the file
//! has not changed since we last patched it, so the corresponding backup is
//! known-good and safe to reuse as the patch source. A mismatch means the
//! file changed outside our control (typically a game update).

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

const HASH_FILE_EXTENSION: &str = "xxh3";

#[derive(Error, Debug)]
pub enum HashError {
    /// A fingerprint is stored but disagrees with the live content: the file
    /// was modified since the last patch.
    #[error("fingerprint mismatch: '{file}' was modified since the last patch", file = file.display())]
    Mismatch { file: PathBuf },

    #[error("target file is not under the game directory: {file}", file = file.display())]
    OutsideGameDir { file: PathBuf },

    #[error("I/O error on {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Per-target-file content fingerprints, mirrored under a tool-private
/// directory.
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    /// Directory the target files live under; record paths mirror paths
    /// relative to it.
    base: PathBuf,
    /// Root of the fingerprint area.
    root: PathBuf,
}

impl FingerprintStore {
    pub fn new(base: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            root: root.into(),
        }
    }

    /// Check a target file against its stored fingerprint.
    ///
    /// Returns `Ok(false)` when no fingerprint is stored (never touched),
    /// `Ok(true)` on a match, and [`HashError::Mismatch`] when a fingerprint
    /// exists but disagrees (touched then changed).
    pub fn check(&self, file: &Path) -> Result<bool, HashError> {
        let record = self.record_path(file)?;
        if !record.exists() {
            return Ok(false);
        }
        let stored = fs::read_to_string(&record).map_err(|source| HashError::Io {
            path: record.clone(),
            source,
        })?;
        let current = hash_file(file)?;
        if stored.trim() != current {
            return Err(HashError::Mismatch {
                file: file.to_path_buf(),
            });
        }
        Ok(true)
    }

    /// Compute and persist the current content hash, overwriting any prior
    /// value.
    pub fn store(&self, file: &Path) -> Result<(), HashError> {
        let record = self.record_path(file)?;
        if let Some(parent) = record.parent() {
            fs::create_dir_all(parent).map_err(|source| HashError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let current = hash_file(file)?;
        fs::write(&record, &current).map_err(|source| HashError::Io {
            path: record.clone(),
            source,
        })?;
        debug!(file = %file.display(), record = %record.display(), "stored fingerprint");
        Ok(())
    }

    /// Remove a single file's fingerprint (forced re-baseline).
    pub fn discard(&self, file: &Path) -> Result<(), HashError> {
        let record = self.record_path(file)?;
        if record.exists() {
            fs::remove_file(&record).map_err(|source| HashError::Io {
                path: record.clone(),
                source,
            })?;
            debug!(file = %file.display(), "discarded fingerprint");
        }
        Ok(())
    }

    /// Clear all stored fingerprints (full restore or forced re-patch).
    pub fn invalidate(&self) -> Result<(), HashError> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root).map_err(|source| HashError::Io {
                path: self.root.clone(),
                source,
            })?;
            info!(root = %self.root.display(), "invalidated fingerprints");
        }
        Ok(())
    }

    /// Fingerprint record path mirroring the target's relative path, with the
    /// hash extension appended (not substituted, to keep distinct targets
    /// with a shared stem distinct).
    fn record_path(&self, file: &Path) -> Result<PathBuf, HashError> {
        let relative = file
            .strip_prefix(&self.base)
            .map_err(|_| HashError::OutsideGameDir {
                file: file.to_path_buf(),
            })?;
        let mut name = relative.as_os_str().to_os_string();
        name.push(".");
        name.push(HASH_FILE_EXTENSION);
        Ok(self.root.join(name))
    }
}

fn hash_file(file: &Path) -> Result<String, HashError> {
    let content = fs::read(file).map_err(|source| HashError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    Ok(format!("{:016x}", xxh3_64(&content)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> FingerprintStore {
        FingerprintStore::new(dir, dir.join("hephaistos-data/hashes"))
    }

    #[test]
    fn test_check_without_fingerprint_is_first_touch() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("Engine.dll");
        fs::write(&file, b"pristine").unwrap();

        let store = store_in(temp.path());
        assert!(!store.check(&file).unwrap());
    }

    #[test]
    fn test_store_then_check_matches() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("Engine.dll");
        fs::write(&file, b"patched").unwrap();

        let store = store_in(temp.path());
        store.store(&file).unwrap();
        assert!(store.check(&file).unwrap());
    }

    #[test]
    fn test_modified_file_reports_mismatch() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("Engine.dll");
        fs::write(&file, b"patched").unwrap();

        let store = store_in(temp.path());
        store.store(&file).unwrap();
        fs::write(&file, b"game update changed me").unwrap();

        let result = store.check(&file);
        assert!(matches!(result, Err(HashError::Mismatch { .. })));
    }

    #[test]
    fn test_invalidate_clears_all() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("Engine.dll");
        fs::write(&file, b"patched").unwrap();

        let store = store_in(temp.path());
        store.store(&file).unwrap();
        store.invalidate().unwrap();
        assert!(!store.check(&file).unwrap());
    }

    #[test]
    fn test_outside_base_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp.path().join("game"));
        let result = store.check(Path::new("/elsewhere/file.dll"));
        assert!(matches!(result, Err(HashError::OutsideGameDir { .. })));
    }
}
