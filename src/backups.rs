//! Backup store: pristine copies of every target file touched by a patch.
//!
//! Backups are the canonical re-patch source: repeat patches are always
//! re-derived from the pristine copy, never from the previously-patched
//! file. Structured files additionally get a parsed-document snapshot so
//! repeat patches skip the SJSON parse of the original.

use crate::sjson::{self, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("backup for '{file}' is missing", file = file.display())]
    Missing { file: PathBuf },

    #[error("target file is not under the game directory: {file}", file = file.display())]
    OutsideGameDir { file: PathBuf },

    #[error("failed to parse SJSON from {file}: {source}", file = file.display())]
    Sjson {
        file: PathBuf,
        source: sjson::ParseError,
    },

    #[error("I/O error on {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("backup walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

/// The pristine content a patch is derived from.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchSource {
    /// Raw original bytes (binary and plain-text targets).
    Bytes(Vec<u8>),
    /// Parsed original document (structured targets).
    Document(Value),
}

impl PatchSource {
    /// The source as writable bytes; documents are re-serialized.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            PatchSource::Bytes(bytes) => bytes,
            PatchSource::Document(document) => sjson::to_string(&document).into_bytes(),
        }
    }
}

/// Pristine copies of target files, mirrored under tool-private directories.
#[derive(Debug, Clone)]
pub struct BackupStore {
    /// Directory the target files live under.
    base: PathBuf,
    /// Raw byte copies, mirroring paths relative to `base`.
    backups_root: PathBuf,
    /// Parsed-document snapshots for structured files.
    snapshots_root: PathBuf,
}

impl BackupStore {
    pub fn new(
        base: impl Into<PathBuf>,
        backups_root: impl Into<PathBuf>,
        snapshots_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base: base.into(),
            backups_root: backups_root.into(),
            snapshots_root: snapshots_root.into(),
        }
    }

    /// Copy a target file's current content into the backup area and return
    /// it as the patch source.
    ///
    /// No-op if a backup already exists (also heals a crash between backup
    /// store and fingerprint store): the existing backup wins, since the
    /// on-disk file may already be patched.
    pub fn store(&self, file: &Path) -> Result<PatchSource, BackupError> {
        let backup = self.backup_path(file)?;
        if backup.exists() {
            debug!(file = %file.display(), "backup already exists, reusing");
            return self.get(file);
        }
        let content = read(file)?;
        write_creating_dirs(&backup, &content)?;
        debug!(file = %file.display(), backup = %backup.display(), "backed up");
        if sjson::is_sjson_path(file) {
            let text = String::from_utf8_lossy(&content);
            let document = sjson::from_str(&text).map_err(|source| BackupError::Sjson {
                file: file.to_path_buf(),
                source,
            })?;
            let snapshot = self.snapshot_path(file)?;
            write_creating_dirs(&snapshot, sjson::to_string(&document).as_bytes())?;
            debug!(file = %file.display(), snapshot = %snapshot.display(), "snapshotted document");
            Ok(PatchSource::Document(document))
        } else {
            Ok(PatchSource::Bytes(content))
        }
    }

    /// Return the existing backup without re-copying.
    pub fn get(&self, file: &Path) -> Result<PatchSource, BackupError> {
        let backup = self.backup_path(file)?;
        if !backup.exists() {
            return Err(BackupError::Missing {
                file: file.to_path_buf(),
            });
        }
        if sjson::is_sjson_path(file) {
            // Prefer the snapshot; fall back to re-parsing the raw backup if
            // it is missing.
            let snapshot = self.snapshot_path(file)?;
            let source_file = if snapshot.exists() { snapshot } else { backup };
            let text = fs::read_to_string(&source_file).map_err(|source| BackupError::Io {
                path: source_file.clone(),
                source,
            })?;
            let document = sjson::from_str(&text).map_err(|source| BackupError::Sjson {
                file: source_file,
                source,
            })?;
            Ok(PatchSource::Document(document))
        } else {
            Ok(PatchSource::Bytes(read(&backup)?))
        }
    }

    /// Permanently remove a superseded backup and snapshot (forced
    /// re-baseline from the current on-disk file).
    pub fn discard(&self, file: &Path) -> Result<(), BackupError> {
        for path in [self.backup_path(file)?, self.snapshot_path(file)?] {
            if path.exists() {
                fs::remove_file(&path).map_err(|source| BackupError::Io {
                    path: path.clone(),
                    source,
                })?;
                debug!(path = %path.display(), "discarded backup");
            }
        }
        Ok(())
    }

    /// Write every backed-up file's original content back to its original
    /// path, then remove the backup and snapshot areas.
    ///
    /// Returns the restored target paths.
    pub fn restore(&self) -> Result<Vec<PathBuf>, BackupError> {
        let mut restored = Vec::new();
        if !self.backups_root.exists() {
            info!(root = %self.backups_root.display(), "no backups to restore");
            return Ok(restored);
        }
        for entry in WalkDir::new(&self.backups_root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.backups_root)
                .expect("walkdir yields paths under its root");
            let target = self.base.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|source| BackupError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::copy(entry.path(), &target).map_err(|source| BackupError::Io {
                path: target.clone(),
                source,
            })?;
            debug!(target = %target.display(), "restored original");
            restored.push(target);
        }
        for root in [&self.backups_root, &self.snapshots_root] {
            if root.exists() {
                fs::remove_dir_all(root).map_err(|source| BackupError::Io {
                    path: root.clone(),
                    source,
                })?;
            }
        }
        info!(count = restored.len(), "restored backups");
        Ok(restored)
    }

    fn backup_path(&self, file: &Path) -> Result<PathBuf, BackupError> {
        Ok(self.backups_root.join(self.relative(file)?))
    }

    fn snapshot_path(&self, file: &Path) -> Result<PathBuf, BackupError> {
        Ok(self.snapshots_root.join(self.relative(file)?))
    }

    fn relative<'p>(&self, file: &'p Path) -> Result<&'p Path, BackupError> {
        file.strip_prefix(&self.base)
            .map_err(|_| BackupError::OutsideGameDir {
                file: file.to_path_buf(),
            })
    }
}

fn read(path: &Path) -> Result<Vec<u8>, BackupError> {
    fs::read(path).map_err(|source| BackupError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_creating_dirs(path: &Path, content: &[u8]) -> Result<(), BackupError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| BackupError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| BackupError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> BackupStore {
        BackupStore::new(
            dir,
            dir.join("hephaistos-data/backups"),
            dir.join("hephaistos-data/sjson-data"),
        )
    }

    #[test]
    fn test_store_and_get_binary() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("x64/Engine.dll");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"original bytes").unwrap();

        let store = store_in(temp.path());
        let source = store.store(&file).unwrap();
        assert_eq!(source, PatchSource::Bytes(b"original bytes".to_vec()));

        // Mutate the target; the backup must still serve the original.
        fs::write(&file, b"patched bytes").unwrap();
        let source = store.get(&file).unwrap();
        assert_eq!(source, PatchSource::Bytes(b"original bytes".to_vec()));
    }

    #[test]
    fn test_store_is_noop_when_backup_exists() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("Engine.dll");
        fs::write(&file, b"original").unwrap();

        let store = store_in(temp.path());
        store.store(&file).unwrap();
        fs::write(&file, b"patched").unwrap();

        // A second store must not overwrite the pristine copy.
        let source = store.store(&file).unwrap();
        assert_eq!(source, PatchSource::Bytes(b"original".to_vec()));
    }

    #[test]
    fn test_store_sjson_returns_parsed_snapshot() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("Content/Game/GUI/AboutScreen.sjson");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "{AboutScreen: {Back: {Width: 1920,},},}").unwrap();

        let store = store_in(temp.path());
        let source = store.store(&file).unwrap();
        let PatchSource::Document(doc) = source else {
            panic!("expected a document source");
        };
        assert!(doc.as_map().unwrap().contains_key("AboutScreen"));

        // Repeat access goes through the snapshot and parses identically.
        let PatchSource::Document(again) = store.get(&file).unwrap() else {
            panic!("expected a document source");
        };
        assert_eq!(doc, again);
    }

    #[test]
    fn test_get_missing_backup_errors() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(temp.path());
        let result = store.get(&temp.path().join("Engine.dll"));
        assert!(matches!(result, Err(BackupError::Missing { .. })));
    }

    #[test]
    fn test_restore_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let binary = temp.path().join("x64/Engine.dll");
        let data = temp.path().join("Content/Game/GUI/Screen.sjson");
        fs::create_dir_all(binary.parent().unwrap()).unwrap();
        fs::create_dir_all(data.parent().unwrap()).unwrap();
        fs::write(&binary, b"original binary").unwrap();
        fs::write(&data, "{Screen: {X: 960}}").unwrap();

        let store = store_in(temp.path());
        store.store(&binary).unwrap();
        store.store(&data).unwrap();
        fs::write(&binary, b"patched binary").unwrap();
        fs::write(&data, "{Screen: {X: 1289}}").unwrap();

        let mut restored = store.restore().unwrap();
        restored.sort();
        assert_eq!(restored.len(), 2);
        assert_eq!(fs::read(&binary).unwrap(), b"original binary");
        assert_eq!(fs::read_to_string(&data).unwrap(), "{Screen: {X: 960}}");
        // Backup area is gone: a fresh restore has nothing to do.
        assert!(store.restore().unwrap().is_empty());
    }

    #[test]
    fn test_discard_removes_backup() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("Engine.dll");
        fs::write(&file, b"original").unwrap();

        let store = store_in(temp.path());
        store.store(&file).unwrap();
        store.discard(&file).unwrap();
        assert!(matches!(
            store.get(&file),
            Err(BackupError::Missing { .. })
        ));
    }
}
