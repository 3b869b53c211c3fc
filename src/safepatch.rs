//! Safe-patch orchestration: every target file write goes through the
//! fingerprint check, the backup store and an atomic replace, making patch
//! runs idempotent and fully reversible.

use crate::backups::{BackupError, BackupStore, PatchSource};
use crate::hashes::{FingerprintStore, HashError};
use crate::hex::HexPatchError;
use crate::sjson;
use crate::tree::TransformError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SafePatchError {
    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Hex(#[from] HexPatchError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("failed to parse SJSON: {0}")]
    Sjson(#[from] sjson::ParseError),

    #[error("I/O error on {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Couples the backup and fingerprint stores into the safe-patch algorithm.
#[derive(Debug)]
pub struct SafePatcher {
    backups: BackupStore,
    hashes: FingerprintStore,
    /// Re-baseline from the current on-disk content on fingerprint mismatch
    /// instead of failing.
    force: bool,
}

impl SafePatcher {
    pub fn new(backups: BackupStore, hashes: FingerprintStore, force: bool) -> Self {
        Self {
            backups,
            hashes,
            force,
        }
    }

    /// Patch one target file from its pristine source.
    ///
    /// `apply` runs entirely in memory over the pristine [`PatchSource`]; the
    /// target is only replaced (atomically) when it succeeds, then the new
    /// content is fingerprinted. Repeat runs re-derive from the backup, so
    /// patching is idempotent. A fingerprint mismatch means the file changed
    /// outside our control (typically a game update): without `force` the
    /// patch fails, with `force` the stale backup and fingerprint are
    /// discarded and the current content becomes the new pristine baseline.
    pub fn patch_file<F>(&self, file: &Path, apply: F) -> Result<(), SafePatchError>
    where
        F: FnOnce(PatchSource) -> Result<Vec<u8>, SafePatchError>,
    {
        let source = match self.hashes.check(file) {
            Ok(true) => {
                debug!(file = %file.display(), "unchanged since last patch, re-patching from backup");
                self.backups.get(file)?
            }
            Ok(false) => {
                debug!(file = %file.display(), "first touch, backing up");
                self.backups.store(file)?
            }
            Err(HashError::Mismatch { .. }) if self.force => {
                warn!(
                    file = %file.display(),
                    "file changed since last patch, discarding stale backup (forced)"
                );
                self.backups.discard(file)?;
                self.hashes.discard(file)?;
                self.backups.store(file)?
            }
            Err(err) => return Err(err.into()),
        };
        let patched = apply(source)?;
        atomic_write(file, &patched)?;
        self.hashes.store(file)?;
        info!(file = %file.display(), "patched");
        Ok(())
    }

    /// Put every touched file back to its pristine content and drop all
    /// fingerprints, backups and snapshots.
    pub fn restore(&self) -> Result<Vec<PathBuf>, SafePatchError> {
        let restored = self.backups.restore()?;
        self.hashes.invalidate()?;
        Ok(restored)
    }
}

/// Replace `path` without ever exposing a partially-written file: write to a
/// temporary sibling, flush to disk, then rename over the target.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), SafePatchError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let io_err = |source| SafePatchError::Io {
        path: path.to_path_buf(),
        source,
    };
    // Preserve the original permission bits; persist() keeps the temp file's.
    let permissions = fs::metadata(path).map(|meta| meta.permissions()).ok();
    let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    if let Some(permissions) = permissions {
        temp.as_file().set_permissions(permissions).map_err(io_err)?;
    }
    temp.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}
