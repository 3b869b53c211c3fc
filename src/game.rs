//! Game installation model: directory layout validation, the engine
//! variants shipped per platform, and the tool-private data area.

use crate::backups::BackupStore;
use crate::hashes::FingerprintStore;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level directory holding backups, snapshots and fingerprints, created
/// inside the game directory so everything travels with the installation.
pub const DATA_DIR_NAME: &str = "hephaistos-data";

const BACKUPS_DIR: &str = "backups";
const SNAPSHOTS_DIR: &str = "sjson-data";
const HASHES_DIR: &str = "hashes";

const GAME_DIR_DIRS_WINDOWS_LINUX: &[&str] = &["Content", "x64", "x64Vk", "x86"];
const GAME_DIR_DIRS_MACOS: &[&str] = &["Game.macOS.app"];

#[derive(Error, Debug)]
pub enum GameDirError {
    #[error("did not find expected directory '{missing}' in '{dir}'", dir = dir.display())]
    NotGameDir { dir: PathBuf, missing: String },
}

/// The graphics backends a Hades installation ships engine binaries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineVariant {
    DirectX,
    Vulkan,
    X86,
    Metal,
}

impl EngineVariant {
    /// Catalogue override key and display name.
    pub fn name(&self) -> &'static str {
        match self {
            EngineVariant::DirectX => "directx",
            EngineVariant::Vulkan => "vulkan",
            EngineVariant::X86 => "32-bit",
            EngineVariant::Metal => "metal",
        }
    }

    /// Engine binary path relative to the game directory.
    pub fn binary_path(&self) -> &'static Path {
        Path::new(match self {
            EngineVariant::DirectX => "x64/EngineWin64s.dll",
            EngineVariant::Vulkan => "x64Vk/EngineWin64sv.dll",
            EngineVariant::X86 => "x86/EngineWin32s.dll",
            EngineVariant::Metal => "Game.macOS.app/Contents/MacOS/Game.macOS",
        })
    }

    /// The variants present in the current platform's installation.
    pub fn for_current_platform() -> &'static [EngineVariant] {
        if cfg!(target_os = "macos") {
            &[EngineVariant::Metal]
        } else {
            &[
                EngineVariant::DirectX,
                EngineVariant::Vulkan,
                EngineVariant::X86,
            ]
        }
    }
}

impl fmt::Display for EngineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated Hades installation directory.
#[derive(Debug, Clone)]
pub struct GameDir {
    root: PathBuf,
}

impl GameDir {
    /// Validate that `root` looks like a Hades installation by checking for
    /// the platform's expected subdirectories.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, GameDirError> {
        let root = root.into();
        let expected = if cfg!(target_os = "macos") {
            GAME_DIR_DIRS_MACOS
        } else {
            GAME_DIR_DIRS_WINDOWS_LINUX
        };
        for name in expected {
            if !root.join(name).is_dir() {
                return Err(GameDirError::NotGameDir {
                    dir: root,
                    missing: (*name).to_string(),
                });
            }
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of an engine variant's binary.
    pub fn engine_binary(&self, variant: EngineVariant) -> PathBuf {
        self.root.join(variant.binary_path())
    }

    /// Root of the game's SJSON resource tree.
    pub fn sjson_dir(&self) -> PathBuf {
        self.root.join("Content/Game")
    }

    /// Directory holding the game's Lua scripts (and the hook file).
    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join("Content/Scripts")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR_NAME)
    }

    pub fn backup_store(&self) -> BackupStore {
        let data = self.data_dir();
        BackupStore::new(
            &self.root,
            data.join(BACKUPS_DIR),
            data.join(SNAPSHOTS_DIR),
        )
    }

    pub fn fingerprint_store(&self) -> FingerprintStore {
        FingerprintStore::new(&self.root, self.data_dir().join(HASHES_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    pub(crate) fn make_game_dir(root: &Path) {
        let dirs: &[&str] = if cfg!(target_os = "macos") {
            &["Game.macOS.app/Contents/MacOS", "Content/Game", "Content/Scripts"]
        } else {
            &["x64", "x64Vk", "x86", "Content/Game", "Content/Scripts"]
        };
        for dir in dirs {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
    }

    #[test]
    fn test_valid_game_dir() {
        let temp = tempfile::tempdir().unwrap();
        make_game_dir(temp.path());
        let game = GameDir::new(temp.path()).unwrap();
        assert_eq!(game.data_dir(), temp.path().join("hephaistos-data"));
        assert!(game.sjson_dir().ends_with("Content/Game"));
    }

    #[test]
    fn test_missing_subdir_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let err = GameDir::new(temp.path()).unwrap_err();
        let GameDirError::NotGameDir { missing, .. } = err;
        assert!(!missing.is_empty());
    }

    #[test]
    fn test_variant_names_match_catalogue_keys() {
        assert_eq!(EngineVariant::X86.name(), "32-bit");
        assert_eq!(EngineVariant::Metal.name(), "metal");
        assert!(!EngineVariant::for_current_platform().is_empty());
    }
}
