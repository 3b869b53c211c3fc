//! Lua mod: installs the bundled mod files into the game and appends the
//! import hook to the game's script entry point so the Lua-side adjustments
//! load with the game.

use crate::safepatch::{SafePatchError, SafePatcher};
use crate::screen::Screen;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Script the game loads first; the import hook is appended to it.
pub const HOOK_FILE: &str = "RoomManager.lua";

/// Where the mod files are installed, relative to the game directory.
pub const MOD_DIR: &str = "Content/Mods/Hephaistos";

/// Mod entry point the hook imports, relative to the scripts directory.
pub const MOD_ENTRY_POINT: &str = "../Mods/Hephaistos/Hephaistos.lua";

const MOD_ENTRY_POINT_FILE: &str = "Hephaistos.lua";
const MOD_CONFIG_FILE: &str = "HephaistosConfig.lua";

/// The mod sources shipped with the crate. The config file is rewritten for
/// the target viewport at install time.
const MOD_FILES: &[(&str, &str)] = &[
    (MOD_ENTRY_POINT_FILE, include_str!("../lua/Hephaistos.lua")),
    (MOD_CONFIG_FILE, include_str!("../lua/HephaistosConfig.lua")),
];

#[derive(Error, Debug)]
pub enum LuaModError {
    #[error("failed to write mod file {path}: {source}", path = path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove mod directory {path}: {source}", path = path.display())]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub fn import_statement() -> String {
    format!("Import \"{MOD_ENTRY_POINT}\"")
}

pub fn hook_file(scripts_dir: &Path) -> PathBuf {
    scripts_dir.join(HOOK_FILE)
}

pub fn mod_dir(game_root: &Path) -> PathBuf {
    game_root.join(MOD_DIR)
}

/// Install (or reinstall) the mod under `Content/Mods/Hephaistos`, with its
/// config file set to the virtual viewport.
///
/// The mod is not backed up: it does not exist in a pristine installation,
/// so uninstall is plain removal.
pub fn install_mod(game_root: &Path, viewport: Screen) -> Result<PathBuf, LuaModError> {
    let mod_dir = mod_dir(game_root);
    fs::create_dir_all(&mod_dir).map_err(|source| LuaModError::Write {
        path: mod_dir.clone(),
        source,
    })?;
    for (name, content) in MOD_FILES {
        let target = mod_dir.join(name);
        let content = if *name == MOD_CONFIG_FILE {
            configure(content, viewport)
        } else {
            (*content).to_string()
        };
        debug!(file = %target.display(), "writing mod file");
        fs::write(&target, content).map_err(|source| LuaModError::Write {
            path: target.clone(),
            source,
        })?;
    }
    info!(dir = %mod_dir.display(), %viewport, "installed Lua mod");
    Ok(mod_dir)
}

/// Remove the installed mod directory. Returns whether anything was removed.
pub fn uninstall_mod(game_root: &Path) -> Result<bool, LuaModError> {
    let mod_dir = mod_dir(game_root);
    if !mod_dir.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(&mod_dir).map_err(|source| LuaModError::Remove {
        path: mod_dir.clone(),
        source,
    })?;
    info!(dir = %mod_dir.display(), "removed Lua mod");
    Ok(true)
}

/// Whether the mod entry point is currently installed.
pub fn mod_status(game_root: &Path) -> bool {
    mod_dir(game_root).join(MOD_ENTRY_POINT_FILE).is_file()
}

/// Rewrite the viewport assignments in the shipped config template.
fn configure(config: &str, viewport: Screen) -> String {
    let mut out = String::with_capacity(config.len());
    for line in config.lines() {
        if line.starts_with("Hephaistos.ScreenWidth") {
            out.push_str(&format!("Hephaistos.ScreenWidth = {}", viewport.width));
        } else if line.starts_with("Hephaistos.ScreenHeight") {
            out.push_str(&format!("Hephaistos.ScreenHeight = {}", viewport.height));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Append the import hook to the hook file through the safe-patch
/// orchestrator, so repeat patches never stack multiple hooks.
pub fn install_hook(
    patcher: &SafePatcher,
    scripts_dir: &Path,
    import_statement: &str,
) -> Result<(), SafePatchError> {
    let file = hook_file(scripts_dir);
    debug!(file = %file.display(), "patching Lua hook file");
    patcher.patch_file(&file, |source| {
        let mut content = source.into_bytes();
        content.extend_from_slice(
            format!("\n\n-- Hephaistos hook\n{import_statement}\n").as_bytes(),
        );
        Ok(content)
    })
}

/// Whether the hook file currently contains the import hook.
pub fn hook_status(scripts_dir: &Path, import_statement: &str) -> io::Result<bool> {
    let file = hook_file(scripts_dir);
    let text = fs::read_to_string(&file)?;
    Ok(text.contains(import_statement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backups::BackupStore;
    use crate::hashes::FingerprintStore;

    fn patcher_in(dir: &Path) -> SafePatcher {
        let data = dir.join("hephaistos-data");
        SafePatcher::new(
            BackupStore::new(dir, data.join("backups"), data.join("sjson-data")),
            FingerprintStore::new(dir, data.join("hashes")),
            false,
        )
    }

    #[test]
    fn test_hook_appends_once() {
        let temp = tempfile::tempdir().unwrap();
        let scripts = temp.path().join("Content/Scripts");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(scripts.join(HOOK_FILE), "-- room manager\n").unwrap();

        let patcher = patcher_in(temp.path());
        let statement = import_statement();
        assert!(!hook_status(&scripts, &statement).unwrap());

        install_hook(&patcher, &scripts, &statement).unwrap();
        assert!(hook_status(&scripts, &statement).unwrap());

        // Re-running derives from the backup: still exactly one hook.
        install_hook(&patcher, &scripts, &statement).unwrap();
        let text = fs::read_to_string(scripts.join(HOOK_FILE)).unwrap();
        assert_eq!(text.matches(&statement).count(), 1);
        assert!(text.starts_with("-- room manager\n"));
    }

    #[test]
    fn test_mod_install_writes_configured_viewport() {
        let temp = tempfile::tempdir().unwrap();
        assert!(!mod_status(temp.path()));

        let mod_dir = install_mod(temp.path(), Screen::new(2578, 1080)).unwrap();
        assert!(mod_status(temp.path()));
        assert!(mod_dir.join(MOD_ENTRY_POINT_FILE).is_file());

        let config = fs::read_to_string(mod_dir.join(MOD_CONFIG_FILE)).unwrap();
        assert!(config.contains("Hephaistos.ScreenWidth = 2578"), "got: {config}");
        assert!(config.contains("Hephaistos.ScreenHeight = 1080"), "got: {config}");
    }

    #[test]
    fn test_mod_reinstall_rewrites_configuration() {
        let temp = tempfile::tempdir().unwrap();
        install_mod(temp.path(), Screen::new(2578, 1080)).unwrap();
        let mod_dir = install_mod(temp.path(), Screen::new(3440, 1440)).unwrap();

        let config = fs::read_to_string(mod_dir.join(MOD_CONFIG_FILE)).unwrap();
        assert!(config.contains("Hephaistos.ScreenWidth = 3440"), "got: {config}");
        assert!(!config.contains("2578"), "stale viewport left behind: {config}");
    }

    #[test]
    fn test_mod_uninstall_removes_directory() {
        let temp = tempfile::tempdir().unwrap();
        install_mod(temp.path(), Screen::new(2560, 1080)).unwrap();

        assert!(uninstall_mod(temp.path()).unwrap());
        assert!(!mod_status(temp.path()));
        assert!(!mod_dir(temp.path()).exists());

        // Uninstalling a clean installation is a no-op.
        assert!(!uninstall_mod(temp.path()).unwrap());
    }
}
