use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use hephaistos::backups::PatchSource;
use hephaistos::game::{EngineVariant, GameDir};
use hephaistos::hashes::HashError;
use hephaistos::hex::{self, HexCatalogue};
use hephaistos::lua;
use hephaistos::rules;
use hephaistos::safepatch::{SafePatchError, SafePatcher};
use hephaistos::screen::{ScaleContext, Scaling, Screen, DEFAULT_SCREEN};
use hephaistos::sjson;
use hephaistos::tree;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hephaistos")]
#[command(about = "Hades widescreen patcher", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch the game to the given display resolution
    Patch {
        /// Display width in pixels
        width: i32,

        /// Display height in pixels
        height: i32,

        /// Scaling algorithm: 'hor+' or 'pixel'
        #[arg(short, long, default_value_t = Scaling::default())]
        scaling: Scaling,

        /// Center the HUD instead of expanding it to the screen edges
        #[arg(long)]
        center_hud: bool,

        /// Re-baseline from the current files if the game was updated
        #[arg(short, long)]
        force: bool,

        /// Path to the Hades installation directory
        #[arg(short, long, default_value = ".")]
        game_dir: PathBuf,

        /// Custom hex patch catalogue (defaults to the bundled one)
        #[arg(long)]
        hex_catalogue: Option<PathBuf>,

        /// Save directory whose Profile*.sjson files get the resolution set
        #[arg(long)]
        profile_dir: Option<PathBuf>,
    },

    /// Restore all patched files from backups
    Restore {
        /// Path to the Hades installation directory
        #[arg(short, long, default_value = ".")]
        game_dir: PathBuf,
    },

    /// Report patch status without modifying anything
    Status {
        /// Path to the Hades installation directory
        #[arg(short, long, default_value = ".")]
        game_dir: PathBuf,

        /// Custom hex patch catalogue (defaults to the bundled one)
        #[arg(long)]
        hex_catalogue: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Patch {
            width,
            height,
            scaling,
            center_hud,
            force,
            game_dir,
            hex_catalogue,
            profile_dir,
        } => cmd_patch(
            width,
            height,
            scaling,
            center_hud,
            force,
            &game_dir,
            hex_catalogue.as_deref(),
            profile_dir.as_deref(),
        ),

        Commands::Restore { game_dir } => cmd_restore(&game_dir),

        Commands::Status {
            game_dir,
            hex_catalogue,
        } => cmd_status(&game_dir, hex_catalogue.as_deref()),
    }
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalogue(path: Option<&Path>) -> Result<HexCatalogue> {
    Ok(match path {
        Some(path) => hex::load_from_path(path)?,
        None => hex::load_from_str(hex::DEFAULT_CATALOGUE)?,
    })
}

#[allow(clippy::too_many_arguments)]
fn cmd_patch(
    width: i32,
    height: i32,
    scaling: Scaling,
    center_hud: bool,
    force: bool,
    game_dir: &Path,
    hex_catalogue: Option<&Path>,
    profile_dir: Option<&Path>,
) -> Result<()> {
    let game = GameDir::new(game_dir)?;
    let resolution = Screen::new(width, height);
    let ctx = ScaleContext::compute(resolution, scaling, center_hud);
    let catalogue = load_catalogue(hex_catalogue)?;
    let patcher = SafePatcher::new(game.backup_store(), game.fingerprint_store(), force);

    println!(
        "Patching {} for {} ({} scaling, virtual viewport {})",
        game.root().display(),
        resolution,
        scaling,
        ctx.new
    );
    println!();

    let mut failures = 0usize;

    // Engine binaries.
    for &variant in EngineVariant::for_current_platform() {
        let file = game.engine_binary(variant);
        let patches = catalogue.compile(variant.name(), &ctx)?;
        let result = patcher.patch_file(&file, |source| {
            hex::apply(&source.into_bytes(), &patches, &file).map_err(Into::into)
        });
        report(&mut failures, &file, result);
    }

    // SJSON resource files.
    for (relative, transform) in rules::transforms() {
        let file = game.sjson_dir().join(&relative);
        let result = patcher.patch_file(&file, |source| {
            let document = match source {
                PatchSource::Document(document) => document,
                PatchSource::Bytes(bytes) => {
                    sjson::from_str(&String::from_utf8_lossy(&bytes))?
                }
            };
            let patched = tree::apply(&document, &transform, &ctx)?;
            Ok(sjson::to_string(&patched).into_bytes())
        });
        report(&mut failures, &file, result);
    }

    // Lua mod and the hook importing it. The mod is installed first so the
    // hook never points at a missing entry point.
    match lua::install_mod(game.root(), ctx.new) {
        Ok(mod_dir) => println!("{} {}", "✓".green(), mod_dir.display()),
        Err(err) => {
            eprintln!("{} {}: {err}", "✗".red(), lua::mod_dir(game.root()).display());
            failures += 1;
        }
    }
    let scripts = game.scripts_dir();
    let statement = lua::import_statement();
    let result = lua::install_hook(&patcher, &scripts, &statement);
    report(&mut failures, &lua::hook_file(&scripts), result);

    // Save profiles (user data, patched in place without backup).
    if let Some(profile_dir) = profile_dir {
        match patch_profiles(profile_dir, resolution) {
            Ok(edited) if edited.is_empty() => {
                println!(
                    "{}",
                    format!("No Profile*.sjson found in '{}'", profile_dir.display()).yellow()
                );
            }
            Ok(edited) => {
                for file in edited {
                    println!("{} {}", "✓".green(), file.display());
                }
            }
            Err(err) => {
                eprintln!("{} profiles: {err:#}", "✗".red());
                failures += 1;
            }
        }
    }

    println!();
    if failures > 0 {
        anyhow::bail!("{failures} file(s) failed to patch");
    }
    println!("{}", "All files patched.".green().bold());
    Ok(())
}

fn report(failures: &mut usize, file: &Path, result: Result<(), SafePatchError>) {
    match result {
        Ok(()) => println!("{} {}", "✓".green(), file.display()),
        Err(err) => {
            eprintln!("{} {}: {}", "✗".red(), file.display(), err);
            if matches!(err, SafePatchError::Hash(HashError::Mismatch { .. })) {
                eprintln!(
                    "  {}",
                    "The game may have been updated; re-run with --force to re-baseline.".yellow()
                );
            }
            *failures += 1;
        }
    }
}

/// Set the resolution fields in every `Profile*.sjson` under `dir`.
fn patch_profiles(dir: &Path, resolution: Screen) -> Result<Vec<PathBuf>> {
    let mut edited = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_profile = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("Profile") && name.ends_with(".sjson"));
        if !is_profile {
            continue;
        }
        let document = sjson::from_str(&fs::read_to_string(&path)?)?;
        let patched = rules::apply_profile(&document, resolution);
        fs::write(&path, sjson::to_string(&patched))?;
        edited.push(path);
    }
    Ok(edited)
}

fn cmd_restore(game_dir: &Path) -> Result<()> {
    let game = GameDir::new(game_dir)?;
    let patcher = SafePatcher::new(game.backup_store(), game.fingerprint_store(), false);
    let restored = patcher.restore()?;
    let mod_removed = lua::uninstall_mod(game.root())?;
    if restored.is_empty() && !mod_removed {
        println!("Nothing to restore.");
        return Ok(());
    }
    for file in &restored {
        println!("{} {}", "✓".green(), file.display());
    }
    if mod_removed {
        println!("{} {} (removed)", "✓".green(), lua::mod_dir(game.root()).display());
    }
    println!("Restored {} file(s).", restored.len());
    Ok(())
}

fn cmd_status(game_dir: &Path, hex_catalogue: Option<&Path>) -> Result<()> {
    let game = GameDir::new(game_dir)?;
    let catalogue = load_catalogue(hex_catalogue)?;
    // Scanning only needs the original patterns; the context is irrelevant.
    let ctx = ScaleContext::compute(DEFAULT_SCREEN, Scaling::PixelBased, false);

    let mut any_patched = false;

    for &variant in EngineVariant::for_current_platform() {
        let file = game.engine_binary(variant);
        let patches = catalogue.compile(variant.name(), &ctx)?;
        let data = match fs::read(&file) {
            Ok(data) => data,
            Err(err) => {
                eprintln!("{} {} ({}): {err}", "✗".red(), variant, file.display());
                continue;
            }
        };
        let statuses = hex::scan(&data, &patches);
        if hex::is_pristine(&statuses) {
            println!("{} {} ({}): pristine", "✓".green(), variant, file.display());
        } else {
            any_patched = true;
            println!("{} {} ({}): patched", "⊙".yellow(), variant, file.display());
            for status in statuses.iter().filter(|status| !status.pristine) {
                println!("    '{}' default values not found", status.patch);
            }
        }
    }

    if lua::mod_status(game.root()) {
        any_patched = true;
        println!(
            "{} {}: mod installed",
            "⊙".yellow(),
            lua::mod_dir(game.root()).display()
        );
    } else {
        println!(
            "{} {}: no mod",
            "✓".green(),
            lua::mod_dir(game.root()).display()
        );
    }

    let scripts = game.scripts_dir();
    let statement = lua::import_statement();
    match lua::hook_status(&scripts, &statement) {
        Ok(true) => {
            any_patched = true;
            println!(
                "{} {}: hook installed",
                "⊙".yellow(),
                lua::hook_file(&scripts).display()
            );
        }
        Ok(false) => println!(
            "{} {}: no hook",
            "✓".green(),
            lua::hook_file(&scripts).display()
        ),
        Err(err) => eprintln!(
            "{} {}: {err}",
            "✗".red(),
            lua::hook_file(&scripts).display()
        ),
    }

    println!();
    if any_patched {
        println!("{}", "Game is patched.".yellow());
    } else {
        println!("{}", "Game is pristine.".green());
    }
    Ok(())
}
