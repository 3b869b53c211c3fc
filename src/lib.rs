//! Hephaistos: Hades widescreen patcher.
//!
//! Patches the game's engine binaries and SJSON resource files to run at
//! arbitrary resolutions, with Hor+ (default) or pixel-based scaling.
//!
//! # Architecture
//!
//! Two patch engines share one safety layer:
//!
//! - [`hex`]: literal byte-pattern search/replace over engine binaries,
//!   driven by a versioned external catalogue with exact expected-occurrence
//!   counts per entry.
//! - [`tree`]: declarative transformation trees over parsed SJSON documents
//!   ([`sjson`]), with the built-in GUI catalogue in [`rules`].
//!
//! Both run entirely in memory; all writes go through the safe-patch
//! orchestrator ([`safepatch`]), which couples the fingerprint store
//! ([`hashes`]) and the backup store ([`backups`]).
//!
//! # Safety
//!
//! - Every target file is backed up before its first patch
//! - Repeat patches re-derive from the pristine backup (idempotence)
//! - Content fingerprints detect game updates before any write
//! - Atomic file writes (tempfile + fsync + rename)
//! - Patch failures leave the on-disk file untouched
//! - `restore` reverts everything
//!
//! # Example
//!
//! ```no_run
//! use hephaistos::game::{EngineVariant, GameDir};
//! use hephaistos::hex;
//! use hephaistos::safepatch::SafePatcher;
//! use hephaistos::screen::{ScaleContext, Scaling, Screen};
//!
//! # fn main() -> anyhow::Result<()> {
//! let game = GameDir::new("/path/to/Hades")?;
//! let ctx = ScaleContext::compute(Screen::new(3440, 1440), Scaling::HorPlus, false);
//! let catalogue = hex::load_from_str(hex::DEFAULT_CATALOGUE)?;
//! let patcher = SafePatcher::new(game.backup_store(), game.fingerprint_store(), false);
//!
//! for &variant in EngineVariant::for_current_platform() {
//!     let file = game.engine_binary(variant);
//!     let patches = catalogue.compile(variant.name(), &ctx)?;
//!     patcher.patch_file(&file, |source| {
//!         hex::apply(&source.into_bytes(), &patches, &file).map_err(Into::into)
//!     })?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod backups;
pub mod game;
pub mod hashes;
pub mod hex;
pub mod lua;
pub mod rules;
pub mod safepatch;
pub mod screen;
pub mod sjson;
pub mod tree;

// Re-exports
pub use backups::{BackupError, BackupStore, PatchSource};
pub use game::{EngineVariant, GameDir, GameDirError};
pub use hashes::{FingerprintStore, HashError};
pub use hex::{CatalogueError, HexCatalogue, HexPatchError};
pub use safepatch::{SafePatchError, SafePatcher};
pub use screen::{ScaleContext, Scaling, Screen, DEFAULT_SCREEN};
pub use sjson::{Map, Value};
pub use tree::{FieldRule, LeafRule, NodeTransform, TransformError, ValueOp};
