//! Binary Patch Engine: literal byte-pattern search/replace over game
//! binaries, driven by a versioned external catalogue.
//!
//! The engine never parses instructions or symbols; correctness rests on
//! each catalogue entry's exact expected-occurrence count.

pub mod catalogue;
pub mod engine;

pub use catalogue::{
    load_from_path, load_from_str, CatalogueError, HexCatalogue, HexPatch, DEFAULT_CATALOGUE,
};
pub use engine::{apply, is_pristine, scan, EntryStatus, HexPatchError};
