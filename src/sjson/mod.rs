//! SJSON: the game's superset-of-JSON data format.
//!
//! Adds unquoted map keys and trailing commas on top of JSON. Documents are
//! ordered-map-and-sequence trees ([`Value`]) that serialize back preserving
//! key order.

mod de;
mod ser;
mod value;

pub use de::{from_str, ParseError};
pub use ser::to_string;
pub use value::{Map, Value};

/// File extension of structured-data target files.
pub const SJSON_SUFFIX: &str = "sjson";

/// Whether a path is a structured-data (SJSON) target.
pub fn is_sjson_path(path: &std::path::Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(SJSON_SUFFIX)
}
