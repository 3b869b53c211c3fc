//! Binary patch application: catalogue-ordered substitution with exact
//! occurrence counts, plus the read-only status scan.

use super::catalogue::HexPatch;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum HexPatchError {
    /// The substitution count differs from the catalogue's expected count:
    /// wrong binary, or a game update changed the binary layout. Nothing is
    /// written.
    #[error(
        "'{patch}' patching: expected {expected} matches in '{file}', found {actual}",
        file = file.display()
    )]
    PatternCountMismatch {
        patch: String,
        expected: usize,
        actual: usize,
        file: PathBuf,
    },
}

/// Apply every catalogue entry to `data` in declaration order.
///
/// Each entry must substitute exactly its expected count or the whole file
/// fails — the primary guard against silently patching the wrong binary.
pub fn apply(data: &[u8], patches: &[HexPatch], file: &Path) -> Result<Vec<u8>, HexPatchError> {
    let mut data = data.to_vec();
    for patch in patches {
        let (patched, count) = patch.substitute(&data);
        debug!(
            patch = %patch.name,
            count,
            file = %file.display(),
            "replaced pattern occurrences"
        );
        if count != patch.expected_subs {
            return Err(HexPatchError::PatternCountMismatch {
                patch: patch.name.clone(),
                expected: patch.expected_subs,
                actual: count,
                file: file.to_path_buf(),
            });
        }
        data = patched;
    }
    Ok(data)
}

/// Per-entry result of the read-only status scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStatus {
    pub patch: String,
    pub expected_subs: usize,
    /// The original (unpatched) pattern is still present in exactly the
    /// expected count.
    pub pristine: bool,
}

/// Re-scan a buffer and report, per entry with nonzero expected count,
/// whether the original pattern is still present — distinguishes "already
/// patched" from "pristine" without mutating anything.
pub fn scan(data: &[u8], patches: &[HexPatch]) -> Vec<EntryStatus> {
    patches
        .iter()
        .filter(|patch| patch.expected_subs != 0)
        .map(|patch| {
            let actual = patch.count_matches(data);
            EntryStatus {
                patch: patch.name.clone(),
                expected_subs: patch.expected_subs,
                pristine: actual == patch.expected_subs,
            }
        })
        .collect()
}

/// Whether a scanned buffer is fully pristine (every nonzero entry matches).
pub fn is_pristine(statuses: &[EntryStatus]) -> bool {
    statuses.iter().all(|status| status.pristine)
}

#[cfg(test)]
mod tests {
    use super::super::catalogue::load_from_str;
    use super::*;
    use crate::screen::{ScaleContext, Scaling, Screen};

    fn ctx() -> ScaleContext {
        ScaleContext::compute(Screen::new(3440, 1440), Scaling::PixelBased, false)
    }

    fn width_catalogue(expected: usize) -> Vec<HexPatch> {
        load_from_str(&format!(
            r#"
            [[patch]]
            name = "width"
            pattern = '@default.width:i32@'
            replacement = "@new.width:i32@"
            expected_subs = {expected}
            "#
        ))
        .unwrap()
        .compile("directx", &ctx())
        .unwrap()
    }

    fn buffer_with_width_occurrences(n: usize) -> Vec<u8> {
        let mut data = b"header".to_vec();
        for _ in 0..n {
            data.extend_from_slice(&1920i32.to_le_bytes());
            data.extend_from_slice(b"gap");
        }
        data
    }

    #[test]
    fn test_exact_count_patches() {
        let patches = width_catalogue(2);
        let data = buffer_with_width_occurrences(2);
        let patched = apply(&data, &patches, Path::new("Engine.dll")).unwrap();
        assert_eq!(
            patched
                .windows(4)
                .filter(|w| *w == 3440i32.to_le_bytes())
                .count(),
            2
        );
        // No occurrence of the original pattern survives.
        assert_eq!(patches[0].count_matches(&patched), 0);
    }

    #[test]
    fn test_extra_occurrence_fails_with_entry_name() {
        let patches = width_catalogue(2);
        let data = buffer_with_width_occurrences(3);
        let err = apply(&data, &patches, Path::new("Engine.dll")).unwrap_err();
        match err {
            HexPatchError::PatternCountMismatch {
                patch,
                expected,
                actual,
                file,
            } => {
                assert_eq!(patch, "width");
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
                assert_eq!(file, Path::new("Engine.dll"));
            }
        }
    }

    #[test]
    fn test_missing_occurrence_fails() {
        let patches = width_catalogue(2);
        let data = buffer_with_width_occurrences(1);
        assert!(apply(&data, &patches, Path::new("Engine.dll")).is_err());
    }

    #[test]
    fn test_scan_distinguishes_pristine_from_patched() {
        let patches = width_catalogue(2);
        let pristine = buffer_with_width_occurrences(2);
        let statuses = scan(&pristine, &patches);
        assert!(is_pristine(&statuses));

        let patched = apply(&pristine, &patches, Path::new("Engine.dll")).unwrap();
        let statuses = scan(&patched, &patches);
        assert!(!is_pristine(&statuses));
        assert_eq!(statuses[0].patch, "width");
    }

    #[test]
    fn test_scan_skips_zero_expectation_entries() {
        let patches = width_catalogue(0);
        let statuses = scan(&buffer_with_width_occurrences(0), &patches);
        assert!(statuses.is_empty());
    }

    #[test]
    fn test_zero_expectation_entry_passes_on_absent_pattern() {
        let patches = width_catalogue(0);
        let data = b"no pattern here".to_vec();
        let patched = apply(&data, &patches, Path::new("Engine.dll")).unwrap();
        assert_eq!(patched, data);
    }
}
