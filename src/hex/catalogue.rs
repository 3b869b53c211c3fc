//! Hex patch catalogues: versioned external data describing byte-pattern
//! substitutions.
//!
//! Expected substitution counts are empirically derived from specific game
//! binary builds, so the catalogue is data loaded from TOML rather than
//! hardcoded logic — it is expected to change whenever the target binaries
//! do, independently of this crate.
//!
//! Patterns are byte regexes with placeholders; replacements are templates
//! of literal bytes, `${N}` capture back-references, and placeholders.
//! Placeholder syntax: `@default.<dim>:<enc>@`, `@new.<dim>:<enc>@`, or
//! `@<number>:<enc>@`, with `<dim>` one of `width`/`height`/`center_x`/
//! `center_y` and `<enc>` one of `i32`/`f32` (little-endian). On the pattern
//! side placeholders expand to regex-escaped literal bytes and `new.*` is
//! rejected (patterns always match pristine content); on the replacement
//! side they expand to raw bytes.

use crate::screen::ScaleContext;
use regex::bytes::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The default catalogue shipped with the crate, matching current game
/// builds.
pub const DEFAULT_CATALOGUE: &str = include_str!("../../catalogues/hades.toml");

#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("failed to read catalogue from {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalogue TOML: {source}")]
    Toml { source: toml_edit::de::Error },

    #[error("invalid catalogue: {}", issues.join("; "))]
    Validation { issues: Vec<String> },

    #[error("patch '{patch}': bad placeholder '{token}': {reason}")]
    Placeholder {
        patch: String,
        token: String,
        reason: String,
    },

    #[error("patch '{patch}': bad replacement template: {reason}")]
    Template { patch: String, reason: String },

    #[error("patch '{patch}': pattern failed to compile: {source}")]
    Regex {
        patch: String,
        source: regex::Error,
    },
}

/// A loaded (uncompiled) hex patch catalogue.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct HexCatalogue {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default, rename = "patch")]
    pub patches: Vec<PatchEntry>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    /// Game build the expected counts were derived from.
    #[serde(default)]
    pub game_version: Option<String>,
}

/// One named byte-pattern substitution rule with per-variant overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct PatchEntry {
    pub name: String,
    pub pattern: String,
    pub replacement: String,
    pub expected_subs: usize,
    #[serde(default)]
    pub overrides: HashMap<String, PatchOverride>,
}

/// Partial per-engine-variant override of a [`PatchEntry`].
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchOverride {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub expected_subs: Option<usize>,
}

pub fn load_from_str(input: &str) -> Result<HexCatalogue, CatalogueError> {
    let catalogue: HexCatalogue =
        toml_edit::de::from_str(input).map_err(|source| CatalogueError::Toml { source })?;
    catalogue.validate()?;
    Ok(catalogue)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<HexCatalogue, CatalogueError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| CatalogueError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents)
}

impl HexCatalogue {
    fn validate(&self) -> Result<(), CatalogueError> {
        let mut issues = Vec::new();
        if self.patches.is_empty() {
            issues.push("catalogue contains no patches".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for patch in &self.patches {
            if patch.name.trim().is_empty() {
                issues.push("patch with empty name".to_string());
            }
            if !seen.insert(patch.name.as_str()) {
                issues.push(format!("duplicate patch name '{}'", patch.name));
            }
            if patch.pattern.trim().is_empty() {
                issues.push(format!("patch '{}' has an empty pattern", patch.name));
            }
            if patch.replacement.trim().is_empty() {
                issues.push(format!("patch '{}' has an empty replacement", patch.name));
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(CatalogueError::Validation { issues })
        }
    }

    /// Merge per-variant overrides and compile every entry against the run
    /// context, preserving catalogue declaration order.
    pub fn compile(
        &self,
        variant: &str,
        ctx: &ScaleContext,
    ) -> Result<Vec<HexPatch>, CatalogueError> {
        self.patches
            .iter()
            .map(|entry| entry.compile(variant, ctx))
            .collect()
    }
}

impl PatchEntry {
    fn compile(&self, variant: &str, ctx: &ScaleContext) -> Result<HexPatch, CatalogueError> {
        let overrides = self.overrides.get(variant);
        let pattern = overrides
            .and_then(|o| o.pattern.as_deref())
            .unwrap_or(&self.pattern);
        let replacement = overrides
            .and_then(|o| o.replacement.as_deref())
            .unwrap_or(&self.replacement);
        let expected_subs = overrides
            .and_then(|o| o.expected_subs)
            .unwrap_or(self.expected_subs);

        let expanded = expand_pattern(&self.name, pattern, ctx)?;
        let regex = RegexBuilder::new(&expanded)
            .unicode(false)
            .build()
            .map_err(|source| CatalogueError::Regex {
                patch: self.name.clone(),
                source,
            })?;
        let replacement = parse_replacement(&self.name, replacement, ctx)?;
        // A back-reference past the pattern's group count would silently
        // expand to zero bytes and corrupt the output while the exact-count
        // guard still passes.
        let groups = regex.captures_len();
        for part in &replacement {
            if let ReplacementPart::Group(idx) = part {
                if *idx >= groups {
                    return Err(CatalogueError::Template {
                        patch: self.name.clone(),
                        reason: format!(
                            "back-reference '${{{idx}}}' exceeds the pattern's {} capture group(s)",
                            groups - 1
                        ),
                    });
                }
            }
        }
        Ok(HexPatch {
            name: self.name.clone(),
            regex,
            replacement,
            expected_subs,
        })
    }
}

/// A compiled catalogue entry, ready to run against a byte buffer.
#[derive(Debug, Clone)]
pub struct HexPatch {
    pub name: String,
    regex: Regex,
    replacement: Vec<ReplacementPart>,
    pub expected_subs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplacementPart {
    Literal(Vec<u8>),
    Group(usize),
}

impl HexPatch {
    /// Replace every pattern occurrence, returning the new buffer and the
    /// substitution count.
    pub fn substitute(&self, data: &[u8]) -> (Vec<u8>, usize) {
        let mut out = Vec::with_capacity(data.len());
        let mut last_end = 0;
        let mut count = 0;
        for caps in self.regex.captures_iter(data) {
            let whole = caps.get(0).expect("capture group 0 always present");
            out.extend_from_slice(&data[last_end..whole.start()]);
            for part in &self.replacement {
                match part {
                    ReplacementPart::Literal(bytes) => out.extend_from_slice(bytes),
                    ReplacementPart::Group(idx) => {
                        if let Some(group) = caps.get(*idx) {
                            out.extend_from_slice(group.as_bytes());
                        }
                    }
                }
            }
            last_end = whole.end();
            count += 1;
        }
        out.extend_from_slice(&data[last_end..]);
        (out, count)
    }

    /// Count pattern occurrences without rewriting anything.
    pub fn count_matches(&self, data: &[u8]) -> usize {
        self.regex.find_iter(data).count()
    }
}

/// Expand placeholders into regex-escaped literal bytes.
fn expand_pattern(patch: &str, pattern: &str, ctx: &ScaleContext) -> Result<String, CatalogueError> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(start) = rest.find('@') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('@')
            .ok_or_else(|| CatalogueError::Placeholder {
                patch: patch.to_string(),
                token: rest[start..].to_string(),
                reason: "unterminated placeholder".to_string(),
            })?;
        let token = &after[..end];
        if token.starts_with("new.") {
            return Err(CatalogueError::Placeholder {
                patch: patch.to_string(),
                token: token.to_string(),
                reason: "patterns match pristine content; 'new.*' values are replacement-only"
                    .to_string(),
            });
        }
        for byte in placeholder_bytes(patch, token, ctx)? {
            // Always hex-escape: the bytes are literals, never regex syntax.
            let _ = write!(out, "\\x{byte:02X}");
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Parse a replacement template into literal/back-reference segments.
///
/// Templates are expanded manually rather than through the regex crate's `$N`
/// expansion because computed replacement bytes may themselves contain `$`.
fn parse_replacement(
    patch: &str,
    template: &str,
    ctx: &ScaleContext,
) -> Result<Vec<ReplacementPart>, CatalogueError> {
    let mut parts: Vec<ReplacementPart> = Vec::new();
    let mut literal: Vec<u8> = Vec::new();
    let mut chars = template.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '@' => {
                let rest = &template[idx + 1..];
                let end = rest.find('@').ok_or_else(|| CatalogueError::Placeholder {
                    patch: patch.to_string(),
                    token: template[idx..].to_string(),
                    reason: "unterminated placeholder".to_string(),
                })?;
                let token = &rest[..end];
                literal.extend(placeholder_bytes(patch, token, ctx)?);
                // Skip past the placeholder body and closing '@'.
                for _ in 0..=end {
                    chars.next();
                }
            }
            '$' => {
                if chars.next_if(|(_, c)| *c == '{').is_none() {
                    return Err(CatalogueError::Template {
                        patch: patch.to_string(),
                        reason: "expected '${N}' back-reference after '$'".to_string(),
                    });
                }
                let mut digits = String::new();
                while let Some((_, digit)) = chars.next_if(|(_, c)| c.is_ascii_digit()) {
                    digits.push(digit);
                }
                if digits.is_empty() || chars.next_if(|(_, c)| *c == '}').is_none() {
                    return Err(CatalogueError::Template {
                        patch: patch.to_string(),
                        reason: "expected '${N}' back-reference after '$'".to_string(),
                    });
                }
                let group = digits.parse::<usize>().map_err(|_| CatalogueError::Template {
                    patch: patch.to_string(),
                    reason: format!("back-reference '${{{digits}}}' out of range"),
                })?;
                if !literal.is_empty() {
                    parts.push(ReplacementPart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(ReplacementPart::Group(group));
            }
            c => {
                let mut buf = [0u8; 4];
                literal.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    if !literal.is_empty() {
        parts.push(ReplacementPart::Literal(literal));
    }
    Ok(parts)
}

/// Resolve one placeholder token to its little-endian bytes.
fn placeholder_bytes(
    patch: &str,
    token: &str,
    ctx: &ScaleContext,
) -> Result<Vec<u8>, CatalogueError> {
    let bad = |reason: &str| CatalogueError::Placeholder {
        patch: patch.to_string(),
        token: token.to_string(),
        reason: reason.to_string(),
    };
    let (source, encoding) = token
        .split_once(':')
        .ok_or_else(|| bad("expected '<value>:<encoding>'"))?;
    let value: f64 = match source.split_once('.') {
        Some((screen, dim)) if screen == "default" || screen == "new" => {
            let screen = if screen == "default" {
                ctx.default
            } else {
                ctx.new
            };
            f64::from(match dim {
                "width" => screen.width,
                "height" => screen.height,
                "center_x" => screen.center_x(),
                "center_y" => screen.center_y(),
                _ => return Err(bad("unknown dimension")),
            })
        }
        _ => source
            .parse::<f64>()
            .map_err(|_| bad("expected 'default.<dim>', 'new.<dim>', or a number"))?,
    };
    match encoding {
        "i32" => Ok((value as i32).to_le_bytes().to_vec()),
        "f32" => Ok((value as f32).to_le_bytes().to_vec()),
        _ => Err(bad("unknown encoding (expected 'i32' or 'f32')")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::{ScaleContext, Scaling, Screen};

    fn ctx() -> ScaleContext {
        ScaleContext::compute(Screen::new(3440, 1440), Scaling::PixelBased, false)
    }

    #[test]
    fn test_load_default_catalogue() {
        let catalogue = load_from_str(DEFAULT_CATALOGUE).unwrap();
        let names: Vec<&str> = catalogue.patches.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "viewport",
                "fullscreen_vector",
                "x86_loadscreen_draw",
                "screencenter_vector"
            ]
        );
        // Declaration order is preserved and the variant overrides survive.
        assert_eq!(catalogue.patches[1].expected_subs, 244);
        assert_eq!(
            catalogue.patches[1].overrides["32-bit"].expected_subs,
            Some(243)
        );
    }

    #[test]
    fn test_compile_merges_variant_overrides() {
        let catalogue = load_from_str(DEFAULT_CATALOGUE).unwrap();
        let directx = catalogue.compile("directx", &ctx()).unwrap();
        let metal = catalogue.compile("metal", &ctx()).unwrap();
        assert_eq!(directx[0].expected_subs, 2);
        assert_eq!(metal[0].expected_subs, 1);
        assert_eq!(directx[3].expected_subs, 486);
        assert_eq!(metal[3].expected_subs, 229);
    }

    #[test]
    fn test_substitute_preserves_captured_context_bytes() {
        let catalogue = load_from_str(
            r#"
            [[patch]]
            name = "viewport"
            pattern = '(\xC7.{5})@default.width:i32@(\xC7.{5})@default.height:i32@'
            replacement = "${1}@new.width:i32@${2}@new.height:i32@"
            expected_subs = 1
            "#,
        )
        .unwrap();
        let patch = &catalogue.compile("directx", &ctx()).unwrap()[0];

        let mut data = Vec::new();
        data.extend_from_slice(&[0xC7, 1, 2, 3, 4, 5]);
        data.extend_from_slice(&1920i32.to_le_bytes());
        data.extend_from_slice(&[0xC7, 9, 8, 7, 6, 5]);
        data.extend_from_slice(&1080i32.to_le_bytes());

        let (patched, count) = patch.substitute(&data);
        assert_eq!(count, 1);
        let mut expected = Vec::new();
        expected.extend_from_slice(&[0xC7, 1, 2, 3, 4, 5]);
        expected.extend_from_slice(&3440i32.to_le_bytes());
        expected.extend_from_slice(&[0xC7, 9, 8, 7, 6, 5]);
        expected.extend_from_slice(&1440i32.to_le_bytes());
        assert_eq!(patched, expected);
    }

    #[test]
    fn test_new_placeholder_rejected_in_pattern() {
        let catalogue = load_from_str(
            r#"
            [[patch]]
            name = "bad"
            pattern = '@new.width:i32@'
            replacement = "@new.width:i32@"
            expected_subs = 1
            "#,
        )
        .unwrap();
        let result = catalogue.compile("directx", &ctx());
        assert!(matches!(result, Err(CatalogueError::Placeholder { .. })));
    }

    #[test]
    fn test_backreference_beyond_capture_groups_rejected() {
        // '${2}' on a single-group pattern would otherwise expand to zero
        // bytes at substitution time.
        let catalogue = load_from_str(
            r#"
            [[patch]]
            name = "dangling"
            pattern = 'A(B)C'
            replacement = "${2}X"
            expected_subs = 1
            "#,
        )
        .unwrap();
        let result = catalogue.compile("directx", &ctx());
        match result {
            Err(CatalogueError::Template { patch, reason }) => {
                assert_eq!(patch, "dangling");
                assert!(reason.contains("${2}"), "got: {reason}");
            }
            other => panic!("expected a template error, got {other:?}"),
        }

        // An in-range back-reference still compiles.
        let catalogue = load_from_str(
            r#"
            [[patch]]
            name = "anchored"
            pattern = 'A(B)C'
            replacement = "${1}X"
            expected_subs = 1
            "#,
        )
        .unwrap();
        assert!(catalogue.compile("directx", &ctx()).is_ok());
    }

    #[test]
    fn test_literal_placeholder() {
        let bytes = placeholder_bytes("p", "1250:f32", &ctx()).unwrap();
        assert_eq!(bytes, 1250.0f32.to_le_bytes().to_vec());
    }

    #[test]
    fn test_validation_rejects_duplicates() {
        let result = load_from_str(
            r#"
            [[patch]]
            name = "dup"
            pattern = 'a'
            replacement = "b"
            expected_subs = 1

            [[patch]]
            name = "dup"
            pattern = 'c'
            replacement = "d"
            expected_subs = 1
            "#,
        );
        assert!(matches!(result, Err(CatalogueError::Validation { .. })));
    }
}
