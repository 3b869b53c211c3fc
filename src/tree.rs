//! Structured Patch Engine: declarative transformation trees over SJSON
//! documents.
//!
//! A transform tree is shaped like the document's own key structure and is
//! walked recursively, extending a dotted path used for diagnostics. All
//! transformations are pure: they consume a clone of the node and return a
//! new value, so a failed transform never leaves the source document
//! observably changed.

use crate::screen::ScaleContext;
use crate::sjson::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// A transform path names a field the document does not have and no
    /// default was supplied — schema drift, fatal for the file.
    #[error("did not find '{path}'")]
    MissingField { path: String },

    #[error("expected a {expected} at '{path}', found a {found}")]
    UnexpectedKind {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// One node of a transform tree.
#[derive(Debug, Clone)]
pub enum NodeTransform {
    /// Recurse into the named children of a map node.
    Map(Vec<(String, NodeTransform)>),
    /// Broadcast rules over every element of a sequence node.
    Seq(Vec<LeafRule>),
    /// Apply rules to the current map node.
    Leaf(Vec<LeafRule>),
}

/// A rule applied to one map node.
#[derive(Debug, Clone)]
pub enum LeafRule {
    /// Rewrite named fields in place; a missing field with a default is
    /// inserted, a missing field without one is an error.
    Update(Vec<FieldRule>),
    /// Activate only when `key` equals `equals` on this node; otherwise pass
    /// through unchanged. When active, upsert the sibling fields (a missing
    /// sibling without a default is skipped).
    IfSibling {
        key: String,
        equals: String,
        fields: Vec<FieldRule>,
    },
}

/// One field rewrite: the callback plus an optional default to insert when
/// the field is absent.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: String,
    pub op: ValueOp,
    pub default: Option<Value>,
}

impl FieldRule {
    pub fn new(field: impl Into<String>, op: ValueOp) -> Self {
        Self {
            field: field.into(),
            op,
            default: None,
        }
    }

    pub fn with_default(field: impl Into<String>, op: ValueOp, default: Value) -> Self {
        Self {
            field: field.into(),
            op,
            default: Some(default),
        }
    }
}

/// Value-rewriting callbacks, closed over the run context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueOp {
    /// Keep the offset from the horizontal screen center.
    RecenterX,
    /// Keep the offset from the vertical screen center.
    RecenterY,
    /// Pinned to the left edge: unchanged, unless the HUD is centered.
    FixedFromLeft,
    /// Keep the offset from the right edge; `center_hud` forces or
    /// suppresses HUD centering regardless of the context flag.
    FixedFromRight { center_hud: Option<bool> },
    /// Keep the offset from the bottom edge.
    FixedFromBottom,
    /// Multiply by the horizontal scale factor.
    RescaleX,
    /// Multiply by the vertical scale factor.
    RescaleY,
    /// Multiply by the uniform (max-axis) scale factor.
    Rescale,
    /// Shift a child element's OffsetX/OffsetY by the viewport growth,
    /// compensated by the element's own Scale (or `fallback_scale`).
    AddOffset { fallback_scale: f64 },
}

impl ValueOp {
    /// Apply the callback to a value, returning the rewritten value.
    ///
    /// Non-numeric inputs to numeric callbacks pass through unchanged.
    pub fn apply(&self, value: &Value, ctx: &ScaleContext) -> Value {
        match self {
            ValueOp::RecenterX => {
                recompute_fixed(value, ctx.default.center_x(), ctx.new.center_x())
            }
            ValueOp::RecenterY => {
                recompute_fixed(value, ctx.default.center_y(), ctx.new.center_y())
            }
            ValueOp::FixedFromLeft => {
                if ctx.center_hud {
                    recompute_fixed(value, ctx.default.center_x(), ctx.new.center_x())
                } else {
                    value.clone()
                }
            }
            ValueOp::FixedFromRight { center_hud } => {
                if center_hud.unwrap_or(ctx.center_hud) {
                    recompute_fixed(value, ctx.default.center_x(), ctx.new.center_x())
                } else {
                    recompute_fixed(value, ctx.default.width, ctx.new.width)
                }
            }
            ValueOp::FixedFromBottom => {
                recompute_fixed(value, ctx.default.height, ctx.new.height)
            }
            ValueOp::RescaleX => rescale(value, ctx.scale_x),
            ValueOp::RescaleY => rescale(value, ctx.scale_y),
            ValueOp::Rescale => rescale(value, ctx.scale),
            ValueOp::AddOffset { fallback_scale } => add_offset(value, *fallback_scale, ctx),
        }
    }
}

/// Recompute a value that sits at a fixed offset from a reference point.
///
/// `recompute_fixed(1020, 960, 1296) == 1356`: an X fixed at +60 from the
/// old center stays +60 from the new center. Integer inputs stay integers.
fn recompute_fixed(value: &Value, original_reference: i32, new_reference: i32) -> Value {
    match value {
        Value::Int(n) => {
            let offset = i64::from(original_reference) - n;
            Value::Int(i64::from(new_reference) - offset)
        }
        Value::Float(n) => {
            let offset = f64::from(original_reference) - n;
            Value::Float(f64::from(new_reference) - offset)
        }
        other => other.clone(),
    }
}

fn rescale(value: &Value, factor: f64) -> Value {
    match value.as_f64() {
        Some(n) => Value::Float(n * factor),
        None => value.clone(),
    }
}

fn add_offset(value: &Value, fallback_scale: f64, ctx: &ScaleContext) -> Value {
    let Some(map) = value.as_map() else {
        return value.clone();
    };
    let mut patched = map.clone();
    // A scaled element needs its offset adjusted by the inverse scale.
    let scale = patched
        .get("Scale")
        .and_then(Value::as_f64)
        .unwrap_or(fallback_scale);
    let multiplier = 1.0 / scale;
    let offset_x = f64::from(ctx.new.center_x() - ctx.default.center_x()) * multiplier;
    let offset_y = f64::from(ctx.new.height - ctx.default.height) * multiplier;
    let current_x = patched.get("OffsetX").and_then(Value::as_f64).unwrap_or(0.0);
    let current_y = patched.get("OffsetY").and_then(Value::as_f64).unwrap_or(0.0);
    patched.insert("OffsetX", Value::Float(current_x + offset_x));
    patched.insert("OffsetY", Value::Float(current_y + offset_y));
    Value::Map(patched)
}

/// Apply a transform tree to a document, returning the patched copy.
pub fn apply(
    document: &Value,
    transform: &NodeTransform,
    ctx: &ScaleContext,
) -> Result<Value, TransformError> {
    apply_at(document, transform, ctx, None)
}

fn join_path(previous: Option<&str>, segment: &str) -> String {
    match previous {
        Some(previous) => format!("{previous}.{segment}"),
        None => segment.to_string(),
    }
}

fn apply_at(
    value: &Value,
    transform: &NodeTransform,
    ctx: &ScaleContext,
    path: Option<&str>,
) -> Result<Value, TransformError> {
    match transform {
        NodeTransform::Map(children) => {
            let map = value.as_map().ok_or_else(|| TransformError::UnexpectedKind {
                path: path.unwrap_or("<root>").to_string(),
                expected: "map",
                found: value.kind(),
            })?;
            let mut patched = map.clone();
            for (key, child_transform) in children {
                let current_path = join_path(path, key);
                let child = patched
                    .get(key)
                    .ok_or_else(|| TransformError::MissingField {
                        path: current_path.clone(),
                    })?
                    .clone();
                let rewritten = apply_at(&child, child_transform, ctx, Some(&current_path))?;
                patched.insert(key.clone(), rewritten);
            }
            Ok(Value::Map(patched))
        }
        NodeTransform::Seq(rules) => {
            let current_path = join_path(path, "[]");
            let items = value
                .as_array()
                .ok_or_else(|| TransformError::UnexpectedKind {
                    path: current_path.clone(),
                    expected: "sequence",
                    found: value.kind(),
                })?;
            debug!(path = %current_path, "patching sequence");
            let mut patched = Vec::with_capacity(items.len());
            for item in items {
                let mut current = item.clone();
                for rule in rules {
                    current = apply_rule(&current, rule, ctx, &current_path)?;
                }
                patched.push(current);
            }
            Ok(Value::Array(patched))
        }
        NodeTransform::Leaf(rules) => {
            let current_path = path.unwrap_or("<root>");
            debug!(path = %current_path, "patching node");
            let mut current = value.clone();
            for rule in rules {
                current = apply_rule(&current, rule, ctx, current_path)?;
            }
            Ok(current)
        }
    }
}

fn apply_rule(
    value: &Value,
    rule: &LeafRule,
    ctx: &ScaleContext,
    path: &str,
) -> Result<Value, TransformError> {
    match rule {
        LeafRule::Update(fields) => {
            let map = value.as_map().ok_or_else(|| TransformError::UnexpectedKind {
                path: path.to_string(),
                expected: "map",
                found: value.kind(),
            })?;
            let mut patched = map.clone();
            for rule in fields {
                match patched.get(&rule.field) {
                    Some(current) => {
                        let rewritten = rule.op.apply(current, ctx);
                        debug!(
                            path,
                            field = %rule.field,
                            from = %current,
                            to = %rewritten,
                            "updated field"
                        );
                        patched.insert(rule.field.clone(), rewritten);
                    }
                    None => match &rule.default {
                        Some(default) => {
                            let inserted = rule.op.apply(default, ctx);
                            debug!(path, field = %rule.field, value = %inserted, "inserted field");
                            patched.insert(rule.field.clone(), inserted);
                        }
                        None => {
                            return Err(TransformError::MissingField {
                                path: format!("{path}.{}", rule.field),
                            })
                        }
                    },
                }
            }
            Ok(Value::Map(patched))
        }
        LeafRule::IfSibling {
            key,
            equals,
            fields,
        } => {
            let Some(map) = value.as_map() else {
                return Ok(value.clone());
            };
            if map.get(key).and_then(Value::as_str) != Some(equals.as_str()) {
                return Ok(value.clone());
            }
            let mut patched = map.clone();
            for rule in fields {
                match patched.get(&rule.field) {
                    Some(current) => {
                        let rewritten = rule.op.apply(current, ctx);
                        debug!(
                            path,
                            lookup = %format!("{key} = {equals}"),
                            sibling = %rule.field,
                            to = %rewritten,
                            "updated sibling"
                        );
                        patched.insert(rule.field.clone(), rewritten);
                    }
                    // Upsert semantics: insert from the default, or skip.
                    None => {
                        if let Some(default) = &rule.default {
                            let inserted = rule.op.apply(default, ctx);
                            debug!(
                                path,
                                lookup = %format!("{key} = {equals}"),
                                sibling = %rule.field,
                                value = %inserted,
                                "inserted sibling"
                            );
                            patched.insert(rule.field.clone(), inserted);
                        }
                    }
                }
            }
            Ok(Value::Map(patched))
        }
    }
}
