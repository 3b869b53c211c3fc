//! SJSON serializer.
//!
//! Emits strict JSON (quoted keys, no trailing commas), which is a valid
//! subset of what [`super::de`] accepts, so backups and patched files always
//! round-trip through the same parser.

use super::value::Value;

const INDENT: &str = "  ";

/// Serialize a document to text with a trailing newline.
pub fn to_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0);
    out.push('\n');
    out
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Float(n) => write_float(out, *n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return;
            }
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push('\n');
                push_indent(out, depth + 1);
                write_value(out, item, depth + 1);
            }
            out.push('\n');
            push_indent(out, depth);
            out.push(']');
        }
        Value::Map(map) => {
            if map.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push('{');
            for (idx, (key, item)) in map.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push('\n');
                push_indent(out, depth + 1);
                write_string(out, key);
                out.push_str(": ");
                write_value(out, item, depth + 1);
            }
            out.push('\n');
            push_indent(out, depth);
            out.push('}');
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn write_float(out: &mut String, n: f64) {
    // Keep a decimal point so the value re-parses as a float.
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        out.push_str(&format!("{n:.1}"));
    } else {
        out.push_str(&n.to_string());
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::super::{from_str, to_string};
    use super::super::value::{Map, Value};

    #[test]
    fn test_serialized_output_reparses_identically() {
        let doc = from_str(
            r#"{
                AboutScreen: {
                    Back: { Width: 1920, Height: 1080 },
                    Labels: ["a", "b",],
                    Scale: 1.5,
                },
            }"#,
        )
        .unwrap();
        let text = to_string(&doc);
        let reparsed = from_str(&text).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn test_float_keeps_decimal_point() {
        let mut map = Map::new();
        map.insert("ScaleX", Value::Float(2.0));
        let text = to_string(&Value::Map(map));
        assert!(text.contains("2.0"), "got: {text}");
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(to_string(&Value::Array(vec![])), "[]\n");
        assert_eq!(to_string(&Value::Map(Map::new())), "{}\n");
    }
}
