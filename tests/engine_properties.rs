//! Generative properties of the two patch engines: the binary engine's
//! exact-count guard over arbitrary surrounding bytes, and parse/serialize
//! round-tripping of arbitrary SJSON documents.

use hephaistos::hex::{self, HexPatch};
use hephaistos::screen::{ScaleContext, Scaling, Screen};
use hephaistos::sjson::{self, Map, Value};
use proptest::prelude::*;
use std::path::Path;

fn ctx() -> ScaleContext {
    ScaleContext::compute(Screen::new(2560, 1080), Scaling::PixelBased, false)
}

fn width_patch(expected_subs: usize) -> Vec<HexPatch> {
    hex::load_from_str(&format!(
        r#"
        [[patch]]
        name = "viewport_width"
        pattern = '@default.width:i32@'
        replacement = "@new.width:i32@"
        expected_subs = {expected_subs}
        "#
    ))
    .unwrap()
    .compile("directx", &ctx())
    .unwrap()
}

/// Filler whose bytes stay below 0x80, so it can never overlap the pattern
/// (1920 little-endian starts with 0x80) or the 2560 replacement bytes.
fn filler() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..0x80, 0..32)
}

/// `segments.len() - 1` pattern occurrences interleaved with filler.
fn buffer_with_occurrences(segments: &[Vec<u8>]) -> Vec<u8> {
    let mut data = Vec::new();
    for (idx, segment) in segments.iter().enumerate() {
        if idx > 0 {
            data.extend_from_slice(&1920i32.to_le_bytes());
        }
        data.extend_from_slice(segment);
    }
    data
}

fn document() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e12..1.0e12f64).prop_map(Value::Float),
        ".*".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[A-Za-z_][A-Za-z0-9_]{0,6}", inner), 0..6)
                .prop_map(|entries| Value::Map(entries.into_iter().collect::<Map>())),
        ]
    })
}

proptest! {
    #[test]
    fn hex_apply_rewrites_exactly_the_expected_occurrences(
        segments in prop::collection::vec(filler(), 2..6),
    ) {
        let occurrences = segments.len() - 1;
        let data = buffer_with_occurrences(&segments);
        let patches = width_patch(occurrences);

        let patched = hex::apply(&data, &patches, Path::new("EngineWin64s.dll")).unwrap();
        // Same-size replacement, and no default value survives.
        prop_assert_eq!(patched.len(), data.len());
        prop_assert_eq!(patches[0].count_matches(&patched), 0);
        prop_assert_eq!(patches[0].count_matches(&data), occurrences);
    }

    #[test]
    fn hex_apply_refuses_any_unexpected_occurrence_count(
        segments in prop::collection::vec(filler(), 2..6),
        delta in 1usize..3,
    ) {
        let occurrences = segments.len() - 1;
        let data = buffer_with_occurrences(&segments);
        let patches = width_patch(occurrences + delta);

        let result = hex::apply(&data, &patches, Path::new("EngineWin64s.dll"));
        prop_assert!(result.is_err());
    }

    #[test]
    fn sjson_documents_round_trip_through_the_serializer(doc in document()) {
        let text = sjson::to_string(&doc);
        let reparsed = sjson::from_str(&text).unwrap();
        prop_assert_eq!(reparsed, doc);
    }
}
