// crates/loon-protocol/tests/frame_properties.rs
use std::io::Cursor;

use loon_protocol::{encode_frame, read_frame, FrameDecoder};
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Any JSON value without floats (serde_json only round-trips floats
/// exactly with its `float_roundtrip` feature).
fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        ".*".prop_map(Value::from),
    ];

    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map(".*", inner, 0..8)
                .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn wire_of(values: &[Value]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|value| encode_frame(value).unwrap())
        .collect()
}

fn read_all(wire: &[u8]) -> Vec<Value> {
    let mut cursor = Cursor::new(wire.to_vec());
    let mut out = Vec::new();
    while let Some(value) = read_frame(&mut cursor).unwrap() {
        out.push(value);
    }
    out
}

proptest! {
    /// Property: decoding the encoding of any value yields that value.
    #[test]
    fn prop_frames_round_trip(values in prop::collection::vec(json_value(), 0..8)) {
        prop_assert_eq!(read_all(&wire_of(&values)), values);
    }

    /// Property: a garbage line costs exactly that line.
    ///
    /// A line starting with `}` can never parse, whatever follows it.
    #[test]
    fn prop_garbage_line_is_skipped(
        garbage in prop::collection::vec(
            any::<u8>().prop_filter("no newline", |b| *b != b'\n'),
            0..64,
        ),
        value in json_value(),
    ) {
        let mut wire = vec![b'}'];
        wire.extend_from_slice(&garbage);
        wire.push(b'\n');
        wire.extend(encode_frame(&value).unwrap());

        prop_assert_eq!(read_all(&wire), vec![value]);
    }

    /// Property: how the bytes are chunked does not change what decodes.
    #[test]
    fn prop_chunking_is_invisible(
        values in prop::collection::vec(json_value(), 1..6),
        chunk in 1usize..16,
    ) {
        let wire = wire_of(&values);
        let mut decoder = FrameDecoder::new();

        let decoded: Vec<Value> = wire
            .chunks(chunk)
            .flat_map(|piece| decoder.push_bytes(piece))
            .collect();

        prop_assert_eq!(decoded, values);
        prop_assert!(!decoder.has_partial());
    }
}
