//! # Seeded Round-Trip Tests
//!
//! Generates random values for a nested schema from a fixed seed, encodes
//! them, and checks that decoding yields the same value and that re-encoding
//! the decoded value reproduces the same bytes.
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test round_trip
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use structview::{
    Codec, MapView, RecordSchema, Schema, SchemaCompiler, ScratchBuffer, Value, VectorView,
    ViewType,
};

const SEED: u64 = 0x5eed_1e55;
const ITERATIONS: usize = 200;

fn word(rng: &mut StdRng, max: usize) -> Value<'static> {
    let len = rng.gen_range(1..=max);
    Value::text(
        (0..len)
            .map(|_| rng.gen_range(b'a'..=b'z') as char)
            .collect::<String>(),
    )
}

fn maybe(rng: &mut StdRng, value: impl FnOnce(&mut StdRng) -> Value<'static>) -> Value<'static> {
    if rng.gen_bool(0.7) {
        value(rng)
    } else {
        Value::Null
    }
}

fn item_schema() -> Schema {
    Schema::map(
        RecordSchema::new("Item")
            .required_field("id", Schema::primitive("uint32"))
            .required_field("score", Schema::primitive("float64"))
            .field("label", Schema::string(Some(16)))
            .field("tags", Schema::vector(Schema::string(None)))
            .field(
                "pos",
                Schema::object(
                    RecordSchema::new("Pos")
                        .field("x", Schema::primitive("int16"))
                        .field("y", Schema::primitive("int16")),
                ),
            ),
    )
}

fn random_item(rng: &mut StdRng) -> Value<'static> {
    let id = Value::Int(rng.gen_range(0..=u32::MAX as i64));
    let score = Value::Float(rng.gen_range(-4000..4000) as f64 / 4.0);
    let label = maybe(rng, |rng| word(rng, 16));
    let tags = maybe(rng, |rng| {
        let n = rng.gen_range(0..5);
        Value::list((0..n).map(|_| word(rng, 8)))
    });
    let pos = maybe(rng, |rng| {
        Value::object([
            ("x", Value::Int(rng.gen_range(i16::MIN as i64..=i16::MAX as i64))),
            ("y", Value::Int(rng.gen_range(i16::MIN as i64..=i16::MAX as i64))),
        ])
    });
    Value::object([
        ("id", id),
        ("score", score),
        ("label", label),
        ("tags", tags),
        ("pos", pos),
    ])
}

fn random_items(rng: &mut StdRng) -> Value<'static> {
    let n = rng.gen_range(0..12);
    Value::list((0..n).map(|_| maybe(rng, random_item)))
}

fn read_u32(bytes: &[u8], at: usize) -> usize {
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap()) as usize
}

/// Slots and marker never decrease, and the marker is the used length.
fn assert_map_offsets(map: &MapView<&[u8]>) {
    let layout = map.ty().layout().unwrap();
    let bytes = map.bytes();
    let mut offsets: Vec<usize> = layout
        .optional
        .iter()
        .map(|f| read_u32(bytes, f.slot_offset))
        .collect();
    offsets.push(read_u32(bytes, layout.length_field_offset));
    assert_eq!(offsets[0], layout.header_len());
    assert!(offsets.windows(2).all(|w| w[0] <= w[1]), "{:?}", offsets);
    assert_eq!(*offsets.last().unwrap(), map.byte_length());
}

fn items_type() -> ViewType {
    SchemaCompiler::new()
        .compile(&Schema::vector(item_schema()))
        .unwrap()
}

#[test]
fn random_item_lists_survive_encode_and_decode() {
    let ty = items_type();
    let mut rng = StdRng::seed_from_u64(SEED);
    for _ in 0..ITERATIONS {
        let value = random_items(&mut rng);
        let bytes = ty.encode_to_vec(&value).unwrap();
        assert_eq!(bytes.len(), ty.encoded_len(&value).unwrap());

        let decoded = ty.decode(&bytes).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(ty.encode_to_vec(&decoded).unwrap(), bytes);
    }
}

#[test]
fn item_views_agree_with_whole_value_decode() {
    let ty = items_type();
    let vector_ty = ty.as_vector().unwrap().clone();
    let mut rng = StdRng::seed_from_u64(SEED ^ 1);
    for _ in 0..ITERATIONS {
        let value = random_items(&mut rng);
        let view = VectorView::from_value(vector_ty.clone(), &value).unwrap();
        let expected = value.as_list().unwrap();
        assert_eq!(view.len(), expected.len());
        for (i, item) in expected.iter().enumerate() {
            match view.get_view(i).unwrap() {
                None => assert!(item.is_null()),
                Some(item_view) => {
                    let map = item_view.as_map().unwrap();
                    assert_map_offsets(map);
                    assert_eq!(&map.get("id").unwrap(), item.field_or_null("id"));
                    assert_eq!(&map.get("tags").unwrap(), item.field_or_null("tags"));
                    assert_eq!(map.has("label").unwrap(), !item.field_or_null("label").is_null());
                }
            }
        }
    }
}

#[test]
fn scratch_encoding_matches_exact_allocation() {
    let ty = items_type();
    let mut scratch = ScratchBuffer::with_capacity(1 << 16);
    let mut rng = StdRng::seed_from_u64(SEED ^ 2);
    for _ in 0..ITERATIONS {
        let value = random_items(&mut rng);
        let exact = ty.encode_to_vec(&value).unwrap();
        let reused = scratch.encode_to_vec(&ty, &value).unwrap();
        assert_eq!(reused, exact);
    }
}
