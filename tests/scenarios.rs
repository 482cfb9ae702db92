//! # End-to-End View Scenarios
//!
//! Exercises the public API the way an application would: schemas built with
//! the builder or parsed from JSON, compiled once, then used to encode, view,
//! mutate and dispatch buffers.
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test scenarios
//! ```

use serde_json::json;
use structview::views::string;
use structview::{
    MapView, ObjectView, RecordSchema, Schema, SchemaCompiler, ScratchBuffer, StringView,
    TagRegistry, Value, View, ViewError, ViewType,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn node_schema() -> Schema {
    Schema::map(
        RecordSchema::new("Node")
            .required_field("value", Schema::primitive("int32"))
            .field("next", Schema::reference("Node")),
    )
}

fn chain(values: &[i64]) -> Value<'static> {
    values.iter().rev().fold(Value::Null, |next, &v| {
        Value::object([("value", Value::Int(v)), ("next", next)])
    })
}

// ============================================================================
// RECURSIVE SCHEMAS
// ============================================================================

#[test]
fn self_referential_map_round_trips_a_linked_chain() {
    let mut compiler = SchemaCompiler::new();
    let node = compiler.compile_map(&node_schema()).unwrap();
    let value = chain(&[1, 2, 3]);

    let view = MapView::from_value(node.clone(), &value).unwrap();
    assert_eq!(view.byte_length(), 36);
    assert_eq!(view.to_value().unwrap(), value);

    let Some(View::Map(second)) = view.get_view("next").unwrap() else {
        panic!("expected nested map");
    };
    assert_eq!(second.get("value").unwrap(), Value::Int(2));
    assert_eq!(second.byte_length(), 24);

    let again = compiler.compile_map(&node_schema()).unwrap();
    assert!(again.same_type(&node));
}

#[test]
fn mutually_recursive_records_resolve_through_the_cache() {
    let mut compiler = SchemaCompiler::new();
    let tree = compiler
        .compile(&Schema::map(
            RecordSchema::new("Tree")
                .required_field("id", Schema::primitive("uint16"))
                .field(
                    "children",
                    Schema::vector(Schema::map(
                        RecordSchema::new("Branch")
                            .required_field("weight", Schema::primitive("uint8"))
                            .field("tree", Schema::reference("Tree")),
                    )),
                ),
        ))
        .unwrap();
    assert!(compiler.get("Branch").is_some());

    let value = json!({
        "id": 1,
        "children": [
            {"weight": 5, "tree": {"id": 2, "children": []}},
            {"weight": 6, "tree": null}
        ]
    });
    let bytes = tree.encode_to_vec(&Value::from_json(&value)).unwrap();
    let view = tree.view(&bytes[..]).unwrap();
    assert_eq!(view.to_json().unwrap(), value);
}

// ============================================================================
// JSON SCHEMAS
// ============================================================================

#[test]
fn json_and_builder_schemas_compile_to_the_same_layout() {
    let from_json = Schema::from_json(&json!({
        "$id": "Reading",
        "type": "object",
        "properties": {
            "sensor": {"type": "integer", "btype": "uint16", "default": 7},
            "celsius": {"type": "number", "btype": "float32"},
            "label": {"type": "string", "maxLength": 6},
            "samples": {"type": "array", "maxItems": 3, "items": {"type": "integer", "btype": "int8"}}
        }
    }))
    .unwrap();
    let built = Schema::object(
        RecordSchema::new("Reading")
            .field("sensor", Schema::primitive("uint16").with_default(7i64))
            .field("celsius", Schema::primitive("float32"))
            .field("label", Schema::string(Some(6)))
            .field("samples", Schema::array(Schema::primitive("int8"), 3)),
    );
    assert_eq!(from_json, built);

    let a = SchemaCompiler::new().compile_object(&from_json).unwrap();
    let b = SchemaCompiler::new().compile_object(&built).unwrap();
    let (a, b) = (a.layout().unwrap(), b.layout().unwrap());
    assert_eq!(a.length, 2 + 4 + 6 + 3);
    assert_eq!(a.length, b.length);
    assert_eq!(a.default_image, b.default_image);
    let offsets = |fields: &[structview::layout::FieldLayout]| {
        fields.iter().map(|f| (f.name.clone(), f.start)).collect::<Vec<_>>()
    };
    assert_eq!(offsets(&a.fields[..]), offsets(&b.fields[..]));
    assert_eq!(a.fields[2].start, 6);
}

#[test]
fn compile_errors_name_the_problem_and_leave_the_cache_clean() {
    let mut compiler = SchemaCompiler::new();
    let bad = Schema::object(
        RecordSchema::new("Bad")
            .field("ok", Schema::primitive("uint8"))
            .field("tail", Schema::string(None)),
    );
    let err = compiler.compile(&bad).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ViewError>(),
        Some(ViewError::InvalidSchema { .. })
    ));
    assert!(compiler.get("Bad").is_none());
    assert!(compiler.is_empty());

    let dangling = compiler.compile(&Schema::reference("Nowhere")).unwrap_err();
    assert!(dangling.to_string().contains("Nowhere"));
}

// ============================================================================
// TAGGED DISPATCH
// ============================================================================

#[test]
fn tagged_messages_decode_from_a_shared_stream() {
    let mut compiler = SchemaCompiler::new();
    let mut registry = TagRegistry::new();
    for doc in [
        json!({
            "$id": "Ping", "type": "object",
            "properties": {
                "op": {"type": "integer", "btype": "uint8", "default": 1},
                "seq": {"type": "integer", "btype": "uint32"}
            }
        }),
        json!({
            "$id": "Say", "type": "object",
            "properties": {
                "op": {"type": "integer", "btype": "uint8", "default": 2},
                "text": {"type": "string", "maxLength": 8}
            }
        }),
    ] {
        let schema = Schema::from_json(&doc).unwrap();
        registry.register_schema(&mut compiler, &schema).unwrap();
    }

    let messages = [
        json!({"op": 2, "text": "hello"}),
        json!({"op": 1, "seq": 99}),
        json!({"op": 2, "text": "bye"}),
    ];
    let mut stream = Vec::new();
    for message in &messages {
        let view = registry.encode(&Value::from_json(message)).unwrap();
        stream.extend_from_slice(view.bytes());
    }
    assert_eq!(stream.len(), 9 + 5 + 9);

    let mut offset = 0;
    let mut decoded = Vec::new();
    while offset < stream.len() {
        let view = registry.decode(&stream, offset).unwrap();
        offset += view.byte_length();
        decoded.push(view.to_json().unwrap());
    }
    assert_eq!(decoded, messages);
}

// ============================================================================
// STRINGS AND SCRATCH ENCODING
// ============================================================================

#[test]
fn bounded_strings_pad_and_trim() {
    let view = StringView::from_str("foo", Some(10));
    assert_eq!(view.byte_length(), 10);
    assert_eq!(view.as_str(), "foo");
    let trimmed = view.trim();
    assert_eq!(trimmed.byte_length(), 3);
    assert_eq!(trimmed.bytes(), b"foo");

    let mut buf = [0xAAu8; 8];
    assert_eq!(string::encode("héllo", &mut buf, 2, Some(4)).unwrap(), 4);
    assert_eq!(&buf[..2], &[0xAA, 0xAA]);
    assert_eq!(string::decode(&buf, 2, 4).unwrap(), "hél");
    assert_eq!(buf[6..], [0xAA, 0xAA]);
}

#[test]
fn strings_inside_records_mutate_in_place() {
    let person = SchemaCompiler::new()
        .compile_object(&Schema::object(
            RecordSchema::new("Person")
                .field("age", Schema::primitive("uint8"))
                .field("name", Schema::string(Some(10))),
        ))
        .unwrap();
    let mut view = ObjectView::from_value(
        person,
        &Value::object([("age", Value::Int(30)), ("name", Value::text("añob"))]),
    )
    .unwrap();
    match view.get_view_mut("name").unwrap() {
        View::String(mut name) => {
            name.reverse();
            assert_eq!(name.search(b"a", 0), Some(4));
            assert_eq!(name.replace(b"b", b"B"), 1);
        }
        other => panic!("expected string view, got {}", other.kind_name()),
    }
    assert_eq!(view.get("name").unwrap(), Value::text("Boña"));
    assert_eq!(view.get("age").unwrap(), Value::Int(30));
}

#[test]
fn scratch_buffer_serves_many_encodes() {
    let mut compiler = SchemaCompiler::new();
    let ty: ViewType = compiler
        .compile(&Schema::vector(Schema::string(None)))
        .unwrap();
    let mut scratch = ScratchBuffer::with_capacity(128);
    for words in [vec!["a", "bb"], vec!["ccc"], vec![]] {
        let value = Value::list(words.iter().map(|w| Value::text(*w)));
        let expected = ty.encode_to_vec(&value).unwrap();
        let view = scratch.encode(&ty, &value).unwrap();
        assert_eq!(view.byte_length(), expected.len());
        assert_eq!(view.to_value().unwrap(), value);
    }
}
