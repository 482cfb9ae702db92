//! Fuzz testing for views over untrusted bytes.
//!
//! Wraps arbitrary bytes in map, vector and collection views and walks every
//! accessor. Corrupt offset tables must surface as errors, never panics.
//! Anything that decodes must re-encode, and a second encode/decode pass must
//! be stable (the first pass may drop empty strings and lossy text).

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use structview::{
    Codec, RecordSchema, Schema, SchemaCompiler, TagRegistry, Value, View, ViewType,
};

#[derive(Debug, Arbitrary)]
enum Target {
    Map,
    Vector,
    Collection,
    Tagged { offset: u8 },
}

#[derive(Debug, Arbitrary)]
struct ViewInput {
    target: Target,
    data: Vec<u8>,
    index: u8,
}

fn node() -> Schema {
    Schema::map(
        RecordSchema::new("Node")
            .required_field("kind", Schema::primitive("uint8"))
            .field("name", Schema::string(Some(12)))
            .field("next", Schema::reference("Node"))
            .field("weights", Schema::vector(Schema::primitive("int16"))),
    )
}

fn walk(view: &View<&[u8]>, index: usize) {
    let _ = view.to_json();
    match view {
        View::Map(map) => {
            for name in ["kind", "name", "next", "weights"] {
                let _ = map.get(name);
                if let Ok(Some(child)) = map.get_view(name) {
                    walk(&child, index);
                }
            }
        }
        View::Vector(vector) => {
            let _ = vector.get(index);
            for item in vector.iter().flatten().flatten() {
                let _ = item.to_value();
            }
        }
        View::Collection(collection) => {
            let _ = collection.get(index);
        }
        _ => {}
    }
}

fn check_round_trip(ty: &ViewType, data: &[u8]) {
    if let Ok(value) = ty.decode(data) {
        let value: Value<'static> = value.to_owned_static();
        let bytes = ty.encode_to_vec(&value).expect("decoded value must re-encode");
        let normalized = ty.decode(&bytes).expect("re-encoded bytes must decode");
        let stable = ty.encode_to_vec(&normalized).expect("normalized value must encode");
        assert_eq!(stable, bytes);
    }
}

fuzz_target!(|input: ViewInput| {
    let mut compiler = SchemaCompiler::new();
    let index = input.index as usize;
    let ty = match input.target {
        Target::Map => compiler.compile(&node()),
        Target::Vector => compiler.compile(&Schema::vector(node())),
        Target::Collection => compiler.compile(&Schema::collection(vec![
            Schema::primitive("uint32"),
            Schema::string(None),
            node(),
        ])),
        Target::Tagged { offset } => {
            let mut registry = TagRegistry::new();
            let schema = Schema::object(
                RecordSchema::new("Tagged")
                    .field("tag", Schema::primitive("uint8").with_default(4i64))
                    .field("body", Schema::string(Some(6))),
            );
            registry
                .register_schema(&mut compiler, &schema)
                .expect("valid tagged schema");
            if let Ok(view) = registry.decode(&input.data, offset as usize) {
                let _ = view.to_value();
            }
            return;
        }
    }
    .expect("valid schema");

    if let Ok(view) = ty.view(&input.data[..]) {
        walk(&view, index);
    }
    check_round_trip(&ty, &input.data);
});
