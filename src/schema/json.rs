//! JSON schema documents.
//!
//! Accepts a JSON-Schema-like dialect with a `btype` keyword for the binary
//! primitive type. `properties` keep document order, which becomes field
//! order. An `array` with `maxItems` is a fixed array; without it, a vector.
//! An unrecognized `type` is treated as a primitive name so the compiler can
//! report it.

use eyre::Result;
use serde_json::Value as Json;

use super::{RecordSchema, Schema, SchemaKind};
use crate::error::ViewError;
use crate::layout::Endian;
use crate::types::Value;

fn invalid(reason: impl Into<String>) -> eyre::Report {
    ViewError::invalid_schema(reason).into()
}

fn opt_usize(doc: &Json, key: &str) -> Result<Option<usize>> {
    match doc.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| invalid(format!("'{}' must be a non-negative integer", key))),
    }
}

fn record(doc: &Json) -> Result<RecordSchema> {
    let id = doc.get("$id").and_then(Json::as_str).unwrap_or_default();
    let mut record = RecordSchema::new(id);
    if let Some(props) = doc.get("properties") {
        let props = props
            .as_object()
            .ok_or_else(|| invalid(format!("'properties' of '{}' must be an object", id)))?;
        for (name, field) in props {
            record = record.field(name.clone(), Schema::from_json(field)?);
        }
    }
    if let Some(required) = doc.get("required") {
        let required = required
            .as_array()
            .ok_or_else(|| invalid(format!("'required' of '{}' must be an array", id)))?;
        for name in required {
            let name = name
                .as_str()
                .ok_or_else(|| invalid("'required' entries must be strings"))?;
            record.required.push(name.to_string());
        }
    }
    Ok(record)
}

fn items(doc: &Json, what: &str) -> Result<Schema> {
    let items = doc
        .get("items")
        .ok_or_else(|| invalid(format!("{} schema has no 'items'", what)))?;
    Schema::from_json(items)
}

impl Schema {
    pub fn from_json(doc: &Json) -> Result<Schema> {
        if !doc.is_object() {
            return Err(invalid("schema node must be a JSON object"));
        }
        let default = doc.get("default").map(Value::from_json);

        if let Some(target) = doc.get("$ref") {
            let id = target
                .as_str()
                .ok_or_else(|| invalid("'$ref' must be a string"))?;
            let mut schema = Schema::reference(id.trim_start_matches('#'));
            schema.default = default;
            return Ok(schema);
        }

        let type_name = doc
            .get("type")
            .and_then(Json::as_str)
            .ok_or_else(|| invalid("schema node has no 'type'"))?;
        let btype = doc.get("btype").and_then(Json::as_str);
        let endian = match doc.get("endian").and_then(Json::as_str) {
            None => Endian::Little,
            Some(name) => Endian::from_name(name)
                .ok_or_else(|| invalid(format!("unknown endianness '{}'", name)))?,
        };

        let kind = match type_name {
            "object" => SchemaKind::Object(record(doc)?),
            "map" => SchemaKind::Map(record(doc)?),
            "string" => SchemaKind::String {
                max_length: opt_usize(doc, "maxLength")?,
            },
            "array" => match opt_usize(doc, "maxItems")? {
                Some(count) => SchemaKind::Array {
                    item: Box::new(items(doc, "array")?),
                    count,
                },
                None => SchemaKind::Vector {
                    item: Box::new(items(doc, "array")?),
                },
            },
            "vector" => SchemaKind::Vector {
                item: Box::new(items(doc, "vector")?),
            },
            "collection" => {
                let parts = doc
                    .get("items")
                    .and_then(Json::as_array)
                    .ok_or_else(|| invalid("collection schema needs an 'items' array"))?;
                SchemaKind::Collection {
                    parts: parts.iter().map(Schema::from_json).collect::<Result<_>>()?,
                }
            }
            "number" => SchemaKind::Primitive {
                type_name: btype.unwrap_or("float64").to_string(),
                endian,
            },
            "integer" => SchemaKind::Primitive {
                type_name: btype.unwrap_or("int32").to_string(),
                endian,
            },
            other => SchemaKind::Primitive {
                type_name: btype.unwrap_or(other).to_string(),
                endian,
            },
        };
        Ok(Schema { kind, default })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn properties_keep_document_order() {
        let schema = Schema::from_json(&json!({
            "$id": "P",
            "type": "object",
            "properties": {
                "z": {"type": "integer", "btype": "uint8"},
                "a": {"type": "string", "maxLength": 4}
            }
        }))
        .unwrap();
        let SchemaKind::Object(record) = &schema.kind else {
            panic!("expected object");
        };
        let names: Vec<&str> = record.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["z", "a"]);
        assert_eq!(record.id, "P");
    }

    #[test]
    fn arrays_without_max_items_are_vectors() {
        let fixed = Schema::from_json(&json!({
            "type": "array", "maxItems": 3, "items": {"type": "number"}
        }))
        .unwrap();
        assert!(matches!(fixed.kind, SchemaKind::Array { count: 3, .. }));

        let open = Schema::from_json(&json!({"type": "array", "items": {"type": "number"}}))
            .unwrap();
        assert!(matches!(open.kind, SchemaKind::Vector { .. }));
    }

    #[test]
    fn numeric_types_pick_default_widths() {
        let number = Schema::from_json(&json!({"type": "number"})).unwrap();
        let integer = Schema::from_json(&json!({"type": "integer", "endian": "big"})).unwrap();
        assert_eq!(number, Schema::primitive("float64"));
        assert_eq!(integer, Schema::primitive_with("int32", Endian::Big));
    }

    #[test]
    fn defaults_and_refs_are_read() {
        let schema = Schema::from_json(&json!({
            "type": "map",
            "$id": "Node",
            "required": ["kind"],
            "properties": {
                "kind": {"type": "integer", "btype": "uint8", "default": 3},
                "next": {"$ref": "#Node"}
            }
        }))
        .unwrap();
        let SchemaKind::Map(record) = &schema.kind else {
            panic!("expected map");
        };
        assert!(record.is_required("kind"));
        assert_eq!(record.fields[0].1.default, Some(Value::Int(3)));
        assert_eq!(record.fields[1].1, Schema::reference("Node"));
    }

    #[test]
    fn malformed_documents_are_invalid_schemas() {
        for doc in [
            json!("uint8"),
            json!({"properties": {}}),
            json!({"type": "string", "maxLength": -1}),
            json!({"type": "integer", "endian": "middle"}),
            json!({"type": "vector"}),
        ] {
            let err = Schema::from_json(&doc).unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<ViewError>(),
                    Some(ViewError::InvalidSchema { .. })
                ),
                "{:?} gave {}",
                doc,
                err
            );
        }
    }
}
