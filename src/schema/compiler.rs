//! # Schema Compiler
//!
//! Walks a schema tree once and produces the immutable layout metadata views
//! run on. Compiled record types are cached by id, so compiling the same
//! record twice, or sharing it between several parents, yields one handle.
//!
//! ## Compilation Order
//!
//! ```text
//! compile(Person)
//!   ├─ register placeholder "Person"   <- a $ref to Person resolves here
//!   ├─ compile(age)   -> uint8, length 1
//!   ├─ compile(name)  -> string[10], length 10
//!   ├─ offsets: age @ 0, name @ 1; length 11
//!   ├─ default image: encode each field default (or its type default)
//!   └─ fill placeholder
//! ```
//!
//! Children finish before their parent, so every fixed child length is known
//! when the parent computes its offsets.
//!
//! ## Recursion
//!
//! A record that reaches itself through a variable-length field (a map
//! field, a vector item) compiles fine: the reference resolves to a weak
//! back reference to the placeholder and is only dereferenced when a value
//! is encoded. The type is freed once the compiler and every view holding it
//! are gone. A fixed record that contains itself has no fixed length and is
//! rejected.
//!
//! ## Errors
//!
//! Every rejection is a `ViewError::InvalidSchema`. A failed compile removes
//! every record it registered, so the cache never holds a placeholder that
//! will not be filled.

use eyre::Result;
use hashbrown::HashMap;
use tracing::{debug, trace};

use super::{RecordSchema, Schema, SchemaKind};
use crate::config::OFFSET_WIDTH;
use crate::error::ViewError;
use crate::layout::{
    ArrayLayout, ArrayType, Codec, CollectionLayout, CollectionType, FieldLayout, MapLayout,
    MapType, NumericKind, ObjectLayout, ObjectType, OptionalField, PrimitiveType, StringType,
    VectorLayout, VectorType, ViewType,
};
use crate::types::Value;

fn invalid(reason: impl Into<String>) -> eyre::Report {
    ViewError::invalid_schema(reason).into()
}

/// Compiles schemas and caches record types by id.
#[derive(Debug, Default)]
pub struct SchemaCompiler {
    types: HashMap<String, ViewType>,
    /// Ids registered by the compile in progress.
    registered: Vec<String>,
}

impl SchemaCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled type registered under `id`, if any.
    pub fn get(&self, id: &str) -> Option<&ViewType> {
        self.types.get(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn compile(&mut self, schema: &Schema) -> Result<ViewType> {
        let result = self.compile_node(schema);
        let added = std::mem::take(&mut self.registered);
        if result.is_err() {
            for id in added {
                self.types.remove(&id);
            }
        }
        result
    }

    pub fn compile_object(&mut self, schema: &Schema) -> Result<ObjectType> {
        match self.compile(schema)? {
            ViewType::Object(t) => Ok(t),
            other => Err(invalid(format!("expected an object schema, got {}", other.kind_name()))),
        }
    }

    pub fn compile_map(&mut self, schema: &Schema) -> Result<MapType> {
        match self.compile(schema)? {
            ViewType::Map(t) => Ok(t),
            other => Err(invalid(format!("expected a map schema, got {}", other.kind_name()))),
        }
    }

    pub fn compile_vector(&mut self, schema: &Schema) -> Result<VectorType> {
        match self.compile(schema)? {
            ViewType::Vector(t) => Ok(t),
            other => Err(invalid(format!("expected a vector schema, got {}", other.kind_name()))),
        }
    }

    fn compile_node(&mut self, schema: &Schema) -> Result<ViewType> {
        match &schema.kind {
            SchemaKind::Primitive { type_name, endian } => {
                let kind = NumericKind::from_name(type_name)
                    .ok_or_else(|| invalid(format!("unknown primitive type '{}'", type_name)))?;
                Ok(PrimitiveType::new(kind, *endian).into())
            }
            SchemaKind::String { max_length } => Ok(StringType::new(*max_length).into()),
            SchemaKind::Array { item, count } => self.compile_array(schema, item, *count),
            SchemaKind::Vector { item } => {
                let item = self.compile_node(item)?;
                Ok(VectorType::new(VectorLayout { item }).into())
            }
            SchemaKind::Collection { parts } => {
                let parts = parts
                    .iter()
                    .map(|p| self.compile_node(p))
                    .collect::<Result<Vec<_>>>()?;
                Ok(CollectionType::new(CollectionLayout { parts }).into())
            }
            SchemaKind::Object(record) => self.compile_object_record(record),
            SchemaKind::Map(record) => self.compile_map_record(record),
            SchemaKind::Ref(id) => self
                .types
                .get(id)
                .map(link)
                .ok_or_else(|| invalid(format!("unresolved reference to '{}'", id))),
        }
    }

    fn compile_array(&mut self, schema: &Schema, item: &Schema, count: usize) -> Result<ViewType> {
        let item_ty = self.compile_node(item)?;
        let item_len = item_ty
            .fixed_len()
            .ok_or_else(|| invalid(format!("array item {} has no fixed length", item_ty.kind_name())))?;
        if item_len == 0 {
            return Err(invalid("array item has zero length"));
        }

        let list_default = schema.default.as_ref().and_then(Value::as_list);
        let mut default_image = vec![0u8; count * item_len];
        for (i, chunk) in default_image.chunks_exact_mut(item_len).enumerate() {
            let value = list_default
                .and_then(|items| items.get(i))
                .filter(|v| !v.is_null())
                .or(item.default.as_ref())
                .unwrap_or(&Value::Null);
            item_ty.encode(value, chunk)?;
        }
        Ok(ArrayType::new(ArrayLayout {
            item: item_ty,
            count,
            item_len,
            default_image,
        })
        .into())
    }

    /// Returns the cached type for `id` when it already exists.
    fn cached(&self, id: &str, kind: &str) -> Result<Option<ViewType>> {
        if id.is_empty() {
            return Ok(None);
        }
        match self.types.get(id) {
            None => Ok(None),
            Some(existing) if existing.kind_name() == kind => {
                trace!(id, kind, "schema cache hit");
                Ok(Some(link(existing)))
            }
            Some(existing) => Err(invalid(format!(
                "id '{}' is already registered as {}, cannot redefine it as {}",
                id,
                existing.kind_name(),
                kind
            ))),
        }
    }

    fn register(&mut self, id: &str, ty: ViewType) {
        if !id.is_empty() {
            self.types.insert(id.to_string(), ty);
            self.registered.push(id.to_string());
        }
    }

    /// Compiles each field, children first, in declaration order.
    fn compile_fields<'r>(
        &mut self,
        record: &'r RecordSchema,
    ) -> Result<Vec<(String, ViewType, &'r Schema)>> {
        for name in &record.required {
            if !record.fields.iter().any(|(n, _)| n == name) {
                return Err(invalid(format!(
                    "record '{}' requires undeclared field '{}'",
                    record.id, name
                )));
            }
        }
        record
            .fields
            .iter()
            .map(|(name, schema)| Ok((name.clone(), self.compile_node(schema)?, schema)))
            .collect()
    }

    fn compile_object_record(&mut self, record: &RecordSchema) -> Result<ViewType> {
        if let Some(ty) = self.cached(&record.id, "object")? {
            return Ok(ty);
        }
        let handle = ObjectType::placeholder(&record.id);
        self.register(&record.id, handle.clone().into());

        let mut fields = Vec::with_capacity(record.fields.len());
        let mut offset = 0;
        for (name, ty, schema) in self.compile_fields(record)? {
            let length = ty.fixed_len().ok_or_else(|| {
                invalid(format!(
                    "field '{}' of object '{}' has no fixed length",
                    name, record.id
                ))
            })?;
            fields.push(FieldLayout {
                name,
                ty,
                start: offset,
                length,
                default: schema.default.clone(),
            });
            offset += length;
        }
        let default_image = default_image(&fields, offset)?;
        debug!(id = %record.id, kind = "object", length = offset, "compiled record");
        handle.fill(ObjectLayout {
            fields,
            length: offset,
            default_image,
        })?;
        Ok(handle.into())
    }

    fn compile_map_record(&mut self, record: &RecordSchema) -> Result<ViewType> {
        if let Some(ty) = self.cached(&record.id, "map")? {
            return Ok(ty);
        }
        let handle = MapType::placeholder(&record.id);
        self.register(&record.id, handle.clone().into());

        let mut required = Vec::new();
        let mut optional = Vec::new();
        let mut offset = 0;
        for (name, ty, schema) in self.compile_fields(record)? {
            if record.is_required(&name) {
                let length = ty.fixed_len().ok_or_else(|| {
                    invalid(format!(
                        "required field '{}' of map '{}' has no fixed maximum length",
                        name, record.id
                    ))
                })?;
                required.push(FieldLayout {
                    name,
                    ty,
                    start: offset,
                    length,
                    default: schema.default.clone(),
                });
                offset += length;
            } else {
                optional.push((name, ty, schema.default.clone()));
            }
        }

        let required_length = offset;
        let optional: Vec<OptionalField> = optional
            .into_iter()
            .enumerate()
            .map(|(i, (name, ty, default))| OptionalField {
                name,
                max_length: ty.fixed_len(),
                ty,
                slot_offset: required_length + i * OFFSET_WIDTH,
                default,
            })
            .collect();
        let length_field_offset = required_length + optional.len() * OFFSET_WIDTH;
        let default_image = default_image(&required, required_length)?;
        debug!(
            id = %record.id,
            kind = "map",
            required_length,
            optional = optional.len(),
            "compiled record"
        );
        handle.fill(MapLayout {
            required,
            optional,
            required_length,
            length_field_offset,
            default_image,
        })?;
        Ok(handle.into())
    }
}

/// A cached type as seen from a field. A record that is not filled yet is an
/// ancestor of that field, so it is linked weakly.
fn link(ty: &ViewType) -> ViewType {
    match ty {
        ViewType::Object(t) if !t.is_compiled() => t.back_ref().into(),
        ViewType::Map(t) if !t.is_compiled() => t.back_ref().into(),
        other => other.clone(),
    }
}

/// Encodes each field's default (or its type's own default) at its offset.
fn default_image(fields: &[FieldLayout], length: usize) -> Result<Vec<u8>> {
    let mut image = vec![0u8; length];
    for field in fields {
        let value = field.default.as_ref().unwrap_or(&Value::Null);
        field.ty.encode(value, &mut image[field.range()])?;
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Endian;

    fn person() -> Schema {
        Schema::object(
            RecordSchema::new("Person")
                .field("age", Schema::primitive("uint8").with_default(7i64))
                .field("name", Schema::string(Some(10))),
        )
    }

    fn schema_error(result: Result<ViewType>) -> String {
        let err = result.unwrap_err();
        match err.downcast_ref::<ViewError>() {
            Some(ViewError::InvalidSchema { reason }) => reason.clone(),
            other => panic!("expected InvalidSchema, got {:?}", other),
        }
    }

    #[test]
    fn object_offsets_follow_declaration_order() {
        let mut compiler = SchemaCompiler::new();
        let ty = compiler.compile_object(&person()).unwrap();
        let layout = ty.layout().unwrap();
        assert_eq!(layout.length, 11);
        assert_eq!(layout.fields[0].range(), 0..1);
        assert_eq!(layout.fields[1].range(), 1..11);
        assert_eq!(layout.default_image[0], 7);
        assert!(layout.default_image[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn compiling_twice_returns_the_same_handle() {
        let mut compiler = SchemaCompiler::new();
        let a = compiler.compile(&person()).unwrap();
        let b = compiler.compile(&person()).unwrap();
        assert!(a.same_type(&b));
        assert!(compiler.get("Person").unwrap().same_type(&a));
        assert_eq!(compiler.len(), 1);
    }

    #[test]
    fn shared_sub_records_compile_once() {
        let point = Schema::object(
            RecordSchema::new("Point")
                .field("x", Schema::primitive("int16"))
                .field("y", Schema::primitive("int16")),
        );
        let line = Schema::object(
            RecordSchema::new("Line")
                .field("from", point.clone())
                .field("to", Schema::reference("Point")),
        );
        let mut compiler = SchemaCompiler::new();
        let line = compiler.compile_object(&line).unwrap();
        let fields = &line.layout().unwrap().fields;
        assert!(fields[0].ty.same_type(&fields[1].ty));
        assert_eq!(line.length().unwrap(), 8);
    }

    #[test]
    fn map_slots_follow_required_fields() {
        let schema = Schema::map(
            RecordSchema::new("M")
                .required_field("a", Schema::primitive("uint8"))
                .field("name", Schema::string(Some(20)))
                .required_field("b", Schema::primitive_with("uint16", Endian::Big))
                .field("tags", Schema::vector(Schema::primitive("uint8"))),
        );
        let mut compiler = SchemaCompiler::new();
        let map = compiler.compile_map(&schema).unwrap();
        let layout = map.layout().unwrap();
        assert_eq!(layout.required_length, 3);
        assert_eq!(layout.optional[0].slot_offset, 3);
        assert_eq!(layout.optional[0].max_length, Some(20));
        assert_eq!(layout.optional[1].slot_offset, 7);
        assert_eq!(layout.optional[1].max_length, None);
        assert_eq!(layout.length_field_offset, 11);
        assert_eq!(layout.header_len(), 15);
    }

    #[test]
    fn self_referential_map_resolves_to_its_placeholder() {
        let schema = Schema::map(
            RecordSchema::new("Tree")
                .required_field("value", Schema::primitive("int32"))
                .field("children", Schema::vector(Schema::reference("Tree"))),
        );
        let mut compiler = SchemaCompiler::new();
        let tree = compiler.compile_map(&schema).unwrap();
        let children = &tree.layout().unwrap().optional[0].ty;
        let item = &children.as_vector().unwrap().layout().item;
        assert!(item.as_map().unwrap().same_type(&tree));
        assert!(item.as_map().unwrap().is_back_ref());
        assert!(!tree.is_back_ref());
    }

    #[test]
    fn references_to_finished_records_own_them() {
        let point = Schema::object(
            RecordSchema::new("Point")
                .field("x", Schema::primitive("int16"))
                .field("y", Schema::primitive("int16")),
        );
        let mut compiler = SchemaCompiler::new();
        compiler.compile(&point).unwrap();
        let pair = compiler
            .compile(&Schema::collection(vec![
                Schema::reference("Point"),
                Schema::reference("Point"),
            ]))
            .unwrap();
        drop(compiler);

        let parts = &pair.as_collection().unwrap().layout().parts;
        let first = parts[0].as_object().unwrap();
        assert!(!first.is_back_ref());
        assert_eq!(first.length().unwrap(), 4);
    }

    #[test]
    fn fixed_record_cannot_contain_itself() {
        let schema = Schema::object(
            RecordSchema::new("Loop").field("inner", Schema::reference("Loop")),
        );
        let mut compiler = SchemaCompiler::new();
        let reason = schema_error(compiler.compile(&schema));
        assert!(reason.contains("no fixed length"), "{}", reason);
        assert!(compiler.get("Loop").is_none());
    }

    #[test]
    fn rejections_are_invalid_schema() {
        let mut compiler = SchemaCompiler::new();
        assert!(schema_error(compiler.compile(&Schema::primitive("uint128"))).contains("uint128"));

        let unbounded = Schema::map(
            RecordSchema::new("U").required_field("name", Schema::string(None)),
        );
        assert!(schema_error(compiler.compile(&unbounded)).contains("no fixed maximum length"));

        let vector_field = Schema::object(
            RecordSchema::new("V").field("xs", Schema::vector(Schema::primitive("uint8"))),
        );
        schema_error(compiler.compile(&vector_field));
        schema_error(compiler.compile(&Schema::reference("Nowhere")));
        schema_error(compiler.compile(&Schema::array(Schema::string(Some(0)), 3)));

        compiler.compile(&person()).unwrap();
        let clash = Schema::map(RecordSchema::new("Person"));
        assert!(schema_error(compiler.compile(&clash)).contains("already registered as object"));
    }

    #[test]
    fn failed_compile_leaves_no_placeholders() {
        let schema = Schema::object(
            RecordSchema::new("Outer")
                .field(
                    "inner",
                    Schema::object(RecordSchema::new("Inner").field("x", Schema::primitive("uint8"))),
                )
                .field("bad", Schema::primitive("nope")),
        );
        let mut compiler = SchemaCompiler::new();
        assert!(compiler.compile(&schema).is_err());
        assert!(compiler.is_empty());
    }

    #[test]
    fn array_defaults_come_from_list_then_item() {
        let schema = Schema::array(Schema::primitive("uint8").with_default(9i64), 3)
            .with_default(Value::list([Value::Int(1), Value::Null]));
        let mut compiler = SchemaCompiler::new();
        let ty = compiler.compile(&schema).unwrap();
        assert_eq!(ty.as_array().unwrap().layout().default_image, vec![1, 9, 9]);
    }
}
