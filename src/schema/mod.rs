//! # Schemas
//!
//! A [`Schema`] is the declarative description of a value's byte layout. It
//! is an input only: nothing reads or writes buffers through a schema. The
//! [`SchemaCompiler`] turns a schema into a [`ViewType`](crate::layout::ViewType)
//! once, and views use that.
//!
//! ## Node Kinds
//!
//! | Kind | Compiles to | Notes |
//! |------|-------------|-------|
//! | `Primitive` | `PrimitiveType` | name such as `uint8`, `float64` |
//! | `String` | `StringType` | optional `max_length` in bytes |
//! | `Array` | `ArrayType` | fixed `count` of fixed-length items |
//! | `Vector` | `VectorType` | any count, items may be absent |
//! | `Object` | `ObjectType` | fixed record, every field fixed-length |
//! | `Map` | `MapType` | sparse record, required fields fixed-length |
//! | `Collection` | `CollectionType` | heterogeneous parts |
//! | `Ref` | the record it names | resolves records by id |
//!
//! Any node may carry a literal `default` that is baked into the enclosing
//! record's default image.
//!
//! ## Building Schemas
//!
//! ```ignore
//! let person = Schema::object(
//!     RecordSchema::new("Person")
//!         .field("age", Schema::primitive("uint8"))
//!         .field("name", Schema::string(Some(10))),
//! );
//!
//! // Or from a JSON document:
//! let person = Schema::from_json(&serde_json::json!({
//!     "$id": "Person",
//!     "type": "object",
//!     "properties": {
//!         "age": {"type": "integer", "btype": "uint8"},
//!         "name": {"type": "string", "maxLength": 10}
//!     }
//! }))?;
//! ```
//!
//! ## Module Structure
//!
//! - `compiler`: `SchemaCompiler`, layout computation and the type cache
//! - `json`: `Schema::from_json`

pub mod compiler;
mod json;

pub use compiler::SchemaCompiler;

use crate::layout::Endian;
use crate::types::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub kind: SchemaKind,
    pub default: Option<Value<'static>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Primitive { type_name: String, endian: Endian },
    String { max_length: Option<usize> },
    Array { item: Box<Schema>, count: usize },
    Vector { item: Box<Schema> },
    Object(RecordSchema),
    Map(RecordSchema),
    Collection { parts: Vec<Schema> },
    Ref(String),
}

/// Fields of an object or map, in declaration order.
///
/// An empty `id` makes the record anonymous: it is compiled afresh every time
/// and cannot be referenced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSchema {
    pub id: String,
    pub fields: Vec<(String, Schema)>,
    pub required: Vec<String>,
}

impl RecordSchema {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push((name.into(), schema));
        self
    }

    /// Adds a field and marks it required.
    pub fn required_field(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.fields.push((name, schema));
        self
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            default: None,
        }
    }

    pub fn primitive(type_name: impl Into<String>) -> Self {
        Self::primitive_with(type_name, Endian::Little)
    }

    pub fn primitive_with(type_name: impl Into<String>, endian: Endian) -> Self {
        Self::of(SchemaKind::Primitive {
            type_name: type_name.into(),
            endian,
        })
    }

    pub fn string(max_length: Option<usize>) -> Self {
        Self::of(SchemaKind::String { max_length })
    }

    pub fn array(item: Schema, count: usize) -> Self {
        Self::of(SchemaKind::Array {
            item: Box::new(item),
            count,
        })
    }

    pub fn vector(item: Schema) -> Self {
        Self::of(SchemaKind::Vector {
            item: Box::new(item),
        })
    }

    pub fn object(record: RecordSchema) -> Self {
        Self::of(SchemaKind::Object(record))
    }

    pub fn map(record: RecordSchema) -> Self {
        Self::of(SchemaKind::Map(record))
    }

    pub fn collection(parts: Vec<Schema>) -> Self {
        Self::of(SchemaKind::Collection { parts })
    }

    /// A reference to a record compiled earlier or currently being compiled.
    pub fn reference(id: impl Into<String>) -> Self {
        Self::of(SchemaKind::Ref(id.into()))
    }

    pub fn with_default(mut self, default: impl Into<Value<'static>>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// The record id, for objects, maps and references.
    pub fn id(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::Object(r) | SchemaKind::Map(r) => Some(&r.id),
            SchemaKind::Ref(id) => Some(id),
            _ => None,
        }
    }
}
