//! # structview - Schema-Driven Zero-Copy Binary Views
//!
//! structview compiles a declarative field schema into a byte layout once,
//! then reads and writes structured values directly inside a contiguous byte
//! buffer through typed views. Decoding never builds an intermediate object
//! graph: a view is a compiled type handle plus a slice.
//!
//! - **Zero-copy reads**: views borrow the buffer; strings decode as
//!   `Cow::Borrowed` when the bytes are valid UTF-8
//! - **Exact allocation**: `from_value` sizes its buffer with a length
//!   pre-pass; writing through an existing view never allocates
//! - **Compile once**: offsets, slot tables and default images are computed
//!   by the schema compiler and cached by record id
//!
//! ## Quick Start
//!
//! ```ignore
//! use structview::{ObjectView, RecordSchema, Schema, SchemaCompiler, Value};
//!
//! let mut compiler = SchemaCompiler::new();
//! let person = compiler.compile_object(&Schema::object(
//!     RecordSchema::new("Person")
//!         .field("age", Schema::primitive("uint8"))
//!         .field("name", Schema::string(Some(10))),
//! ))?;
//!
//! let view = ObjectView::from_value(
//!     person,
//!     &Value::object([("age", Value::Int(10)), ("name", Value::text("abc"))]),
//! )?;
//! assert_eq!(view.byte_length(), 11);
//! assert_eq!(view.get("name")?, Value::text("abc"));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Schema (builder or JSON)                    │
//! ├──────────────────────────────────────────────┤
//! │  SchemaCompiler ── cache: id -> ViewType     │
//! ├──────────────────────────────────────────────┤
//! │  Layouts: Object │ Map │ Array │ Vector │ …  │
//! ├──────────────────────────────────────────────┤
//! │  Views over &[u8] / &mut [u8] / Vec<u8>      │
//! │  TagRegistry │ ScratchBuffer                 │
//! ├──────────────────────────────────────────────┤
//! │  Primitive + string codecs (zerocopy)        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Formats
//!
//! All offsets, counts and length markers are u32 little-endian. Numeric
//! fields are little-endian unless their schema says otherwise.
//!
//! | View | Layout |
//! |------|--------|
//! | Object | `field0 ‖ field1 ‖ …` at fixed offsets |
//! | Array | `item0 ‖ item1 ‖ …`, stride = item length |
//! | Map | `required… ‖ slot0 … slotN-1 ‖ marker ‖ optional data…` |
//! | Vector | `count ‖ offset0 … offsetCount ‖ item data…` |
//! | Collection | `offset0 … offsetN-1 ‖ part data…` |
//!
//! ## Module Overview
//!
//! - [`schema`]: schema trees, JSON schema parsing, the compiler
//! - [`layout`]: compiled type handles and the `Codec` trait
//! - [`views`]: the views, tagged dispatch and scratch encoding
//! - [`types`]: the boundary `Value`
//! - [`error`]: typed error conditions
//! - [`config`]: wire and algorithm constants

#[macro_use]
mod macros;

pub mod config;
pub mod error;
pub mod layout;
pub mod schema;
pub mod types;
pub mod views;

pub use error::ViewError;
pub use layout::{
    ArrayType, Codec, CollectionType, Endian, MapType, NumericKind, ObjectType, PrimitiveType,
    StringType, VectorType, ViewType,
};
pub use schema::{RecordSchema, Schema, SchemaCompiler, SchemaKind};
pub use types::Value;
pub use views::{
    ArrayView, CollectionView, Discriminant, MapView, ObjectView, PrimitiveArrayView,
    PrimitiveView, ScratchBuffer, Searcher, StringView, TagRegistry, VectorView, View,
};
