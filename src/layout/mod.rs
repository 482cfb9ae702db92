//! # Compiled Layouts
//!
//! This module holds the static metadata the schema compiler produces and the
//! views consume. A compiled type is a cheap, reference-counted handle; the
//! layout behind it is immutable once compilation finishes.
//!
//! ## Type Handles
//!
//! | Handle | Geometry | Fixed length |
//! |--------|----------|--------------|
//! | `PrimitiveType` | one scalar | width |
//! | `StringType` | UTF-8 span | `max_length`, if declared |
//! | `ArrayType` | `count` items of one fixed type | `count * item_len` |
//! | `ObjectType` | fields at constant offsets | sum of field lengths |
//! | `MapType` | required slots + optional offset table | - |
//! | `VectorType` | count + offset table | - |
//! | `CollectionType` | per-part offset table | - |
//!
//! ## Two-Phase Records
//!
//! `ObjectType` and `MapType` are created empty and filled exactly once. The
//! compiler registers the empty handle under the schema id before compiling
//! the fields, so a field that refers back to its own record resolves to the
//! same handle instead of recursing forever. A fixed record that contains
//! itself has no fixed length and is rejected.
//!
//! A reference resolved while its record is still empty is a back reference:
//! it holds the record weakly and is upgraded each time it is encoded,
//! decoded or viewed. Recursive types are freed with their last owning
//! handle.
//!
//! ## Dispatch
//!
//! [`ViewType`] is the closed set of kinds. Each kind implements [`Codec`] next
//! to its view (see `crate::views`), and `ViewType` forwards to it. The kind is
//! chosen once at compile time and stored in the layout; nothing re-dispatches
//! on a type name per call.

pub mod primitive;

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use eyre::{bail, eyre, Result};

use crate::types::Value;

pub use primitive::{Endian, NumericKind, PrimitiveType};

/// Encoding and decoding of one compiled kind.
///
/// `encode` receives a slice of exactly `fixed_len()` bytes when writing into
/// a fixed slot, and exactly `encoded_len(value)` bytes when writing into a
/// variable region. Encoding `Value::Null` into a fixed slot writes that
/// kind's default image; variable regions never encode `Null` and record a
/// zero span instead.
pub trait Codec {
    fn fixed_len(&self) -> Option<usize>;

    fn encoded_len(&self, value: &Value<'_>) -> Result<usize>;

    fn encode(&self, value: &Value<'_>, out: &mut [u8]) -> Result<usize>;

    fn decode<'a>(&self, data: &'a [u8]) -> Result<Value<'a>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringType {
    pub max_length: Option<usize>,
}

impl StringType {
    pub fn new(max_length: Option<usize>) -> Self {
        Self { max_length }
    }
}

/// A field at a constant offset.
#[derive(Debug, Clone)]
pub struct FieldLayout {
    pub name: String,
    pub ty: ViewType,
    pub start: usize,
    pub length: usize,
    pub default: Option<Value<'static>>,
}

impl FieldLayout {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.length
    }
}

/// An optional map field addressed through the offset table.
#[derive(Debug, Clone)]
pub struct OptionalField {
    pub name: String,
    pub ty: ViewType,
    pub slot_offset: usize,
    pub max_length: Option<usize>,
    pub default: Option<Value<'static>>,
}

#[derive(Debug)]
pub struct ObjectLayout {
    pub fields: Vec<FieldLayout>,
    pub length: usize,
    pub default_image: Vec<u8>,
}

impl ObjectLayout {
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug)]
pub struct MapLayout {
    pub required: Vec<FieldLayout>,
    pub optional: Vec<OptionalField>,
    pub required_length: usize,
    pub length_field_offset: usize,
    /// Default image of the required region, `required_length` bytes.
    pub default_image: Vec<u8>,
}

impl MapLayout {
    /// Bytes before the first optional field's data.
    pub fn header_len(&self) -> usize {
        self.length_field_offset + crate::config::MAP_LENGTH_MARKER_WIDTH
    }

    pub fn required_field(&self, name: &str) -> Option<&FieldLayout> {
        self.required.iter().find(|f| f.name == name)
    }

    pub fn optional_index(&self, name: &str) -> Option<usize> {
        self.optional.iter().position(|f| f.name == name)
    }
}

#[derive(Debug)]
pub struct ArrayLayout {
    pub item: ViewType,
    pub count: usize,
    pub item_len: usize,
    pub default_image: Vec<u8>,
}

#[derive(Debug)]
pub struct VectorLayout {
    pub item: ViewType,
}

#[derive(Debug)]
pub struct CollectionLayout {
    pub parts: Vec<ViewType>,
}

/// Storage behind a record handle.
///
/// A record that is still being compiled can only be reached again from
/// inside its own fields, so the compiler links those references with
/// `Back`. Every cycle between records therefore contains one weak edge, and
/// dropping the last owning handle frees the whole group.
enum Link<L> {
    Owned(Arc<OnceLock<L>>),
    Back(Weak<OnceLock<L>>),
}

impl<L> Clone for Link<L> {
    fn clone(&self) -> Self {
        match self {
            Link::Owned(slot) => Link::Owned(Arc::clone(slot)),
            Link::Back(slot) => Link::Back(Weak::clone(slot)),
        }
    }
}

impl<L> Link<L> {
    fn as_ptr(&self) -> *const OnceLock<L> {
        match self {
            Link::Owned(slot) => Arc::as_ptr(slot),
            Link::Back(slot) => Weak::as_ptr(slot),
        }
    }
}

macro_rules! record_handle {
    ($name:ident, $layout:ident) => {
        #[derive(Clone)]
        pub struct $name {
            id: Arc<str>,
            link: Link<$layout>,
        }

        // Records may reference themselves, so the layout is not printed.
        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("id", &self.id)
                    .field("back_ref", &self.is_back_ref())
                    .finish()
            }
        }

        impl $name {
            pub(crate) fn placeholder(id: &str) -> Self {
                Self {
                    id: Arc::from(id),
                    link: Link::Owned(Arc::new(OnceLock::new())),
                }
            }

            pub(crate) fn fill(&self, layout: $layout) -> Result<()> {
                match &self.link {
                    Link::Owned(slot) => slot
                        .set(layout)
                        .map_err(|_| eyre!("record '{}' compiled twice", self.id)),
                    Link::Back(_) => bail!("record '{}' cannot be filled through a back reference", self.id),
                }
            }

            /// A handle to the same record that does not keep it alive.
            pub(crate) fn back_ref(&self) -> Self {
                let slot = match &self.link {
                    Link::Owned(slot) => Arc::downgrade(slot),
                    Link::Back(slot) => Weak::clone(slot),
                };
                Self {
                    id: Arc::clone(&self.id),
                    link: Link::Back(slot),
                }
            }

            pub fn id(&self) -> &str {
                &self.id
            }

            /// True for a reference from inside the record's own fields.
            pub fn is_back_ref(&self) -> bool {
                matches!(self.link, Link::Back(_))
            }

            /// An owning handle to the record. Back references are upgraded and
            /// fail once every owning handle has been dropped.
            pub fn resolve(&self) -> Result<Cow<'_, Self>> {
                match &self.link {
                    Link::Owned(_) => Ok(Cow::Borrowed(self)),
                    Link::Back(slot) => {
                        let slot = slot.upgrade().ok_or_else(|| {
                            eyre!("record '{}' was dropped while a reference to it remained", self.id)
                        })?;
                        Ok(Cow::Owned(Self {
                            id: Arc::clone(&self.id),
                            link: Link::Owned(slot),
                        }))
                    }
                }
            }

            /// The compiled layout. Back references must be resolved first.
            pub fn layout(&self) -> Result<&$layout> {
                match &self.link {
                    Link::Owned(slot) => slot.get().ok_or_else(|| {
                        eyre!("record '{}' is used before its layout is compiled", self.id)
                    }),
                    Link::Back(_) => bail!("record '{}' is a back reference; resolve it first", self.id),
                }
            }

            pub fn is_compiled(&self) -> bool {
                match &self.link {
                    Link::Owned(slot) => slot.get().is_some(),
                    Link::Back(slot) => slot.upgrade().is_some_and(|s| s.get().is_some()),
                }
            }

            pub fn same_type(&self, other: &Self) -> bool {
                std::ptr::eq(self.link.as_ptr(), other.link.as_ptr())
            }
        }
    };
}

record_handle!(ObjectType, ObjectLayout);
record_handle!(MapType, MapLayout);

macro_rules! sequence_handle {
    ($name:ident, $layout:ident) => {
        #[derive(Debug, Clone)]
        pub struct $name(Arc<$layout>);

        impl $name {
            pub(crate) fn new(layout: $layout) -> Self {
                Self(Arc::new(layout))
            }

            pub fn layout(&self) -> &$layout {
                &self.0
            }

            pub fn same_type(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0)
            }
        }
    };
}

sequence_handle!(ArrayType, ArrayLayout);
sequence_handle!(VectorType, VectorLayout);
sequence_handle!(CollectionType, CollectionLayout);

/// Any compiled view type.
#[derive(Debug, Clone)]
pub enum ViewType {
    Primitive(PrimitiveType),
    String(StringType),
    Array(ArrayType),
    Object(ObjectType),
    Map(MapType),
    Vector(VectorType),
    Collection(CollectionType),
}

impl ViewType {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ViewType::Primitive(_) => "primitive",
            ViewType::String(_) => "string",
            ViewType::Array(_) => "array",
            ViewType::Object(_) => "object",
            ViewType::Map(_) => "map",
            ViewType::Vector(_) => "vector",
            ViewType::Collection(_) => "collection",
        }
    }

    /// Identity comparison: true when both handles point at the same compiled
    /// type. Value-typed kinds (primitives, strings) compare by value.
    pub fn same_type(&self, other: &ViewType) -> bool {
        match (self, other) {
            (ViewType::Primitive(a), ViewType::Primitive(b)) => a == b,
            (ViewType::String(a), ViewType::String(b)) => a == b,
            (ViewType::Array(a), ViewType::Array(b)) => a.same_type(b),
            (ViewType::Object(a), ViewType::Object(b)) => a.same_type(b),
            (ViewType::Map(a), ViewType::Map(b)) => a.same_type(b),
            (ViewType::Vector(a), ViewType::Vector(b)) => a.same_type(b),
            (ViewType::Collection(a), ViewType::Collection(b)) => a.same_type(b),
            _ => false,
        }
    }

    fn codec(&self) -> &dyn Codec {
        match self {
            ViewType::Primitive(t) => t,
            ViewType::String(t) => t,
            ViewType::Array(t) => t,
            ViewType::Object(t) => t,
            ViewType::Map(t) => t,
            ViewType::Vector(t) => t,
            ViewType::Collection(t) => t,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            ViewType::Object(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapType> {
        match self {
            ViewType::Map(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorType> {
        match self {
            ViewType::Vector(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            ViewType::Array(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionType> {
        match self {
            ViewType::Collection(t) => Some(t),
            _ => None,
        }
    }
}

impl Codec for ViewType {
    fn fixed_len(&self) -> Option<usize> {
        self.codec().fixed_len()
    }

    fn encoded_len(&self, value: &Value<'_>) -> Result<usize> {
        self.codec().encoded_len(value)
    }

    fn encode(&self, value: &Value<'_>, out: &mut [u8]) -> Result<usize> {
        self.codec().encode(value, out)
    }

    fn decode<'a>(&self, data: &'a [u8]) -> Result<Value<'a>> {
        self.codec().decode(data)
    }
}

impl From<PrimitiveType> for ViewType {
    fn from(t: PrimitiveType) -> Self {
        ViewType::Primitive(t)
    }
}

impl From<StringType> for ViewType {
    fn from(t: StringType) -> Self {
        ViewType::String(t)
    }
}

impl From<ArrayType> for ViewType {
    fn from(t: ArrayType) -> Self {
        ViewType::Array(t)
    }
}

impl From<ObjectType> for ViewType {
    fn from(t: ObjectType) -> Self {
        ViewType::Object(t)
    }
}

impl From<MapType> for ViewType {
    fn from(t: MapType) -> Self {
        ViewType::Map(t)
    }
}

impl From<VectorType> for ViewType {
    fn from(t: VectorType) -> Self {
        ViewType::Vector(t)
    }
}

impl From<CollectionType> for ViewType {
    fn from(t: CollectionType) -> Self {
        ViewType::Collection(t)
    }
}
