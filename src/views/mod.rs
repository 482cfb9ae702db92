//! # Views
//!
//! A view is a typed window over a byte buffer. It holds a compiled type
//! handle and the buffer, nothing else: constructing one never copies bytes,
//! and writing through one never allocates.
//!
//! ## Buffer Ownership
//!
//! Every view is generic over its storage `B`:
//!
//! | `B` | Reads | Writes | Typical source |
//! |-----|-------|--------|----------------|
//! | `&[u8]` | yes | no | decoding a received message |
//! | `&mut [u8]` | yes | yes | editing a region of a larger buffer |
//! | `Vec<u8>` | yes | yes | `from_value`, sized exactly |
//!
//! Read methods live on `impl<B: AsRef<[u8]>>`, write methods on
//! `impl<B: AsRef<[u8]> + AsMut<[u8]>>`, so a read-only view has no setters
//! at all and overlapping mutable views cannot be built.
//!
//! ## Module Structure
//!
//! - `primitive`: one scalar and its strided array form
//! - `string`: UTF-8 spans, search, reverse, replace
//! - `array`: fixed count of fixed-length items
//! - `object`: fixed record
//! - `map`: sparse record with an optional-field offset table
//! - `vector`: variable sequence with holes
//! - `collection`: heterogeneous tuple
//! - `scratch`: bounded reusable encode buffer
//! - `tagged`: discriminant-based dispatch over fixed records
//!
//! ## Variable Regions
//!
//! Maps, vectors and collections share one convention: an offset table of
//! u32 LE entries, each item spanning from its entry to the next. Equal
//! adjacent offsets mean the item is absent and decodes to `Value::Null`.
//! Rewriting an item in place is allowed only when the new encoding fits in
//! the existing span.

pub mod array;
pub mod collection;
pub mod map;
pub mod object;
pub mod primitive;
pub mod scratch;
pub mod string;
pub mod tagged;
pub mod vector;


use std::ops::Range;

use eyre::{bail, ensure, Result};

use crate::error::ensure_capacity;
use crate::layout::{Codec, ViewType};
use crate::types::Value;

pub use array::ArrayView;
pub use collection::CollectionView;
pub use map::MapView;
pub use object::ObjectView;
pub use primitive::{PrimitiveArrayView, PrimitiveView};
pub use scratch::ScratchBuffer;
pub use string::{Searcher, StringView};
pub use tagged::{Discriminant, TagRegistry};
pub use vector::VectorView;

/// A view of any kind.
#[derive(Debug, Clone)]
pub enum View<B> {
    Primitive(PrimitiveView<B>),
    String(StringView<B>),
    Array(ArrayView<B>),
    Object(ObjectView<B>),
    Map(MapView<B>),
    Vector(VectorView<B>),
    Collection(CollectionView<B>),
}

impl ViewType {
    /// Wraps `data` in the view matching this type.
    pub fn view<B: AsRef<[u8]>>(&self, data: B) -> Result<View<B>> {
        let view = match self {
            ViewType::Primitive(t) => View::Primitive(PrimitiveView::new(*t, data)?),
            ViewType::String(_) => View::String(StringView::new(data)),
            ViewType::Array(t) => View::Array(ArrayView::new(t.clone(), data)?),
            ViewType::Object(t) => View::Object(ObjectView::new(t.clone(), data)?),
            ViewType::Map(t) => View::Map(MapView::new(t.clone(), data)?),
            ViewType::Vector(t) => View::Vector(VectorView::new(t.clone(), data)?),
            ViewType::Collection(t) => View::Collection(CollectionView::new(t.clone(), data)?),
        };
        Ok(view)
    }

    /// Encodes `value` into a freshly allocated buffer of exactly its length.
    pub fn encode_to_vec(&self, value: &Value<'_>) -> Result<Vec<u8>> {
        let len = match self.fixed_len() {
            Some(len) => len,
            None => self.encoded_len(value)?,
        };
        let mut data = vec![0u8; len];
        self.encode(value, &mut data)?;
        Ok(data)
    }
}

impl<B: AsRef<[u8]>> View<B> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            View::Primitive(_) => "primitive",
            View::String(_) => "string",
            View::Array(_) => "array",
            View::Object(_) => "object",
            View::Map(_) => "map",
            View::Vector(_) => "vector",
            View::Collection(_) => "collection",
        }
    }

    pub fn byte_length(&self) -> usize {
        match self {
            View::Primitive(v) => v.byte_length(),
            View::String(v) => v.byte_length(),
            View::Array(v) => v.byte_length(),
            View::Object(v) => v.byte_length(),
            View::Map(v) => v.byte_length(),
            View::Vector(v) => v.byte_length(),
            View::Collection(v) => v.byte_length(),
        }
    }

    pub fn to_value(&self) -> Result<Value<'_>> {
        match self {
            View::Primitive(v) => v.to_value(),
            View::String(v) => Ok(v.to_value()),
            View::Array(v) => v.to_value(),
            View::Object(v) => v.to_value(),
            View::Map(v) => v.to_value(),
            View::Vector(v) => v.to_value(),
            View::Collection(v) => v.to_value(),
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(self.to_value()?.to_json())
    }

    pub fn as_object(&self) -> Option<&ObjectView<B>> {
        match self {
            View::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapView<B>> {
        match self {
            View::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorView<B>> {
        match self {
            View::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&StringView<B>> {
        match self {
            View::String(v) => Some(v),
            _ => None,
        }
    }
}

/// Validates an offset-table span against a buffer of `len` bytes.
pub(crate) fn checked_span(start: usize, end: usize, len: usize) -> Result<Range<usize>> {
    ensure!(
        start <= end && end <= len,
        "offset span {}..{} is invalid for a {} byte buffer",
        start,
        end,
        len
    );
    Ok(start..end)
}

/// Length `value` occupies in a variable region. `Null` is a zero span.
pub(crate) fn span_len(ty: &ViewType, value: &Value<'_>) -> Result<usize> {
    if value.is_null() {
        return Ok(0);
    }
    ty.encoded_len(value)
}

/// Decodes an item of a variable region; a zero span is absent.
pub(crate) fn decode_span<'a>(ty: &ViewType, span: &'a [u8]) -> Result<Value<'a>> {
    if span.is_empty() {
        return Ok(Value::Null);
    }
    ty.decode(span)
}

/// Rewrites one item of a variable region without moving its neighbours.
///
/// The new encoding must fit in `span`; bytes past it are zeroed. A present
/// item cannot become absent in place.
pub(crate) fn rewrite_span(ty: &ViewType, value: &Value<'_>, span: &mut [u8]) -> Result<()> {
    if value.is_null() {
        if span.is_empty() {
            return Ok(());
        }
        bail!("a present item cannot be made absent in place; re-encode the container");
    }
    let required = ty.encoded_len(value)?;
    ensure_capacity(required, span.len())?;
    let (head, tail) = span.split_at_mut(required);
    ty.encode(value, head)?;
    tail.fill(0);
    Ok(())
}
