//! # MapView - Sparse Record
//!
//! A map keeps its required fields at fixed offsets, like an object, and
//! addresses its optional fields through an offset table that points into a
//! trailing variable region. Absent optional fields cost four bytes.
//!
//! ## Wire Layout
//!
//! ```text
//! ┌─────────────────┬────────┬─────┬──────────┬────────┬─────────────────┐
//! │ required fields │ slot 0 │ ... │ slot N-1 │ marker │ optional data   │
//! │ (fixed offsets) │ u32 LE │     │ u32 LE   │ u32 LE │ (declared order)│
//! └─────────────────┴────────┴─────┴──────────┴────────┴─────────────────┘
//! 0          required_length                 length_field_offset
//! ```
//!
//! Slot `i` holds the start of optional field `i`. Its end is slot `i + 1`,
//! or the marker for the last field. The marker holds the total used length.
//! A zero span is an absent field.
//!
//! ## Encoding Rules
//!
//! - Required fields start from the default image and are overlaid when
//!   present and non-null.
//! - An optional field whose key is missing encodes its declared default, if
//!   any. An explicit `Null` is always absent.
//! - Each present optional field advances the cursor by its encoded length,
//!   clamped to the field's maximum.
//!
//! ## In-Place Updates
//!
//! `set` on an optional field rewrites its bytes only when the new encoding
//! fits the current span; growing a field raises `CapacityExceeded`, since
//! moving the trailing fields would invalidate other views of the buffer.

use std::borrow::Cow;
use std::ops::Range;

use eyre::{bail, ensure, eyre, Result};

use crate::error::ensure_capacity;
use crate::layout::primitive::{read_offset, write_offset};
use crate::layout::{Codec, MapLayout, MapType, OptionalField, ViewType};
use crate::types::Value;
use crate::views::{checked_span, decode_span, rewrite_span, span_len, View};

/// The value an optional field encodes for `input`.
fn effective_input<'v, 'a>(field: &'v OptionalField, input: &'v Value<'a>) -> &'v Value<'a> {
    match input.field(&field.name) {
        Some(v) => v,
        None => field.default.as_ref().unwrap_or(&Value::Null),
    }
}

fn optional_len(field: &OptionalField, value: &Value<'_>) -> Result<usize> {
    let len = span_len(&field.ty, value)?;
    Ok(field.max_length.map_or(len, |max| len.min(max)))
}

/// Start and end of optional field `index` within a map whose marker is `end`.
fn optional_span(layout: &MapLayout, data: &[u8], index: usize, end: usize) -> Result<Range<usize>> {
    let start = read_offset(data, layout.optional[index].slot_offset)?;
    let stop = match layout.optional.get(index + 1) {
        Some(next) => read_offset(data, next.slot_offset)?,
        None => end,
    };
    checked_span(start, stop, end)
}

fn check_object(ty: &MapType, value: &Value<'_>) -> Result<()> {
    match value {
        Value::Null | Value::Object(_) => Ok(()),
        other => bail!(
            "expected an object for map '{}', got {}",
            ty.id(),
            other.kind_name()
        ),
    }
}

fn used_length(layout: &MapLayout, data: &[u8]) -> Result<usize> {
    let end = read_offset(data, layout.length_field_offset)?;
    ensure!(
        end >= layout.header_len() && end <= data.len(),
        "map length marker {} is outside {}..={}",
        end,
        layout.header_len(),
        data.len()
    );
    Ok(end)
}

impl Codec for MapType {
    fn fixed_len(&self) -> Option<usize> {
        None
    }

    fn encoded_len(&self, value: &Value<'_>) -> Result<usize> {
        let this = self.resolve()?;
        let layout = this.layout()?;
        check_object(self, value)?;
        for field in &layout.required {
            if let Some(v) = value.field(&field.name).filter(|v| !v.is_null()) {
                field.ty.encoded_len(v)?;
            }
        }
        layout.optional.iter().try_fold(layout.header_len(), |len, field| {
            Ok(len + optional_len(field, effective_input(field, value))?)
        })
    }

    fn encode(&self, value: &Value<'_>, out: &mut [u8]) -> Result<usize> {
        let this = self.resolve()?;
        let layout = this.layout()?;
        check_object(self, value)?;
        ensure!(
            out.len() >= layout.header_len(),
            "map '{}' needs at least {} bytes, got {}",
            self.id(),
            layout.header_len(),
            out.len()
        );

        out[..layout.required_length].copy_from_slice(&layout.default_image);
        for field in &layout.required {
            match value.field(&field.name) {
                Some(v) if !v.is_null() => {
                    field.ty.encode(v, &mut out[field.range()])?;
                }
                _ => {}
            }
        }

        let mut end = layout.header_len();
        for field in &layout.optional {
            write_offset(out, field.slot_offset, end)?;
            let input = effective_input(field, value);
            let len = optional_len(field, input)?;
            if len == 0 {
                continue;
            }
            ensure_capacity(end + len, out.len())?;
            field.ty.encode(input, &mut out[end..end + len])?;
            end += len;
        }
        write_offset(out, layout.length_field_offset, end)?;
        Ok(end)
    }

    fn decode<'a>(&self, data: &'a [u8]) -> Result<Value<'a>> {
        let this = self.resolve()?;
        let layout = this.layout()?;
        let end = used_length(layout, data)?;
        let mut pairs = Vec::with_capacity(layout.required.len() + layout.optional.len());
        for field in &layout.required {
            let value = field.ty.decode(&data[field.range()])?;
            pairs.push((Cow::Owned(field.name.clone()), value));
        }
        for (i, field) in layout.optional.iter().enumerate() {
            let span = optional_span(layout, data, i, end)?;
            let value = decode_span(&field.ty, &data[span])?;
            pairs.push((Cow::Owned(field.name.clone()), value));
        }
        Ok(Value::Object(pairs))
    }
}

#[derive(Debug, Clone)]
pub struct MapView<B> {
    ty: MapType,
    data: B,
    end: usize,
}

impl<B: AsRef<[u8]>> MapView<B> {
    pub fn new(ty: MapType, data: B) -> Result<Self> {
        let ty = ty.resolve()?.into_owned();
        let layout = ty.layout()?;
        ensure!(
            data.as_ref().len() >= layout.header_len(),
            "map '{}' view needs at least {} bytes, got {}",
            ty.id(),
            layout.header_len(),
            data.as_ref().len()
        );
        let end = used_length(layout, data.as_ref())?;
        Ok(Self { ty, data, end })
    }

    pub fn ty(&self) -> &MapType {
        &self.ty
    }

    /// Used length recorded in the marker.
    pub fn byte_length(&self) -> usize {
        self.end
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data.as_ref()[..self.end]
    }

    fn span_of(&self, name: &str) -> Result<Range<usize>> {
        let layout = self.ty.layout()?;
        if let Some(field) = layout.required_field(name) {
            return Ok(field.range());
        }
        let index = layout
            .optional_index(name)
            .ok_or_else(|| eyre!("map '{}' has no field '{}'", self.ty.id(), name))?;
        optional_span(layout, self.data.as_ref(), index, self.end)
    }

    fn field_type(&self, name: &str) -> Result<&ViewType> {
        let layout = self.ty.layout()?;
        if let Some(field) = layout.required_field(name) {
            return Ok(&field.ty);
        }
        layout
            .optional
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.ty)
            .ok_or_else(|| eyre!("map '{}' has no field '{}'", self.ty.id(), name))
    }

    /// Decodes a field; absent optional fields are `Null`.
    pub fn get(&self, name: &str) -> Result<Value<'_>> {
        let span = self.span_of(name)?;
        decode_span(self.field_type(name)?, &self.data.as_ref()[span])
    }

    /// Whether a field holds a value. Required fields always do.
    pub fn has(&self, name: &str) -> Result<bool> {
        Ok(!self.span_of(name)?.is_empty())
    }

    pub fn get_view(&self, name: &str) -> Result<Option<View<&[u8]>>> {
        let span = self.span_of(name)?;
        if span.is_empty() {
            return Ok(None);
        }
        let ty = self.field_type(name)?;
        ty.view(&self.data.as_ref()[span]).map(Some)
    }

    /// Present fields in layout order, required fields first.
    pub fn fields(&self) -> impl Iterator<Item = Result<(&str, Value<'_>)>> + '_ {
        let (required, optional) = match self.ty.layout() {
            Ok(l) => (l.required.as_slice(), l.optional.as_slice()),
            Err(_) => (&[][..], &[][..]),
        };
        let data = self.data.as_ref();
        let required = required.iter().map(move |f| {
            f.ty.decode(&data[f.range()])
                .map(|v| (f.name.as_str(), v))
        });
        let optional = optional.iter().enumerate().filter_map(move |(i, f)| {
            let span = match self.ty.layout().and_then(|l| optional_span(l, data, i, self.end)) {
                Ok(span) if span.is_empty() => return None,
                Ok(span) => span,
                Err(e) => return Some(Err(e)),
            };
            Some(f.ty.decode(&data[span]).map(|v| (f.name.as_str(), v)))
        });
        required.chain(optional)
    }

    pub fn to_value(&self) -> Result<Value<'_>> {
        self.ty.decode(self.data.as_ref())
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(self.to_value()?.to_json())
    }

    pub fn into_inner(self) -> B {
        self.data
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> MapView<B> {
    /// Overwrites one field in place.
    ///
    /// Required fields behave like object fields (`Null` restores the
    /// default). Optional fields must fit their current span.
    pub fn set(&mut self, name: &str, value: &Value<'_>) -> Result<&mut Self> {
        let layout = self.ty.layout()?;
        if let Some(field) = layout.required_field(name) {
            let range = field.range();
            let data = self.data.as_mut();
            if value.is_null() {
                data[range.clone()].copy_from_slice(&layout.default_image[range]);
            } else {
                field.ty.encoded_len(value)?;
                field.ty.encode(value, &mut data[range])?;
            }
            return Ok(self);
        }
        let index = layout
            .optional_index(name)
            .ok_or_else(|| eyre!("map '{}' has no field '{}'", self.ty.id(), name))?;
        let field = &layout.optional[index];
        let span = optional_span(layout, self.data.as_ref(), index, self.end)?;
        rewrite_span(&field.ty, value, &mut self.data.as_mut()[span])?;
        Ok(self)
    }

    /// Re-encodes the whole map into the existing buffer. The value is
    /// checked and sized before any byte changes.
    pub fn write(&mut self, value: &Value<'_>) -> Result<&mut Self> {
        let required = self.ty.encoded_len(value)?;
        ensure_capacity(required, self.data.as_ref().len())?;
        self.end = self.ty.encode(value, self.data.as_mut())?;
        Ok(self)
    }
}

impl MapView<Vec<u8>> {
    /// Allocates exactly the encoded length and encodes `value`.
    pub fn from_value(ty: MapType, value: &Value<'_>) -> Result<Self> {
        let ty = ty.resolve()?.into_owned();
        let len = ty.encoded_len(value)?;
        let mut data = vec![0u8; len];
        let end = ty.encode(value, &mut data)?;
        Ok(Self { ty, data, end })
    }
}
