//! # VectorView - Variable-Length Sequence
//!
//! A vector stores a count, an offset table with one more entry than there
//! are items, and the item data back to back. Items may have any encoded
//! length, including none at all: an item whose span is empty is a hole and
//! decodes to `Value::Null`.
//!
//! ## Wire Layout
//!
//! ```text
//! ┌───────┬──────────┬──────────┬─────┬──────────────┬──────────────┐
//! │ count │ offset 0 │ offset 1 │ ... │ offset count │ item data    │
//! │ u32   │ u32      │ u32      │     │ u32 (= end)  │              │
//! └───────┴──────────┴──────────┴─────┴──────────────┴──────────────┘
//! ```
//!
//! Item `i` spans `offset[i]..offset[i + 1]`. `offset[0]` is the header
//! length and `offset[count]` the total length, so the table is
//! non-decreasing and a view's byte length is its last offset.
//!
//! ## Nesting
//!
//! Items are encoded into their own sub-slice and every offset is relative to
//! the start of the vector, so a vector of maps or vectors encodes by calling
//! the item type's codec at the running cursor.
//!
//! ## Sizing
//!
//! `from_value` makes two passes: `encoded_len` sums the exact length, then
//! the value is encoded into a buffer of that size. [`ScratchBuffer`] reuses
//! one bounded buffer instead.
//!
//! [`ScratchBuffer`]: crate::views::ScratchBuffer

use std::ops::Range;

use eyre::{bail, ensure, Result};
use smallvec::SmallVec;

use crate::config::{OFFSET_WIDTH, VECTOR_COUNT_WIDTH};
use crate::error::ensure_capacity;
use crate::layout::primitive::{read_offset, write_offset};
use crate::layout::{Codec, VectorType, ViewType};
use crate::types::Value;
use crate::views::{checked_span, decode_span, rewrite_span, span_len, View};

/// Header length of a vector holding `count` items.
pub fn header_len(count: usize) -> Option<usize> {
    count
        .checked_add(1)?
        .checked_mul(OFFSET_WIDTH)?
        .checked_add(VECTOR_COUNT_WIDTH)
}

fn entry_pos(index: usize) -> usize {
    VECTOR_COUNT_WIDTH + index * OFFSET_WIDTH
}

fn list_items<'v, 'a>(value: &'v Value<'a>) -> Result<&'v [Value<'a>]> {
    match value {
        Value::Null => Ok(&[]),
        Value::List(items) => Ok(items),
        other => bail!("expected a list for vector, got {}", other.kind_name()),
    }
}

/// Reads and validates the count, returning it with the header length.
fn read_header(data: &[u8]) -> Result<(usize, usize)> {
    let count = read_offset(data, 0)?;
    let header = header_len(count)
        .filter(|&h| h <= data.len())
        .ok_or_else(|| {
            eyre::eyre!(
                "vector of {} items does not fit in {} bytes",
                count,
                data.len()
            )
        })?;
    Ok((count, header))
}

impl Codec for VectorType {
    fn fixed_len(&self) -> Option<usize> {
        None
    }

    fn encoded_len(&self, value: &Value<'_>) -> Result<usize> {
        let items = list_items(value)?;
        let header = header_len(items.len())
            .ok_or_else(|| eyre::eyre!("vector of {} items is too long", items.len()))?;
        let item_ty = &self.layout().item;
        items
            .iter()
            .try_fold(header, |len, item| Ok(len + span_len(item_ty, item)?))
    }

    fn encode(&self, value: &Value<'_>, out: &mut [u8]) -> Result<usize> {
        let items = list_items(value)?;
        let item_ty = &self.layout().item;
        let header = header_len(items.len())
            .ok_or_else(|| eyre::eyre!("vector of {} items is too long", items.len()))?;
        ensure_capacity(header, out.len())?;

        write_offset(out, 0, items.len())?;
        let mut cursor = header;
        for (i, item) in items.iter().enumerate() {
            write_offset(out, entry_pos(i), cursor)?;
            let len = span_len(item_ty, item)?;
            if len == 0 {
                continue;
            }
            ensure_capacity(cursor + len, out.len())?;
            item_ty.encode(item, &mut out[cursor..cursor + len])?;
            cursor += len;
        }
        write_offset(out, entry_pos(items.len()), cursor)?;
        Ok(cursor)
    }

    fn decode<'a>(&self, data: &'a [u8]) -> Result<Value<'a>> {
        let (count, header) = read_header(data)?;
        let offsets = (0..=count)
            .map(|i| read_offset(data, entry_pos(i)))
            .collect::<Result<SmallVec<[usize; 16]>>>()?;
        ensure!(
            offsets[0] >= header,
            "vector data starts at {} inside its {} byte header",
            offsets[0],
            header
        );
        let item_ty = &self.layout().item;
        offsets
            .windows(2)
            .map(|w| {
                let span = checked_span(w[0], w[1], data.len())?;
                decode_span(item_ty, &data[span])
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::List)
    }
}

#[derive(Debug, Clone)]
pub struct VectorView<B> {
    ty: VectorType,
    data: B,
    count: usize,
    end: usize,
}

impl<B: AsRef<[u8]>> VectorView<B> {
    pub fn new(ty: VectorType, data: B) -> Result<Self> {
        let bytes = data.as_ref();
        let (count, header) = read_header(bytes)?;
        let end = read_offset(bytes, entry_pos(count))?;
        ensure!(
            end >= header && end <= bytes.len(),
            "vector end offset {} is outside {}..={}",
            end,
            header,
            bytes.len()
        );
        Ok(Self {
            ty,
            data,
            count,
            end,
        })
    }

    pub fn ty(&self) -> &VectorType {
        &self.ty
    }

    pub fn item_type(&self) -> &ViewType {
        &self.ty.layout().item
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The last offset: header plus item data.
    pub fn byte_length(&self) -> usize {
        self.end
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data.as_ref()[..self.end]
    }

    fn item_span(&self, index: usize) -> Result<Range<usize>> {
        ensure!(
            index < self.count,
            "index {} out of bounds for vector of {} items",
            index,
            self.count
        );
        let data = self.data.as_ref();
        let start = read_offset(data, entry_pos(index))?;
        let stop = read_offset(data, entry_pos(index + 1))?;
        checked_span(start, stop, self.end)
    }

    /// Decodes item `index`; holes are `Null`.
    pub fn get(&self, index: usize) -> Result<Value<'_>> {
        let span = self.item_span(index)?;
        decode_span(self.item_type(), &self.data.as_ref()[span])
    }

    pub fn has(&self, index: usize) -> Result<bool> {
        Ok(!self.item_span(index)?.is_empty())
    }

    pub fn get_view(&self, index: usize) -> Result<Option<View<&[u8]>>> {
        let span = self.item_span(index)?;
        if span.is_empty() {
            return Ok(None);
        }
        self.item_type().view(&self.data.as_ref()[span]).map(Some)
    }

    /// Yields a view per item, `None` for holes.
    pub fn iter(&self) -> impl Iterator<Item = Result<Option<View<&[u8]>>>> + '_ {
        (0..self.count).map(move |i| self.get_view(i))
    }

    pub fn values(&self) -> impl Iterator<Item = Result<Value<'_>>> + '_ {
        (0..self.count).map(move |i| self.get(i))
    }

    pub fn to_value(&self) -> Result<Value<'_>> {
        self.ty.decode(self.bytes())
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(self.to_value()?.to_json())
    }

    pub fn into_inner(self) -> B {
        self.data
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> VectorView<B> {
    /// Rewrites item `index` in place. The new encoding must fit the item's
    /// current span.
    pub fn set(&mut self, index: usize, value: &Value<'_>) -> Result<&mut Self> {
        let span = self.item_span(index)?;
        rewrite_span(&self.ty.layout().item, value, &mut self.data.as_mut()[span])?;
        Ok(self)
    }

    /// Re-encodes the whole vector into the existing buffer. Every item is
    /// checked and sized before any byte changes.
    pub fn write(&mut self, value: &Value<'_>) -> Result<&mut Self> {
        let required = self.ty.encoded_len(value)?;
        ensure_capacity(required, self.data.as_ref().len())?;
        self.end = self.ty.encode(value, self.data.as_mut())?;
        self.count = read_offset(self.data.as_ref(), 0)?;
        Ok(self)
    }
}

impl VectorView<Vec<u8>> {
    /// Allocates exactly the encoded length and encodes `value`.
    pub fn from_value(ty: VectorType, value: &Value<'_>) -> Result<Self> {
        let len = ty.encoded_len(value)?;
        let mut data = vec![0u8; len];
        ty.encode(value, &mut data)?;
        Self::new(ty, data)
    }
}
