//! # CollectionView - Heterogeneous Tuple
//!
//! A collection has a fixed number of parts, each with its own type and its
//! own encoded length. One offset table addresses all of them:
//!
//! ```text
//! ┌──────────┬─────┬────────────┬────────┬─────┬──────────┐
//! │ offset 0 │ ... │ offset N-1 │ part 0 │ ... │ part N-1 │
//! └──────────┴─────┴────────────┴────────┴─────┴──────────┘
//! ```
//!
//! Part `i` spans `offset[i]..offset[i + 1]`; the last part runs to the end
//! of the view. An empty part decodes to `Value::Null`.

use std::ops::Range;

use eyre::{bail, ensure, Result};

use crate::config::OFFSET_WIDTH;
use crate::error::ensure_capacity;
use crate::layout::primitive::{read_offset, write_offset};
use crate::layout::{Codec, CollectionType, ViewType};
use crate::types::Value;
use crate::views::{checked_span, decode_span, rewrite_span, span_len, View};

impl CollectionType {
    pub fn arity(&self) -> usize {
        self.layout().parts.len()
    }

    fn header_len(&self) -> usize {
        self.arity() * OFFSET_WIDTH
    }
}

fn part_inputs<'v, 'a>(value: &'v Value<'a>) -> Result<&'v [Value<'a>]> {
    match value {
        Value::Null => Ok(&[]),
        Value::List(items) => Ok(items),
        other => bail!("expected a list for collection, got {}", other.kind_name()),
    }
}

/// Span of part `index` in a collection of `arity` parts over `data`.
fn part_span(data: &[u8], arity: usize, index: usize) -> Result<Range<usize>> {
    let start = read_offset(data, index * OFFSET_WIDTH)?;
    let stop = if index + 1 < arity {
        read_offset(data, (index + 1) * OFFSET_WIDTH)?
    } else {
        data.len()
    };
    checked_span(start, stop, data.len())
}

impl Codec for CollectionType {
    fn fixed_len(&self) -> Option<usize> {
        None
    }

    fn encoded_len(&self, value: &Value<'_>) -> Result<usize> {
        let inputs = part_inputs(value)?;
        self.layout()
            .parts
            .iter()
            .enumerate()
            .try_fold(self.header_len(), |len, (i, part)| {
                Ok(len + span_len(part, inputs.get(i).unwrap_or(&Value::Null))?)
            })
    }

    fn encode(&self, value: &Value<'_>, out: &mut [u8]) -> Result<usize> {
        let inputs = part_inputs(value)?;
        let header = self.header_len();
        ensure_capacity(header, out.len())?;
        let mut cursor = header;
        for (i, part) in self.layout().parts.iter().enumerate() {
            write_offset(out, i * OFFSET_WIDTH, cursor)?;
            let input = inputs.get(i).unwrap_or(&Value::Null);
            let len = span_len(part, input)?;
            if len == 0 {
                continue;
            }
            ensure_capacity(cursor + len, out.len())?;
            part.encode(input, &mut out[cursor..cursor + len])?;
            cursor += len;
        }
        Ok(cursor)
    }

    fn decode<'a>(&self, data: &'a [u8]) -> Result<Value<'a>> {
        let arity = self.arity();
        ensure!(
            data.len() >= self.header_len(),
            "collection of {} parts needs at least {} bytes, got {}",
            arity,
            self.header_len(),
            data.len()
        );
        self.layout()
            .parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                let span = part_span(data, arity, i)?;
                decode_span(part, &data[span])
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::List)
    }
}

#[derive(Debug, Clone)]
pub struct CollectionView<B> {
    ty: CollectionType,
    data: B,
}

impl<B: AsRef<[u8]>> CollectionView<B> {
    pub fn new(ty: CollectionType, data: B) -> Result<Self> {
        ensure!(
            data.as_ref().len() >= ty.header_len(),
            "collection of {} parts needs at least {} bytes, got {}",
            ty.arity(),
            ty.header_len(),
            data.as_ref().len()
        );
        Ok(Self { ty, data })
    }

    pub fn ty(&self) -> &CollectionType {
        &self.ty
    }

    pub fn len(&self) -> usize {
        self.ty.arity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_length(&self) -> usize {
        self.data.as_ref().len()
    }

    pub fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn part(&self, index: usize) -> Result<(&ViewType, Range<usize>)> {
        let parts = &self.ty.layout().parts;
        let part = parts.get(index).ok_or_else(|| {
            eyre::eyre!(
                "index {} out of bounds for collection of {} parts",
                index,
                parts.len()
            )
        })?;
        Ok((part, part_span(self.data.as_ref(), parts.len(), index)?))
    }

    pub fn get(&self, index: usize) -> Result<Value<'_>> {
        let (ty, span) = self.part(index)?;
        decode_span(ty, &self.data.as_ref()[span])
    }

    pub fn get_view(&self, index: usize) -> Result<Option<View<&[u8]>>> {
        let (ty, span) = self.part(index)?;
        if span.is_empty() {
            return Ok(None);
        }
        ty.view(&self.data.as_ref()[span]).map(Some)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<Option<View<&[u8]>>>> + '_ {
        (0..self.len()).map(move |i| self.get_view(i))
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

impl<B: AsRef<[u8]> + AsMut<[u8]>> CollectionView<B> {
    /// Rewrites part `index` in place. The new encoding must fit the part's
    /// current span.
    pub fn set(&mut self, index: usize, value: &Value<'_>) -> Result<&mut Self> {
        let span = self.part(index)?.1;
        let part = &self.ty.layout().parts[index];
        rewrite_span(part, value, &mut self.data.as_mut()[span])?;
        Ok(self)
    }

    /// Re-encodes the collection into the existing buffer. The view keeps its
    /// byte length, so the encoding must fill it exactly.
    pub fn write(&mut self, value: &Value<'_>) -> Result<&mut Self> {
        let required = self.ty.encoded_len(value)?;
        ensure!(
            required == self.byte_length(),
            "collection encoding of {} bytes does not match the view's {} bytes",
            required,
            self.byte_length()
        );
        self.ty.encode(value, self.data.as_mut())?;
        Ok(self)
    }
}

impl CollectionView<Vec<u8>> {
    pub fn from_value(ty: CollectionType, value: &Value<'_>) -> Result<Self> {
        let len = ty.encoded_len(value)?;
        let mut data = vec![0u8; len];
        ty.encode(value, &mut data)?;
        Self::new(ty, data)
    }
}
