//! # ArrayView - Fixed-Count Homogeneous Sequence
//!
//! Items are laid out back to back with a stride equal to the item type's
//! fixed length. The number of items a view exposes is derived from its byte
//! length, so a view over a shorter region simply sees fewer items.
//!
//! ```text
//! ┌────────┬────────┬────────┬─────┐
//! │ item 0 │ item 1 │ item 2 │ ... │   stride = item_len
//! └────────┴────────┴────────┴─────┘
//! ```
//!
//! Encoding starts from the compiled default image, then overlays the input
//! list. Lists longer than the declared count are truncated; shorter lists
//! and `Null` items leave the default in place.

use eyre::{bail, ensure, Result};

use crate::layout::{ArrayType, Codec, ViewType};
use crate::types::Value;
use crate::views::View;

impl Codec for ArrayType {
    fn fixed_len(&self) -> Option<usize> {
        let layout = self.layout();
        Some(layout.count * layout.item_len)
    }

    fn encoded_len(&self, value: &Value<'_>) -> Result<usize> {
        let layout = self.layout();
        match value {
            Value::Null => {}
            Value::List(items) => {
                for item in items.iter().take(layout.count).filter(|v| !v.is_null()) {
                    layout.item.encoded_len(item)?;
                }
            }
            other => bail!("expected a list for array, got {}", other.kind_name()),
        }
        Ok(layout.count * layout.item_len)
    }

    fn encode(&self, value: &Value<'_>, out: &mut [u8]) -> Result<usize> {
        let layout = self.layout();
        let len = layout.default_image.len();
        ensure!(
            out.len() >= len,
            "array needs {} bytes, got {}",
            len,
            out.len()
        );
        out[..len].copy_from_slice(&layout.default_image);
        let items = match value {
            Value::Null => return Ok(len),
            Value::List(items) => items,
            other => bail!("expected a list for array, got {}", other.kind_name()),
        };
        for (chunk, item) in out[..len]
            .chunks_exact_mut(layout.item_len)
            .zip(items.iter().take(layout.count))
        {
            if !item.is_null() {
                layout.item.encode(item, chunk)?;
            }
        }
        Ok(len)
    }

    fn decode<'a>(&self, data: &'a [u8]) -> Result<Value<'a>> {
        let layout = self.layout();
        let len = layout.count * layout.item_len;
        ensure!(
            data.len() >= len,
            "array needs {} bytes, got {}",
            len,
            data.len()
        );
        data[..len]
            .chunks_exact(layout.item_len)
            .map(|chunk| layout.item.decode(chunk))
            .collect::<Result<Vec<_>>>()
            .map(Value::List)
    }
}

#[derive(Debug, Clone)]
pub struct ArrayView<B> {
    ty: ArrayType,
    data: B,
}

impl<B: AsRef<[u8]>> ArrayView<B> {
    pub fn new(ty: ArrayType, data: B) -> Result<Self> {
        ensure!(
            ty.layout().item_len > 0,
            "array item length must be non-zero"
        );
        Ok(Self { ty, data })
    }

    pub fn ty(&self) -> &ArrayType {
        &self.ty
    }

    pub fn item_type(&self) -> &ViewType {
        &self.ty.layout().item
    }

    fn stride(&self) -> usize {
        self.ty.layout().item_len
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().len() / self.stride()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_length(&self) -> usize {
        self.len() * self.stride()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data.as_ref()[..self.byte_length()]
    }

    fn item_range(&self, index: usize) -> Result<std::ops::Range<usize>> {
        ensure!(
            index < self.len(),
            "index {} out of bounds for array of {} items",
            index,
            self.len()
        );
        let start = index * self.stride();
        Ok(start..start + self.stride())
    }

    pub fn get(&self, index: usize) -> Result<Value<'_>> {
        let range = self.item_range(index)?;
        self.item_type().decode(&self.data.as_ref()[range])
    }

    pub fn get_view(&self, index: usize) -> Result<View<&[u8]>> {
        let range = self.item_range(index)?;
        self.item_type().view(&self.data.as_ref()[range])
    }

    /// Lazily decodes each item. The iterator is finite and can be
    /// recreated any number of times.
    pub fn iter(&self) -> impl Iterator<Item = Result<Value<'_>>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn to_value(&self) -> Result<Value<'_>> {
        self.iter().collect::<Result<Vec<_>>>().map(Value::List)
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(self.to_value()?.to_json())
    }

    pub fn into_inner(self) -> B {
        self.data
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> ArrayView<B> {
    pub fn get_view_mut(&mut self, index: usize) -> Result<View<&mut [u8]>> {
        let range = self.item_range(index)?;
        self.ty.layout().item.view(&mut self.data.as_mut()[range])
    }

    /// Overwrites one item. `Null` restores the item's default.
    pub fn set(&mut self, index: usize, value: &Value<'_>) -> Result<&mut Self> {
        let range = self.item_range(index)?;
        let layout = self.ty.layout();
        let data = self.data.as_mut();
        if value.is_null() {
            if let Some(default) = layout.default_image.get(range.clone()) {
                data[range].copy_from_slice(default);
                return Ok(self);
            }
        }
        layout.item.encoded_len(value)?;
        layout.item.encode(value, &mut data[range])?;
        Ok(self)
    }

    /// Re-encodes the whole view from `value`, defaults first. The value is
    /// checked before any byte changes.
    pub fn write(&mut self, value: &Value<'_>) -> Result<&mut Self> {
        self.ty.encoded_len(value)?;
        self.ty.encode(value, self.data.as_mut())?;
        Ok(self)
    }
}

impl ArrayView<Vec<u8>> {
    pub fn from_value(ty: ArrayType, value: &Value<'_>) -> Result<Self> {
        let mut data = vec![0u8; ty.layout().default_image.len()];
        ty.encode(value, &mut data)?;
        Self::new(ty, data)
    }
}
