//! # ObjectView - Fixed Record
//!
//! Every field of a fixed record sits at a constant offset computed by the
//! schema compiler, and the record's byte length is the sum of its field
//! lengths. Reading a field is one slice and one decode; no header is parsed.
//!
//! ```text
//! {age: uint8, name: string[10]}
//!
//! offset: 0     1                      11
//!         ┌─────┬──────────────────────┐
//!         │ age │ name (10 bytes)      │
//!         └─────┴──────────────────────┘
//! ```
//!
//! ## Encoding
//!
//! `from_value` allocates exactly `length` bytes, copies the cached default
//! image and overlays every field that is present and non-null in the input.
//! Keys the record does not declare are ignored.

use std::borrow::Cow;

use eyre::{bail, ensure, eyre, Result};

use crate::layout::{Codec, FieldLayout, ObjectType};
use crate::types::Value;
use crate::views::View;

impl ObjectType {
    /// Byte length of every instance of this record.
    pub fn length(&self) -> Result<usize> {
        Ok(self.resolve()?.layout()?.length)
    }

    fn field_layout(&self, name: &str) -> Result<&FieldLayout> {
        self.layout()?
            .field(name)
            .ok_or_else(|| eyre!("object '{}' has no field '{}'", self.id(), name))
    }
}

impl Codec for ObjectType {
    fn fixed_len(&self) -> Option<usize> {
        self.length().ok()
    }

    fn encoded_len(&self, value: &Value<'_>) -> Result<usize> {
        let this = self.resolve()?;
        let layout = this.layout()?;
        check_object(self, value)?;
        for field in &layout.fields {
            if let Some(v) = value.field(&field.name).filter(|v| !v.is_null()) {
                field.ty.encoded_len(v)?;
            }
        }
        Ok(layout.length)
    }

    fn encode(&self, value: &Value<'_>, out: &mut [u8]) -> Result<usize> {
        let this = self.resolve()?;
        let layout = this.layout()?;
        check_object(self, value)?;
        ensure!(
            out.len() >= layout.length,
            "object '{}' needs {} bytes, got {}",
            self.id(),
            layout.length,
            out.len()
        );
        out[..layout.length].copy_from_slice(&layout.default_image);
        for field in &layout.fields {
            if let Some(v) = value.field(&field.name).filter(|v| !v.is_null()) {
                field.ty.encode(v, &mut out[field.range()])?;
            }
        }
        Ok(layout.length)
    }

    fn decode<'a>(&self, data: &'a [u8]) -> Result<Value<'a>> {
        let this = self.resolve()?;
        let layout = this.layout()?;
        ensure!(
            data.len() >= layout.length,
            "object '{}' needs {} bytes, got {}",
            self.id(),
            layout.length,
            data.len()
        );
        layout
            .fields
            .iter()
            .map(|f| {
                f.ty.decode(&data[f.range()])
                    .map(|v| (Cow::Owned(f.name.clone()), v))
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Object)
    }
}

fn check_object(ty: &ObjectType, value: &Value<'_>) -> Result<()> {
    match value {
        Value::Null | Value::Object(_) => Ok(()),
        other => bail!(
            "expected an object for '{}', got {}",
            ty.id(),
            other.kind_name()
        ),
    }
}

#[derive(Debug, Clone)]
pub struct ObjectView<B> {
    ty: ObjectType,
    data: B,
}

impl<B: AsRef<[u8]>> ObjectView<B> {
    pub fn new(ty: ObjectType, data: B) -> Result<Self> {
        let ty = ty.resolve()?.into_owned();
        let length = ty.length()?;
        ensure!(
            data.as_ref().len() >= length,
            "object '{}' view needs {} bytes, got {}",
            ty.id(),
            length,
            data.as_ref().len()
        );
        Ok(Self { ty, data })
    }

    pub fn ty(&self) -> &ObjectType {
        &self.ty
    }

    pub fn byte_length(&self) -> usize {
        self.ty.fixed_len().unwrap_or(0)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data.as_ref()[..self.byte_length()]
    }

    pub fn get(&self, name: &str) -> Result<Value<'_>> {
        let field = self.ty.field_layout(name)?;
        field.ty.decode(&self.data.as_ref()[field.range()])
    }

    pub fn get_view(&self, name: &str) -> Result<View<&[u8]>> {
        let field = self.ty.field_layout(name)?;
        field.ty.view(&self.data.as_ref()[field.range()])
    }

    /// Decodes every field in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = Result<(&str, Value<'_>)>> + '_ {
        let fields = self.ty.layout().map(|l| l.fields.as_slice()).unwrap_or(&[]);
        fields.iter().map(move |f| {
            f.ty.decode(&self.data.as_ref()[f.range()])
                .map(|v| (f.name.as_str(), v))
        })
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

impl<B: AsRef<[u8]> + AsMut<[u8]>> ObjectView<B> {
    pub fn get_view_mut(&mut self, name: &str) -> Result<View<&mut [u8]>> {
        let field = self.ty.field_layout(name)?;
        field.ty.view(&mut self.data.as_mut()[field.range()])
    }

    /// Overwrites one field. `Null` restores the field's default.
    pub fn set(&mut self, name: &str, value: &Value<'_>) -> Result<&mut Self> {
        let layout = self.ty.layout()?;
        let field = self.ty.field_layout(name)?;
        let range = field.range();
        let data = self.data.as_mut();
        if value.is_null() {
            data[range.clone()].copy_from_slice(&layout.default_image[range]);
        } else {
            field.ty.encoded_len(value)?;
            field.ty.encode(value, &mut data[range])?;
        }
        Ok(self)
    }

    /// Re-encodes the whole record from `value`, defaults first. The value is
    /// checked before any byte changes.
    pub fn write(&mut self, value: &Value<'_>) -> Result<&mut Self> {
        self.ty.encoded_len(value)?;
        self.ty.encode(value, self.data.as_mut())?;
        Ok(self)
    }
}

impl ObjectView<Vec<u8>> {
    pub fn from_value(ty: ObjectType, value: &Value<'_>) -> Result<Self> {
        let ty = ty.resolve()?.into_owned();
        let mut data = vec![0u8; ty.length()?];
        ty.encode(value, &mut data)?;
        Ok(Self { ty, data })
    }
}
