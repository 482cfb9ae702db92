//! # PrimitiveView - Single Scalar Access
//!
//! `PrimitiveView` reads and writes one numeric scalar in place;
//! `PrimitiveArrayView` is its strided form over a run of scalars of the same
//! kind. Both share the codec in `crate::layout::primitive`.
//!
//! ## Usage
//!
//! ```ignore
//! let ty = PrimitiveType::little(NumericKind::Uint16);
//! let mut view = PrimitiveView::from_value(ty, &Value::Int(513))?;
//! assert_eq!(view.bytes(), &[1, 2]);
//! view.set(&Value::Int(70000))?; // wraps to 4464
//! ```

use eyre::{bail, ensure, Result};

use crate::layout::{Codec, Endian, PrimitiveType};
use crate::types::Value;

impl Codec for PrimitiveType {
    fn fixed_len(&self) -> Option<usize> {
        Some(self.width())
    }

    fn encoded_len(&self, value: &Value<'_>) -> Result<usize> {
        match value {
            Value::Null | Value::Int(_) | Value::UInt(_) | Value::Float(_) => Ok(self.width()),
            other => bail!("expected a number for {}, got {}", self.kind.name(), other.kind_name()),
        }
    }

    fn encode(&self, value: &Value<'_>, out: &mut [u8]) -> Result<usize> {
        if value.is_null() {
            self.clear(out)?;
        } else {
            self.write(out, value)?;
        }
        Ok(self.width())
    }

    fn decode<'a>(&self, data: &'a [u8]) -> Result<Value<'a>> {
        self.read(data)
    }
}

#[derive(Debug, Clone)]
pub struct PrimitiveView<B> {
    ty: PrimitiveType,
    data: B,
}

impl<B: AsRef<[u8]>> PrimitiveView<B> {
    pub fn new(ty: PrimitiveType, data: B) -> Result<Self> {
        ensure!(
            data.as_ref().len() >= ty.width(),
            "{} view needs {} bytes, got {}",
            ty.kind.name(),
            ty.width(),
            data.as_ref().len()
        );
        Ok(Self { ty, data })
    }

    pub fn ty(&self) -> PrimitiveType {
        self.ty
    }

    pub fn endian(&self) -> Endian {
        self.ty.endian
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data.as_ref()[..self.ty.width()]
    }

    pub fn byte_length(&self) -> usize {
        self.ty.width()
    }

    pub fn get(&self) -> Result<Value<'static>> {
        self.ty.read(self.bytes())
    }

    pub fn to_value(&self) -> Result<Value<'static>> {
        self.get()
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(self.get()?.to_json())
    }

    pub fn into_inner(self) -> B {
        self.data
    }

    // Typed reads reinterpret the view's bytes in its byte order.
    typed_accessors!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> PrimitiveView<B> {
    fn bytes_mut(&mut self) -> &mut [u8] {
        let width = self.ty.width();
        &mut self.data.as_mut()[..width]
    }

    pub fn set(&mut self, value: &Value<'_>) -> Result<&mut Self> {
        let ty = self.ty;
        ty.write(self.bytes_mut(), value)?;
        Ok(self)
    }

    typed_accessors!(@mut u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);
}

impl PrimitiveView<Vec<u8>> {
    pub fn from_value(ty: PrimitiveType, value: &Value<'_>) -> Result<Self> {
        let mut data = vec![0u8; ty.width()];
        ty.encode(value, &mut data)?;
        Ok(Self { ty, data })
    }
}

/// Strided run of scalars of one kind.
#[derive(Debug, Clone)]
pub struct PrimitiveArrayView<B> {
    ty: PrimitiveType,
    data: B,
}

impl<B: AsRef<[u8]>> PrimitiveArrayView<B> {
    pub fn new(ty: PrimitiveType, data: B) -> Self {
        Self { ty, data }
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().len() / self.ty.width()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element_start(&self, index: usize) -> Result<usize> {
        ensure!(
            index < self.len(),
            "index {} out of bounds for {} elements",
            index,
            self.len()
        );
        Ok(index * self.ty.width())
    }

    pub fn get(&self, index: usize) -> Result<Value<'static>> {
        let start = self.element_start(index)?;
        self.ty.read(&self.data.as_ref()[start..])
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<Value<'static>>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn to_value(&self) -> Result<Value<'static>> {
        self.iter().collect::<Result<Vec<_>>>().map(Value::List)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> PrimitiveArrayView<B> {
    pub fn set(&mut self, index: usize, value: &Value<'_>) -> Result<&mut Self> {
        let start = self.element_start(index)?;
        let ty = self.ty;
        ty.write(&mut self.data.as_mut()[start..], value)?;
        Ok(self)
    }
}

impl PrimitiveArrayView<Vec<u8>> {
    pub fn from_values(ty: PrimitiveType, values: &[Value<'_>]) -> Result<Self> {
        let width = ty.width();
        let mut data = vec![0u8; values.len() * width];
        for (chunk, value) in data.chunks_exact_mut(width).zip(values) {
            ty.encode(value, chunk)?;
        }
        Ok(Self { ty, data })
    }
}
