//! # Primitive Types and Wire Codecs
//!
//! Fixed-width numeric scalars. Every multi-byte kind is read and written
//! through the `zerocopy::byteorder` wire types, so both byte orders share one
//! code path and no unaligned pointer casts are needed.
//!
//! ## Kinds
//!
//! | Name | Width | Decodes to |
//! |------|-------|------------|
//! | int8, int16, int32, int64 | 1, 2, 4, 8 | `Value::Int` |
//! | uint8, uint16, uint32 | 1, 2, 4 | `Value::Int` |
//! | uint64 | 8 | `Value::Int`, or `Value::UInt` above `i64::MAX` |
//! | float32, float64 | 4, 8 | `Value::Float` |
//!
//! ## Write Semantics
//!
//! Writes never range check. Integers wrap to the target width; floats
//! written to integer kinds are truncated toward zero first.

use eyre::{ensure, Result};
use zerocopy::byteorder::{BigEndian, LittleEndian, F32, F64, I16, I32, I64, U16, U32, U64};
use zerocopy::{FromBytes, IntoBytes};

use crate::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "little" | "le" => Some(Endian::Little),
            "big" | "be" => Some(Endian::Big),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
}

impl NumericKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "int8" => NumericKind::Int8,
            "uint8" => NumericKind::Uint8,
            "int16" => NumericKind::Int16,
            "uint16" => NumericKind::Uint16,
            "int32" => NumericKind::Int32,
            "uint32" => NumericKind::Uint32,
            "int64" | "bigint64" => NumericKind::Int64,
            "uint64" | "biguint64" => NumericKind::Uint64,
            "float32" => NumericKind::Float32,
            "float64" | "number" => NumericKind::Float64,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            NumericKind::Int8 => "int8",
            NumericKind::Uint8 => "uint8",
            NumericKind::Int16 => "int16",
            NumericKind::Uint16 => "uint16",
            NumericKind::Int32 => "int32",
            NumericKind::Uint32 => "uint32",
            NumericKind::Int64 => "int64",
            NumericKind::Uint64 => "uint64",
            NumericKind::Float32 => "float32",
            NumericKind::Float64 => "float64",
        }
    }

    pub fn width(self) -> usize {
        match self {
            NumericKind::Int8 | NumericKind::Uint8 => 1,
            NumericKind::Int16 | NumericKind::Uint16 => 2,
            NumericKind::Int32 | NumericKind::Uint32 | NumericKind::Float32 => 4,
            NumericKind::Int64 | NumericKind::Uint64 | NumericKind::Float64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, NumericKind::Float32 | NumericKind::Float64)
    }
}

/// A compiled numeric scalar: kind plus byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveType {
    pub kind: NumericKind,
    pub endian: Endian,
}

impl PrimitiveType {
    pub fn new(kind: NumericKind, endian: Endian) -> Self {
        Self { kind, endian }
    }

    pub fn little(kind: NumericKind) -> Self {
        Self::new(kind, Endian::Little)
    }

    pub fn width(&self) -> usize {
        self.kind.width()
    }

    pub fn read(&self, data: &[u8]) -> Result<Value<'static>> {
        let e = self.endian;
        let value = match self.kind {
            NumericKind::Int8 => Value::Int(read_i8(data, e)? as i64),
            NumericKind::Uint8 => Value::Int(read_u8(data, e)? as i64),
            NumericKind::Int16 => Value::Int(read_i16(data, e)? as i64),
            NumericKind::Uint16 => Value::Int(read_u16(data, e)? as i64),
            NumericKind::Int32 => Value::Int(read_i32(data, e)? as i64),
            NumericKind::Uint32 => Value::Int(read_u32(data, e)? as i64),
            NumericKind::Int64 => Value::Int(read_i64(data, e)?),
            NumericKind::Uint64 => Value::from_u64(read_u64(data, e)?),
            NumericKind::Float32 => Value::Float(read_f32(data, e)? as f64),
            NumericKind::Float64 => Value::Float(read_f64(data, e)?),
        };
        Ok(value)
    }

    /// Reads the scalar as an `i64` tag/discriminant.
    pub fn read_i64(&self, data: &[u8]) -> Result<i64> {
        self.read(data)?.to_i64_wrapping()
    }

    pub fn write(&self, data: &mut [u8], value: &Value<'_>) -> Result<()> {
        let e = self.endian;
        match self.kind {
            NumericKind::Int8 => write_i8(data, e, value.to_i64_wrapping()? as i8),
            NumericKind::Uint8 => write_u8(data, e, value.to_i64_wrapping()? as u8),
            NumericKind::Int16 => write_i16(data, e, value.to_i64_wrapping()? as i16),
            NumericKind::Uint16 => write_u16(data, e, value.to_i64_wrapping()? as u16),
            NumericKind::Int32 => write_i32(data, e, value.to_i64_wrapping()? as i32),
            NumericKind::Uint32 => write_u32(data, e, value.to_i64_wrapping()? as u32),
            NumericKind::Int64 => write_i64(data, e, value.to_i64_wrapping()?),
            NumericKind::Uint64 => write_u64(data, e, value.to_u64_wrapping()?),
            NumericKind::Float32 => write_f32(data, e, value.to_f64()? as f32),
            NumericKind::Float64 => write_f64(data, e, value.to_f64()?),
        }
    }

    /// Zeroes the scalar's bytes.
    pub fn clear(&self, data: &mut [u8]) -> Result<()> {
        let width = self.width();
        ensure!(
            data.len() >= width,
            "insufficient space for {}: {} bytes",
            self.kind.name(),
            data.len()
        );
        data[..width].fill(0);
        Ok(())
    }
}

// Single-byte kinds take an `Endian` so every kind has the same codec shape.

#[inline]
pub fn read_u8(data: &[u8], _endian: Endian) -> Result<u8> {
    data.first()
        .copied()
        .ok_or_else(|| eyre::eyre!("insufficient data for u8: 0 bytes, need 1"))
}

#[inline]
pub fn read_i8(data: &[u8], endian: Endian) -> Result<i8> {
    read_u8(data, endian).map(|b| b as i8)
}

#[inline]
pub fn write_u8(data: &mut [u8], _endian: Endian, value: u8) -> Result<()> {
    let slot = data
        .first_mut()
        .ok_or_else(|| eyre::eyre!("insufficient space for u8: 0 bytes, need 1"))?;
    *slot = value;
    Ok(())
}

#[inline]
pub fn write_i8(data: &mut [u8], endian: Endian, value: i8) -> Result<()> {
    write_u8(data, endian, value as u8)
}

wire_codec! {
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

/// Reads one u32 LE offset-table entry at `pos`.
#[inline]
pub(crate) fn read_offset(data: &[u8], pos: usize) -> Result<usize> {
    ensure!(
        pos <= data.len(),
        "offset entry at {} is past the end of a {} byte buffer",
        pos,
        data.len()
    );
    read_u32(&data[pos..], Endian::Little).map(|v| v as usize)
}

/// Writes one u32 LE offset-table entry at `pos`.
#[inline]
pub(crate) fn write_offset(data: &mut [u8], pos: usize, value: usize) -> Result<()> {
    ensure!(
        value <= u32::MAX as usize,
        "offset {} does not fit in a u32 offset table",
        value
    );
    ensure!(
        pos <= data.len(),
        "offset entry at {} is past the end of a {} byte buffer",
        pos,
        data.len()
    );
    write_u32(&mut data[pos..], Endian::Little, value as u32)
}
