//! # ScratchBuffer - Bounded Reusable Encode Buffer
//!
//! Variable-length kinds (maps, vectors, collections) do not know their size
//! until the value is walked. `from_value` allocates a fresh buffer of the
//! exact size on every call; a `ScratchBuffer` instead keeps one allocation
//! with a fixed ceiling and hands out views over the region each encode used.
//!
//! ## Overflow
//!
//! The exact length is computed before anything is written. An encode that
//! would not fit fails with `ViewError::CapacityExceeded` and leaves the
//! buffer untouched; nothing is truncated.
//!
//! ```ignore
//! let mut scratch = ScratchBuffer::with_capacity(256);
//! let view = scratch.encode(&vector_type, &value)?;
//! assert_eq!(view.to_value()?, value);
//!
//! let too_big = ScratchBuffer::with_capacity(4).encode(&vector_type, &value);
//! assert!(too_big.is_err());
//! ```

use eyre::Result;
use tracing::debug;

use crate::config::DEFAULT_SCRATCH_CAPACITY;
use crate::error::ensure_capacity;
use crate::layout::{Codec, ViewType};
use crate::types::Value;
use crate::views::View;

#[derive(Debug, Clone)]
pub struct ScratchBuffer {
    buf: Vec<u8>,
}

impl Default for ScratchBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SCRATCH_CAPACITY)
    }
}

impl ScratchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Exact encoded length of `value`, checked against the capacity.
    fn reserve(&self, ty: &ViewType, value: &Value<'_>) -> Result<usize> {
        let required = match ty.fixed_len() {
            Some(len) => len,
            None => ty.encoded_len(value)?,
        };
        if let Err(e) = ensure_capacity(required, self.capacity()) {
            debug!(
                kind = ty.kind_name(),
                required,
                capacity = self.capacity(),
                "scratch encode exceeds capacity"
            );
            return Err(e);
        }
        Ok(required)
    }

    /// Encodes `value` and returns a view over exactly the bytes written.
    pub fn encode(&mut self, ty: &ViewType, value: &Value<'_>) -> Result<View<&mut [u8]>> {
        let len = self.reserve(ty, value)?;
        let region = &mut self.buf[..len];
        ty.encode(value, region)?;
        ty.view(region)
    }

    /// Encodes `value` and copies the written bytes out.
    pub fn encode_to_vec(&mut self, ty: &ViewType, value: &Value<'_>) -> Result<Vec<u8>> {
        let len = self.reserve(ty, value)?;
        ty.encode(value, &mut self.buf[..len])?;
        Ok(self.buf[..len].to_vec())
    }
}
