//! # Internal Macros
//!
//! This module provides internal macros for reducing boilerplate in the
//! primitive codecs.
//!
//! ## wire_codec!
//!
//! Generates a `read_<ty>` / `write_<ty>` function pair for each multi-byte
//! numeric type, backed by the matching `zerocopy::byteorder` wire type. The
//! byte order is chosen at runtime from an [`Endian`](crate::layout::Endian).
//!
//! ### Usage
//!
//! ```ignore
//! use zerocopy::byteorder::{U16, U32};
//!
//! wire_codec! {
//!     u16 => U16,
//!     u32 => U32,
//! }
//!
//! // Generates:
//! // pub fn read_u16(data: &[u8], endian: Endian) -> Result<u16>
//! // pub fn write_u16(data: &mut [u8], endian: Endian, value: u16) -> Result<()>
//! // pub fn read_u32(data: &[u8], endian: Endian) -> Result<u32>
//! // pub fn write_u32(data: &mut [u8], endian: Endian, value: u32) -> Result<()>
//! ```
//!
//! ## typed_accessors!
//!
//! Generates `get_<ty>` / `set_<ty>` methods on a view type that exposes
//! `bytes()`, `bytes_mut()` and `endian()`. Used by `PrimitiveView`.

/// Generates endian-aware read/write functions over `zerocopy` wire types.
macro_rules! wire_codec {
    ($($prim:ident => $wire:ident),* $(,)?) => {
        ::paste::paste! {
            $(
                #[inline]
                pub fn [<read_ $prim>](data: &[u8], endian: Endian) -> eyre::Result<$prim> {
                    const WIDTH: usize = std::mem::size_of::<$prim>();
                    eyre::ensure!(
                        data.len() >= WIDTH,
                        "insufficient data for {}: {} bytes, need {}",
                        stringify!($prim),
                        data.len(),
                        WIDTH
                    );
                    let bytes = &data[..WIDTH];
                    let value = match endian {
                        Endian::Little => {
                            $wire::<LittleEndian>::read_from_bytes(bytes).map(|v| v.get()).ok()
                        }
                        Endian::Big => {
                            $wire::<BigEndian>::read_from_bytes(bytes).map(|v| v.get()).ok()
                        }
                    };
                    value.ok_or_else(|| eyre::eyre!("failed to read {} from wire", stringify!($prim)))
                }

                #[inline]
                pub fn [<write_ $prim>](
                    data: &mut [u8],
                    endian: Endian,
                    value: $prim,
                ) -> eyre::Result<()> {
                    const WIDTH: usize = std::mem::size_of::<$prim>();
                    eyre::ensure!(
                        data.len() >= WIDTH,
                        "insufficient space for {}: {} bytes, need {}",
                        stringify!($prim),
                        data.len(),
                        WIDTH
                    );
                    match endian {
                        Endian::Little => data[..WIDTH]
                            .copy_from_slice($wire::<LittleEndian>::new(value).as_bytes()),
                        Endian::Big => data[..WIDTH]
                            .copy_from_slice($wire::<BigEndian>::new(value).as_bytes()),
                    }
                    Ok(())
                }
            )*
        }
    };
}

/// Generates typed getter/setter methods for a single-scalar view.
macro_rules! typed_accessors {
    ($($prim:ident),* $(,)?) => {
        ::paste::paste! {
            $(
                #[inline]
                pub fn [<get_ $prim>](&self) -> eyre::Result<$prim> {
                    $crate::layout::primitive::[<read_ $prim>](self.bytes(), self.endian())
                }
            )*
        }
    };
    (@mut $($prim:ident),* $(,)?) => {
        ::paste::paste! {
            $(
                #[inline]
                pub fn [<set_ $prim>](&mut self, value: $prim) -> eyre::Result<()> {
                    let endian = self.endian();
                    $crate::layout::primitive::[<write_ $prim>](self.bytes_mut(), endian, value)
                }
            )*
        }
    };
}
