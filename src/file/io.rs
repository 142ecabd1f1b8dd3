//! Low-level byte order and safe reading utilities.
//!
//! This module provides endian-aware, bounds-checked reading of primitive values from byte
//! buffers. Both the metadata blob (always little-endian) and the native image (either byte
//! order, reported by its [`crate::file::AddressSpace`]) are read through these helpers.
//!
//! # Key Components
//!
//! - [`crate::file::io::ByteIO`] - Trait defining endian-aware decoding for primitive types
//! - [`crate::file::io::read_le_at`] / [`crate::file::io::read_be_at`] - Read with auto-advance
//! - [`crate::file::io::read_at`] - Read using a runtime [`crate::file::Endianness`]
//! - [`crate::file::io::read_uint_at`] - Read an unsigned integer of a runtime width
//!
//! # Examples
//!
//! ```rust,ignore
//! use il2scope::file::io::read_le_at;
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//!
//! let first: u16 = read_le_at(&data, &mut offset)?;
//! let second: u16 = read_le_at(&data, &mut offset)?;
//! let third: u32 = read_le_at(&data, &mut offset)?;
//!
//! assert_eq!((first, second, third), (1, 2, 3));
//! assert_eq!(offset, 8);
//! # Ok::<(), il2scope::Error>(())
//! ```

use crate::{file::Endianness, Error::OutOfBounds, Result};

/// Trait for implementing type-specific safe binary data reading operations.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size
/// byte array required for that particular type (e.g., `[u8; 4]` for `u32`).
pub trait ByteIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_byte_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl ByteIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }
            }
        )*
    };
}

impl_byte_io!(
    u64 => 8,
    i64 => 8,
    u32 => 4,
    i32 => 4,
    u16 => 2,
    i16 => 2,
    u8 => 1,
    i8 => 1,
);

/// Safely reads a value of type `T` in little-endian byte order from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = take::<T>(data, offset)?;
    Ok(T::from_le_bytes(bytes))
}

/// Safely reads a value of type `T` in big-endian byte order at `offset`, advancing it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = take::<T>(data, offset)?;
    Ok(T::from_be_bytes(bytes))
}

/// Reads a value of type `T` at `offset` in the given byte order, advancing the offset.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_at<T: ByteIO>(data: &[u8], offset: &mut usize, endianness: Endianness) -> Result<T> {
    match endianness {
        Endianness::Little => read_le_at(data, offset),
        Endianness::Big => read_be_at(data, offset),
    }
}

/// Reads an unsigned integer of `width` bytes (1, 2, 4 or 8), zero-extended to `u64`.
///
/// Used for fields whose width is only known at runtime, such as pointer-sized members of the
/// registration tables.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes, or
/// [`crate::Error::Malformed`] for an unsupported width.
pub fn read_uint_at(
    data: &[u8],
    offset: &mut usize,
    width: usize,
    endianness: Endianness,
) -> Result<u64> {
    match width {
        1 => read_at::<u8>(data, offset, endianness).map(u64::from),
        2 => read_at::<u16>(data, offset, endianness).map(u64::from),
        4 => read_at::<u32>(data, offset, endianness).map(u64::from),
        8 => read_at::<u64>(data, offset, endianness),
        _ => Err(malformed_error!("Unsupported integer width - {}", width)),
    }
}

fn take<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T::Bytes> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;
    Ok(read)
}
