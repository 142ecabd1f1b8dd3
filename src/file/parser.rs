//! Low-level byte stream parser.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary data
//! parser used for reading sequences of values out of the metadata blob and the native image:
//! pointer arrays of the registration tables, index lists and NUL-terminated strings.
//!
//! # Examples
//!
//! ```rust
//! use il2scope::{file::Endianness, Parser};
//!
//! let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
//! let mut parser = Parser::new(&data, Endianness::Little);
//!
//! let first = parser.read::<u32>()?;
//! assert_eq!(first, 0x04030201);
//!
//! let rest = parser.read_uint(4)?;
//! assert_eq!(rest, 0x08070605);
//! assert!(!parser.has_more_data());
//! # Ok::<(), il2scope::Error>(())
//! ```

use crate::{
    file::{
        io::{read_at, read_uint_at, ByteIO},
        Endianness,
    },
    Result,
};

/// A cursor over a byte slice which reads values in a fixed byte order.
///
/// The parser maintains an internal position and bounds checks every read, so a truncated or
/// malformed input surfaces as [`crate::Error::OutOfBounds`] instead of a panic.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
    /// Byte order of multi-byte values
    endianness: Endianness,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    /// * `endianness` - Byte order of the values in `data`
    #[must_use]
    pub fn new(data: &'a [u8], endianness: Endianness) -> Self {
        Parser {
            data,
            position: 0,
            endianness,
        }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Read a value of type `T` in the parser's byte order.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `T` would exceed the data length.
    pub fn read<T: ByteIO>(&mut self) -> Result<T> {
        read_at(self.data, &mut self.position, self.endianness)
    }

    /// Read an unsigned integer whose width is only known at runtime (1, 2, 4 or 8 bytes).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the read would exceed the data length.
    pub fn read_uint(&mut self, width: usize) -> Result<u64> {
        read_uint_at(self.data, &mut self.position, width, self.endianness)
    }

    /// Read a NUL-terminated UTF-8 string starting at the current position.
    ///
    /// The position is advanced past the terminator.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no terminator is found, or
    /// [`crate::Error::Malformed`] if the bytes are not valid UTF-8.
    pub fn read_string_utf8(&mut self) -> Result<&'a str> {
        let start = self.position;
        let Some(len) = self.data[start..].iter().position(|&b| b == 0) else {
            return Err(out_of_bounds_error!());
        };

        let value = std::str::from_utf8(&self.data[start..start + len])
            .map_err(|e| malformed_error!("Invalid UTF-8 string at {} - {}", start, e))?;
        self.position = start + len + 1;
        Ok(value)
    }
}
