//! String heap and string literal table.
//!
//! Identifier strings (type, namespace, member and assembly names) live in one heap of
//! NUL-terminated UTF-8 strings, referenced by byte offset. String literals used by managed code
//! are stored separately: a table of `(length, dataIndex)` records pointing into a data section
//! without terminators.

use std::{ffi::CStr, str};

use crate::{metadata::tables::StringLiteral, Error::OutOfBounds, Result};

/// The identifier string heap.
///
/// # Examples
///
/// ```rust
/// use il2scope::metadata::streams::Strings;
///
/// let data = b"Game.Core\0Player\0";
/// let strings = Strings::from(data);
/// assert_eq!(strings.get(10)?, "Player");
/// # Ok::<(), il2scope::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Create a `Strings` view over the heap bytes
    #[must_use]
    pub fn from(data: &'a [u8]) -> Strings<'a> {
        Strings { data }
    }

    /// Get the string starting at byte offset `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the index is outside the heap, or
    /// [`crate::Error::Malformed`] if the string is unterminated or not UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        match CStr::from_bytes_until_nul(&self.data[index..]) {
            Ok(result) => result
                .to_str()
                .map_err(|_| malformed_error!("Invalid string at index - {}", index)),
            Err(_) => Err(malformed_error!("Unterminated string at index - {}", index)),
        }
    }

    /// Size of the heap in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the heap holds no data
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The string literal table with its data section.
pub struct StringLiterals<'a> {
    table: Vec<StringLiteral>,
    data: &'a [u8],
}

impl<'a> StringLiterals<'a> {
    /// Combine the decoded literal table with the literal data section
    #[must_use]
    pub fn new(table: Vec<StringLiteral>, data: &'a [u8]) -> StringLiterals<'a> {
        StringLiterals { table, data }
    }

    /// Number of literals
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if there are no literals
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The raw bytes of literal `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the index or its data range is invalid.
    pub fn get_bytes(&self, index: usize) -> Result<&'a [u8]> {
        let literal = self.table.get(index).ok_or(OutOfBounds)?;
        let start = literal.data_index as usize;
        let end = start
            .checked_add(literal.length as usize)
            .ok_or(OutOfBounds)?;
        self.data.get(start..end).ok_or(OutOfBounds)
    }

    /// Literal `index` decoded as UTF-8.
    ///
    /// # Errors
    /// Returns an error if the literal is out of bounds or not valid UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        str::from_utf8(self.get_bytes(index)?)
            .map_err(|_| malformed_error!("Invalid string literal - {}", index))
    }
}
