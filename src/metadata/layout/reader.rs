//! Reading structures through a computed layout.
//!
//! A [`Record`] is the result of reading one structure: the values of exactly the fields present
//! for the active version pair, keyed by field name. Requesting any other field is a contract
//! violation reported as [`crate::Error::FieldNotPresentForVersion`], never a silent default.
//!
//! Values are stored zero-extended to 64 bits; the typed accessors reinterpret them according
//! to how the consuming code declares the field (signed index, unsigned count, address).

use crate::{
    file::{parser::Parser, AddressSpace, Endianness, PointerWidth},
    metadata::{
        layout::{ResolvedLayout, StructKind, StructLayout},
        version::{Version, VersionPair},
    },
    Error, Result,
};

/// One structure read through a [`ResolvedLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    kind: StructKind,
    version: Version,
    values: Vec<(&'static str, u64)>,
}

impl Record {
    /// The structure this record was read as
    #[must_use]
    pub fn kind(&self) -> StructKind {
        self.kind
    }

    /// Whether `field` was part of the layout
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.values.iter().any(|(name, _)| *name == field)
    }

    /// All values in on-disk order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.values.iter().copied()
    }

    /// The raw value of `field`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FieldNotPresentForVersion`] if the layout for the active version
    /// excludes `field`.
    pub fn get(&self, field: &'static str) -> Result<u64> {
        self.values
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| *value)
            .ok_or(Error::FieldNotPresentForVersion {
                structure: self.kind,
                field,
                version: self.version,
            })
    }

    /// The value of `field` if the layout contains it
    #[must_use]
    pub fn get_opt(&self, field: &'static str) -> Option<u64> {
        self.get(field).ok()
    }

    /// `field` as a 32-bit signed index (`-1` commonly means "none").
    ///
    /// # Errors
    /// Returns [`crate::Error::FieldNotPresentForVersion`] if the field is absent.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn get_i32(&self, field: &'static str) -> Result<i32> {
        Ok(self.get(field)? as u32 as i32)
    }

    /// `field` as a 32-bit unsigned value.
    ///
    /// # Errors
    /// Returns [`crate::Error::FieldNotPresentForVersion`] if the field is absent.
    #[allow(clippy::cast_possible_truncation)]
    pub fn get_u32(&self, field: &'static str) -> Result<u32> {
        Ok(self.get(field)? as u32)
    }

    /// `field` as a 16-bit signed value.
    ///
    /// # Errors
    /// Returns [`crate::Error::FieldNotPresentForVersion`] if the field is absent.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn get_i16(&self, field: &'static str) -> Result<i16> {
        Ok(self.get(field)? as u16 as i16)
    }

    /// `field` as a 16-bit unsigned value.
    ///
    /// # Errors
    /// Returns [`crate::Error::FieldNotPresentForVersion`] if the field is absent.
    #[allow(clippy::cast_possible_truncation)]
    pub fn get_u16(&self, field: &'static str) -> Result<u16> {
        Ok(self.get(field)? as u16)
    }

    /// `field` as a count or offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::FieldNotPresentForVersion`] if the field is absent, or
    /// [`crate::Error::Malformed`] if the value does not fit the host.
    pub fn get_usize(&self, field: &'static str) -> Result<usize> {
        let value = self.get(field)?;
        usize::try_from(value)
            .map_err(|_| malformed_error!("{}.{} value {} too large", self.kind, field, value))
    }

    /// `field` as a signed 32-bit index, or `None` when negative.
    ///
    /// # Errors
    /// Returns [`crate::Error::FieldNotPresentForVersion`] if the field is absent.
    pub fn get_index(&self, field: &'static str) -> Result<Option<usize>> {
        let value = self.get_i32(field)?;
        Ok(usize::try_from(value).ok())
    }
}

impl ResolvedLayout {
    /// Reads one record from the start of `bytes`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `bytes` is shorter than the layout.
    pub fn read(&self, bytes: &[u8], endianness: Endianness) -> Result<Record> {
        if bytes.len() < self.size() {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(bytes, endianness);
        let mut values = Vec::with_capacity(self.fields().len());
        for field in self.fields() {
            let value = parser.read_uint(field.width.bytes(self.pointer_width()))?;
            values.push((field.name, value));
        }

        Ok(Record {
            kind: self.kind(),
            version: self.version(),
            values,
        })
    }

    /// Reads `count` consecutive records from `data` starting at `offset`, strided by the
    /// layout size.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the array exceeds `data`.
    pub fn read_array(
        &self,
        data: &[u8],
        offset: usize,
        count: usize,
        endianness: Endianness,
    ) -> Result<Vec<Record>> {
        let Some(total) = count.checked_mul(self.size()) else {
            return Err(out_of_bounds_error!());
        };
        let Some(bytes) = offset
            .checked_add(total)
            .and_then(|end| data.get(offset..end))
        else {
            return Err(out_of_bounds_error!());
        };

        if self.size() == 0 {
            return Ok(Vec::new());
        }
        bytes
            .chunks_exact(self.size())
            .map(|chunk| self.read(chunk, endianness))
            .collect()
    }

    /// Reads one record through an address space at file `offset`, returning the record and
    /// the number of bytes consumed.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record exceeds the image.
    pub fn read_from(&self, adapter: &dyn AddressSpace, offset: usize) -> Result<(Record, usize)> {
        let bytes = adapter.read_bytes(offset, self.size())?;
        Ok((self.read(bytes, adapter.endianness())?, self.size()))
    }
}

/// Reads one structure of `kind` at file `offset` of `adapter`.
///
/// Returns the record together with the number of bytes consumed, which equals
/// [`crate::metadata::layout::struct_size`] for the same arguments.
///
/// # Errors
/// - [`crate::Error::UnsupportedVersion`] for a pair outside the supported matrix
/// - [`crate::Error::OutOfBounds`] if the structure exceeds the image
///
/// # Examples
///
/// ```rust
/// use il2scope::file::{Endianness, FlatImage, PointerWidth};
/// use il2scope::metadata::layout::{read_structure, StructKind};
/// use il2scope::metadata::version::{Version, VersionPair};
///
/// let mut data = vec![0u8; 12];
/// data[0..8].copy_from_slice(&0x4000_u64.to_le_bytes());
/// data[8..12].copy_from_slice(&0x0011_0000_u32.to_le_bytes());
/// let image = FlatImage::from_mem(data, PointerWidth::Bits64, Endianness::Little);
///
/// let pair = VersionPair::uniform(Version::new(29, 0));
/// let (record, consumed) = read_structure(StructKind::TypeDescriptor, pair, &image, 0)?;
/// assert_eq!(consumed, 12);
/// assert_eq!(record.get("datapoint")?, 0x4000);
/// assert!(record.get("classIndex").is_err());
/// # Ok::<(), il2scope::Error>(())
/// ```
pub fn read_structure(
    kind: StructKind,
    pair: VersionPair,
    adapter: &dyn AddressSpace,
    offset: usize,
) -> Result<(Record, usize)> {
    StructLayout::of(kind)
        .resolve(pair, adapter.pointer_width())?
        .read_from(adapter, offset)
}

/// Reads one structure of `kind` from the little-endian metadata blob at `offset`.
///
/// # Errors
/// Same as [`read_structure`].
pub fn read_metadata_structure(
    kind: StructKind,
    pair: VersionPair,
    data: &[u8],
    offset: usize,
) -> Result<(Record, usize)> {
    let layout = StructLayout::of(kind).resolve(pair, PointerWidth::Bits32)?;
    let bytes = offset
        .checked_add(layout.size())
        .and_then(|end| data.get(offset..end))
        .ok_or(out_of_bounds_error!())?;
    Ok((layout.read(bytes, Endianness::Little)?, layout.size()))
}
