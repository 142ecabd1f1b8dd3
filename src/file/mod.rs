//! Byte sources and address spaces.
//!
//! The decoder consumes two inputs: the metadata blob (a plain little-endian file) and the
//! native image which holds the registration tables. This module provides:
//!
//! - [`crate::file::Backend`] - raw byte storage, either owned ([`crate::file::memory::Memory`])
//!   or memory-mapped ([`crate::file::physical::Physical`])
//! - [`crate::file::MetadataFile`] - the metadata blob
//! - [`crate::file::AddressSpace`] - the adapter through which the native image is read:
//!   pointer width, byte order, bounds-checked reads and virtual address translation
//! - [`crate::file::FlatImage`] - an address space over a buffer with explicit segment mappings
//! - [`crate::file::image::BinaryImage`] - an address space over a PE, ELF or Mach-O file
//!
//! Container formats are only consulted for their section/segment tables; everything else in
//! the crate talks to the [`crate::file::AddressSpace`] trait.

pub mod image;
pub mod io;
pub mod memory;
pub mod parser;
pub mod physical;

use std::path::Path;

use crate::{Error::Empty, Result};
use memory::Memory;
use physical::Physical;

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of the data, allowing for both in-memory and on-disk
/// representations. All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// Byte order of multi-byte values in an address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

/// Width of a native pointer in the analyzed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerWidth {
    /// 4-byte pointers (armeabi-v7a, x86)
    Bits32,
    /// 8-byte pointers (arm64-v8a, x86_64)
    Bits64,
}

impl PointerWidth {
    /// Size of a pointer in bytes
    #[must_use]
    pub fn bytes(self) -> usize {
        match self {
            PointerWidth::Bits32 => 4,
            PointerWidth::Bits64 => 8,
        }
    }
}

/// The adapter through which the native image is read.
///
/// Implemented by the container-format layer. The decoder never interprets file offsets on its
/// own; registration tables are pointer-linked structures, and every pointer goes through
/// [`AddressSpace::va_to_offset`] before bytes are fetched with [`AddressSpace::read_bytes`].
pub trait AddressSpace: Send + Sync {
    /// Pointer width of the image
    fn pointer_width(&self) -> PointerWidth;

    /// Byte order of the image
    fn endianness(&self) -> Endianness;

    /// Bounds-checked access to `length` bytes at `offset` in the file.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the image.
    fn read_bytes(&self, offset: usize, length: usize) -> Result<&[u8]>;

    /// Translates a virtual address into a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if no section backs the address.
    fn va_to_offset(&self, va: u64) -> Result<usize>;

    /// Reads a pointer-sized value at file `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the read exceeds the image.
    fn read_pointer(&self, offset: usize) -> Result<u64> {
        let width = self.pointer_width().bytes();
        let bytes = self.read_bytes(offset, width)?;
        parser::Parser::new(bytes, self.endianness()).read_uint(width)
    }

    /// Reads `count` consecutive pointers starting at virtual address `va`.
    ///
    /// A `count` of zero never touches the address, so null array pointers with an empty
    /// count are accepted.
    ///
    /// # Errors
    /// Returns an error if the address is unmapped or the array exceeds the image.
    fn read_pointer_array(&self, va: u64, count: usize) -> Result<Vec<u64>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let width = self.pointer_width().bytes();
        let Some(total) = count.checked_mul(width) else {
            return Err(out_of_bounds_error!());
        };

        let bytes = self.read_bytes(self.va_to_offset(va)?, total)?;
        let mut parser = parser::Parser::new(bytes, self.endianness());
        (0..count).map(|_| parser.read_uint(width)).collect()
    }

    /// Reads a NUL-terminated UTF-8 string at virtual address `va`.
    ///
    /// # Errors
    /// Returns an error if the address is unmapped, no terminator is found or the bytes are not
    /// valid UTF-8.
    fn read_c_string(&self, va: u64) -> Result<String> {
        const CHUNK: usize = 64;

        let offset = self.va_to_offset(va)?;
        let mut collected = Vec::new();
        loop {
            let start = offset + collected.len();
            let chunk = match self.read_bytes(start, CHUNK) {
                Ok(chunk) => chunk,
                // Tail of the image, fall back to byte-wise reads
                Err(_) => self.read_bytes(start, 1)?,
            };

            if let Some(end) = chunk.iter().position(|&b| b == 0) {
                collected.extend_from_slice(&chunk[..end]);
                break;
            }
            collected.extend_from_slice(chunk);
        }

        String::from_utf8(collected)
            .map_err(|e| malformed_error!("Invalid UTF-8 string at 0x{:X} - {}", va, e))
    }
}

/// The metadata blob (`global-metadata.dat`).
///
/// # Examples
///
/// ```rust,no_run
/// use il2scope::MetadataFile;
/// use std::path::Path;
///
/// let file = MetadataFile::from_file(Path::new("global-metadata.dat"))?;
/// println!("Metadata blob: {} bytes", file.len());
/// # Ok::<(), il2scope::Error>(())
/// ```
pub struct MetadataFile {
    data: Box<dyn Backend>,
}

impl MetadataFile {
    /// Memory-maps the metadata blob at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is empty.
    pub fn from_file(path: &Path) -> Result<MetadataFile> {
        Self::load(Physical::new(path)?)
    }

    /// Wraps a metadata blob which is already in memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for an empty buffer.
    pub fn from_mem(data: Vec<u8>) -> Result<MetadataFile> {
        Self::load(Memory::new(data))
    }

    fn load<T: Backend + 'static>(data: T) -> Result<MetadataFile> {
        if data.len() == 0 {
            return Err(Empty);
        }

        Ok(MetadataFile {
            data: Box::new(data),
        })
    }

    /// Returns the total size of the blob in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the blob has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Returns the complete blob.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }
}

/// A contiguous mapping of virtual addresses onto file offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// First virtual address covered by the segment
    pub va: u64,
    /// File offset of `va`
    pub offset: usize,
    /// Number of file-backed bytes
    pub size: usize,
}

impl Segment {
    /// Translates `va` if this segment covers it.
    #[must_use]
    pub fn translate(&self, va: u64) -> Option<usize> {
        let delta = va.checked_sub(self.va)?;
        let delta = usize::try_from(delta).ok()?;
        if delta < self.size {
            self.offset.checked_add(delta)
        } else {
            None
        }
    }
}

/// An [`AddressSpace`] over a raw buffer with explicitly declared segments.
///
/// Useful for memory dumps (where file offsets equal virtual addresses relative to a base) and
/// for tests which craft registration tables by hand.
///
/// # Examples
///
/// ```rust
/// use il2scope::file::{AddressSpace, Endianness, FlatImage, PointerWidth};
///
/// let mut data = vec![0u8; 0x20];
/// data[0x10..0x18].copy_from_slice(&0x1000_u64.to_le_bytes());
///
/// let image = FlatImage::from_mem(data, PointerWidth::Bits64, Endianness::Little)
///     .with_segment(0x1000, 0, 0x20);
///
/// assert_eq!(image.va_to_offset(0x1010)?, 0x10);
/// assert_eq!(image.read_pointer(0x10)?, 0x1000);
/// # Ok::<(), il2scope::Error>(())
/// ```
pub struct FlatImage {
    data: Box<dyn Backend>,
    segments: Vec<Segment>,
    pointer_width: PointerWidth,
    endianness: Endianness,
}

impl FlatImage {
    /// Creates an address space over an owned buffer with no segments.
    #[must_use]
    pub fn from_mem(data: Vec<u8>, pointer_width: PointerWidth, endianness: Endianness) -> Self {
        FlatImage {
            data: Box::new(Memory::new(data)),
            segments: Vec::new(),
            pointer_width,
            endianness,
        }
    }

    /// Creates an address space over a memory-mapped dump with no segments.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn from_file(
        path: &Path,
        pointer_width: PointerWidth,
        endianness: Endianness,
    ) -> Result<Self> {
        Ok(FlatImage {
            data: Box::new(Physical::new(path)?),
            segments: Vec::new(),
            pointer_width,
            endianness,
        })
    }

    /// Adds a mapping of `size` bytes at virtual address `va` onto file `offset`.
    #[must_use]
    pub fn with_segment(mut self, va: u64, offset: usize, size: usize) -> Self {
        self.segments.push(Segment { va, offset, size });
        self
    }

    /// The declared segments
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl AddressSpace for FlatImage {
    fn pointer_width(&self) -> PointerWidth {
        self.pointer_width
    }

    fn endianness(&self) -> Endianness {
        self.endianness
    }

    fn read_bytes(&self, offset: usize, length: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, length)
    }

    fn va_to_offset(&self, va: u64) -> Result<usize> {
        self.segments
            .iter()
            .find_map(|segment| segment.translate(va))
            .ok_or(crate::Error::UnmappedAddress(va))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn image() -> FlatImage {
        let mut data = vec![0u8; 0x40];
        data[0x20..0x28].copy_from_slice(&0x4000_0010_u64.to_le_bytes());
        data[0x28..0x30].copy_from_slice(&0x4000_0000_u64.to_le_bytes());
        data[0x30..0x35].copy_from_slice(b"Core\0");

        FlatImage::from_mem(data, PointerWidth::Bits64, Endianness::Little)
            .with_segment(0x4000_0000, 0x10, 0x30)
    }

    #[test]
    fn translate() {
        let image = image();
        assert_eq!(image.va_to_offset(0x4000_0000).unwrap(), 0x10);
        assert_eq!(image.va_to_offset(0x4000_002F).unwrap(), 0x3F);
        assert!(matches!(
            image.va_to_offset(0x4000_0030),
            Err(Error::UnmappedAddress(0x4000_0030))
        ));
        assert!(matches!(
            image.va_to_offset(0x10),
            Err(Error::UnmappedAddress(_))
        ));
    }

    #[test]
    fn pointers() {
        let image = image();
        let pointers = image.read_pointer_array(0x4000_0010, 2).unwrap();
        assert_eq!(pointers, vec![0x4000_0010, 0x4000_0000]);
        assert!(image.read_pointer_array(0, 0).unwrap().is_empty());
        assert!(image.read_pointer_array(0x4000_0028, 2).is_err());
    }

    #[test]
    fn c_string() {
        let image = image();
        assert_eq!(image.read_c_string(0x4000_0020).unwrap(), "Core");
    }

    #[test]
    fn metadata_file() {
        assert!(matches!(MetadataFile::from_mem(vec![]), Err(Error::Empty)));
        let file = MetadataFile::from_mem(vec![1, 2, 3]).unwrap();
        assert_eq!(file.len(), 3);
        assert_eq!(file.data(), &[1, 2, 3]);
    }
}
