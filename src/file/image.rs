//! Native image address space backed by goblin.
//!
//! [`BinaryImage`] loads a PE (`GameAssembly.dll`), ELF (`libil2cpp.so`) or thin Mach-O
//! (`UnityFramework`) file and records how its loadable sections map virtual addresses onto file
//! offsets. Only the mapping is kept; the parsed container is discarded after construction.

use std::path::Path;

use goblin::{
    elf::program_header::PT_LOAD,
    mach::Mach,
    Object,
};

use crate::{
    file::{
        memory::Memory, physical::Physical, AddressSpace, Backend, Endianness, PointerWidth,
        Segment,
    },
    Error::{Empty, UnmappedAddress},
    Result,
};

/// The container format a [`BinaryImage`] was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Portable Executable (Windows)
    Pe,
    /// Executable and Linkable Format (Android, Linux)
    Elf,
    /// Mach-O (iOS, macOS)
    MachO,
}

/// An [`AddressSpace`] over an executable image.
///
/// # Examples
///
/// ```rust,no_run
/// use il2scope::file::{image::BinaryImage, AddressSpace};
/// use std::path::Path;
///
/// let image = BinaryImage::from_file(Path::new("libil2cpp.so"))?;
/// println!("{:?}, {} byte pointers", image.format(), image.pointer_width().bytes());
/// # Ok::<(), il2scope::Error>(())
/// ```
pub struct BinaryImage {
    data: Box<dyn Backend>,
    segments: Vec<Segment>,
    pointer_width: PointerWidth,
    endianness: Endianness,
    format: ImageFormat,
}

struct Mapping {
    segments: Vec<Segment>,
    pointer_width: PointerWidth,
    endianness: Endianness,
    format: ImageFormat,
}

impl BinaryImage {
    /// Memory-maps and parses the executable at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a supported container.
    pub fn from_file(path: &Path) -> Result<BinaryImage> {
        Self::load(Physical::new(path)?)
    }

    /// Parses an executable which is already in memory.
    ///
    /// # Errors
    /// Returns an error if the buffer is empty or not a supported container.
    pub fn from_mem(data: Vec<u8>) -> Result<BinaryImage> {
        Self::load(Memory::new(data))
    }

    fn load<T: Backend + 'static>(data: T) -> Result<BinaryImage> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let mapping = Self::map(data.data())?;
        log::debug!(
            "loaded {:?} image with {} segments",
            mapping.format,
            mapping.segments.len()
        );

        Ok(BinaryImage {
            data: Box::new(data),
            segments: mapping.segments,
            pointer_width: mapping.pointer_width,
            endianness: mapping.endianness,
            format: mapping.format,
        })
    }

    fn map(bytes: &[u8]) -> Result<Mapping> {
        let width = |is_64: bool| {
            if is_64 {
                PointerWidth::Bits64
            } else {
                PointerWidth::Bits32
            }
        };
        let order = |little: bool| {
            if little {
                Endianness::Little
            } else {
                Endianness::Big
            }
        };

        match Object::parse(bytes)? {
            Object::Elf(elf) => {
                let segments = elf
                    .program_headers
                    .iter()
                    .filter(|header| header.p_type == PT_LOAD)
                    .filter_map(|header| {
                        Some(Segment {
                            va: header.p_vaddr,
                            offset: usize::try_from(header.p_offset).ok()?,
                            size: usize::try_from(header.p_filesz).ok()?,
                        })
                    })
                    .collect();

                Ok(Mapping {
                    segments,
                    pointer_width: width(elf.is_64),
                    endianness: order(elf.little_endian),
                    format: ImageFormat::Elf,
                })
            }
            Object::PE(pe) => {
                let segments = pe
                    .sections
                    .iter()
                    .map(|section| Segment {
                        va: pe.image_base + u64::from(section.virtual_address),
                        offset: section.pointer_to_raw_data as usize,
                        size: section.virtual_size.min(section.size_of_raw_data) as usize,
                    })
                    .collect();

                Ok(Mapping {
                    segments,
                    pointer_width: width(pe.is_64),
                    endianness: Endianness::Little,
                    format: ImageFormat::Pe,
                })
            }
            Object::Mach(Mach::Binary(macho)) => {
                let segments = macho
                    .segments
                    .iter()
                    .filter(|segment| segment.filesize > 0)
                    .filter_map(|segment| {
                        Some(Segment {
                            va: segment.vmaddr,
                            offset: usize::try_from(segment.fileoff).ok()?,
                            size: usize::try_from(segment.filesize).ok()?,
                        })
                    })
                    .collect();

                Ok(Mapping {
                    segments,
                    pointer_width: width(macho.is_64),
                    endianness: order(macho.little_endian),
                    format: ImageFormat::MachO,
                })
            }
            Object::Mach(Mach::Fat(_)) => Err(malformed_error!(
                "Fat Mach-O images must be thinned to a single architecture first"
            )),
            _ => Err(malformed_error!("Unsupported executable container")),
        }
    }

    /// The container format
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// The file-backed segments of the image
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl AddressSpace for BinaryImage {
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
            .ok_or(UnmappedAddress(va))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage() {
        assert!(BinaryImage::from_mem(vec![]).is_err());
        assert!(BinaryImage::from_mem(vec![0x42; 64]).is_err());
    }

    #[test]
    fn minimal_elf64() {
        // ELF64 header followed by a single PT_LOAD program header
        let mut data = vec![0u8; 0x100];
        data[0..4].copy_from_slice(b"\x7fELF");
        data[4] = 2; // ELFCLASS64
        data[5] = 1; // ELFDATA2LSB
        data[6] = 1; // EV_CURRENT
        data[16..18].copy_from_slice(&3u16.to_le_bytes()); // ET_DYN
        data[18..20].copy_from_slice(&183u16.to_le_bytes()); // EM_AARCH64
        data[20..24].copy_from_slice(&1u32.to_le_bytes());
        data[32..40].copy_from_slice(&64u64.to_le_bytes()); // e_phoff
        data[52..54].copy_from_slice(&64u16.to_le_bytes()); // e_ehsize
        data[54..56].copy_from_slice(&56u16.to_le_bytes()); // e_phentsize
        data[56..58].copy_from_slice(&1u16.to_le_bytes()); // e_phnum
        data[58..60].copy_from_slice(&64u16.to_le_bytes()); // e_shentsize

        let ph = 64;
        data[ph..ph + 4].copy_from_slice(&PT_LOAD.to_le_bytes());
        data[ph + 4..ph + 8].copy_from_slice(&5u32.to_le_bytes()); // PF_R | PF_X
        data[ph + 8..ph + 16].copy_from_slice(&0u64.to_le_bytes()); // p_offset
        data[ph + 16..ph + 24].copy_from_slice(&0x10000u64.to_le_bytes()); // p_vaddr
        data[ph + 24..ph + 32].copy_from_slice(&0x10000u64.to_le_bytes()); // p_paddr
        data[ph + 32..ph + 40].copy_from_slice(&0x100u64.to_le_bytes()); // p_filesz
        data[ph + 40..ph + 48].copy_from_slice(&0x100u64.to_le_bytes()); // p_memsz
        data[ph + 48..ph + 56].copy_from_slice(&0x1000u64.to_le_bytes()); // p_align

        let image = BinaryImage::from_mem(data).unwrap();
        assert_eq!(image.format(), ImageFormat::Elf);
        assert_eq!(image.pointer_width(), PointerWidth::Bits64);
        assert_eq!(image.endianness(), Endianness::Little);
        assert_eq!(image.va_to_offset(0x10040).unwrap(), 0x40);
        assert!(image.va_to_offset(0x20000).is_err());
    }
}
