//! Memory-mapped file backend.
//!
//! Metadata blobs of large games easily exceed tens of megabytes and native images hundreds;
//! [`crate::file::physical::Physical`] maps them read-only instead of copying them into the
//! process, letting the operating system page in only the sections the decoder touches.

use super::Backend;
use crate::{Error::OutOfBounds, Result};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A file backend that uses memory-mapped I/O for access to files on disk.
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Memory-map the file at `path` read-only.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;

        // The mapping is read-only and the file handle is not shared with writers.
        let mmap = unsafe { Mmap::map(&file) }?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        self.data.get(offset..offset_end).ok_or(OutOfBounds)
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn map_file() {
        let path = std::env::temp_dir().join(format!("il2scope-physical-{}.bin", std::process::id()));
        {
            let mut file = fs::File::create(&path).unwrap();
            file.write_all(&[0xAF, 0x1B, 0xB1, 0xFA, 0x1D, 0x00, 0x00, 0x00])
                .unwrap();
        }

        let physical = Physical::new(&path).unwrap();
        assert_eq!(physical.len(), 8);
        assert_eq!(physical.data_slice(4, 4).unwrap(), &[0x1D, 0x00, 0x00, 0x00]);
        assert!(physical.data_slice(6, 4).is_err());

        drop(physical);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file() {
        assert!(Physical::new("/nonexistent/global-metadata.dat").is_err());
    }
}
