//! Per-module code tables (24.2 and later).
//!
//! From 24.2 on, the code registration no longer holds one global method pointer table.
//! Each managed module has an `Il2CppCodeGenModule` with its own method pointers, indexed by
//! the row number of the method token.

use crate::{
    file::AddressSpace,
    metadata::layout::{Record, ResolvedLayout},
    Result,
};

/// The code tables of one managed module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeGenModule {
    /// Module name, matching the image name (`Assembly-CSharp.dll`)
    pub name: String,
    /// Native address of every method, indexed by token row - 1
    pub method_pointers: Vec<u64>,
    /// Number of adjustor thunks, 24.5 and 27.1 on
    pub adjustor_thunk_count: Option<usize>,
    /// Address of the invoker index table
    pub invoker_indices: u64,
    /// Number of reverse P/Invoke wrappers
    pub reverse_pinvoke_wrapper_count: usize,
    /// Number of RGCTX ranges
    pub rgctx_ranges_count: usize,
    /// Number of RGCTX definitions
    pub rgctxs_count: usize,
    /// Module initializer address, from 27 on
    pub module_initializer: Option<u64>,
}

impl CodeGenModule {
    /// Reads the module record at virtual address `va`, following its name and method
    /// pointer table.
    ///
    /// # Errors
    /// Returns an error if the record or any table it points to is unmapped.
    pub(crate) fn read(adapter: &dyn AddressSpace, layout: &ResolvedLayout, va: u64) -> Result<Self> {
        let (record, _) = layout.read_from(adapter, adapter.va_to_offset(va)?)?;
        Self::from_record(adapter, &record)
    }

    fn from_record(adapter: &dyn AddressSpace, record: &Record) -> Result<Self> {
        let name = adapter.read_c_string(record.get("moduleName")?)?;
        let method_pointers = adapter.read_pointer_array(
            record.get("methodPointers")?,
            record.get_usize("methodPointerCount")?,
        )?;

        let adjustor_thunk_count = if record.contains("adjustorThunkCount") {
            Some(record.get_usize("adjustorThunkCount")?)
        } else {
            None
        };

        Ok(CodeGenModule {
            name,
            method_pointers,
            adjustor_thunk_count,
            invoker_indices: record.get("invokerIndices")?,
            reverse_pinvoke_wrapper_count: record.get_usize("reversePInvokeWrapperCount")?,
            rgctx_ranges_count: record.get_usize("rgctxRangesCount")?,
            rgctxs_count: record.get_usize("rgctxsCount")?,
            module_initializer: record.get_opt("moduleInitializer"),
        })
    }

    /// Native address of the method with metadata `token`, if it has a body.
    #[must_use]
    pub fn method_address(&self, token: u32) -> Option<u64> {
        let row = (token & 0x00FF_FFFF) as usize;
        let address = *self.method_pointers.get(row.checked_sub(1)?)?;
        (address != 0).then_some(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        file::{Endianness, FlatImage, PointerWidth},
        metadata::{
            layout::{StructKind, StructLayout},
            version::{v, VersionPair},
        },
    };

    #[test]
    fn read_module_v24_2() {
        // 0x00: module record, 0x80: name, 0x90: method pointers
        let mut data = vec![0u8; 0xA0];
        let mut put = |offset: usize, value: u64| {
            data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        };
        put(0x00, 0x1080); // moduleName
        put(0x08, 2); // methodPointerCount
        put(0x10, 0x1090); // methodPointers
        put(0x90, 0x5000);
        put(0x98, 0);
        data[0x80..0x8C].copy_from_slice(b"Game.dll\0\0\0\0");

        let image = FlatImage::from_mem(data, PointerWidth::Bits64, Endianness::Little)
            .with_segment(0x1000, 0, 0xA0);
        let layout = StructLayout::of(StructKind::CodeGenModule)
            .resolve(VersionPair::uniform(v(24, 2)), PointerWidth::Bits64)
            .unwrap();

        let module = CodeGenModule::read(&image, &layout, 0x1000).unwrap();
        assert_eq!(module.name, "Game.dll");
        assert_eq!(module.method_pointers, vec![0x5000, 0]);
        assert_eq!(module.adjustor_thunk_count, None);
        assert_eq!(module.module_initializer, None);

        assert_eq!(module.method_address(0x0600_0001), Some(0x5000));
        assert_eq!(module.method_address(0x0600_0002), None);
        assert_eq!(module.method_address(0x0600_0000), None);
        assert_eq!(module.method_address(0x0600_0009), None);
    }
}
