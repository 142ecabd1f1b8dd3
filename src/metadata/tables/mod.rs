//! Typed records of the metadata blob sections.
//!
//! Every fixed-size section of the blob is an array of one structure kind. The types in this
//! module are the typed form of those structures: each implements [`TableRow`], converting a
//! layout [`Record`] into plain fields. Fields which only exist in some versions are `Option`s;
//! `None` means the active layout does not contain the field, not that the value was zero.
//!
//! Indices into other tables are kept raw. Nothing here follows a reference; that is left to
//! the [`crate::typegraph`] resolver, which reports dangling indices per type.

mod extra;
mod generics;
mod image;
mod members;
mod typedef;

pub use extra::{
    CustomAttributeDataRange, CustomAttributeTypeRange, FieldDefaultValue, FieldMarshaledSize,
    FieldRef, ParameterDefaultValue, StringLiteral,
};
pub use generics::{GenericContainer, GenericParameter};
pub use image::{AssemblyDefinition, AssemblyName, ImageDefinition};
pub use members::{
    EventDefinition, FieldAttributes, FieldDefinition, MethodAttributes, MethodDefinition,
    ParameterDefinition, PropertyDefinition,
};
pub use typedef::{TypeAttributes, TypeDefinition};

use crate::{
    file::{parser::Parser, Endianness, PointerWidth},
    metadata::{
        layout::{Record, StructKind, StructLayout},
        streams::{Section, SectionId},
        version::VersionPair,
    },
    Result,
};

/// A typed row of a metadata section.
pub trait TableRow: Sized {
    /// The structure kind the section is an array of
    const KIND: StructKind;

    /// Converts a record read with the layout of [`TableRow::KIND`].
    ///
    /// # Errors
    /// Returns [`crate::Error::FieldNotPresentForVersion`] if a field the conversion requires
    /// is missing from the layout.
    fn from_record(record: &Record) -> Result<Self>;
}

/// Reads every row of a fixed-size section.
///
/// The row count is the section size divided by the version specific row size; a trailing
/// partial row is ignored. A missing section yields an empty table.
///
/// # Errors
/// Returns [`crate::Error::CorruptData`] if the section does not lie inside `data`, or any
/// error from the row conversion.
pub fn read_table<T: TableRow>(
    data: &[u8],
    id: SectionId,
    section: Option<Section>,
    pair: VersionPair,
) -> Result<Vec<T>> {
    let Some(section) = section else {
        return Ok(Vec::new());
    };

    let layout = StructLayout::of(T::KIND).resolve(pair, PointerWidth::Bits32)?;
    if layout.size() == 0 {
        return Ok(Vec::new());
    }

    let count = section.size / layout.size();
    let records = layout
        .read_array(data, section.offset, count, Endianness::Little)
        .map_err(|_| crate::Error::CorruptData {
            section: id.name(),
            offset: section.offset,
        })?;

    records.iter().map(T::from_record).collect()
}

/// Reads a section which is a plain array of 32-bit indices.
///
/// # Errors
/// Returns [`crate::Error::CorruptData`] if the section does not lie inside `data`.
pub fn read_index_table(data: &[u8], id: SectionId, section: Option<Section>) -> Result<Vec<i32>> {
    let Some(section) = section else {
        return Ok(Vec::new());
    };

    let bytes = corrupt_on!(
        section
            .offset
            .checked_add(section.size)
            .and_then(|end| data.get(section.offset..end)),
        id.name(),
        section.offset
    )?;

    // A trailing partial entry is not part of the table
    let whole = &bytes[..bytes.len() - bytes.len() % 4];
    let mut parser = Parser::new(whole, Endianness::Little);
    let mut values = Vec::with_capacity(whole.len() / 4);
    while parser.has_more_data() {
        values.push(parser.read::<i32>()?);
    }
    Ok(values)
}

/// A signed table index, `None` when negative.
pub(crate) fn index(value: i32) -> Option<u32> {
    u32::try_from(value).ok()
}

/// A signed index field, `None` when negative.
pub(crate) fn get_index(record: &Record, field: &'static str) -> Result<Option<u32>> {
    Ok(index(record.get_i32(field)?))
}

/// An index field which only exists in some versions.
pub(crate) fn get_opt_u32(record: &Record, field: &'static str) -> Result<Option<u32>> {
    if record.contains(field) {
        Ok(Some(record.get_u32(field)?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::version::v, Error};

    #[test]
    fn index_table() {
        let data: Vec<u8> = [3i32, -1, 7]
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect();

        let section = Some(Section { offset: 0, size: 12 });
        let values = read_index_table(&data, SectionId::NestedTypes, section).unwrap();
        assert_eq!(values, vec![3, -1, 7]);

        let section = Some(Section { offset: 0, size: 10 });
        let values = read_index_table(&data, SectionId::NestedTypes, section).unwrap();
        assert_eq!(values, vec![3, -1]);

        assert!(read_index_table(&data, SectionId::NestedTypes, None)
            .unwrap()
            .is_empty());

        let section = Some(Section { offset: 8, size: 12 });
        assert!(matches!(
            read_index_table(&data, SectionId::NestedTypes, section),
            Err(Error::CorruptData {
                section: "nestedTypes",
                offset: 8
            })
        ));
    }

    #[test]
    fn table_rows() {
        let data: Vec<u8> = [1i32, 2, 3, 4, 5, 6, 0xFF]
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect();

        // Trailing partial row is ignored
        let section = Some(Section { offset: 0, size: 26 });
        let rows: Vec<FieldRef> =
            read_table(&data, SectionId::FieldRefs, section, VersionPair::uniform(v(24, 0))).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].type_index, 3);
        assert_eq!(rows[1].field_index, 4);
    }

    #[test]
    fn negative_index() {
        assert_eq!(index(-1), None);
        assert_eq!(index(0), Some(0));
    }
}
