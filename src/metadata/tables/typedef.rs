use bitflags::bitflags;

use crate::{
    metadata::{
        layout::{Record, StructKind},
        tables::{get_index, get_opt_u32, TableRow},
    },
    Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Type definition attribute flags
    pub struct TypeAttributes: u32 {
        /// Visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested and publicly visible
        const NESTED_PUBLIC = 0x0000_0002;
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
        /// Type cannot be instantiated
        const ABSTRACT = 0x0000_0080;
        /// Type cannot be derived from
        const SEALED = 0x0000_0100;
        /// Name has special meaning to the runtime
        const SPECIAL_NAME = 0x0000_0400;
        /// Type is serializable
        const SERIALIZABLE = 0x0000_2000;
    }
}

/// A type definition.
///
/// Member lists are contiguous ranges into the shared member tables: `field_start ..
/// field_start + field_count` in the field table, and so on. A start of `-1` with a zero count
/// is an empty range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    /// Simple name in the string heap
    pub name_index: u32,
    /// Namespace in the string heap
    pub namespace_index: u32,
    /// Registration type descriptor of the type itself
    pub byval_type_index: Option<u32>,
    /// Registration type descriptor of the by-reference form, up to 24.5
    pub byref_type_index: Option<u32>,
    /// Registration type descriptor of the enclosing type
    pub declaring_type_index: Option<u32>,
    /// Registration type descriptor of the base type
    pub parent_index: Option<u32>,
    /// Registration type descriptor of the underlying type of an enum
    pub element_type_index: Option<u32>,
    /// Generic container, for generic type definitions
    pub generic_container_index: Option<u32>,
    /// Raw attribute flags
    pub flags: u32,
    /// First field
    pub field_start: i32,
    /// First method
    pub method_start: i32,
    /// First event
    pub event_start: i32,
    /// First property
    pub property_start: i32,
    /// First entry in the nested types section
    pub nested_types_start: i32,
    /// First entry in the interfaces section
    pub interfaces_start: i32,
    /// First entry in the vtable methods section
    pub vtable_start: i32,
    /// First entry in the interface offsets section
    pub interface_offsets_start: i32,
    /// Number of methods
    pub method_count: u16,
    /// Number of properties
    pub property_count: u16,
    /// Number of fields
    pub field_count: u16,
    /// Number of events
    pub event_count: u16,
    /// Number of nested types
    pub nested_type_count: u16,
    /// Number of vtable slots
    pub vtable_count: u16,
    /// Number of implemented interfaces
    pub interfaces_count: u16,
    /// Number of interface offsets
    pub interface_offsets_count: u16,
    /// Packed flags: value type, enum, ...
    pub bitfield: u32,
    /// Metadata token, from 19 on
    pub token: Option<u32>,
}

impl TypeDefinition {
    /// The type is a value type
    #[must_use]
    pub fn is_valuetype(&self) -> bool {
        self.bitfield & 0x1 != 0
    }

    /// The type is an enum
    #[must_use]
    pub fn is_enum(&self) -> bool {
        (self.bitfield >> 1) & 0x1 != 0
    }

    /// The type is an interface
    #[must_use]
    pub fn is_interface(&self) -> bool {
        TypeAttributes::from_bits_truncate(self.flags).contains(TypeAttributes::INTERFACE)
    }

    /// Attribute flags
    #[must_use]
    pub fn attributes(&self) -> TypeAttributes {
        TypeAttributes::from_bits_truncate(self.flags)
    }
}

impl TableRow for TypeDefinition {
    const KIND: StructKind = StructKind::TypeDefinition;

    fn from_record(record: &Record) -> Result<Self> {
        let byref_type_index = if record.contains("byrefTypeIndex") {
            get_index(record, "byrefTypeIndex")?
        } else {
            None
        };

        Ok(TypeDefinition {
            name_index: record.get_u32("nameIndex")?,
            namespace_index: record.get_u32("namespaceIndex")?,
            byval_type_index: get_index(record, "byvalTypeIndex")?,
            byref_type_index,
            declaring_type_index: get_index(record, "declaringTypeIndex")?,
            parent_index: get_index(record, "parentIndex")?,
            element_type_index: get_index(record, "elementTypeIndex")?,
            generic_container_index: get_index(record, "genericContainerIndex")?,
            flags: record.get_u32("flags")?,
            field_start: record.get_i32("fieldStart")?,
            method_start: record.get_i32("methodStart")?,
            event_start: record.get_i32("eventStart")?,
            property_start: record.get_i32("propertyStart")?,
            nested_types_start: record.get_i32("nestedTypesStart")?,
            interfaces_start: record.get_i32("interfacesStart")?,
            vtable_start: record.get_i32("vtableStart")?,
            interface_offsets_start: record.get_i32("interfaceOffsetsStart")?,
            method_count: record.get_u16("methodCount")?,
            property_count: record.get_u16("propertyCount")?,
            field_count: record.get_u16("fieldCount")?,
            event_count: record.get_u16("eventCount")?,
            nested_type_count: record.get_u16("nestedTypeCount")?,
            vtable_count: record.get_u16("vtableCount")?,
            interfaces_count: record.get_u16("interfacesCount")?,
            interface_offsets_count: record.get_u16("interfaceOffsetsCount")?,
            bitfield: record.get_u32("bitfield")?,
            token: get_opt_u32(record, "token")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        layout::read_metadata_structure,
        version::{v, VersionPair},
    };

    #[test]
    fn crafted_v29() {
        #[rustfmt::skip]
        let words: [u32; 13] = [
            0x10,        // nameIndex
            0x20,        // namespaceIndex
            3,           // byvalTypeIndex
            0xFFFF_FFFF, // declaringTypeIndex
            4,           // parentIndex
            0xFFFF_FFFF, // elementTypeIndex
            0xFFFF_FFFF, // genericContainerIndex
            0x0010_0001, // flags
            0,           // fieldStart
            2,           // methodStart
            0xFFFF_FFFF, // eventStart
            0xFFFF_FFFF, // propertyStart
            0xFFFF_FFFF, // nestedTypesStart
        ];
        let mut data: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        for word in [0xFFFF_FFFFu32, 0, 0] {
            // interfacesStart, vtableStart, interfaceOffsetsStart
            data.extend_from_slice(&word.to_le_bytes());
        }
        for count in [1u16, 0, 2, 0, 0, 0, 0, 0] {
            data.extend_from_slice(&count.to_le_bytes());
        }
        data.extend_from_slice(&0x1u32.to_le_bytes()); // bitfield
        data.extend_from_slice(&0x0200_0002u32.to_le_bytes()); // token

        let (record, consumed) = read_metadata_structure(
            StructKind::TypeDefinition,
            VersionPair::uniform(v(29, 0)),
            &data,
            0,
        )
        .unwrap();
        assert_eq!(consumed, data.len());

        let def = TypeDefinition::from_record(&record).unwrap();
        assert_eq!(def.name_index, 0x10);
        assert_eq!(def.byval_type_index, Some(3));
        assert_eq!(def.byref_type_index, None);
        assert_eq!(def.declaring_type_index, None);
        assert_eq!(def.parent_index, Some(4));
        assert_eq!(def.method_start, 2);
        assert_eq!(def.method_count, 1);
        assert_eq!(def.field_count, 2);
        assert!(def.is_valuetype());
        assert!(!def.is_enum());
        assert!(def.attributes().contains(TypeAttributes::PUBLIC));
        assert_eq!(def.token, Some(0x0200_0002));
    }
}
