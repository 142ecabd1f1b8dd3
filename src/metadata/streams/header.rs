//! The global metadata header.
//!
//! The blob starts with the sanity magic `0xFAB11BAF` and the integer format version, followed
//! by an offset/size pair for every section. Which pairs exist depends on the version, so the
//! header itself is read through the layout table like any other structure.

use strum::EnumIter;

use crate::{
    file::io::read_le,
    metadata::{
        layout::{read_metadata_structure, Record, StructKind},
        version::VersionPair,
    },
    Error::OutOfBounds,
    Result,
};

/// Magic value at the start of every metadata blob
pub const METADATA_SANITY: u32 = 0xFAB1_1BAF;

/// The sections addressed by the header, in the order the header declares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[allow(missing_docs)]
pub enum SectionId {
    StringLiterals,
    StringLiteralData,
    Strings,
    Events,
    Properties,
    Methods,
    ParameterDefaultValues,
    FieldDefaultValues,
    FieldAndParameterDefaultValueData,
    FieldMarshaledSizes,
    Parameters,
    Fields,
    GenericParameters,
    GenericParameterConstraints,
    GenericContainers,
    NestedTypes,
    Interfaces,
    VtableMethods,
    InterfaceOffsets,
    TypeDefinitions,
    Images,
    Assemblies,
    FieldRefs,
    ReferencedAssemblies,
    AttributeTypeRanges,
    AttributeTypes,
    AttributeData,
    AttributeDataRanges,
    ExportedTypeDefinitions,
}

impl SectionId {
    /// Section name plus the header fields holding its offset and size
    pub(crate) fn fields(self) -> (&'static str, &'static str, &'static str) {
        match self {
            SectionId::StringLiterals => ("stringLiteral", "stringLiteralOffset", "stringLiteralSize"),
            SectionId::StringLiteralData => (
                "stringLiteralData",
                "stringLiteralDataOffset",
                "stringLiteralDataSize",
            ),
            SectionId::Strings => ("string", "stringOffset", "stringSize"),
            SectionId::Events => ("events", "eventsOffset", "eventsSize"),
            SectionId::Properties => ("properties", "propertiesOffset", "propertiesSize"),
            SectionId::Methods => ("methods", "methodsOffset", "methodsSize"),
            SectionId::ParameterDefaultValues => (
                "parameterDefaultValues",
                "parameterDefaultValuesOffset",
                "parameterDefaultValuesSize",
            ),
            SectionId::FieldDefaultValues => (
                "fieldDefaultValues",
                "fieldDefaultValuesOffset",
                "fieldDefaultValuesSize",
            ),
            SectionId::FieldAndParameterDefaultValueData => (
                "fieldAndParameterDefaultValueData",
                "fieldAndParameterDefaultValueDataOffset",
                "fieldAndParameterDefaultValueDataSize",
            ),
            SectionId::FieldMarshaledSizes => (
                "fieldMarshaledSizes",
                "fieldMarshaledSizesOffset",
                "fieldMarshaledSizesSize",
            ),
            SectionId::Parameters => ("parameters", "parametersOffset", "parametersSize"),
            SectionId::Fields => ("fields", "fieldsOffset", "fieldsSize"),
            SectionId::GenericParameters => (
                "genericParameters",
                "genericParametersOffset",
                "genericParametersSize",
            ),
            SectionId::GenericParameterConstraints => (
                "genericParameterConstraints",
                "genericParameterConstraintsOffset",
                "genericParameterConstraintsSize",
            ),
            SectionId::GenericContainers => (
                "genericContainers",
                "genericContainersOffset",
                "genericContainersSize",
            ),
            SectionId::NestedTypes => ("nestedTypes", "nestedTypesOffset", "nestedTypesSize"),
            SectionId::Interfaces => ("interfaces", "interfacesOffset", "interfacesSize"),
            SectionId::VtableMethods => ("vtableMethods", "vtableMethodsOffset", "vtableMethodsSize"),
            SectionId::InterfaceOffsets => (
                "interfaceOffsets",
                "interfaceOffsetsOffset",
                "interfaceOffsetsSize",
            ),
            SectionId::TypeDefinitions => (
                "typeDefinitions",
                "typeDefinitionsOffset",
                "typeDefinitionsSize",
            ),
            SectionId::Images => ("images", "imagesOffset", "imagesSize"),
            SectionId::Assemblies => ("assemblies", "assembliesOffset", "assembliesSize"),
            SectionId::FieldRefs => ("fieldRefs", "fieldRefsOffset", "fieldRefsSize"),
            SectionId::ReferencedAssemblies => (
                "referencedAssemblies",
                "referencedAssembliesOffset",
                "referencedAssembliesSize",
            ),
            SectionId::AttributeTypeRanges => (
                "attributesInfo",
                "attributesInfoOffset",
                "attributesInfoCount",
            ),
            SectionId::AttributeTypes => ("attributeTypes", "attributeTypesOffset", "attributeTypesCount"),
            SectionId::AttributeData => ("attributeData", "attributeDataOffset", "attributeDataSize"),
            SectionId::AttributeDataRanges => (
                "attributeDataRange",
                "attributeDataRangeOffset",
                "attributeDataRangeSize",
            ),
            SectionId::ExportedTypeDefinitions => (
                "exportedTypeDefinitions",
                "exportedTypeDefinitionsOffset",
                "exportedTypeDefinitionsSize",
            ),
        }
    }

    /// The section name used in diagnostics
    #[must_use]
    pub fn name(self) -> &'static str {
        self.fields().0
    }
}

/// Location of one section inside the blob, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    /// Offset from the start of the blob
    pub offset: usize,
    /// Length in bytes
    pub size: usize,
}

/// The decoded global metadata header.
pub struct MetadataHeader {
    record: Record,
    version: u32,
}

impl MetadataHeader {
    /// Reads and validates the header at the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a wrong sanity value,
    /// [`crate::Error::UnsupportedVersion`] for an unknown pair and
    /// [`crate::Error::OutOfBounds`] for a truncated blob.
    pub fn read(data: &[u8], pair: VersionPair) -> Result<MetadataHeader> {
        let (sanity, version) = Self::peek(data)?;
        if sanity != METADATA_SANITY {
            return Err(malformed_error!("Invalid metadata sanity - 0x{:08X}", sanity));
        }

        let (record, _) = read_metadata_structure(StructKind::MetadataHeader, pair, data, 0)?;
        Ok(MetadataHeader { record, version })
    }

    /// Reads the sanity value and the integer version without validating anything else.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob is shorter than 8 bytes.
    pub fn peek(data: &[u8]) -> Result<(u32, u32)> {
        if data.len() < 8 {
            return Err(OutOfBounds);
        }

        Ok((read_le::<u32>(data)?, read_le::<u32>(&data[4..])?))
    }

    /// The integer version stored in the blob
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The header fields
    #[must_use]
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Locates `id` inside a blob of `blob_len` bytes.
    ///
    /// Returns `None` if the section does not exist for the active version.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptData`] if the section reaches past the end of the blob.
    pub fn section(&self, id: SectionId, blob_len: usize) -> Result<Option<Section>> {
        let (name, offset_field, size_field) = id.fields();
        let (Some(offset), Some(size)) = (
            self.record.get_opt(offset_field),
            self.record.get_opt(size_field),
        ) else {
            return Ok(None);
        };

        let (offset, size) = (offset as usize, size as usize);
        match offset.checked_add(size) {
            Some(end) if end <= blob_len => Ok(Some(Section { offset, size })),
            _ => Err(crate::Error::CorruptData {
                section: name,
                offset,
            }),
        }
    }
}
