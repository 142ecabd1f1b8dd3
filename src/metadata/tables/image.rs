use crate::{
    metadata::{
        layout::{Record, StructKind},
        tables::{get_index, get_opt_u32, TableRow},
    },
    Result,
};

/// One managed module (`Assembly-CSharp.dll`) and the contiguous range of type definitions it
/// declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDefinition {
    /// Module name in the string heap
    pub name_index: u32,
    /// Owning assembly
    pub assembly_index: u32,
    /// First type definition of the image
    pub type_start: i32,
    /// Number of type definitions
    pub type_count: u32,
    /// First exported type, from 24 on
    pub exported_type_start: Option<u32>,
    /// Number of exported types, from 24 on
    pub exported_type_count: Option<u32>,
    /// Entry point method, if any
    pub entry_point_index: Option<u32>,
    /// Module token, from 19 on
    pub token: Option<u32>,
    /// First custom attribute range, from 24.1 on
    pub custom_attribute_start: Option<u32>,
    /// Number of custom attribute ranges, from 24.1 on
    pub custom_attribute_count: Option<u32>,
}

impl TableRow for ImageDefinition {
    const KIND: StructKind = StructKind::ImageDefinition;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(ImageDefinition {
            name_index: record.get_u32("nameIndex")?,
            assembly_index: record.get_u32("assemblyIndex")?,
            type_start: record.get_i32("typeStart")?,
            type_count: record.get_u32("typeCount")?,
            exported_type_start: get_opt_u32(record, "exportedTypeStart")?,
            exported_type_count: get_opt_u32(record, "exportedTypeCount")?,
            entry_point_index: get_index(record, "entryPointIndex")?,
            token: get_opt_u32(record, "token")?,
            custom_attribute_start: get_opt_u32(record, "customAttributeStart")?,
            custom_attribute_count: get_opt_u32(record, "customAttributeCount")?,
        })
    }
}

/// The identity of an assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyName {
    /// Simple name in the string heap
    pub name_index: u32,
    /// Culture in the string heap
    pub culture_index: u32,
    /// Hash value, up to 24.3
    pub hash_value_index: Option<u32>,
    /// Public key blob
    pub public_key_index: u32,
    /// Hash algorithm id
    pub hash_alg: u32,
    /// Hash length
    pub hash_len: i32,
    /// Assembly name flags
    pub flags: u32,
    /// Version major
    pub major: i32,
    /// Version minor
    pub minor: i32,
    /// Version build
    pub build: i32,
    /// Version revision
    pub revision: i32,
    /// Public key token, little endian
    pub public_key_token: [u8; 8],
}

/// An assembly and its embedded name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyDefinition {
    /// The image holding the assembly's types
    pub image_index: u32,
    /// Assembly token, from 24.1 on
    pub token: Option<u32>,
    /// Custom attribute index, up to 24
    pub custom_attribute_index: Option<u32>,
    /// First referenced assembly, from 20 on
    pub referenced_assembly_start: Option<u32>,
    /// Number of referenced assemblies, from 20 on
    pub referenced_assembly_count: Option<u32>,
    /// The assembly identity
    pub name: AssemblyName,
}

impl TableRow for AssemblyDefinition {
    const KIND: StructKind = StructKind::AssemblyDefinition;

    fn from_record(record: &Record) -> Result<Self> {
        let name = AssemblyName {
            name_index: record.get_u32("nameIndex")?,
            culture_index: record.get_u32("cultureIndex")?,
            hash_value_index: get_opt_u32(record, "hashValueIndex")?,
            public_key_index: record.get_u32("publicKeyIndex")?,
            hash_alg: record.get_u32("hashAlg")?,
            hash_len: record.get_i32("hashLen")?,
            flags: record.get_u32("flags")?,
            major: record.get_i32("major")?,
            minor: record.get_i32("minor")?,
            build: record.get_i32("build")?,
            revision: record.get_i32("revision")?,
            public_key_token: record.get("publicKeyToken")?.to_le_bytes(),
        };

        Ok(AssemblyDefinition {
            image_index: record.get_u32("imageIndex")?,
            token: get_opt_u32(record, "token")?,
            custom_attribute_index: get_opt_u32(record, "customAttributeIndex")?,
            referenced_assembly_start: get_opt_u32(record, "referencedAssemblyStart")?,
            referenced_assembly_count: get_opt_u32(record, "referencedAssemblyCount")?,
            name,
        })
    }
}
