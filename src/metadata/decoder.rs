//! Decoding a metadata blob and its registration tables into flat collections.
//!
//! [`decode`] is the single entry point that turns raw bytes into a [`MetadataSet`]. It reads
//! the header, every fixed-size section and the registration tables, and nothing more: no
//! index is followed, no name is resolved. Any failure here is fatal; the
//! [`crate::typegraph`] resolver is where per-type problems are tolerated.
//!
//! Detecting the version pair is separate ([`detect_version`]) because the integer in the
//! header is ambiguous for `24`, and because callers sometimes know better and override it
//! through [`crate::LoadConfig`].

use crate::{
    config::LoadConfig,
    file::io::read_le,
    metadata::{
        registration::{RegistrationSet, RegistrationSource},
        streams::{MetadataHeader, Section, SectionId, StringLiterals, Strings},
        tables::{
            read_index_table, read_table, AssemblyDefinition, CustomAttributeDataRange,
            CustomAttributeTypeRange, EventDefinition, FieldDefaultValue, FieldDefinition,
            FieldMarshaledSize, FieldRef, GenericContainer, GenericParameter, ImageDefinition,
            MethodDefinition, ParameterDefaultValue, ParameterDefinition, PropertyDefinition,
            StringLiteral, TypeDefinition,
        },
        version::{v, Version, VersionPair},
    },
    Error::OutOfBounds,
    Result,
};

/// Size of the 24.2+ header, which is also where the string literal table starts
const HEADER_SIZE_V24_2: u32 = 264;

/// Every table of one metadata blob plus its registration tables.
///
/// All collections are raw: indices are kept as they are stored and are only followed by the
/// resolver.
pub struct MetadataSet<'a> {
    /// The version pair the set was decoded with
    pub pair: VersionPair,
    /// The decoded header
    pub header: MetadataHeader,
    /// Identifier string heap
    pub strings: Strings<'a>,
    /// String literals used by managed code
    pub string_literals: StringLiterals<'a>,
    /// Images (managed modules)
    pub images: Vec<ImageDefinition>,
    /// Assemblies
    pub assemblies: Vec<AssemblyDefinition>,
    /// Type definitions of all images
    pub type_definitions: Vec<TypeDefinition>,
    /// Method definitions
    pub methods: Vec<MethodDefinition>,
    /// Method parameters
    pub parameters: Vec<ParameterDefinition>,
    /// Field definitions
    pub fields: Vec<FieldDefinition>,
    /// Properties
    pub properties: Vec<PropertyDefinition>,
    /// Events
    pub events: Vec<EventDefinition>,
    /// Generic containers of generic types and methods
    pub generic_containers: Vec<GenericContainer>,
    /// Generic parameters
    pub generic_parameters: Vec<GenericParameter>,
    /// Constraint type indices of generic parameters
    pub generic_parameter_constraints: Vec<i32>,
    /// Nested type definition indices, ranged by each declaring type
    pub nested_types: Vec<i32>,
    /// Implemented interface type indices, ranged by each implementing type
    pub interfaces: Vec<i32>,
    /// Encoded vtable method references
    pub vtable_methods: Vec<i32>,
    /// Field default values
    pub field_default_values: Vec<FieldDefaultValue>,
    /// Parameter default values
    pub parameter_default_values: Vec<ParameterDefaultValue>,
    /// Blob holding the encoded default values
    pub default_value_data: &'a [u8],
    /// Marshaled sizes of fields
    pub field_marshaled_sizes: Vec<FieldMarshaledSize>,
    /// Custom attribute type ranges, up to 27.2
    pub attribute_type_ranges: Vec<CustomAttributeTypeRange>,
    /// Custom attribute type indices, up to 27.2
    pub attribute_types: Vec<i32>,
    /// Custom attribute data ranges, from 29 on
    pub attribute_data_ranges: Vec<CustomAttributeDataRange>,
    /// Raw custom attribute blobs, from 29 on
    pub attribute_data: &'a [u8],
    /// Field references
    pub field_refs: Vec<FieldRef>,
    /// Referenced assembly indices, from 20 on
    pub referenced_assemblies: Vec<i32>,
    /// Exported type definition indices, from 24 on
    pub exported_type_definitions: Vec<i32>,
    /// The registration tables
    pub registration: RegistrationSet<'a>,
}

impl<'a> MetadataSet<'a> {
    /// The name in the string heap at `index`.
    ///
    /// # Errors
    /// Returns an error if the index is outside the heap or the string is malformed.
    pub fn string(&self, index: u32) -> Result<&'a str> {
        self.strings.get(index as usize)
    }

    /// The name of image `image`, if both the image and its name exist.
    #[must_use]
    pub fn image_name(&self, image: usize) -> Option<&'a str> {
        let image = self.images.get(image)?;
        self.strings.get(image.name_index as usize).ok()
    }
}

/// Determines the version pair of a metadata blob.
///
/// The integer version comes from the header. For `24`, the two sub-revisions that changed the
/// metadata layout are told apart heuristically:
///
/// - `24.2` dropped the rgctx section pair from the header, so the string literal table, which
///   always directly follows the header, starts at offset 264 instead of 272
/// - `24.1` appended two fields to every image definition; reading the images with the 24.0
///   stride then misaligns the token field, which is `1` for every 24.0 image
///
/// Overrides in `config` always win. The registration axis follows the metadata axis unless
/// it is overridden.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a wrong sanity value, or
/// [`crate::Error::UnsupportedVersion`] if the result is outside the supported matrix.
///
/// # Examples
///
/// ```rust,no_run
/// use il2scope::{metadata::decoder::detect_version, LoadConfig, MetadataFile};
/// use std::path::Path;
///
/// let file = MetadataFile::from_file(Path::new("global-metadata.dat"))?;
/// let pair = detect_version(file.data(), &LoadConfig::default())?;
/// println!("metadata {} / registration {}", pair.metadata, pair.registration);
/// # Ok::<(), il2scope::Error>(())
/// ```
pub fn detect_version(data: &[u8], config: &LoadConfig) -> Result<VersionPair> {
    let (sanity, version) = MetadataHeader::peek(data)?;
    if sanity != crate::metadata::streams::METADATA_SANITY {
        return Err(malformed_error!("Invalid metadata sanity - 0x{:08X}", sanity));
    }

    let metadata = match config.metadata_version {
        Some(forced) => forced,
        None => {
            let major = u16::try_from(version)
                .map_err(|_| malformed_error!("Invalid metadata version - {}", version))?;

            if major == 24 {
                detect_v24_revision(data)?
            } else {
                Version::new(major, 0)
            }
        }
    };

    let registration = config.registration_version.unwrap_or(metadata);
    let pair = VersionPair::new(metadata, registration);
    pair.ensure_supported()?;

    log::debug!("detected metadata version pair {}", pair);
    Ok(pair)
}

fn detect_v24_revision(data: &[u8]) -> Result<Version> {
    // stringLiteralOffset is the third header field in every revision
    let string_literal_offset = read_le::<u32>(data.get(8..).ok_or(OutOfBounds)?)?;
    if string_literal_offset == HEADER_SIZE_V24_2 {
        return Ok(v(24, 2));
    }

    let header = MetadataHeader::read(data, VersionPair::uniform(v(24, 0)))?;
    let images: Vec<ImageDefinition> = read_table(
        data,
        SectionId::Images,
        header.section(SectionId::Images, data.len())?,
        VersionPair::uniform(v(24, 0)),
    )?;
    if images.iter().any(|image| image.token != Some(1)) {
        return Ok(v(24, 1));
    }

    Ok(v(24, 0))
}

/// Decodes the metadata blob and the registration tables for `pair`.
///
/// # Errors
/// - [`crate::Error::UnsupportedVersion`] before anything is read, for a pair outside the
///   supported matrix
/// - [`crate::Error::Malformed`] for a wrong sanity value
/// - [`crate::Error::CorruptData`] for a section outside the blob
/// - [`crate::Error::UnmappedAddress`] / [`crate::Error::OutOfBounds`] for registration tables
///   the image does not back
pub fn decode<'a>(
    metadata: &'a [u8],
    registration: RegistrationSource<'a>,
    pair: VersionPair,
) -> Result<MetadataSet<'a>> {
    pair.ensure_supported()?;

    let header = MetadataHeader::read(metadata, pair)?;
    if u32::from(pair.metadata.major) != header.version() {
        log::warn!(
            "metadata header declares version {}, decoding as {}",
            header.version(),
            pair.metadata
        );
    }

    let section = |id| header.section(id, metadata.len());
    let bytes = |id| -> Result<&'a [u8]> {
        match section(id)? {
            Some(Section { offset, size }) => Ok(&metadata[offset..offset + size]),
            None => Ok(&[]),
        }
    };
    macro_rules! table {
        ($id:ident) => {
            read_table(metadata, SectionId::$id, section(SectionId::$id)?, pair)?
        };
    }
    macro_rules! indices {
        ($id:ident) => {
            read_index_table(metadata, SectionId::$id, section(SectionId::$id)?)?
        };
    }

    let literal_table: Vec<StringLiteral> = table!(StringLiterals);
    let string_literals = StringLiterals::new(literal_table, bytes(SectionId::StringLiteralData)?);

    let set = MetadataSet {
        pair,
        strings: Strings::from(bytes(SectionId::Strings)?),
        string_literals,
        images: table!(Images),
        assemblies: table!(Assemblies),
        type_definitions: table!(TypeDefinitions),
        methods: table!(Methods),
        parameters: table!(Parameters),
        fields: table!(Fields),
        properties: table!(Properties),
        events: table!(Events),
        generic_containers: table!(GenericContainers),
        generic_parameters: table!(GenericParameters),
        generic_parameter_constraints: indices!(GenericParameterConstraints),
        nested_types: indices!(NestedTypes),
        interfaces: indices!(Interfaces),
        vtable_methods: indices!(VtableMethods),
        field_default_values: table!(FieldDefaultValues),
        parameter_default_values: table!(ParameterDefaultValues),
        default_value_data: bytes(SectionId::FieldAndParameterDefaultValueData)?,
        field_marshaled_sizes: table!(FieldMarshaledSizes),
        attribute_type_ranges: table!(AttributeTypeRanges),
        attribute_types: indices!(AttributeTypes),
        attribute_data_ranges: table!(AttributeDataRanges),
        attribute_data: bytes(SectionId::AttributeData)?,
        field_refs: table!(FieldRefs),
        referenced_assemblies: indices!(ReferencedAssemblies),
        exported_type_definitions: indices!(ExportedTypeDefinitions),
        registration: RegistrationSet::read(registration, pair)?,
        header,
    };

    log::debug!(
        "decoded metadata {}: {} images, {} types, {} methods, {} fields",
        pair,
        set.images.len(),
        set.type_definitions.len(),
        set.methods.len(),
        set.fields.len()
    );

    Ok(set)
}

/// Detects the version pair and decodes in one step.
///
/// # Errors
/// Any error of [`detect_version`] or [`decode`].
pub fn load<'a>(
    metadata: &'a [u8],
    registration: RegistrationSource<'a>,
    config: &LoadConfig,
) -> Result<MetadataSet<'a>> {
    let pair = detect_version(metadata, config)?;
    decode(metadata, registration, pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        file::PointerWidth,
        metadata::{layout::StructKind, version::v},
        test::builder::{ImageBuilder, MetadataBuilder},
        Error,
    };

    fn image(pair: VersionPair) -> crate::test::builder::BuiltImage {
        ImageBuilder::new(pair, PointerWidth::Bits64).build()
    }

    #[test]
    fn detect_plain_versions() {
        for version in [v(16, 0), v(27, 0), v(29, 0), v(31, 0)] {
            let blob = MetadataBuilder::new(VersionPair::uniform(version)).build();
            let pair = detect_version(&blob, &LoadConfig::default()).unwrap();
            assert_eq!(pair, VersionPair::uniform(version));
        }
    }

    #[test]
    fn detect_v24_revisions() {
        let pair = VersionPair::uniform(v(24, 2));
        let blob = MetadataBuilder::new(pair).build();
        assert_eq!(detect_version(&blob, &LoadConfig::default()).unwrap(), pair);

        let mut builder = MetadataBuilder::new(VersionPair::uniform(v(24, 0)));
        builder.image("Game.dll", 0, 0);
        builder.image("Core.dll", 0, 0);
        let blob = builder.build();
        assert_eq!(
            detect_version(&blob, &LoadConfig::default()).unwrap(),
            VersionPair::uniform(v(24, 0))
        );

        // Two 40 byte images read with a 32 byte stride misplace the second token
        let mut builder = MetadataBuilder::new(VersionPair::uniform(v(24, 1)));
        builder.image("Game.dll", 0, 0);
        builder.image("Core.dll", 0, 0);
        let blob = builder.build();
        assert_eq!(
            detect_version(&blob, &LoadConfig::default()).unwrap(),
            VersionPair::uniform(v(24, 1))
        );
    }

    #[test]
    fn detect_overrides() {
        let blob = MetadataBuilder::new(VersionPair::uniform(v(29, 0))).build();

        let config = LoadConfig {
            registration_version: Some(v(29, 1)),
            ..LoadConfig::default()
        };
        assert_eq!(
            detect_version(&blob, &config).unwrap(),
            VersionPair::new(v(29, 0), v(29, 1))
        );

        let config = LoadConfig::default().with_versions(v(27, 2), v(27, 2));
        assert_eq!(
            detect_version(&blob, &config).unwrap(),
            VersionPair::uniform(v(27, 2))
        );

        let config = LoadConfig::default().with_versions(v(26, 0), v(27, 2));
        assert!(matches!(
            detect_version(&blob, &config),
            Err(Error::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn detect_bad_sanity() {
        let mut blob = MetadataBuilder::new(VersionPair::uniform(v(29, 0))).build();
        blob[0] ^= 0xFF;
        assert!(matches!(
            detect_version(&blob, &LoadConfig::default()),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn decode_sections() {
        let pair = VersionPair::uniform(v(29, 0));
        let mut builder = MetadataBuilder::new(pair);
        let image_index = builder.image("Game.dll", 0, 1);
        builder.type_definition(&[("nameIndex", 0), ("namespaceIndex", 0)]);
        builder.field("x", 0);
        builder.nested_type(3);
        builder.string_literal("hello");
        let blob = builder.build();
        let native = image(pair);

        let set = decode(&blob, native.source(), pair).unwrap();
        assert_eq!(set.images.len(), 1);
        assert_eq!(set.image_name(image_index), Some("Game.dll"));
        assert_eq!(set.type_definitions.len(), 1);
        assert_eq!(set.fields.len(), 1);
        assert_eq!(set.string(set.fields[0].name_index).unwrap(), "x");
        assert_eq!(set.nested_types, vec![3]);
        assert_eq!(set.string_literals.get(0).unwrap(), "hello");
        assert!(set.attribute_type_ranges.is_empty());
        assert!(set.registration.types().is_empty());
    }

    #[test]
    fn decode_strides_by_version() {
        // Same logical rows, different on-disk sizes
        for version in [v(24, 0), v(24, 1), v(24, 2), v(27, 0), v(31, 0)] {
            let pair = VersionPair::uniform(version);
            let mut builder = MetadataBuilder::new(pair);
            for name in ["A", "B", "C"] {
                let name = builder.string(name);
                builder.type_definition(&[("nameIndex", u64::from(name))]);
            }
            let blob = builder.build();
            let native = image(pair);

            let set = decode(&blob, native.source(), pair).unwrap();
            let names: Vec<&str> = set
                .type_definitions
                .iter()
                .map(|def| set.string(def.name_index).unwrap())
                .collect();
            assert_eq!(names, ["A", "B", "C"], "{version}");
        }
    }

    #[test]
    fn decode_rejects_unsupported_first() {
        // Nothing is read: an empty blob would otherwise fail with OutOfBounds
        let native = image(VersionPair::uniform(v(29, 0)));
        assert!(matches!(
            decode(&[], native.source(), VersionPair::new(v(28, 0), v(29, 0))),
            Err(Error::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn decode_corrupt_section() {
        let pair = VersionPair::uniform(v(27, 0));
        let mut builder = MetadataBuilder::new(pair);
        builder.field("x", 0);
        let mut blob = builder.build();

        let (_, offset_field, _) = SectionId::Fields.fields();
        let offset = crate::metadata::layout::compute_layout(StructKind::MetadataHeader, pair)
            .unwrap()
            .iter()
            .position(|field| field.name == offset_field)
            .unwrap()
            * 4;
        blob[offset..offset + 4].copy_from_slice(&0x00FF_0000u32.to_le_bytes());

        let native = image(pair);
        assert!(matches!(
            decode(&blob, native.source(), pair),
            Err(Error::CorruptData {
                section: "fields",
                offset: 0x00FF_0000
            })
        ));
    }
}
