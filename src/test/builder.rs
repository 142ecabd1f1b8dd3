//! Builders for crafted metadata blobs and registration images.
//!
//! Rows are encoded through the layout tables, so a builder for version `24.1` produces exactly
//! the bytes a `24.1` decoder expects. Values are given by field name; fields the active layout
//! lacks are ignored, fields the caller leaves out are zero (or `-1` where a builder method
//! documents it).

use std::collections::HashMap;

use strum::IntoEnumIterator;

use crate::{
    file::{Endianness, FlatImage, PointerWidth},
    metadata::{
        layout::{StructKind, StructLayout},
        registration::RegistrationSource,
        streams::{SectionId, METADATA_SANITY},
        version::VersionPair,
    },
};

/// `-1` as stored in a 32-bit index field
pub const NONE: u64 = 0xFFFF_FFFF;

/// Virtual address the first byte of a built image is mapped at
pub const IMAGE_BASE: u64 = 0x1000_0000;

/// Packs a type descriptor word from a kind tag and attribute flags
pub fn bits(kind: u8, attrs: u16) -> u32 {
    (u32::from(kind) << 16) | u32::from(attrs)
}

/// Encodes one record of `kind`, taking every value from `values` by field name.
///
/// Later entries override earlier ones, so callers can prepend defaults.
pub fn encode(
    kind: StructKind,
    pair: VersionPair,
    width: PointerWidth,
    values: &[(&str, u64)],
) -> Vec<u8> {
    let layout = StructLayout::of(kind).resolve(pair, width).unwrap();
    let mut bytes = Vec::with_capacity(layout.size());
    for field in layout.fields() {
        let value = values
            .iter()
            .rev()
            .find(|(name, _)| *name == field.name)
            .map_or(0, |(_, value)| *value);
        let size = field.width.bytes(width);
        bytes.extend_from_slice(&value.to_le_bytes()[..size]);
    }
    bytes
}

/// Builds a `global-metadata.dat` blob section by section.
pub struct MetadataBuilder {
    pair: VersionPair,
    strings: Vec<u8>,
    literal_data: Vec<u8>,
    sections: HashMap<SectionId, Vec<u8>>,
    rows: HashMap<SectionId, usize>,
}

impl MetadataBuilder {
    pub fn new(pair: VersionPair) -> Self {
        MetadataBuilder {
            pair,
            // Offset 0 is the empty string
            strings: vec![0],
            literal_data: Vec::new(),
            sections: HashMap::new(),
            rows: HashMap::new(),
        }
    }

    /// Appends `value` to the string heap and returns its index
    pub fn string(&mut self, value: &str) -> u32 {
        let index = u32::try_from(self.strings.len()).unwrap();
        self.strings.extend_from_slice(value.as_bytes());
        self.strings.push(0);
        index
    }

    /// Appends a row of `kind` to section `id` and returns the row index
    pub fn row(&mut self, id: SectionId, kind: StructKind, values: &[(&str, u64)]) -> usize {
        let bytes = encode(kind, self.pair, PointerWidth::Bits32, values);
        self.sections.entry(id).or_default().extend_from_slice(&bytes);
        let rows = self.rows.entry(id).or_default();
        *rows += 1;
        *rows - 1
    }

    /// Appends a 32-bit index to section `id` and returns its position
    pub fn index(&mut self, id: SectionId, value: i32) -> usize {
        self.sections
            .entry(id)
            .or_default()
            .extend_from_slice(&value.to_le_bytes());
        let rows = self.rows.entry(id).or_default();
        *rows += 1;
        *rows - 1
    }

    /// Number of rows appended to `id` so far
    pub fn count(&self, id: SectionId) -> usize {
        self.rows.get(&id).copied().unwrap_or(0)
    }

    pub fn image(&mut self, name: &str, type_start: usize, type_count: usize) -> usize {
        let name = self.string(name);
        let assembly = self.count(SectionId::Assemblies) as u64;
        let image = self.row(
            SectionId::Images,
            StructKind::ImageDefinition,
            &[
                ("nameIndex", u64::from(name)),
                ("assemblyIndex", assembly),
                ("typeStart", type_start as u64),
                ("typeCount", type_count as u64),
                ("entryPointIndex", NONE),
                ("token", 1),
            ],
        );
        self.row(
            SectionId::Assemblies,
            StructKind::AssemblyDefinition,
            &[
                ("imageIndex", image as u64),
                ("customAttributeIndex", NONE),
                ("nameIndex", u64::from(name)),
                ("major", 1),
            ],
        );
        image
    }

    /// Appends a type definition. Index fields default to `-1`, member ranges to empty.
    pub fn type_definition(&mut self, values: &[(&str, u64)]) -> usize {
        let token = 0x0200_0001 + self.count(SectionId::TypeDefinitions) as u64;
        let mut all = vec![
            ("customAttributeIndex", NONE),
            ("byvalTypeIndex", NONE),
            ("byrefTypeIndex", NONE),
            ("declaringTypeIndex", NONE),
            ("parentIndex", NONE),
            ("elementTypeIndex", NONE),
            ("rgctxStartIndex", NONE),
            ("genericContainerIndex", NONE),
            ("delegateWrapperFromManagedToNativeIndex", NONE),
            ("marshalingFunctionsIndex", NONE),
            ("ccwFunctionIndex", NONE),
            ("guidIndex", NONE),
            ("eventStart", NONE),
            ("propertyStart", NONE),
            ("token", token),
        ];
        all.extend_from_slice(values);
        self.row(SectionId::TypeDefinitions, StructKind::TypeDefinition, &all)
    }

    pub fn field(&mut self, name: &str, type_index: usize) -> usize {
        let name = self.string(name);
        let token = 0x0400_0001 + self.count(SectionId::Fields) as u64;
        self.row(
            SectionId::Fields,
            StructKind::FieldDefinition,
            &[
                ("nameIndex", u64::from(name)),
                ("typeIndex", type_index as u64),
                ("customAttributeIndex", NONE),
                ("token", token),
            ],
        )
    }

    /// Appends a method. Index fields default to `-1`.
    pub fn method(&mut self, name: &str, values: &[(&str, u64)]) -> usize {
        let name = self.string(name);
        let token = 0x0600_0001 + self.count(SectionId::Methods) as u64;
        let mut all = vec![
            ("nameIndex", u64::from(name)),
            ("declaringType", NONE),
            ("returnType", NONE),
            ("parameterStart", NONE),
            ("customAttributeIndex", NONE),
            ("genericContainerIndex", NONE),
            ("methodIndex", NONE),
            ("invokerIndex", NONE),
            ("delegateWrapperIndex", NONE),
            ("rgctxStartIndex", NONE),
            ("token", token),
        ];
        all.extend_from_slice(values);
        self.row(SectionId::Methods, StructKind::MethodDefinition, &all)
    }

    pub fn parameter(&mut self, name: &str, type_index: usize) -> usize {
        let name = self.string(name);
        let token = 0x0800_0001 + self.count(SectionId::Parameters) as u64;
        self.row(
            SectionId::Parameters,
            StructKind::ParameterDefinition,
            &[
                ("nameIndex", u64::from(name)),
                ("token", token),
                ("customAttributeIndex", NONE),
                ("typeIndex", type_index as u64),
            ],
        )
    }

    pub fn generic_container(
        &mut self,
        owner: usize,
        argc: usize,
        is_method: bool,
        parameter_start: usize,
    ) -> usize {
        self.row(
            SectionId::GenericContainers,
            StructKind::GenericContainer,
            &[
                ("ownerIndex", owner as u64),
                ("typeArgc", argc as u64),
                ("isMethod", u64::from(is_method)),
                ("genericParameterStart", parameter_start as u64),
            ],
        )
    }

    pub fn generic_parameter(&mut self, owner: usize, name: &str, num: u16) -> usize {
        let name = self.string(name);
        self.row(
            SectionId::GenericParameters,
            StructKind::GenericParameter,
            &[
                ("ownerIndex", owner as u64),
                ("nameIndex", u64::from(name)),
                ("num", u64::from(num)),
            ],
        )
    }

    pub fn nested_type(&mut self, type_index: i32) -> usize {
        self.index(SectionId::NestedTypes, type_index)
    }

    pub fn string_literal(&mut self, value: &str) -> usize {
        let data_index = self.literal_data.len() as u64;
        self.literal_data.extend_from_slice(value.as_bytes());
        self.row(
            SectionId::StringLiterals,
            StructKind::StringLiteral,
            &[("length", value.len() as u64), ("dataIndex", data_index)],
        )
    }

    /// Lays out the header followed by every section the version declares, in header order.
    pub fn build(mut self) -> Vec<u8> {
        let header_fields =
            crate::metadata::layout::compute_layout(StructKind::MetadataHeader, self.pair).unwrap();
        let header_size: usize = header_fields.iter().map(|field| field.width.bytes(PointerWidth::Bits32)).sum();

        self.sections.insert(SectionId::Strings, std::mem::take(&mut self.strings));
        self.sections
            .insert(SectionId::StringLiteralData, std::mem::take(&mut self.literal_data));

        let mut values: Vec<(&str, u64)> = vec![
            ("sanity", u64::from(METADATA_SANITY)),
            ("version", u64::from(self.pair.metadata.major)),
        ];
        let mut body = Vec::new();
        for id in SectionId::iter() {
            let (_, offset_field, size_field) = id.fields();
            if !header_fields.iter().any(|field| field.name == offset_field) {
                continue;
            }

            let data = self.sections.remove(&id).unwrap_or_default();
            values.push((offset_field, (header_size + body.len()) as u64));
            values.push((size_field, data.len() as u64));
            body.extend_from_slice(&data);
            while body.len() % 4 != 0 {
                body.push(0);
            }
        }

        let mut blob = encode(
            StructKind::MetadataHeader,
            self.pair,
            PointerWidth::Bits32,
            &values,
        );
        blob.extend_from_slice(&body);
        blob
    }
}

/// Builds a native image holding registration tables.
pub struct ImageBuilder {
    pair: VersionPair,
    width: PointerWidth,
    data: Vec<u8>,
    types: Vec<u64>,
    generic_classes: Vec<u64>,
    generic_insts: Vec<u64>,
    method_specs: Vec<(i32, i32, i32)>,
    modules: Vec<u64>,
    method_pointers: Vec<u64>,
}

/// A built image with the addresses of its registration roots.
pub struct BuiltImage {
    pub image: FlatImage,
    pub code_registration: u64,
    pub metadata_registration: u64,
}

impl BuiltImage {
    pub fn source(&self) -> RegistrationSource<'_> {
        RegistrationSource {
            adapter: &self.image,
            code_registration: self.code_registration,
            metadata_registration: self.metadata_registration,
        }
    }
}

impl ImageBuilder {
    pub fn new(pair: VersionPair, width: PointerWidth) -> Self {
        ImageBuilder {
            pair,
            width,
            // Keep address 0 (null) out of the mapped range
            data: vec![0; 16],
            types: Vec::new(),
            generic_classes: Vec::new(),
            generic_insts: Vec::new(),
            method_specs: Vec::new(),
            modules: Vec::new(),
            method_pointers: Vec::new(),
        }
    }

    fn alloc(&mut self, bytes: &[u8]) -> u64 {
        while self.data.len() % self.width.bytes() != 0 {
            self.data.push(0);
        }
        let va = IMAGE_BASE + self.data.len() as u64;
        self.data.extend_from_slice(bytes);
        va
    }

    /// Writes one record of `kind` and returns its address
    pub fn record(&mut self, kind: StructKind, values: &[(&str, u64)]) -> u64 {
        let bytes = encode(kind, self.pair, self.width, values);
        self.alloc(&bytes)
    }

    pub fn pointer_array(&mut self, pointers: &[u64]) -> u64 {
        let size = self.width.bytes();
        let bytes: Vec<u8> = pointers
            .iter()
            .flat_map(|pointer| pointer.to_le_bytes()[..size].to_vec())
            .collect();
        self.alloc(&bytes)
    }

    pub fn c_string(&mut self, value: &str) -> u64 {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.alloc(&bytes)
    }

    /// Writes a type descriptor which is not part of the `types` table
    pub fn type_descriptor(&mut self, bits: u32, datapoint: u64) -> u64 {
        self.record(
            StructKind::TypeDescriptor,
            &[("datapoint", datapoint), ("bits", u64::from(bits))],
        )
    }

    /// Writes a type descriptor and appends it to the `types` table, returning its index
    pub fn add_type(&mut self, bits: u32, datapoint: u64) -> usize {
        let va = self.type_descriptor(bits, datapoint);
        self.types.push(va);
        self.types.len() - 1
    }

    /// Address of the `types` table entry `index`
    pub fn type_address(&self, index: usize) -> u64 {
        self.types[index]
    }

    /// Writes a generic instantiation and appends it to the `genericInsts` table
    pub fn generic_inst(&mut self, arguments: &[u64]) -> u64 {
        let argv = self.pointer_array(arguments);
        let va = self.record(
            StructKind::GenericInst,
            &[("typeArgc", arguments.len() as u64), ("typeArgv", argv)],
        );
        self.generic_insts.push(va);
        va
    }

    /// Writes a generic class and appends it to the `genericClasses` table.
    ///
    /// `definition` is a type definition index up to 24.5 and a descriptor address after.
    pub fn generic_class(&mut self, definition: u64, class_inst: u64, method_inst: u64) -> u64 {
        let va = self.record(
            StructKind::GenericClass,
            &[
                ("typeDefinitionIndex", definition),
                ("type", definition),
                ("classInst", class_inst),
                ("methodInst", method_inst),
            ],
        );
        self.generic_classes.push(va);
        va
    }

    pub fn array_type(&mut self, element: u64, rank: u8) -> u64 {
        self.record(
            StructKind::ArrayType,
            &[("etype", element), ("rank", u64::from(rank))],
        )
    }

    pub fn method_spec(&mut self, method: i32, class_inst: i32, method_inst: i32) -> usize {
        self.method_specs.push((method, class_inst, method_inst));
        self.method_specs.len() - 1
    }

    /// Adds a code-gen module (24.2 and later)
    pub fn code_gen_module(&mut self, name: &str, pointers: &[u64]) {
        let name = self.c_string(name);
        let table = self.pointer_array(pointers);
        let va = self.record(
            StructKind::CodeGenModule,
            &[
                ("moduleName", name),
                ("methodPointerCount", pointers.len() as u64),
                ("methodPointers", table),
            ],
        );
        self.modules.push(va);
    }

    /// Sets the global method pointer table (up to 24.1)
    pub fn method_pointers(&mut self, pointers: &[u64]) {
        self.method_pointers = pointers.to_vec();
    }

    pub fn build(mut self) -> BuiltImage {
        let types = std::mem::take(&mut self.types);
        let classes = std::mem::take(&mut self.generic_classes);
        let insts = std::mem::take(&mut self.generic_insts);
        let modules = std::mem::take(&mut self.modules);
        let method_pointers = std::mem::take(&mut self.method_pointers);

        let types_table = self.pointer_array(&types);
        let classes_table = self.pointer_array(&classes);
        let insts_table = self.pointer_array(&insts);
        let modules_table = self.pointer_array(&modules);
        let pointers_table = self.pointer_array(&method_pointers);

        let mut specs = Vec::new();
        for &(method, class_inst, method_inst) in &self.method_specs {
            specs.extend(encode(
                StructKind::MethodSpec,
                self.pair,
                self.width,
                &[
                    ("methodDefinitionIndex", u64::from(method as u32)),
                    ("classIndexIndex", u64::from(class_inst as u32)),
                    ("methodIndexIndex", u64::from(method_inst as u32)),
                ],
            ));
        }
        let specs_table = self.alloc(&specs);

        let code_registration = self.record(
            StructKind::CodeRegistration,
            &[
                ("methodPointersCount", method_pointers.len() as u64),
                ("methodPointers", pointers_table),
                ("codeGenModulesCount", modules.len() as u64),
                ("codeGenModules", modules_table),
            ],
        );
        let metadata_registration = self.record(
            StructKind::MetadataRegistration,
            &[
                ("genericClassesCount", classes.len() as u64),
                ("genericClasses", classes_table),
                ("genericInstsCount", insts.len() as u64),
                ("genericInsts", insts_table),
                ("typesCount", types.len() as u64),
                ("types", types_table),
                ("methodSpecsCount", self.method_specs.len() as u64),
                ("methodSpecs", specs_table),
            ],
        );

        let size = self.data.len();
        BuiltImage {
            image: FlatImage::from_mem(self.data, self.width, Endianness::Little)
                .with_segment(IMAGE_BASE, 0, size),
            code_registration,
            metadata_registration,
        }
    }
}
