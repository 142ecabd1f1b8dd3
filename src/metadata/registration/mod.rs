//! The native registration tables.
//!
//! IL2CPP emits two root structures into the compiled image: the code registration (method,
//! invoker and generic method pointers, code-gen modules) and the metadata registration (type
//! descriptors, generic classes and instantiations, method specs). Both are pointer-linked, so
//! everything here is read through an [`crate::file::AddressSpace`].
//!
//! [`RegistrationSet`] reads the flat tables eagerly and keeps cached layouts for the
//! structures the resolver follows by address (`Il2CppGenericClass`, `Il2CppGenericInst`,
//! `Il2CppArrayType` and descriptors which are not part of the `types` table).

mod modules;
mod types;

pub use modules::CodeGenModule;
pub use types::{
    ArrayType, GenericClass, GenericClassDefinition, GenericInst, GenericMethodFunctions,
    MethodSpec,
};

use std::collections::HashMap;

use crate::{
    file::AddressSpace,
    metadata::{
        layout::{Record, ResolvedLayout, StructKind, StructLayout},
        tables::MethodDefinition,
        typedesc::{decode_type_descriptor, RawTypeDescriptor},
        version::{v, VersionPair},
    },
    Result,
};

/// Where the registration tables live inside a native image.
///
/// Locating the two root structures requires scanning machine code and is left to the caller;
/// the addresses are plain virtual addresses inside `adapter`.
#[derive(Clone, Copy)]
pub struct RegistrationSource<'a> {
    /// The native image
    pub adapter: &'a dyn AddressSpace,
    /// Virtual address of `Il2CppCodeRegistration`
    pub code_registration: u64,
    /// Virtual address of `Il2CppMetadataRegistration`
    pub metadata_registration: u64,
}

/// A counted array in the native image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeArray {
    /// Number of elements
    pub count: usize,
    /// Virtual address of the first element
    pub address: u64,
}

impl NativeArray {
    fn from_record(record: &Record, count: &'static str, address: &'static str) -> Result<Self> {
        Ok(NativeArray {
            count: record.get_usize(count)?,
            address: record.get(address)?,
        })
    }

    fn from_record_opt(
        record: &Record,
        count: &'static str,
        address: &'static str,
    ) -> Result<Option<Self>> {
        if record.contains(count) {
            Ok(Some(Self::from_record(record, count, address)?))
        } else {
            Ok(None)
        }
    }
}

/// `Il2CppCodeRegistration`, reduced to the tables this crate follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRegistration {
    /// Global method pointer table, up to 24.1
    pub method_pointers: Option<NativeArray>,
    /// Pointers of instantiated generic methods
    pub generic_method_pointers: NativeArray,
    /// Invoker pointers
    pub invoker_pointers: NativeArray,
    /// Per-module code tables, from 24.2 on
    pub code_gen_modules: Option<NativeArray>,
}

impl CodeRegistration {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(CodeRegistration {
            method_pointers: NativeArray::from_record_opt(
                record,
                "methodPointersCount",
                "methodPointers",
            )?,
            generic_method_pointers: NativeArray::from_record(
                record,
                "genericMethodPointersCount",
                "genericMethodPointers",
            )?,
            invoker_pointers: NativeArray::from_record(
                record,
                "invokerPointersCount",
                "invokerPointers",
            )?,
            code_gen_modules: NativeArray::from_record_opt(
                record,
                "codeGenModulesCount",
                "codeGenModules",
            )?,
        })
    }
}

/// `Il2CppMetadataRegistration`, reduced to the tables this crate follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRegistration {
    /// Pointers to `Il2CppGenericClass`
    pub generic_classes: NativeArray,
    /// Pointers to `Il2CppGenericInst`
    pub generic_insts: NativeArray,
    /// Inline array of `Il2CppGenericMethodFunctionsDefinitions`
    pub generic_method_table: NativeArray,
    /// Pointers to `Il2CppType`
    pub types: NativeArray,
    /// Inline array of `Il2CppMethodSpec`
    pub method_specs: NativeArray,
    /// Per type pointers to field offset arrays
    pub field_offsets: NativeArray,
    /// Per type pointers to size records
    pub type_definitions_sizes: NativeArray,
    /// Metadata usage table, from 19 on
    pub metadata_usages: Option<NativeArray>,
}

impl MetadataRegistration {
    fn from_record(record: &Record) -> Result<Self> {
        Ok(MetadataRegistration {
            generic_classes: NativeArray::from_record(
                record,
                "genericClassesCount",
                "genericClasses",
            )?,
            generic_insts: NativeArray::from_record(record, "genericInstsCount", "genericInsts")?,
            generic_method_table: NativeArray::from_record(
                record,
                "genericMethodTableCount",
                "genericMethodTable",
            )?,
            types: NativeArray::from_record(record, "typesCount", "types")?,
            method_specs: NativeArray::from_record(record, "methodSpecsCount", "methodSpecs")?,
            field_offsets: NativeArray::from_record(record, "fieldOffsetsCount", "fieldOffsets")?,
            type_definitions_sizes: NativeArray::from_record(
                record,
                "typeDefinitionsSizesCount",
                "typeDefinitionsSizes",
            )?,
            metadata_usages: NativeArray::from_record_opt(
                record,
                "metadataUsagesCount",
                "metadataUsages",
            )?,
        })
    }
}

/// The decoded registration tables.
pub struct RegistrationSet<'a> {
    adapter: &'a dyn AddressSpace,
    pair: VersionPair,
    code_registration: CodeRegistration,
    metadata_registration: MetadataRegistration,
    types: Vec<RawTypeDescriptor>,
    type_addresses: Vec<u64>,
    type_lookup: HashMap<u64, usize>,
    generic_classes: Vec<u64>,
    generic_insts: Vec<GenericInst>,
    method_specs: Vec<MethodSpec>,
    generic_method_table: Vec<GenericMethodFunctions>,
    code_gen_modules: Vec<CodeGenModule>,
    method_pointers: Vec<u64>,
    descriptor_layout: ResolvedLayout,
    generic_class_layout: ResolvedLayout,
    generic_inst_layout: ResolvedLayout,
    array_type_layout: ResolvedLayout,
}

impl<'a> RegistrationSet<'a> {
    /// Reads both registration roots and every flat table they point to.
    ///
    /// # Errors
    /// - [`crate::Error::UnsupportedVersion`] for a pair outside the supported matrix
    /// - [`crate::Error::UnmappedAddress`] / [`crate::Error::OutOfBounds`] for a table which
    ///   is not backed by the image
    /// - [`crate::Error::Malformed`] for a descriptor with an unknown kind
    pub fn read(source: RegistrationSource<'a>, pair: VersionPair) -> Result<Self> {
        let adapter = source.adapter;
        let width = adapter.pointer_width();
        let layout = |kind| StructLayout::of(kind).resolve(pair, width);

        let (record, _) = layout(StructKind::CodeRegistration)?
            .read_from(adapter, adapter.va_to_offset(source.code_registration)?)?;
        let code_registration = CodeRegistration::from_record(&record)?;

        let (record, _) = layout(StructKind::MetadataRegistration)?
            .read_from(adapter, adapter.va_to_offset(source.metadata_registration)?)?;
        let metadata_registration = MetadataRegistration::from_record(&record)?;

        let descriptor_layout = layout(StructKind::TypeDescriptor)?;
        let generic_class_layout = layout(StructKind::GenericClass)?;
        let generic_inst_layout = layout(StructKind::GenericInst)?;
        let array_type_layout = layout(StructKind::ArrayType)?;

        let types_table = metadata_registration.types;
        let type_addresses = adapter.read_pointer_array(types_table.address, types_table.count)?;
        let types = type_addresses
            .iter()
            .map(|&va| read_descriptor(adapter, &descriptor_layout, va))
            .collect::<Result<Vec<_>>>()?;

        // Several table entries may share one descriptor; the first index wins
        let mut type_lookup = HashMap::with_capacity(type_addresses.len());
        for (index, &va) in type_addresses.iter().enumerate() {
            type_lookup.entry(va).or_insert(index);
        }

        let classes = metadata_registration.generic_classes;
        let generic_classes = adapter.read_pointer_array(classes.address, classes.count)?;

        let insts = metadata_registration.generic_insts;
        let generic_insts = adapter
            .read_pointer_array(insts.address, insts.count)?
            .into_iter()
            .map(|va| read_generic_inst(adapter, &generic_inst_layout, va))
            .collect::<Result<Vec<_>>>()?;

        let method_specs = read_inline_array(
            adapter,
            &layout(StructKind::MethodSpec)?,
            metadata_registration.method_specs,
        )?
        .iter()
        .map(MethodSpec::from_record)
        .collect::<Result<Vec<_>>>()?;

        let generic_method_table = read_inline_array(
            adapter,
            &layout(StructKind::GenericMethodFunctions)?,
            metadata_registration.generic_method_table,
        )?
        .iter()
        .map(GenericMethodFunctions::from_record)
        .collect::<Result<Vec<_>>>()?;

        let code_gen_modules = match code_registration.code_gen_modules {
            Some(modules) => {
                let module_layout = layout(StructKind::CodeGenModule)?;
                adapter
                    .read_pointer_array(modules.address, modules.count)?
                    .into_iter()
                    .map(|va| CodeGenModule::read(adapter, &module_layout, va))
                    .collect::<Result<Vec<_>>>()?
            }
            None => Vec::new(),
        };

        let method_pointers = match code_registration.method_pointers {
            Some(pointers) => adapter.read_pointer_array(pointers.address, pointers.count)?,
            None => Vec::new(),
        };

        log::debug!(
            "registration {}: {} types, {} generic classes, {} generic insts, {} method specs, {} modules",
            pair.registration,
            types.len(),
            generic_classes.len(),
            generic_insts.len(),
            method_specs.len(),
            code_gen_modules.len()
        );

        Ok(RegistrationSet {
            adapter,
            pair,
            code_registration,
            metadata_registration,
            types,
            type_addresses,
            type_lookup,
            generic_classes,
            generic_insts,
            method_specs,
            generic_method_table,
            code_gen_modules,
            method_pointers,
            descriptor_layout,
            generic_class_layout,
            generic_inst_layout,
            array_type_layout,
        })
    }

    /// The native image the tables were read from
    #[must_use]
    pub fn adapter(&self) -> &'a dyn AddressSpace {
        self.adapter
    }

    /// The version pair the tables were read with
    #[must_use]
    pub fn version(&self) -> VersionPair {
        self.pair
    }

    /// The code registration root
    #[must_use]
    pub fn code_registration(&self) -> &CodeRegistration {
        &self.code_registration
    }

    /// The metadata registration root
    #[must_use]
    pub fn metadata_registration(&self) -> &MetadataRegistration {
        &self.metadata_registration
    }

    /// The `types` table, decoded
    #[must_use]
    pub fn types(&self) -> &[RawTypeDescriptor] {
        &self.types
    }

    /// Addresses of the `types` table entries
    #[must_use]
    pub fn type_addresses(&self) -> &[u64] {
        &self.type_addresses
    }

    /// Addresses of every `Il2CppGenericClass`
    #[must_use]
    pub fn generic_classes(&self) -> &[u64] {
        &self.generic_classes
    }

    /// The generic instantiation table
    #[must_use]
    pub fn generic_insts(&self) -> &[GenericInst] {
        &self.generic_insts
    }

    /// The method spec table
    #[must_use]
    pub fn method_specs(&self) -> &[MethodSpec] {
        &self.method_specs
    }

    /// The generic method table
    #[must_use]
    pub fn generic_method_table(&self) -> &[GenericMethodFunctions] {
        &self.generic_method_table
    }

    /// The code-gen modules, empty before 24.2
    #[must_use]
    pub fn code_gen_modules(&self) -> &[CodeGenModule] {
        &self.code_gen_modules
    }

    /// Index of the descriptor at `va` in the `types` table
    #[must_use]
    pub fn type_index_of(&self, va: u64) -> Option<usize> {
        self.type_lookup.get(&va).copied()
    }

    /// The descriptor at `va`, from the `types` table if it is part of it.
    ///
    /// # Errors
    /// Returns an error if `va` is unmapped or the descriptor kind is unknown.
    pub fn type_at(&self, va: u64) -> Result<RawTypeDescriptor> {
        match self.type_index_of(va) {
            Some(index) => Ok(self.types[index]),
            None => read_descriptor(self.adapter, &self.descriptor_layout, va),
        }
    }

    /// The `Il2CppGenericClass` at `va`.
    ///
    /// # Errors
    /// Returns an error if `va` is unmapped, or
    /// [`crate::Error::UnresolvedTypeReference`] if the definition index is negative.
    pub fn generic_class_at(&self, va: u64) -> Result<GenericClass> {
        let (record, _) = self
            .generic_class_layout
            .read_from(self.adapter, self.adapter.va_to_offset(va)?)?;
        GenericClass::from_record(&record)
    }

    /// The `Il2CppGenericInst` at `va`.
    ///
    /// # Errors
    /// Returns an error if `va` is unmapped.
    pub fn generic_inst_at(&self, va: u64) -> Result<GenericInst> {
        read_generic_inst(self.adapter, &self.generic_inst_layout, va)
    }

    /// The `Il2CppArrayType` at `va`.
    ///
    /// # Errors
    /// Returns an error if `va` is unmapped.
    pub fn array_type_at(&self, va: u64) -> Result<ArrayType> {
        let (record, _) = self
            .array_type_layout
            .read_from(self.adapter, self.adapter.va_to_offset(va)?)?;
        ArrayType::from_record(&record)
    }

    /// The code-gen module of the image named `name`
    #[must_use]
    pub fn code_gen_module(&self, name: &str) -> Option<&CodeGenModule> {
        self.code_gen_modules.iter().find(|module| module.name == name)
    }

    /// Native address of `method`, declared in the image named `image_name`.
    ///
    /// Up to 24.1 the global method pointer table is indexed by the method's `methodIndex`;
    /// later versions look the token up in the image's code-gen module.
    #[must_use]
    pub fn method_address(&self, image_name: &str, method: &MethodDefinition) -> Option<u64> {
        let address = if self.pair.registration <= v(24, 1) {
            let index = usize::try_from(method.method_index?).ok()?;
            *self.method_pointers.get(index)?
        } else {
            self.code_gen_module(image_name)?.method_address(method.token)?
        };

        (address != 0).then_some(address)
    }
}

fn read_descriptor(
    adapter: &dyn AddressSpace,
    layout: &ResolvedLayout,
    va: u64,
) -> Result<RawTypeDescriptor> {
    let (record, _) = layout.read_from(adapter, adapter.va_to_offset(va)?)?;
    decode_type_descriptor(record.get_u32("bits")?, record.get("datapoint")?)
}

fn read_generic_inst(
    adapter: &dyn AddressSpace,
    layout: &ResolvedLayout,
    va: u64,
) -> Result<GenericInst> {
    let (record, _) = layout.read_from(adapter, adapter.va_to_offset(va)?)?;
    GenericInst::from_record(&record)
}

fn read_inline_array(
    adapter: &dyn AddressSpace,
    layout: &ResolvedLayout,
    array: NativeArray,
) -> Result<Vec<Record>> {
    if array.count == 0 {
        return Ok(Vec::new());
    }

    let offset = adapter.va_to_offset(array.address)?;
    let Some(total) = array.count.checked_mul(layout.size()) else {
        return Err(out_of_bounds_error!());
    };
    let bytes = adapter.read_bytes(offset, total)?;
    layout.read_array(bytes, 0, array.count, adapter.endianness())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        file::{Endianness, FlatImage, PointerWidth},
        metadata::typedesc::{TypeKind, TypePayload, ELEMENT_TYPE},
        test::builder::{bits, ImageBuilder, NONE},
        Error,
    };

    #[test]
    fn read_types_and_generics_v29() {
        let pair = VersionPair::uniform(v(29, 0));
        let mut image = ImageBuilder::new(pair, PointerWidth::Bits64);
        let int = image.add_type(bits(ELEMENT_TYPE::I4, 0), 0);
        let class = image.add_type(bits(ELEMENT_TYPE::CLASS, 0), 3);
        let (int_va, class_va) = (image.type_address(int), image.type_address(class));
        let inst = image.generic_inst(&[int_va]);
        let generic = image.generic_class(class_va, inst, 0);
        let list = image.add_type(bits(ELEMENT_TYPE::GENERICINST, 0), generic);
        let list_va = image.type_address(list);
        let built = image.build();

        let registration = RegistrationSet::read(built.source(), pair).unwrap();
        assert_eq!(registration.types().len(), 3);
        assert_eq!(registration.types()[0].kind, TypeKind::I4);
        assert_eq!(registration.types()[1].payload, TypePayload::ClassIndex(3));
        assert_eq!(
            registration.types()[2].payload,
            TypePayload::GenericClass(generic)
        );
        assert_eq!(registration.type_index_of(list_va), Some(2));
        assert_eq!(registration.generic_classes(), &[generic]);

        let class = registration.generic_class_at(generic).unwrap();
        assert_eq!(class.definition, GenericClassDefinition::Type(class_va));
        assert_eq!(class.class_inst, inst);
        assert_eq!(class.method_inst, 0);

        assert_eq!(registration.generic_insts().len(), 1);
        let args = registration.generic_insts()[0]
            .arguments(registration.adapter())
            .unwrap();
        assert_eq!(args, vec![int_va]);
        assert!(registration.code_gen_modules().is_empty());
    }

    #[test]
    fn generic_class_by_index_v24() {
        let pair = VersionPair::uniform(v(24, 0));
        let mut image = ImageBuilder::new(pair, PointerWidth::Bits32);
        let int = image.add_type(bits(ELEMENT_TYPE::I4, 0), 0);
        let int_va = image.type_address(int);
        let inst = image.generic_inst(&[int_va]);
        let generic = image.generic_class(7, inst, 0);
        let bad = image.generic_class(NONE, inst, 0);
        let built = image.build();

        let registration = RegistrationSet::read(built.source(), pair).unwrap();
        assert_eq!(
            registration.generic_class_at(generic).unwrap().definition,
            GenericClassDefinition::TypeDefinitionIndex(7)
        );
        assert!(matches!(
            registration.generic_class_at(bad),
            Err(Error::UnresolvedTypeReference { .. })
        ));
    }

    #[test]
    fn descriptor_outside_types_table() {
        let pair = VersionPair::uniform(v(24, 0));
        let mut image = ImageBuilder::new(pair, PointerWidth::Bits32);
        let string = image.type_descriptor(bits(ELEMENT_TYPE::STRING, 0), 0);
        let array = image.array_type(string, 2);
        let built = image.build();

        let registration = RegistrationSet::read(built.source(), pair).unwrap();
        assert!(registration.types().is_empty());
        assert_eq!(registration.type_index_of(string), None);
        assert_eq!(registration.type_at(string).unwrap().kind, TypeKind::String);
        assert!(matches!(
            registration.type_at(0xDEAD_0000),
            Err(Error::UnmappedAddress(0xDEAD_0000))
        ));

        let shape = registration.array_type_at(array).unwrap();
        assert_eq!(shape.etype, string);
        assert_eq!(shape.rank, 2);
    }

    #[test]
    fn unmapped_root() {
        let adapter = FlatImage::from_mem(vec![0; 16], PointerWidth::Bits64, Endianness::Little);
        let source = RegistrationSource {
            adapter: &adapter,
            code_registration: 0x1000,
            metadata_registration: 0x2000,
        };
        assert!(matches!(
            RegistrationSet::read(source, VersionPair::uniform(v(27, 0))),
            Err(Error::UnmappedAddress(0x1000))
        ));
    }

    #[test]
    fn inline_method_specs() {
        let pair = VersionPair::uniform(v(27, 1));
        let mut image = ImageBuilder::new(pair, PointerWidth::Bits64);
        image.method_spec(4, 0, -1);
        image.method_spec(5, -1, 0);
        let built = image.build();

        let registration = RegistrationSet::read(built.source(), pair).unwrap();
        assert_eq!(
            registration.method_specs(),
            &[
                MethodSpec {
                    method_definition_index: 4,
                    class_index_index: 0,
                    method_index_index: -1
                },
                MethodSpec {
                    method_definition_index: 5,
                    class_index_index: -1,
                    method_index_index: 0
                }
            ]
        );
    }

    #[test]
    fn method_addresses_by_version() {
        let method = |method_index: Option<u32>, token: u32| MethodDefinition {
            name_index: 0,
            declaring_type: None,
            return_type: None,
            return_parameter_token: None,
            parameter_start: 0,
            generic_container_index: None,
            method_index,
            invoker_index: None,
            token,
            flags: 0,
            iflags: 0,
            slot: 0,
            parameter_count: 0,
        };

        let pair = VersionPair::uniform(v(24, 1));
        let mut image = ImageBuilder::new(pair, PointerWidth::Bits64);
        image.method_pointers(&[0x7000, 0x7100]);
        let built = image.build();
        let registration = RegistrationSet::read(built.source(), pair).unwrap();
        assert_eq!(
            registration.method_address("Game.dll", &method(Some(1), 0x0600_0001)),
            Some(0x7100)
        );
        assert_eq!(registration.method_address("Game.dll", &method(None, 0x0600_0001)), None);

        let pair = VersionPair::uniform(v(29, 0));
        let mut image = ImageBuilder::new(pair, PointerWidth::Bits64);
        image.code_gen_module("Game.dll", &[0x8000, 0x8100]);
        let built = image.build();
        let registration = RegistrationSet::read(built.source(), pair).unwrap();
        assert_eq!(registration.code_gen_modules()[0].name, "Game.dll");
        assert_eq!(
            registration.method_address("Game.dll", &method(None, 0x0600_0002)),
            Some(0x8100)
        );
        assert_eq!(registration.method_address("Other.dll", &method(None, 0x0600_0002)), None);
    }
}
