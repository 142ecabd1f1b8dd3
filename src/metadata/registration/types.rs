use crate::{
    file::AddressSpace,
    metadata::layout::Record,
    Result,
};

/// Where a generic class record names its generic type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericClassDefinition {
    /// Type definition index, up to 24.5
    TypeDefinitionIndex(u32),
    /// Address of a `CLASS`/`VALUETYPE` type descriptor, from 27 on
    Type(u64),
}

/// An instantiation of a generic type definition (`Il2CppGenericClass`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericClass {
    /// The generic type definition
    pub definition: GenericClassDefinition,
    /// Address of the class instantiation arguments (`Il2CppGenericInst`), or 0
    pub class_inst: u64,
    /// Address of the method instantiation arguments, or 0
    pub method_inst: u64,
    /// Runtime cache slot, zero in a file image
    pub cached_class: u64,
}

impl GenericClass {
    pub(crate) fn from_record(record: &Record) -> Result<Self> {
        let definition = if record.contains("type") {
            GenericClassDefinition::Type(record.get("type")?)
        } else {
            let index = record.get_i32("typeDefinitionIndex")?;
            let index = u32::try_from(index)
                .map_err(|_| unresolved_error!("generic class with definition index {}", index))?;
            GenericClassDefinition::TypeDefinitionIndex(index)
        };

        Ok(GenericClass {
            definition,
            class_inst: record.get("classInst")?,
            method_inst: record.get("methodInst")?,
            cached_class: record.get("cachedClass")?,
        })
    }
}

/// A list of generic arguments (`Il2CppGenericInst`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericInst {
    /// Number of arguments
    pub type_argc: usize,
    /// Address of the array of type descriptor pointers
    pub type_argv: u64,
}

impl GenericInst {
    pub(crate) fn from_record(record: &Record) -> Result<Self> {
        Ok(GenericInst {
            type_argc: record.get_usize("typeArgc")?,
            type_argv: record.get("typeArgv")?,
        })
    }

    /// Reads the addresses of the argument type descriptors.
    ///
    /// # Errors
    /// Returns an error if the argument array is unmapped or truncated.
    pub fn arguments(&self, adapter: &dyn AddressSpace) -> Result<Vec<u64>> {
        adapter.read_pointer_array(self.type_argv, self.type_argc)
    }
}

/// A multi-dimensional array shape (`Il2CppArrayType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayType {
    /// Address of the element type descriptor
    pub etype: u64,
    /// Number of dimensions
    pub rank: u8,
    /// Number of explicit sizes
    pub numsizes: u8,
    /// Number of explicit lower bounds
    pub numlobounds: u8,
    /// Address of the sizes array
    pub sizes: u64,
    /// Address of the lower bounds array
    pub lobounds: u64,
}

impl ArrayType {
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn from_record(record: &Record) -> Result<Self> {
        Ok(ArrayType {
            etype: record.get("etype")?,
            rank: record.get("rank")? as u8,
            numsizes: record.get("numsizes")? as u8,
            numlobounds: record.get("numlobounds")? as u8,
            sizes: record.get("sizes")?,
            lobounds: record.get("lobounds")?,
        })
    }
}

/// A generic method instantiation (`Il2CppMethodSpec`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodSpec {
    /// The generic method definition
    pub method_definition_index: i32,
    /// Index into the generic instantiation table for the class arguments, or -1
    pub class_index_index: i32,
    /// Index into the generic instantiation table for the method arguments, or -1
    pub method_index_index: i32,
}

impl MethodSpec {
    pub(crate) fn from_record(record: &Record) -> Result<Self> {
        Ok(MethodSpec {
            method_definition_index: record.get_i32("methodDefinitionIndex")?,
            class_index_index: record.get_i32("classIndexIndex")?,
            method_index_index: record.get_i32("methodIndexIndex")?,
        })
    }
}

/// Code for one generic method instantiation (`Il2CppGenericMethodFunctionsDefinitions`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericMethodFunctions {
    /// Index into the method spec table
    pub generic_method_index: i32,
    /// Index into the generic method pointer table
    pub method_index: i32,
    /// Index into the invoker table
    pub invoker_index: i32,
    /// Index into the adjustor thunk table, 24.5 and 27.1 on
    pub adjustor_thunk_index: Option<i32>,
}

impl GenericMethodFunctions {
    pub(crate) fn from_record(record: &Record) -> Result<Self> {
        let adjustor_thunk_index = if record.contains("adjustorThunkIndex") {
            Some(record.get_i32("adjustorThunkIndex")?)
        } else {
            None
        };

        Ok(GenericMethodFunctions {
            generic_method_index: record.get_i32("genericMethodIndex")?,
            method_index: record.get_i32("methodIndex")?,
            invoker_index: record.get_i32("invokerIndex")?,
            adjustor_thunk_index,
        })
    }
}
