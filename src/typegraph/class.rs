//! Resolved classes and their members.

use std::sync::OnceLock;

use crate::{
    metadata::tables::TypeAttributes,
    typegraph::types::{ClassId, TypeId},
};

/// Identity of a class in the graph: a type definition plus its generic arguments.
///
/// A non-generic class, and the open definition of a generic one, have empty argument lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericInstantiationKey {
    /// Index into the type definition table
    pub definition: u32,
    /// Arguments of the type's generic parameters
    pub class_args: Vec<TypeId>,
    /// Arguments of method level generic parameters
    pub method_args: Vec<TypeId>,
}

impl GenericInstantiationKey {
    /// The key of type definition `definition` itself
    #[must_use]
    pub fn definition(definition: u32) -> Self {
        GenericInstantiationKey {
            definition,
            class_args: Vec::new(),
            method_args: Vec::new(),
        }
    }

    /// Whether the key carries generic arguments
    #[must_use]
    pub fn is_instantiation(&self) -> bool {
        !self.class_args.is_empty() || !self.method_args.is_empty()
    }
}

/// A class materialized from a type definition or a generic instantiation of one.
///
/// The identity, names and declaring class are fixed when the class is created. Members are
/// filled in afterwards, exactly once; a class whose members could not be resolved keeps them
/// unset and is left out of every listing.
pub struct ResolvedClass {
    /// The memoization key
    pub key: GenericInstantiationKey,
    /// Image declaring the definition
    pub image: Option<usize>,
    /// Namespace of the outermost declaring type
    pub namespace: String,
    /// Metadata name, with the arity marker (`List`1`)
    pub name: String,
    /// `::` separated, sanitized path: namespace segments, declaring chain, name
    pub qualified_name: String,
    /// Enclosing class
    pub declaring: Option<ClassId>,
    /// Generic arguments, or the open parameters of a generic definition
    pub generic_args: Vec<TypeId>,
    /// Attribute flags
    pub flags: TypeAttributes,
    /// Value type
    pub is_valuetype: bool,
    /// Enum
    pub is_enum: bool,
    /// Metadata token of the definition
    pub token: Option<u32>,
    /// Generic nesting depth: zero for a definition, otherwise one more than its deepest argument
    pub depth: usize,
    pub(crate) underlying: OnceLock<TypeId>,
    pub(crate) nested: OnceLock<Vec<ClassId>>,
    pub(crate) fields: OnceLock<Vec<ResolvedField>>,
    pub(crate) methods: OnceLock<Vec<ResolvedMethod>>,
}

impl ResolvedClass {
    /// Index of the type definition
    #[must_use]
    pub fn definition(&self) -> u32 {
        self.key.definition
    }

    /// Whether this is an instantiation rather than a definition
    #[must_use]
    pub fn is_instantiation(&self) -> bool {
        self.key.is_instantiation()
    }

    /// Whether the type is an interface
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeAttributes::INTERFACE)
    }

    /// Whether members were resolved
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.methods.get().is_some()
    }

    /// Underlying type of an enum
    #[must_use]
    pub fn underlying(&self) -> Option<TypeId> {
        self.underlying.get().copied()
    }

    /// Nested classes, in nested type table order
    #[must_use]
    pub fn nested(&self) -> &[ClassId] {
        self.nested.get().map_or(&[], Vec::as_slice)
    }

    /// Fields, ordered by name
    #[must_use]
    pub fn fields(&self) -> &[ResolvedField] {
        self.fields.get().map_or(&[], Vec::as_slice)
    }

    /// Methods, ordered by rendered signature
    #[must_use]
    pub fn methods(&self) -> &[ResolvedMethod] {
        self.methods.get().map_or(&[], Vec::as_slice)
    }

    /// The field named `name`
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields().iter().find(|field| field.name == name)
    }

    /// The method with unique identifier `unique_id`
    #[must_use]
    pub fn method(&self, unique_id: &str) -> Option<&ResolvedMethod> {
        self.methods()
            .iter()
            .find(|method| method.unique_id == unique_id)
    }
}

/// A resolved field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// Field name
    pub name: String,
    /// Per-type rather than per-instance
    pub is_static: bool,
    /// Field type, with class generic parameters substituted
    pub ty: TypeId,
    /// The class declaring the field
    pub declaring: ClassId,
    /// Metadata token
    pub token: Option<u32>,
}

/// A resolved method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParameter {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: TypeId,
}

/// A resolved method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMethod {
    /// Method name
    pub name: String,
    /// `<name>_<parameter count>`, with `_<rank>` appended when overloads share that base
    pub unique_id: String,
    /// Rendered signature, `[static ]<return> <name>(<type> <param>, ...)`
    pub signature: String,
    /// No `this` parameter
    pub is_static: bool,
    /// Return type
    pub return_type: TypeId,
    /// Parameters in declaration order
    pub parameters: Vec<ResolvedParameter>,
    /// The class declaring the method
    pub declaring: ClassId,
    /// Metadata token
    pub token: u32,
    /// Native code address, for methods of definitions that have compiled code
    pub address: Option<u64>,
}
