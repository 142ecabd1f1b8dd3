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
    /// Field attribute flags, carried in the `attrs` bits of the field's type descriptor
    pub struct FieldAttributes: u16 {
        /// Accessible only by the declaring type
        const PRIVATE = 0x0001;
        /// Accessible by anyone
        const PUBLIC = 0x0006;
        /// Per-type rather than per-instance
        const STATIC = 0x0010;
        /// Only assignable in a constructor
        const INIT_ONLY = 0x0020;
        /// Compile-time constant
        const LITERAL = 0x0040;
        /// Has a default value
        const HAS_DEFAULT = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method attribute flags
    pub struct MethodAttributes: u16 {
        /// Accessible only by the declaring type
        const PRIVATE = 0x0001;
        /// Accessible by anyone
        const PUBLIC = 0x0006;
        /// Per-type rather than per-instance
        const STATIC = 0x0010;
        /// Cannot be overridden
        const FINAL = 0x0020;
        /// Virtual dispatch
        const VIRTUAL = 0x0040;
        /// Hides by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Always gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// No implementation
        const ABSTRACT = 0x0400;
        /// Name has special meaning
        const SPECIAL_NAME = 0x0800;
    }
}

/// A method definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDefinition {
    /// Name in the string heap
    pub name_index: u32,
    /// Declaring type definition
    pub declaring_type: Option<u32>,
    /// Registration type descriptor of the return type
    pub return_type: Option<u32>,
    /// Token of the return parameter, from 31 on
    pub return_parameter_token: Option<u32>,
    /// First parameter
    pub parameter_start: i32,
    /// Generic container, for generic methods
    pub generic_container_index: Option<u32>,
    /// Index into the method pointer table, up to 24.1
    pub method_index: Option<u32>,
    /// Index into the invoker table, up to 24.1
    pub invoker_index: Option<u32>,
    /// Metadata token
    pub token: u32,
    /// Raw attribute flags
    pub flags: u16,
    /// Implementation flags
    pub iflags: u16,
    /// Vtable slot
    pub slot: u16,
    /// Number of parameters
    pub parameter_count: u16,
}

impl MethodDefinition {
    /// Attribute flags
    #[must_use]
    pub fn attributes(&self) -> MethodAttributes {
        MethodAttributes::from_bits_truncate(self.flags)
    }

    /// The method has no `this` parameter
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.attributes().contains(MethodAttributes::STATIC)
    }
}

impl TableRow for MethodDefinition {
    const KIND: StructKind = StructKind::MethodDefinition;

    fn from_record(record: &Record) -> Result<Self> {
        let method_index = if record.contains("methodIndex") {
            get_index(record, "methodIndex")?
        } else {
            None
        };
        let invoker_index = if record.contains("invokerIndex") {
            get_index(record, "invokerIndex")?
        } else {
            None
        };

        Ok(MethodDefinition {
            name_index: record.get_u32("nameIndex")?,
            declaring_type: get_index(record, "declaringType")?,
            return_type: get_index(record, "returnType")?,
            return_parameter_token: get_opt_u32(record, "returnParameterToken")?,
            parameter_start: record.get_i32("parameterStart")?,
            generic_container_index: get_index(record, "genericContainerIndex")?,
            method_index,
            invoker_index,
            token: record.get_u32("token")?,
            flags: record.get_u16("flags")?,
            iflags: record.get_u16("iflags")?,
            slot: record.get_u16("slot")?,
            parameter_count: record.get_u16("parameterCount")?,
        })
    }
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDefinition {
    /// Name in the string heap
    pub name_index: u32,
    /// Metadata token
    pub token: u32,
    /// Registration type descriptor of the parameter type
    pub type_index: Option<u32>,
}

impl TableRow for ParameterDefinition {
    const KIND: StructKind = StructKind::ParameterDefinition;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(ParameterDefinition {
            name_index: record.get_u32("nameIndex")?,
            token: record.get_u32("token")?,
            type_index: get_index(record, "typeIndex")?,
        })
    }
}

/// A field definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    /// Name in the string heap
    pub name_index: u32,
    /// Registration type descriptor of the field type; its `attrs` hold the field flags
    pub type_index: Option<u32>,
    /// Metadata token, from 19 on
    pub token: Option<u32>,
}

impl TableRow for FieldDefinition {
    const KIND: StructKind = StructKind::FieldDefinition;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(FieldDefinition {
            name_index: record.get_u32("nameIndex")?,
            type_index: get_index(record, "typeIndex")?,
            token: get_opt_u32(record, "token")?,
        })
    }
}

/// A property with its accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDefinition {
    /// Name in the string heap
    pub name_index: u32,
    /// Getter, relative to the declaring type's first method
    pub get: Option<u32>,
    /// Setter, relative to the declaring type's first method
    pub set: Option<u32>,
    /// Property attributes
    pub attrs: u32,
    /// Metadata token, from 19 on
    pub token: Option<u32>,
}

impl TableRow for PropertyDefinition {
    const KIND: StructKind = StructKind::PropertyDefinition;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(PropertyDefinition {
            name_index: record.get_u32("nameIndex")?,
            get: get_index(record, "get")?,
            set: get_index(record, "set")?,
            attrs: record.get_u32("attrs")?,
            token: get_opt_u32(record, "token")?,
        })
    }
}

/// An event with its accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    /// Name in the string heap
    pub name_index: u32,
    /// Registration type descriptor of the handler type
    pub type_index: Option<u32>,
    /// Add accessor, relative to the declaring type's first method
    pub add: Option<u32>,
    /// Remove accessor, relative to the declaring type's first method
    pub remove: Option<u32>,
    /// Raise accessor, relative to the declaring type's first method
    pub raise: Option<u32>,
    /// Metadata token, from 19 on
    pub token: Option<u32>,
}

impl TableRow for EventDefinition {
    const KIND: StructKind = StructKind::EventDefinition;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(EventDefinition {
            name_index: record.get_u32("nameIndex")?,
            type_index: get_index(record, "typeIndex")?,
            add: get_index(record, "add")?,
            remove: get_index(record, "remove")?,
            raise: get_index(record, "raise")?,
            token: get_opt_u32(record, "token")?,
        })
    }
}
