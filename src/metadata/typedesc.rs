//! Interpretation of packed type descriptors.
//!
//! Every type referenced anywhere in the metadata is an entry of the registration `types`
//! array: a pointer-sized `datapoint` followed by a 32-bit packed word.
//!
//! ```text
//!  31   30   29 ........ 24 23 ......... 16 15 ................... 0
//! +----+----+--------------+---------------+------------------------+
//! |pin |byref|   num_mods   |     kind      |         attrs          |
//! +----+----+--------------+---------------+------------------------+
//! ```
//!
//! The meaning of `datapoint` depends solely on `kind`. [`decode_type_descriptor`] performs the
//! bit arithmetic once and returns the payload as a [`TypePayload`] variant, so the value can
//! only be consumed under the interpretation its kind licenses. Array descriptors and generic
//! class records are left as addresses; following them is the job of the resolver.

use crate::Result;

#[allow(non_snake_case, dead_code, missing_docs)]
/// Kind tags of the packed type descriptor
pub mod ELEMENT_TYPE {
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Payload: address of the element type
    pub const PTR: u8 = 0x0f;
    // Payload: address of the element type
    pub const BYREF: u8 = 0x10;
    // Payload: type definition index
    pub const VALUETYPE: u8 = 0x11;
    // Payload: type definition index
    pub const CLASS: u8 = 0x12;
    // Payload: generic parameter index
    pub const VAR: u8 = 0x13;
    // Payload: address of an Il2CppArrayType
    pub const ARRAY: u8 = 0x14;
    // Payload: address of an Il2CppGenericClass
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    pub const FNPTR: u8 = 0x1b;
    pub const OBJECT: u8 = 0x1c;
    // Payload: address of the element type
    pub const SZARRAY: u8 = 0x1d;
    // Payload: generic parameter index
    pub const MVAR: u8 = 0x1e;
    pub const CMOD_REQD: u8 = 0x1f;
    pub const CMOD_OPT: u8 = 0x20;
    pub const INTERNAL: u8 = 0x21;
    pub const MODIFIER: u8 = 0x40;
    pub const SENTINEL: u8 = 0x41;
    pub const PINNED: u8 = 0x45;
    // Payload: type definition index
    pub const ENUM: u8 = 0x55;
}

/// The kind of a packed type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum TypeKind {
    End,
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    String,
    Ptr,
    ByRef,
    ValueType,
    Class,
    Var,
    Array,
    GenericInst,
    TypedByRef,
    I,
    U,
    FnPtr,
    Object,
    SzArray,
    MVar,
    CModReqd,
    CModOpt,
    Internal,
    Modifier,
    Sentinel,
    Pinned,
    Enum,
}

impl TypeKind {
    /// Maps a kind tag onto its variant.
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<TypeKind> {
        Some(match tag {
            ELEMENT_TYPE::END => TypeKind::End,
            ELEMENT_TYPE::VOID => TypeKind::Void,
            ELEMENT_TYPE::BOOLEAN => TypeKind::Boolean,
            ELEMENT_TYPE::CHAR => TypeKind::Char,
            ELEMENT_TYPE::I1 => TypeKind::I1,
            ELEMENT_TYPE::U1 => TypeKind::U1,
            ELEMENT_TYPE::I2 => TypeKind::I2,
            ELEMENT_TYPE::U2 => TypeKind::U2,
            ELEMENT_TYPE::I4 => TypeKind::I4,
            ELEMENT_TYPE::U4 => TypeKind::U4,
            ELEMENT_TYPE::I8 => TypeKind::I8,
            ELEMENT_TYPE::U8 => TypeKind::U8,
            ELEMENT_TYPE::R4 => TypeKind::R4,
            ELEMENT_TYPE::R8 => TypeKind::R8,
            ELEMENT_TYPE::STRING => TypeKind::String,
            ELEMENT_TYPE::PTR => TypeKind::Ptr,
            ELEMENT_TYPE::BYREF => TypeKind::ByRef,
            ELEMENT_TYPE::VALUETYPE => TypeKind::ValueType,
            ELEMENT_TYPE::CLASS => TypeKind::Class,
            ELEMENT_TYPE::VAR => TypeKind::Var,
            ELEMENT_TYPE::ARRAY => TypeKind::Array,
            ELEMENT_TYPE::GENERICINST => TypeKind::GenericInst,
            ELEMENT_TYPE::TYPEDBYREF => TypeKind::TypedByRef,
            ELEMENT_TYPE::I => TypeKind::I,
            ELEMENT_TYPE::U => TypeKind::U,
            ELEMENT_TYPE::FNPTR => TypeKind::FnPtr,
            ELEMENT_TYPE::OBJECT => TypeKind::Object,
            ELEMENT_TYPE::SZARRAY => TypeKind::SzArray,
            ELEMENT_TYPE::MVAR => TypeKind::MVar,
            ELEMENT_TYPE::CMOD_REQD => TypeKind::CModReqd,
            ELEMENT_TYPE::CMOD_OPT => TypeKind::CModOpt,
            ELEMENT_TYPE::INTERNAL => TypeKind::Internal,
            ELEMENT_TYPE::MODIFIER => TypeKind::Modifier,
            ELEMENT_TYPE::SENTINEL => TypeKind::Sentinel,
            ELEMENT_TYPE::PINNED => TypeKind::Pinned,
            ELEMENT_TYPE::ENUM => TypeKind::Enum,
            _ => return None,
        })
    }

    /// Whether values of this kind are fully described by the kind alone
    #[must_use]
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            TypeKind::Boolean
                | TypeKind::Char
                | TypeKind::I1
                | TypeKind::U1
                | TypeKind::I2
                | TypeKind::U2
                | TypeKind::I4
                | TypeKind::U4
                | TypeKind::I8
                | TypeKind::U8
                | TypeKind::R4
                | TypeKind::R8
                | TypeKind::String
                | TypeKind::I
                | TypeKind::U
                | TypeKind::Object
                | TypeKind::TypedByRef
        )
    }
}

/// The payload of a descriptor, in the single interpretation its kind licenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypePayload {
    /// The kind carries no payload
    None,
    /// `VALUETYPE`, `CLASS`, `ENUM`: index into the type definition table
    ClassIndex(u32),
    /// `PTR`, `SZARRAY`, `BYREF`: address of the element's descriptor
    ElementType(u64),
    /// `ARRAY`: address of an array type record
    ArrayType(u64),
    /// `VAR`, `MVAR`: index into the generic parameter table
    GenericParameterIndex(u32),
    /// `GENERICINST`: address of a generic class record
    GenericClass(u64),
}

/// A decoded type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawTypeDescriptor {
    /// Field/parameter attribute flags
    pub attrs: u16,
    /// The kind tag
    pub kind: TypeKind,
    /// Number of custom modifiers
    pub num_mods: u8,
    /// Passed by reference
    pub byref: bool,
    /// Pinned local
    pub pinned: bool,
    /// The kind specific payload
    pub payload: TypePayload,
}

/// Attribute flag marking a field as static
pub const FIELD_ATTRIBUTE_STATIC: u16 = 0x0010;

impl RawTypeDescriptor {
    /// Whether the attribute flags mark a static field
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.attrs & FIELD_ATTRIBUTE_STATIC != 0
    }
}

/// Decomposes a packed descriptor word and its datapoint.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the kind tag is unknown.
///
/// # Examples
///
/// ```rust
/// use il2scope::metadata::typedesc::{decode_type_descriptor, TypeKind, TypePayload};
///
/// // CLASS, attrs 0x0006, definition index 42
/// let desc = decode_type_descriptor(0x0012_0006, 42)?;
/// assert_eq!(desc.kind, TypeKind::Class);
/// assert_eq!(desc.attrs, 6);
/// assert_eq!(desc.payload, TypePayload::ClassIndex(42));
/// # Ok::<(), il2scope::Error>(())
/// ```
#[allow(clippy::cast_possible_truncation)]
pub fn decode_type_descriptor(bits: u32, payload: u64) -> Result<RawTypeDescriptor> {
    let tag = ((bits >> 16) & 0xff) as u8;
    let Some(kind) = TypeKind::from_tag(tag) else {
        return Err(malformed_error!("Unknown type descriptor kind 0x{:02X}", tag));
    };

    // Indices occupy the low half of the pointer-sized datapoint
    let index = payload as u32;
    let payload = match kind {
        TypeKind::ValueType | TypeKind::Class | TypeKind::Enum => TypePayload::ClassIndex(index),
        TypeKind::Ptr | TypeKind::SzArray | TypeKind::ByRef => TypePayload::ElementType(payload),
        TypeKind::Array => TypePayload::ArrayType(payload),
        TypeKind::Var | TypeKind::MVar => TypePayload::GenericParameterIndex(index),
        TypeKind::GenericInst => TypePayload::GenericClass(payload),
        _ => TypePayload::None,
    };

    Ok(RawTypeDescriptor {
        attrs: (bits & 0xffff) as u16,
        kind,
        num_mods: ((bits >> 24) & 0x3f) as u8,
        byref: (bits >> 30) & 1 == 1,
        pinned: (bits >> 31) & 1 == 1,
        payload,
    })
}
