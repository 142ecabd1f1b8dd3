use crate::{
    metadata::{
        layout::{Record, StructKind},
        tables::{get_index, get_opt_u32, TableRow},
    },
    Result,
};

/// Default value of a constant or optional field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefaultValue {
    /// The field the value belongs to
    pub field_index: u32,
    /// Type of the stored value
    pub type_index: Option<u32>,
    /// Offset into the default value data section
    pub data_index: Option<u32>,
}

impl TableRow for FieldDefaultValue {
    const KIND: StructKind = StructKind::FieldDefaultValue;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(FieldDefaultValue {
            field_index: record.get_u32("fieldIndex")?,
            type_index: get_index(record, "typeIndex")?,
            data_index: get_index(record, "dataIndex")?,
        })
    }
}

/// Default value of an optional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDefaultValue {
    /// The parameter the value belongs to
    pub parameter_index: u32,
    /// Type of the stored value
    pub type_index: Option<u32>,
    /// Offset into the default value data section
    pub data_index: Option<u32>,
}

impl TableRow for ParameterDefaultValue {
    const KIND: StructKind = StructKind::ParameterDefaultValue;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(ParameterDefaultValue {
            parameter_index: record.get_u32("parameterIndex")?,
            type_index: get_index(record, "typeIndex")?,
            data_index: get_index(record, "dataIndex")?,
        })
    }
}

/// Marshaled size of a field with a fixed native layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMarshaledSize {
    /// The field
    pub field_index: u32,
    /// Type of the field
    pub type_index: Option<u32>,
    /// Size in bytes
    pub size: i32,
}

impl TableRow for FieldMarshaledSize {
    const KIND: StructKind = StructKind::FieldMarshaledSize;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(FieldMarshaledSize {
            field_index: record.get_u32("fieldIndex")?,
            type_index: get_index(record, "typeIndex")?,
            size: record.get_i32("size")?,
        })
    }
}

/// Range of custom attribute types attached to one metadata token (up to 27.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomAttributeTypeRange {
    /// Owner token, from 24.1 on; earlier versions index the range directly
    pub token: Option<u32>,
    /// First entry in the attribute types section
    pub start: i32,
    /// Number of attribute types
    pub count: i32,
}

impl TableRow for CustomAttributeTypeRange {
    const KIND: StructKind = StructKind::CustomAttributeTypeRange;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(CustomAttributeTypeRange {
            token: get_opt_u32(record, "token")?,
            start: record.get_i32("start")?,
            count: record.get_i32("count")?,
        })
    }
}

/// Start of the attribute blob of one metadata token (29 and later).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomAttributeDataRange {
    /// Owner token
    pub token: u32,
    /// Offset into the attribute data section
    pub start_offset: u32,
}

impl TableRow for CustomAttributeDataRange {
    const KIND: StructKind = StructKind::CustomAttributeDataRange;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(CustomAttributeDataRange {
            token: record.get_u32("token")?,
            start_offset: record.get_u32("startOffset")?,
        })
    }
}

/// A field referenced by a metadata usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// Index into the registration type table
    pub type_index: i32,
    /// Index relative to the owning type's first field
    pub field_index: i32,
}

impl TableRow for FieldRef {
    const KIND: StructKind = StructKind::FieldRef;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(FieldRef {
            type_index: record.get_i32("typeIndex")?,
            field_index: record.get_i32("fieldIndex")?,
        })
    }
}

/// Location of one string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    /// Length in bytes
    pub length: u32,
    /// Offset into the literal data section
    pub data_index: u32,
}

impl TableRow for StringLiteral {
    const KIND: StructKind = StructKind::StringLiteral;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(StringLiteral {
            length: record.get_u32("length")?,
            data_index: record.get_u32("dataIndex")?,
        })
    }
}
