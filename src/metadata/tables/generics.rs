use crate::{
    metadata::{
        layout::{Record, StructKind},
        tables::{get_index, TableRow},
    },
    Result,
};

/// The generic parameter list of a type or method definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericContainer {
    /// Owning type definition or method definition, depending on `is_method`
    pub owner_index: i32,
    /// Number of generic parameters
    pub type_argc: u32,
    /// Whether the owner is a method
    pub is_method: bool,
    /// First entry in the generic parameter table
    pub generic_parameter_start: Option<u32>,
}

impl TableRow for GenericContainer {
    const KIND: StructKind = StructKind::GenericContainer;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(GenericContainer {
            owner_index: record.get_i32("ownerIndex")?,
            type_argc: record.get_u32("typeArgc")?,
            is_method: record.get_u32("isMethod")? != 0,
            generic_parameter_start: get_index(record, "genericParameterStart")?,
        })
    }
}

/// One generic parameter (`T` in `List<T>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericParameter {
    /// The generic container declaring the parameter
    pub owner_index: i32,
    /// Name in the string heap
    pub name_index: u32,
    /// First entry in the constraints section
    pub constraints_start: i16,
    /// Number of constraints
    pub constraints_count: i16,
    /// Position within the owning container
    pub num: u16,
    /// Variance and constraint flags
    pub flags: u16,
}

impl TableRow for GenericParameter {
    const KIND: StructKind = StructKind::GenericParameter;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(GenericParameter {
            owner_index: record.get_i32("ownerIndex")?,
            name_index: record.get_u32("nameIndex")?,
            constraints_start: record.get_i16("constraintsStart")?,
            constraints_count: record.get_i16("constraintsCount")?,
            num: record.get_u16("num")?,
            flags: record.get_u16("flags")?,
        })
    }
}
