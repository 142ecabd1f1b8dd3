//! Declarative, version-aware structure layouts.
//!
//! Every structure of the metadata blob and of the native registration tables is described by
//! a [`crate::metadata::layout::StructLayout`]: an ordered list of
//! [`crate::metadata::layout::FieldSpec`] entries, each with a width class and the version
//! windows in which the field exists. Field presence is plain data, so computing the layout of
//! a structure for a [`crate::metadata::version::VersionPair`] is an ordinary pure function:
//!
//! - [`crate::metadata::layout::compute_layout`] - the present fields, in declaration order
//! - [`crate::metadata::layout::struct_size`] - the on-disk size, used to stride record arrays
//! - [`crate::metadata::layout::ResolvedLayout`] - both of the above, computed once and reused
//!   by the [`crate::metadata::layout::reader`] for every record of an array
//!
//! # Examples
//!
//! ```rust
//! use il2scope::file::PointerWidth;
//! use il2scope::metadata::layout::{compute_layout, struct_size, StructKind};
//! use il2scope::metadata::version::{Version, VersionPair};
//!
//! let pair = VersionPair::uniform(Version::new(24, 1));
//! let fields = compute_layout(StructKind::CodeRegistration, pair)?;
//! assert_eq!(fields[0].name, "methodPointersCount");
//!
//! let size = struct_size(StructKind::CodeRegistration, pair, PointerWidth::Bits64)?;
//! assert_eq!(size, fields.len() * 8);
//! # Ok::<(), il2scope::Error>(())
//! ```

pub mod reader;
mod table;

use strum::{EnumCount, EnumIter, IntoStaticStr};

use crate::{
    file::PointerWidth,
    metadata::version::{Version, VersionAxis, VersionPair},
    Result,
};

pub use reader::{read_metadata_structure, read_structure, Record};

/// On-disk width of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidthClass {
    /// Pointer-sized: 4 or 8 bytes depending on the image
    NativeInt,
    /// Always 2 bytes
    FixedInt16,
    /// Always 4 bytes
    FixedInt32,
    /// Always 8 bytes
    FixedInt64,
    /// Always 1 byte
    Byte,
}

impl WidthClass {
    /// Size in bytes for an image with `pointer_width`
    #[must_use]
    pub fn bytes(self, pointer_width: PointerWidth) -> usize {
        match self {
            WidthClass::NativeInt => pointer_width.bytes(),
            WidthClass::FixedInt16 => 2,
            WidthClass::FixedInt32 => 4,
            WidthClass::FixedInt64 => 8,
            WidthClass::Byte => 1,
        }
    }
}

/// An inclusive version range; a missing bound is open.
///
/// The bounds refer to the axis of the owning layout unless the window names its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionWindow {
    /// Axis the bounds are compared against, `None` for the layout's axis
    pub axis: Option<VersionAxis>,
    /// First version containing the field
    pub min: Option<Version>,
    /// Last version containing the field
    pub max: Option<Version>,
}

impl VersionWindow {
    /// The same bounds, compared against `axis`
    #[must_use]
    pub const fn on(self, axis: VersionAxis) -> Self {
        VersionWindow {
            axis: Some(axis),
            ..self
        }
    }

    /// Whether `version` lies inside the bounds
    #[must_use]
    pub fn contains(&self, version: Version) -> bool {
        self.min.map_or(true, |min| version >= min) && self.max.map_or(true, |max| version <= max)
    }

    /// Whether the window holds for `pair`, reading `axis` unless the window names its own
    #[must_use]
    pub fn holds(&self, pair: VersionPair, axis: VersionAxis) -> bool {
        self.contains(pair.get(self.axis.unwrap_or(axis)))
    }
}

/// One field of a structure layout.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    /// Name under which the value is stored in a [`Record`]
    pub name: &'static str,
    /// On-disk width
    pub width: WidthClass,
    /// Windows in which the field exists. Empty means the field is part of every revision.
    pub windows: &'static [VersionWindow],
}

impl FieldSpec {
    /// Whether the field exists for `pair` in a layout versioned along `axis`
    #[must_use]
    pub fn is_present(&self, pair: VersionPair, axis: VersionAxis) -> bool {
        self.windows.is_empty() || self.windows.iter().any(|window| window.holds(pair, axis))
    }
}

/// Every structure kind with a declared layout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount, IntoStaticStr,
)]
pub enum StructKind {
    /// `Il2CppGlobalMetadataHeader`
    MetadataHeader,
    /// `Il2CppImageDefinition`
    ImageDefinition,
    /// `Il2CppAssemblyDefinition` with its embedded assembly name
    AssemblyDefinition,
    /// `Il2CppTypeDefinition`
    TypeDefinition,
    /// `Il2CppMethodDefinition`
    MethodDefinition,
    /// `Il2CppParameterDefinition`
    ParameterDefinition,
    /// `Il2CppFieldDefinition`
    FieldDefinition,
    /// `Il2CppPropertyDefinition`
    PropertyDefinition,
    /// `Il2CppEventDefinition`
    EventDefinition,
    /// `Il2CppFieldDefaultValue`
    FieldDefaultValue,
    /// `Il2CppParameterDefaultValue`
    ParameterDefaultValue,
    /// `Il2CppFieldMarshaledSize`
    FieldMarshaledSize,
    /// `Il2CppGenericContainer`
    GenericContainer,
    /// `Il2CppGenericParameter`
    GenericParameter,
    /// `Il2CppCustomAttributeTypeRange`
    CustomAttributeTypeRange,
    /// `Il2CppCustomAttributeDataRange`
    CustomAttributeDataRange,
    /// `Il2CppFieldRef`
    FieldRef,
    /// `Il2CppStringLiteral`
    StringLiteral,
    /// `Il2CppCodeRegistration`
    CodeRegistration,
    /// `Il2CppMetadataRegistration`
    MetadataRegistration,
    /// `Il2CppType`
    TypeDescriptor,
    /// `Il2CppGenericClass`
    GenericClass,
    /// `Il2CppGenericContext`
    GenericContext,
    /// `Il2CppGenericInst`
    GenericInst,
    /// `Il2CppArrayType`
    ArrayType,
    /// `Il2CppMethodSpec`
    MethodSpec,
    /// `Il2CppGenericMethodFunctionsDefinitions`
    GenericMethodFunctions,
    /// `Il2CppCodeGenModule`
    CodeGenModule,
}

impl std::fmt::Display for StructKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.into())
    }
}

/// The declared field sequence of one structure kind.
#[derive(Debug)]
pub struct StructLayout {
    /// The structure this layout describes
    pub kind: StructKind,
    /// The version axis field windows refer to unless they name their own
    pub axis: VersionAxis,
    /// All fields ever declared for this structure, in on-disk order
    pub fields: &'static [FieldSpec],
}

impl StructLayout {
    /// The declared layout of `kind`
    #[must_use]
    pub fn of(kind: StructKind) -> &'static StructLayout {
        table::layout(kind)
    }

    /// Resolves the layout for a version pair and pointer width.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedVersion`] for a pair outside the supported matrix.
    pub fn resolve(
        &'static self,
        pair: VersionPair,
        pointer_width: PointerWidth,
    ) -> Result<ResolvedLayout> {
        pair.ensure_supported()?;

        let version = pair.get(self.axis);
        let fields: Vec<&'static FieldSpec> = self
            .fields
            .iter()
            .filter(|field| field.is_present(pair, self.axis))
            .collect();
        let size = fields
            .iter()
            .map(|field| field.width.bytes(pointer_width))
            .sum();

        Ok(ResolvedLayout {
            kind: self.kind,
            version,
            pointer_width,
            fields,
            size,
        })
    }
}

/// A structure layout bound to a version pair and pointer width.
#[derive(Debug, Clone)]
pub struct ResolvedLayout {
    kind: StructKind,
    version: Version,
    pointer_width: PointerWidth,
    fields: Vec<&'static FieldSpec>,
    size: usize,
}

impl ResolvedLayout {
    /// The structure kind
    #[must_use]
    pub fn kind(&self) -> StructKind {
        self.kind
    }

    /// The version on the axis of this structure
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// The pointer width `NativeInt` fields are read with
    #[must_use]
    pub fn pointer_width(&self) -> PointerWidth {
        self.pointer_width
    }

    /// The present fields, in on-disk order
    #[must_use]
    pub fn fields(&self) -> &[&'static FieldSpec] {
        &self.fields
    }

    /// Size of one record in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether `name` is part of this layout
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }
}

/// The fields of `kind` present for `pair`, in declaration order.
///
/// # Errors
/// Returns [`crate::Error::UnsupportedVersion`] for a pair outside the supported matrix.
pub fn compute_layout(kind: StructKind, pair: VersionPair) -> Result<Vec<&'static FieldSpec>> {
    pair.ensure_supported()?;

    let layout = StructLayout::of(kind);
    Ok(layout
        .fields
        .iter()
        .filter(|field| field.is_present(pair, layout.axis))
        .collect())
}

/// The on-disk size of `kind` for `pair` and `pointer_width`.
///
/// # Errors
/// Returns [`crate::Error::UnsupportedVersion`] for a pair outside the supported matrix.
pub fn struct_size(kind: StructKind, pair: VersionPair, pointer_width: PointerWidth) -> Result<usize> {
    Ok(StructLayout::of(kind).resolve(pair, pointer_width)?.size())
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::{
        metadata::version::{v, SUPPORTED_VERSIONS},
        Error,
    };

    fn names(kind: StructKind, pair: VersionPair) -> Vec<&'static str> {
        compute_layout(kind, pair)
            .unwrap()
            .iter()
            .map(|field| field.name)
            .collect()
    }

    #[test]
    fn deterministic_and_sized() {
        for kind in StructKind::iter() {
            for &metadata in SUPPORTED_VERSIONS {
                for &registration in SUPPORTED_VERSIONS {
                    let pair = VersionPair::new(metadata, registration);
                    let first = compute_layout(kind, pair).unwrap();
                    let second = compute_layout(kind, pair).unwrap();
                    assert_eq!(first, second);

                    for width in [PointerWidth::Bits32, PointerWidth::Bits64] {
                        let sum: usize = first.iter().map(|f| f.width.bytes(width)).sum();
                        assert_eq!(sum, struct_size(kind, pair, width).unwrap());
                    }
                }
            }
        }
    }

    #[test]
    fn every_kind_declared() {
        for kind in StructKind::iter() {
            let layout = StructLayout::of(kind);
            assert_eq!(layout.kind, kind);
            assert!(!layout.fields.is_empty());
        }
        assert_eq!(StructKind::COUNT, 28);
    }

    #[test]
    fn unsupported_version() {
        let pair = VersionPair::new(v(26, 0), v(24, 0));
        assert!(matches!(
            compute_layout(StructKind::TypeDefinition, pair),
            Err(Error::UnsupportedVersion { .. })
        ));
        assert!(struct_size(StructKind::TypeDefinition, pair, PointerWidth::Bits64).is_err());
    }

    #[test]
    fn code_registration_windows() {
        let fields = names(StructKind::CodeRegistration, VersionPair::uniform(v(24, 1)));
        assert!(fields.contains(&"methodPointers"));
        assert!(!fields.contains(&"codeGenModules"));

        let fields = names(StructKind::CodeRegistration, VersionPair::uniform(v(24, 2)));
        assert!(!fields.contains(&"methodPointers"));
        assert!(fields.contains(&"codeGenModules"));

        // Disjoint windows: 24.5 only and 27.1 onwards
        for (version, present) in [
            (v(24, 4), false),
            (v(24, 5), true),
            (v(27, 0), false),
            (v(27, 1), true),
            (v(31, 0), true),
        ] {
            let fields = names(StructKind::CodeRegistration, VersionPair::uniform(version));
            assert_eq!(fields.contains(&"genericAdjustorThunks"), present, "{version}");
        }
    }

    #[test]
    fn axes_are_independent() {
        // Metadata structures only follow the metadata axis
        let a = names(StructKind::TypeDefinition, VersionPair::new(v(24, 0), v(16, 0)));
        let b = names(StructKind::TypeDefinition, VersionPair::new(v(24, 0), v(31, 0)));
        assert_eq!(a, b);

        // Registration structures only follow the registration axis
        let a = names(StructKind::GenericClass, VersionPair::new(v(16, 0), v(27, 0)));
        let b = names(StructKind::GenericClass, VersionPair::new(v(31, 0), v(27, 0)));
        assert_eq!(a, b);
        assert_eq!(a, vec!["type", "classInst", "methodInst", "cachedClass"]);

        let old = names(StructKind::GenericClass, VersionPair::new(v(27, 0), v(24, 5)));
        assert_eq!(old[0], "typeDefinitionIndex");
    }

    #[test]
    fn field_on_the_other_axis() {
        const WINDOWS: &[VersionWindow] = &[VersionWindow {
            axis: None,
            min: Some(v(27, 0)),
            max: None,
        }
        .on(VersionAxis::Registration)];
        let field = FieldSpec {
            name: "genericMethodPointers",
            width: WidthClass::NativeInt,
            windows: WINDOWS,
        };

        // Declared inside a metadata layout, gated on the registration version
        let axis = VersionAxis::Metadata;
        assert!(field.is_present(VersionPair::new(v(24, 0), v(27, 0)), axis));
        assert!(!field.is_present(VersionPair::new(v(29, 0), v(24, 5)), axis));

        let plain = VersionWindow {
            axis: None,
            min: Some(v(27, 0)),
            max: None,
        };
        assert!(plain.holds(VersionPair::new(v(29, 0), v(24, 5)), axis));
        assert!(!plain.holds(VersionPair::new(v(29, 0), v(24, 5)), VersionAxis::Registration));
    }

    #[test]
    fn type_definition_sizes() {
        let size = |version| {
            struct_size(
                StructKind::TypeDefinition,
                VersionPair::uniform(version),
                PointerWidth::Bits64,
            )
            .unwrap()
        };

        assert_eq!(size(v(24, 0)), 104);
        assert_eq!(size(v(24, 1)), 100);
        assert_eq!(size(v(24, 2)), 92);
        assert_eq!(size(v(24, 5)), 92);
        assert_eq!(size(v(27, 0)), 88);
        assert_eq!(size(v(29, 0)), 88);
    }

    #[test]
    fn native_width() {
        let pair = VersionPair::uniform(v(29, 0));
        assert_eq!(
            struct_size(StructKind::TypeDescriptor, pair, PointerWidth::Bits32).unwrap(),
            8
        );
        assert_eq!(
            struct_size(StructKind::TypeDescriptor, pair, PointerWidth::Bits64).unwrap(),
            12
        );
    }
}
