//! The declared layouts of every structure kind.
//!
//! Windows are inclusive on both ends. A field listed with several windows is present whenever
//! any of them matches, which is how fields that were removed and later reintroduced (adjustor
//! thunks: `24.5` and `27.1+`) are expressed.

use crate::metadata::{
    layout::{FieldSpec, StructKind, StructLayout, VersionWindow, WidthClass},
    version::{v, VersionAxis},
};

const fn since(major: u16, minor: u16) -> VersionWindow {
    VersionWindow {
        axis: None,
        min: Some(v(major, minor)),
        max: None,
    }
}

const fn until(major: u16, minor: u16) -> VersionWindow {
    VersionWindow {
        axis: None,
        min: None,
        max: Some(v(major, minor)),
    }
}

const fn between(min: (u16, u16), max: (u16, u16)) -> VersionWindow {
    VersionWindow {
        axis: None,
        min: Some(v(min.0, min.1)),
        max: Some(v(max.0, max.1)),
    }
}

const fn only(major: u16, minor: u16) -> VersionWindow {
    between((major, minor), (major, minor))
}

macro_rules! field {
    ($name:literal, $width:ident $(, $window:expr)* $(,)?) => {
        FieldSpec {
            name: $name,
            width: WidthClass::$width,
            windows: &[$($window),*],
        }
    };
}

macro_rules! layout {
    ($kind:ident, $axis:ident, [$($field:expr),* $(,)?]) => {
        StructLayout {
            kind: StructKind::$kind,
            axis: VersionAxis::$axis,
            fields: &[$($field),*],
        }
    };
}

pub(super) fn layout(kind: StructKind) -> &'static StructLayout {
    match kind {
        StructKind::MetadataHeader => &METADATA_HEADER,
        StructKind::ImageDefinition => &IMAGE_DEFINITION,
        StructKind::AssemblyDefinition => &ASSEMBLY_DEFINITION,
        StructKind::TypeDefinition => &TYPE_DEFINITION,
        StructKind::MethodDefinition => &METHOD_DEFINITION,
        StructKind::ParameterDefinition => &PARAMETER_DEFINITION,
        StructKind::FieldDefinition => &FIELD_DEFINITION,
        StructKind::PropertyDefinition => &PROPERTY_DEFINITION,
        StructKind::EventDefinition => &EVENT_DEFINITION,
        StructKind::FieldDefaultValue => &FIELD_DEFAULT_VALUE,
        StructKind::ParameterDefaultValue => &PARAMETER_DEFAULT_VALUE,
        StructKind::FieldMarshaledSize => &FIELD_MARSHALED_SIZE,
        StructKind::GenericContainer => &GENERIC_CONTAINER,
        StructKind::GenericParameter => &GENERIC_PARAMETER,
        StructKind::CustomAttributeTypeRange => &CUSTOM_ATTRIBUTE_TYPE_RANGE,
        StructKind::CustomAttributeDataRange => &CUSTOM_ATTRIBUTE_DATA_RANGE,
        StructKind::FieldRef => &FIELD_REF,
        StructKind::StringLiteral => &STRING_LITERAL,
        StructKind::CodeRegistration => &CODE_REGISTRATION,
        StructKind::MetadataRegistration => &METADATA_REGISTRATION,
        StructKind::TypeDescriptor => &TYPE_DESCRIPTOR,
        StructKind::GenericClass => &GENERIC_CLASS,
        StructKind::GenericContext => &GENERIC_CONTEXT,
        StructKind::GenericInst => &GENERIC_INST,
        StructKind::ArrayType => &ARRAY_TYPE,
        StructKind::MethodSpec => &METHOD_SPEC,
        StructKind::GenericMethodFunctions => &GENERIC_METHOD_FUNCTIONS,
        StructKind::CodeGenModule => &CODE_GEN_MODULE,
    }
}

// Metadata blob

static METADATA_HEADER: StructLayout = layout!(MetadataHeader, Metadata, [
    field!("sanity", FixedInt32),
    field!("version", FixedInt32),
    field!("stringLiteralOffset", FixedInt32),
    field!("stringLiteralSize", FixedInt32),
    field!("stringLiteralDataOffset", FixedInt32),
    field!("stringLiteralDataSize", FixedInt32),
    field!("stringOffset", FixedInt32),
    field!("stringSize", FixedInt32),
    field!("eventsOffset", FixedInt32),
    field!("eventsSize", FixedInt32),
    field!("propertiesOffset", FixedInt32),
    field!("propertiesSize", FixedInt32),
    field!("methodsOffset", FixedInt32),
    field!("methodsSize", FixedInt32),
    field!("parameterDefaultValuesOffset", FixedInt32),
    field!("parameterDefaultValuesSize", FixedInt32),
    field!("fieldDefaultValuesOffset", FixedInt32),
    field!("fieldDefaultValuesSize", FixedInt32),
    field!("fieldAndParameterDefaultValueDataOffset", FixedInt32),
    field!("fieldAndParameterDefaultValueDataSize", FixedInt32),
    field!("fieldMarshaledSizesOffset", FixedInt32),
    field!("fieldMarshaledSizesSize", FixedInt32),
    field!("parametersOffset", FixedInt32),
    field!("parametersSize", FixedInt32),
    field!("fieldsOffset", FixedInt32),
    field!("fieldsSize", FixedInt32),
    field!("genericParametersOffset", FixedInt32),
    field!("genericParametersSize", FixedInt32),
    field!("genericParameterConstraintsOffset", FixedInt32),
    field!("genericParameterConstraintsSize", FixedInt32),
    field!("genericContainersOffset", FixedInt32),
    field!("genericContainersSize", FixedInt32),
    field!("nestedTypesOffset", FixedInt32),
    field!("nestedTypesSize", FixedInt32),
    field!("interfacesOffset", FixedInt32),
    field!("interfacesSize", FixedInt32),
    field!("vtableMethodsOffset", FixedInt32),
    field!("vtableMethodsSize", FixedInt32),
    field!("interfaceOffsetsOffset", FixedInt32),
    field!("interfaceOffsetsSize", FixedInt32),
    field!("typeDefinitionsOffset", FixedInt32),
    field!("typeDefinitionsSize", FixedInt32),
    field!("rgctxEntriesOffset", FixedInt32, until(24, 1)),
    field!("rgctxEntriesCount", FixedInt32, until(24, 1)),
    field!("imagesOffset", FixedInt32),
    field!("imagesSize", FixedInt32),
    field!("assembliesOffset", FixedInt32),
    field!("assembliesSize", FixedInt32),
    field!("metadataUsageListsOffset", FixedInt32, between((19, 0), (24, 5))),
    field!("metadataUsageListsCount", FixedInt32, between((19, 0), (24, 5))),
    field!("metadataUsagePairsOffset", FixedInt32, between((19, 0), (24, 5))),
    field!("metadataUsagePairsCount", FixedInt32, between((19, 0), (24, 5))),
    field!("fieldRefsOffset", FixedInt32, since(19, 0)),
    field!("fieldRefsSize", FixedInt32, since(19, 0)),
    field!("referencedAssembliesOffset", FixedInt32, since(20, 0)),
    field!("referencedAssembliesSize", FixedInt32, since(20, 0)),
    field!("attributesInfoOffset", FixedInt32, between((21, 0), (27, 2))),
    field!("attributesInfoCount", FixedInt32, between((21, 0), (27, 2))),
    field!("attributeTypesOffset", FixedInt32, between((21, 0), (27, 2))),
    field!("attributeTypesCount", FixedInt32, between((21, 0), (27, 2))),
    field!("attributeDataOffset", FixedInt32, since(29, 0)),
    field!("attributeDataSize", FixedInt32, since(29, 0)),
    field!("attributeDataRangeOffset", FixedInt32, since(29, 0)),
    field!("attributeDataRangeSize", FixedInt32, since(29, 0)),
    field!("unresolvedVirtualCallParameterTypesOffset", FixedInt32, since(22, 0)),
    field!("unresolvedVirtualCallParameterTypesSize", FixedInt32, since(22, 0)),
    field!("unresolvedVirtualCallParameterRangesOffset", FixedInt32, since(22, 0)),
    field!("unresolvedVirtualCallParameterRangesSize", FixedInt32, since(22, 0)),
    field!("windowsRuntimeTypeNamesOffset", FixedInt32, since(23, 0)),
    field!("windowsRuntimeTypeNamesSize", FixedInt32, since(23, 0)),
    field!("windowsRuntimeStringsOffset", FixedInt32, since(27, 0)),
    field!("windowsRuntimeStringsSize", FixedInt32, since(27, 0)),
    field!("exportedTypeDefinitionsOffset", FixedInt32, since(24, 0)),
    field!("exportedTypeDefinitionsSize", FixedInt32, since(24, 0)),
]);

static IMAGE_DEFINITION: StructLayout = layout!(ImageDefinition, Metadata, [
    field!("nameIndex", FixedInt32),
    field!("assemblyIndex", FixedInt32),
    field!("typeStart", FixedInt32),
    field!("typeCount", FixedInt32),
    field!("exportedTypeStart", FixedInt32, since(24, 0)),
    field!("exportedTypeCount", FixedInt32, since(24, 0)),
    field!("entryPointIndex", FixedInt32),
    field!("token", FixedInt32, since(19, 0)),
    field!("customAttributeStart", FixedInt32, since(24, 1)),
    field!("customAttributeCount", FixedInt32, since(24, 1)),
]);

static ASSEMBLY_DEFINITION: StructLayout = layout!(AssemblyDefinition, Metadata, [
    field!("imageIndex", FixedInt32),
    field!("token", FixedInt32, since(24, 1)),
    field!("customAttributeIndex", FixedInt32, until(24, 0)),
    field!("referencedAssemblyStart", FixedInt32, since(20, 0)),
    field!("referencedAssemblyCount", FixedInt32, since(20, 0)),
    field!("nameIndex", FixedInt32),
    field!("cultureIndex", FixedInt32),
    field!("hashValueIndex", FixedInt32, until(24, 3)),
    field!("publicKeyIndex", FixedInt32),
    field!("hashAlg", FixedInt32),
    field!("hashLen", FixedInt32),
    field!("flags", FixedInt32),
    field!("major", FixedInt32),
    field!("minor", FixedInt32),
    field!("build", FixedInt32),
    field!("revision", FixedInt32),
    field!("publicKeyToken", FixedInt64),
]);

static TYPE_DEFINITION: StructLayout = layout!(TypeDefinition, Metadata, [
    field!("nameIndex", FixedInt32),
    field!("namespaceIndex", FixedInt32),
    field!("customAttributeIndex", FixedInt32, until(24, 0)),
    field!("byvalTypeIndex", FixedInt32),
    field!("byrefTypeIndex", FixedInt32, until(24, 5)),
    field!("declaringTypeIndex", FixedInt32),
    field!("parentIndex", FixedInt32),
    field!("elementTypeIndex", FixedInt32),
    field!("rgctxStartIndex", FixedInt32, until(24, 1)),
    field!("rgctxCount", FixedInt32, until(24, 1)),
    field!("genericContainerIndex", FixedInt32),
    field!("delegateWrapperFromManagedToNativeIndex", FixedInt32, until(22, 0)),
    field!("marshalingFunctionsIndex", FixedInt32, until(22, 0)),
    field!("ccwFunctionIndex", FixedInt32, between((21, 0), (22, 0))),
    field!("guidIndex", FixedInt32, between((21, 0), (22, 0))),
    field!("flags", FixedInt32),
    field!("fieldStart", FixedInt32),
    field!("methodStart", FixedInt32),
    field!("eventStart", FixedInt32),
    field!("propertyStart", FixedInt32),
    field!("nestedTypesStart", FixedInt32),
    field!("interfacesStart", FixedInt32),
    field!("vtableStart", FixedInt32),
    field!("interfaceOffsetsStart", FixedInt32),
    field!("methodCount", FixedInt16),
    field!("propertyCount", FixedInt16),
    field!("fieldCount", FixedInt16),
    field!("eventCount", FixedInt16),
    field!("nestedTypeCount", FixedInt16),
    field!("vtableCount", FixedInt16),
    field!("interfacesCount", FixedInt16),
    field!("interfaceOffsetsCount", FixedInt16),
    field!("bitfield", FixedInt32),
    field!("token", FixedInt32, since(19, 0)),
]);

static METHOD_DEFINITION: StructLayout = layout!(MethodDefinition, Metadata, [
    field!("nameIndex", FixedInt32),
    field!("declaringType", FixedInt32),
    field!("returnType", FixedInt32),
    field!("returnParameterToken", FixedInt32, since(31, 0)),
    field!("parameterStart", FixedInt32),
    field!("customAttributeIndex", FixedInt32, until(24, 0)),
    field!("genericContainerIndex", FixedInt32),
    field!("methodIndex", FixedInt32, until(24, 1)),
    field!("invokerIndex", FixedInt32, until(24, 1)),
    field!("delegateWrapperIndex", FixedInt32, until(24, 1)),
    field!("rgctxStartIndex", FixedInt32, until(24, 1)),
    field!("rgctxCount", FixedInt32, until(24, 1)),
    field!("token", FixedInt32),
    field!("flags", FixedInt16),
    field!("iflags", FixedInt16),
    field!("slot", FixedInt16),
    field!("parameterCount", FixedInt16),
]);

static PARAMETER_DEFINITION: StructLayout = layout!(ParameterDefinition, Metadata, [
    field!("nameIndex", FixedInt32),
    field!("token", FixedInt32),
    field!("customAttributeIndex", FixedInt32, until(24, 0)),
    field!("typeIndex", FixedInt32),
]);

static FIELD_DEFINITION: StructLayout = layout!(FieldDefinition, Metadata, [
    field!("nameIndex", FixedInt32),
    field!("typeIndex", FixedInt32),
    field!("customAttributeIndex", FixedInt32, until(24, 0)),
    field!("token", FixedInt32, since(19, 0)),
]);

static PROPERTY_DEFINITION: StructLayout = layout!(PropertyDefinition, Metadata, [
    field!("nameIndex", FixedInt32),
    field!("get", FixedInt32),
    field!("set", FixedInt32),
    field!("attrs", FixedInt32),
    field!("customAttributeIndex", FixedInt32, until(24, 0)),
    field!("token", FixedInt32, since(19, 0)),
]);

static EVENT_DEFINITION: StructLayout = layout!(EventDefinition, Metadata, [
    field!("nameIndex", FixedInt32),
    field!("typeIndex", FixedInt32),
    field!("add", FixedInt32),
    field!("remove", FixedInt32),
    field!("raise", FixedInt32),
    field!("customAttributeIndex", FixedInt32, until(24, 0)),
    field!("token", FixedInt32, since(19, 0)),
]);

static FIELD_DEFAULT_VALUE: StructLayout = layout!(FieldDefaultValue, Metadata, [
    field!("fieldIndex", FixedInt32),
    field!("typeIndex", FixedInt32),
    field!("dataIndex", FixedInt32),
]);

static PARAMETER_DEFAULT_VALUE: StructLayout = layout!(ParameterDefaultValue, Metadata, [
    field!("parameterIndex", FixedInt32),
    field!("typeIndex", FixedInt32),
    field!("dataIndex", FixedInt32),
]);

static FIELD_MARSHALED_SIZE: StructLayout = layout!(FieldMarshaledSize, Metadata, [
    field!("fieldIndex", FixedInt32),
    field!("typeIndex", FixedInt32),
    field!("size", FixedInt32),
]);

static GENERIC_CONTAINER: StructLayout = layout!(GenericContainer, Metadata, [
    field!("ownerIndex", FixedInt32),
    field!("typeArgc", FixedInt32),
    field!("isMethod", FixedInt32),
    field!("genericParameterStart", FixedInt32),
]);

static GENERIC_PARAMETER: StructLayout = layout!(GenericParameter, Metadata, [
    field!("ownerIndex", FixedInt32),
    field!("nameIndex", FixedInt32),
    field!("constraintsStart", FixedInt16),
    field!("constraintsCount", FixedInt16),
    field!("num", FixedInt16),
    field!("flags", FixedInt16),
]);

static CUSTOM_ATTRIBUTE_TYPE_RANGE: StructLayout = layout!(CustomAttributeTypeRange, Metadata, [
    field!("token", FixedInt32, since(24, 1)),
    field!("start", FixedInt32),
    field!("count", FixedInt32),
]);

static CUSTOM_ATTRIBUTE_DATA_RANGE: StructLayout = layout!(CustomAttributeDataRange, Metadata, [
    field!("token", FixedInt32),
    field!("startOffset", FixedInt32),
]);

static FIELD_REF: StructLayout = layout!(FieldRef, Metadata, [
    field!("typeIndex", FixedInt32),
    field!("fieldIndex", FixedInt32),
]);

static STRING_LITERAL: StructLayout = layout!(StringLiteral, Metadata, [
    field!("length", FixedInt32),
    field!("dataIndex", FixedInt32),
]);

// Registration tables

static CODE_REGISTRATION: StructLayout = layout!(CodeRegistration, Registration, [
    field!("methodPointersCount", NativeInt, until(24, 1)),
    field!("methodPointers", NativeInt, until(24, 1)),
    field!("delegateWrappersFromNativeToManagedCount", NativeInt, until(21, 0)),
    field!("delegateWrappersFromNativeToManaged", NativeInt, until(21, 0)),
    field!("reversePInvokeWrapperCount", NativeInt, since(22, 0)),
    field!("reversePInvokeWrappers", NativeInt, since(22, 0)),
    field!("delegateWrappersFromManagedToNativeCount", NativeInt, until(22, 0)),
    field!("delegateWrappersFromManagedToNative", NativeInt, until(22, 0)),
    field!("marshalingFunctionsCount", NativeInt, until(22, 0)),
    field!("marshalingFunctions", NativeInt, until(22, 0)),
    field!("ccwMarshalingFunctionsCount", NativeInt, between((21, 0), (22, 0))),
    field!("ccwMarshalingFunctions", NativeInt, between((21, 0), (22, 0))),
    field!("genericMethodPointersCount", NativeInt),
    field!("genericMethodPointers", NativeInt),
    field!("genericAdjustorThunks", NativeInt, only(24, 5), since(27, 1)),
    field!("invokerPointersCount", NativeInt),
    field!("invokerPointers", NativeInt),
    field!("customAttributeCount", NativeInt, until(24, 5)),
    field!("customAttributeGenerators", NativeInt, until(24, 5)),
    field!("guidCount", NativeInt, between((21, 0), (22, 0))),
    field!("guids", NativeInt, between((21, 0), (22, 0))),
    field!("unresolvedVirtualCallCount", NativeInt, since(22, 0)),
    field!("unresolvedVirtualCallPointers", NativeInt, since(22, 0)),
    field!("unresolvedInstanceCallPointers", NativeInt, since(29, 1)),
    field!("unresolvedStaticCallPointers", NativeInt, since(29, 1)),
    field!("interopDataCount", NativeInt, since(23, 0)),
    field!("interopData", NativeInt, since(23, 0)),
    field!("windowsRuntimeFactoryCount", NativeInt, since(24, 3)),
    field!("windowsRuntimeFactoryTable", NativeInt, since(24, 3)),
    field!("codeGenModulesCount", NativeInt, since(24, 2)),
    field!("codeGenModules", NativeInt, since(24, 2)),
]);

static METADATA_REGISTRATION: StructLayout = layout!(MetadataRegistration, Registration, [
    field!("genericClassesCount", NativeInt),
    field!("genericClasses", NativeInt),
    field!("genericInstsCount", NativeInt),
    field!("genericInsts", NativeInt),
    field!("genericMethodTableCount", NativeInt),
    field!("genericMethodTable", NativeInt),
    field!("typesCount", NativeInt),
    field!("types", NativeInt),
    field!("methodSpecsCount", NativeInt),
    field!("methodSpecs", NativeInt),
    field!("methodReferencesCount", NativeInt, until(16, 0)),
    field!("methodReferences", NativeInt, until(16, 0)),
    field!("fieldOffsetsCount", NativeInt),
    field!("fieldOffsets", NativeInt),
    field!("typeDefinitionsSizesCount", NativeInt),
    field!("typeDefinitionsSizes", NativeInt),
    field!("metadataUsagesCount", NativeInt, since(19, 0)),
    field!("metadataUsages", NativeInt, since(19, 0)),
]);

static TYPE_DESCRIPTOR: StructLayout = layout!(TypeDescriptor, Registration, [
    field!("datapoint", NativeInt),
    field!("bits", FixedInt32),
]);

static GENERIC_CLASS: StructLayout = layout!(GenericClass, Registration, [
    field!("typeDefinitionIndex", NativeInt, until(24, 5)),
    field!("type", NativeInt, since(27, 0)),
    field!("classInst", NativeInt),
    field!("methodInst", NativeInt),
    field!("cachedClass", NativeInt),
]);

static GENERIC_CONTEXT: StructLayout = layout!(GenericContext, Registration, [
    field!("classInst", NativeInt),
    field!("methodInst", NativeInt),
]);

static GENERIC_INST: StructLayout = layout!(GenericInst, Registration, [
    field!("typeArgc", NativeInt),
    field!("typeArgv", NativeInt),
]);

// Read sequentially; the byte fields are not followed by alignment padding.
static ARRAY_TYPE: StructLayout = layout!(ArrayType, Registration, [
    field!("etype", NativeInt),
    field!("rank", Byte),
    field!("numsizes", Byte),
    field!("numlobounds", Byte),
    field!("sizes", NativeInt),
    field!("lobounds", NativeInt),
]);

static METHOD_SPEC: StructLayout = layout!(MethodSpec, Registration, [
    field!("methodDefinitionIndex", FixedInt32),
    field!("classIndexIndex", FixedInt32),
    field!("methodIndexIndex", FixedInt32),
]);

static GENERIC_METHOD_FUNCTIONS: StructLayout = layout!(GenericMethodFunctions, Registration, [
    field!("genericMethodIndex", FixedInt32),
    field!("methodIndex", FixedInt32),
    field!("invokerIndex", FixedInt32),
    field!("adjustorThunkIndex", FixedInt32, only(24, 5), since(27, 1)),
]);

static CODE_GEN_MODULE: StructLayout = layout!(CodeGenModule, Registration, [
    field!("moduleName", NativeInt),
    field!("methodPointerCount", NativeInt),
    field!("methodPointers", NativeInt),
    field!("adjustorThunkCount", NativeInt, only(24, 5), since(27, 1)),
    field!("adjustorThunks", NativeInt, only(24, 5), since(27, 1)),
    field!("invokerIndices", NativeInt),
    field!("reversePInvokeWrapperCount", NativeInt),
    field!("reversePInvokeWrapperIndices", NativeInt),
    field!("rgctxRangesCount", NativeInt),
    field!("rgctxRanges", NativeInt),
    field!("rgctxsCount", NativeInt),
    field!("rgctxs", NativeInt),
    field!("debuggerMetadata", NativeInt),
    field!("customAttributeCacheGenerator", NativeInt, between((27, 0), (27, 2))),
    field!("moduleInitializer", NativeInt, since(27, 0)),
    field!("staticConstructorTypeIndices", NativeInt, since(27, 0)),
    field!("metadataRegistration", NativeInt, since(27, 0)),
    field!("codeRegistration", NativeInt, since(27, 0)),
]);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        file::PointerWidth,
        metadata::{layout::struct_size, version::VersionPair},
    };

    #[test]
    fn header_size_marks_24_2() {
        // Without the rgctx section the string literal table starts right after the header
        let size = |version| {
            struct_size(
                StructKind::MetadataHeader,
                VersionPair::uniform(version),
                PointerWidth::Bits64,
            )
            .unwrap()
        };
        assert_eq!(size(v(24, 1)), 272);
        assert_eq!(size(v(24, 2)), 264);
    }

    #[test]
    fn window_bounds_inclusive() {
        let window = between((21, 0), (22, 0));
        assert!(window.contains(v(21, 0)));
        assert!(window.contains(v(22, 0)));
        assert!(!window.contains(v(20, 0)));
        assert!(!window.contains(v(23, 0)));

        assert!(until(24, 1).contains(v(24, 1)));
        assert!(!until(24, 1).contains(v(24, 2)));
        assert!(since(27, 1).contains(v(31, 0)));
    }

    #[test]
    fn field_names_unique() {
        use strum::IntoEnumIterator;

        for kind in StructKind::iter() {
            let fields = layout(kind).fields;
            for (i, a) in fields.iter().enumerate() {
                assert!(
                    fields[i + 1..].iter().all(|b| b.name != a.name),
                    "{kind}: duplicate {}",
                    a.name
                );
            }
        }
    }
}
