//! Read-only, rendered view of a [`TypeGraph`] for emitters.
//!
//! The view flattens the graph into owned trees: images hold their top-level types, types hold
//! their nested types, and every member carries its display and native names already rendered.

use std::collections::HashSet;

use crate::typegraph::{
    class::{ResolvedField, ResolvedMethod},
    naming::Renderer,
    types::{ClassId, ResolvedType},
    TypeGraph,
};

/// An image with its top-level types, in definition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// Module name, `Assembly-CSharp.dll`
    pub name: String,
    /// Resolved top-level types
    pub types: Vec<TypeInfo>,
}

impl ImageInfo {
    /// Top-level types of the image
    #[must_use]
    pub fn types(&self) -> &[TypeInfo] {
        &self.types
    }

    /// Finds a type anywhere in the image by qualified name
    #[must_use]
    pub fn find(&self, qualified_name: &str) -> Option<&TypeInfo> {
        self.types.iter().find_map(|ty| ty.find(qualified_name))
    }
}

/// A rendered class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// The class in the graph
    pub id: ClassId,
    /// Namespace of the outermost declaring type
    pub namespace: String,
    /// Metadata name
    pub name: String,
    /// `::` path of sanitized identifiers
    pub qualified_name: String,
    /// C# spelling without namespace
    pub display_name: String,
    /// Native storage name of a value of the class
    pub native_name: String,
    /// Value type
    pub is_valuetype: bool,
    /// Enum
    pub is_enum: bool,
    /// Interface
    pub is_interface: bool,
    /// Fields, ordered by name
    pub fields: Vec<FieldInfo>,
    /// Methods, ordered by signature
    pub methods: Vec<MethodInfo>,
    /// Resolved nested types
    pub nested: Vec<TypeInfo>,
}

impl TypeInfo {
    /// This type or a nested type with `qualified_name`
    #[must_use]
    pub fn find(&self, qualified_name: &str) -> Option<&TypeInfo> {
        if self.qualified_name == qualified_name {
            return Some(self);
        }
        self.nested.iter().find_map(|ty| ty.find(qualified_name))
    }

    /// The field named `name`
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The method with unique identifier `unique_id`
    #[must_use]
    pub fn method(&self, unique_id: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|method| method.unique_id == unique_id)
    }
}

/// A rendered field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// C# spelling of the field type
    pub display_name: String,
    /// Native storage name of the field type
    pub native_name: String,
    /// Per-type rather than per-instance
    pub is_static: bool,
}

/// A rendered method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Method name
    pub name: String,
    /// Identifier unique within the declaring type
    pub unique_id: String,
    /// `[static ]<return> <name>(<type> <param>, ...)`
    pub signature: String,
    /// No `this` parameter
    pub is_static: bool,
    /// The method returns nothing
    pub is_void: bool,
    /// C# spelling of the return type
    pub display_name: String,
    /// Native storage name of the return type
    pub native_name: String,
    /// Parameters in declaration order
    pub parameters: Vec<ParameterInfo>,
    /// Native code address
    pub address: Option<u64>,
}

/// A rendered parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: String,
    /// C# spelling of the parameter type
    pub display_name: String,
    /// Native storage name of the parameter type
    pub native_name: String,
}

impl TypeGraph {
    /// Renders every image with its resolved top-level types.
    #[must_use]
    pub fn images(&self) -> Vec<ImageInfo> {
        self.images
            .iter()
            .map(|image| ImageInfo {
                name: image.name.clone(),
                types: image
                    .types
                    .iter()
                    .filter_map(|&id| self.type_info(id))
                    .collect(),
            })
            .collect()
    }

    /// Renders one resolved class with its nested classes.
    ///
    /// A class is rendered at most once per call; a nested type seen again is skipped.
    #[must_use]
    pub fn type_info(&self, id: ClassId) -> Option<TypeInfo> {
        self.type_info_in(id, &mut HashSet::new())
    }

    fn type_info_in(&self, id: ClassId, visited: &mut HashSet<ClassId>) -> Option<TypeInfo> {
        let class = self.class(id).filter(|class| class.is_resolved())?;
        if !visited.insert(id) {
            return None;
        }
        let renderer = self.renderer();

        Some(TypeInfo {
            id,
            namespace: class.namespace.clone(),
            name: class.name.clone(),
            qualified_name: class.qualified_name.clone(),
            display_name: renderer.class_display(id),
            native_name: renderer.class_native(id),
            is_valuetype: class.is_valuetype,
            is_enum: class.is_enum,
            is_interface: class.is_interface(),
            fields: class
                .fields()
                .iter()
                .map(|field| field_info(&renderer, field))
                .collect(),
            methods: class
                .methods()
                .iter()
                .map(|method| self.method_info(&renderer, method))
                .collect(),
            nested: class
                .nested()
                .iter()
                .filter_map(|&nested| self.type_info_in(nested, visited))
                .collect(),
        })
    }

    fn method_info(&self, renderer: &Renderer<'_>, method: &ResolvedMethod) -> MethodInfo {
        MethodInfo {
            name: method.name.clone(),
            unique_id: method.unique_id.clone(),
            signature: method.signature.clone(),
            is_static: method.is_static,
            is_void: matches!(self.ty(method.return_type), Some(ResolvedType::Void)),
            display_name: renderer.display(method.return_type),
            native_name: renderer.native(method.return_type),
            parameters: method
                .parameters
                .iter()
                .map(|parameter| ParameterInfo {
                    name: parameter.name.clone(),
                    display_name: renderer.display(parameter.ty),
                    native_name: renderer.native(parameter.ty),
                })
                .collect(),
            address: method.address,
        }
    }
}

fn field_info(renderer: &Renderer<'_>, field: &ResolvedField) -> FieldInfo {
    FieldInfo {
        name: field.name.clone(),
        display_name: renderer.display(field.ty),
        native_name: renderer.native(field.ty),
        is_static: field.is_static,
    }
}
