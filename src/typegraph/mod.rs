//! The resolved type graph.
//!
//! A [`TypeGraph`] is the closed, de-duplicated set of classes reachable from the type
//! definitions of a [`MetadataSet`]: every definition, every generic instantiation a member
//! signature mentions, and optionally every instantiation the registration tables list. Each
//! class exists once per [`GenericInstantiationKey`], has a canonical qualified name, fields in
//! name order and methods in signature order with unique identifiers.
//!
//! The graph owns everything. Classes refer to each other through [`ClassId`]s into the
//! graph's class arena, and types through [`TypeId`]s into its interner.
//!
//! # Examples
//!
//! ```rust,no_run
//! use il2scope::{metadata::decoder::MetadataSet, LoadConfig, TypeGraph};
//!
//! # fn example(set: &MetadataSet<'_>) {
//! let graph = TypeGraph::build(set, &LoadConfig::default());
//! for image in graph.images() {
//!     for ty in image.types() {
//!         println!("{} ({} methods)", ty.qualified_name, ty.methods.len());
//!     }
//! }
//!
//! for failure in &graph.report().failures {
//!     eprintln!("{}: {}", failure.subject, failure.error);
//! }
//! # }
//! ```

pub mod class;
pub mod naming;
pub mod resolver;
pub mod types;
mod view;

pub use class::{
    GenericInstantiationKey, ResolvedClass, ResolvedField, ResolvedMethod, ResolvedParameter,
};
pub use naming::Renderer;
pub use resolver::{
    GenericContext, ResolutionFailure, ResolutionReport, Resolver, TypeSource,
};
pub use types::{ClassId, ResolvedType, TypeId, TypeInterner};
pub use view::{FieldInfo, ImageInfo, MethodInfo, ParameterInfo, TypeInfo};

use dashmap::DashMap;

use crate::{config::LoadConfig, metadata::decoder::MetadataSet};

/// An image and its resolved top-level classes
pub(crate) struct ImageEntry {
    pub(crate) name: String,
    pub(crate) types: Vec<ClassId>,
}

/// The resolved classes of one metadata set.
pub struct TypeGraph {
    pub(crate) types: TypeInterner,
    pub(crate) classes: boxcar::Vec<ResolvedClass>,
    pub(crate) memo: DashMap<GenericInstantiationKey, ClassId>,
    pub(crate) images: Vec<ImageEntry>,
    pub(crate) report: ResolutionReport,
}

impl TypeGraph {
    /// Resolves every type definition of `metadata`.
    ///
    /// Classes that fail to resolve are left out and listed in [`TypeGraph::report`].
    #[must_use]
    pub fn build(metadata: &MetadataSet<'_>, config: &LoadConfig) -> TypeGraph {
        let resolver = Resolver::new(metadata, config);
        resolver.run();
        resolver.into_graph()
    }

    /// The class behind `id`. Classes that failed to resolve are returned too; check
    /// [`ResolvedClass::is_resolved`].
    #[must_use]
    pub fn class(&self, id: ClassId) -> Option<&ResolvedClass> {
        self.classes.get(id.index())
    }

    /// Every resolved class, in creation order
    #[allow(clippy::cast_possible_truncation)]
    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ResolvedClass)> {
        self.classes
            .iter()
            .filter(|(_, class)| class.is_resolved())
            .map(|(index, class)| (ClassId(index as u32), class))
    }

    /// The class created for `key`
    #[must_use]
    pub fn lookup(&self, key: &GenericInstantiationKey) -> Option<ClassId> {
        self.memo.get(key).map(|id| *id)
    }

    /// The resolved type definition with the given qualified name
    #[must_use]
    pub fn find(&self, qualified_name: &str) -> Option<ClassId> {
        self.classes()
            .find(|(_, class)| !class.is_instantiation() && class.qualified_name == qualified_name)
            .map(|(id, _)| id)
    }

    /// Resolved instantiations of type definition `definition`
    #[must_use]
    pub fn instantiations_of(&self, definition: u32) -> Vec<ClassId> {
        self.classes()
            .filter(|(_, class)| class.is_instantiation() && class.definition() == definition)
            .map(|(id, _)| id)
            .collect()
    }

    /// The type behind `id`
    #[must_use]
    pub fn ty(&self, id: TypeId) -> Option<&ResolvedType> {
        self.types.get(id)
    }

    /// The type interner
    #[must_use]
    pub fn types(&self) -> &TypeInterner {
        &self.types
    }

    /// Renders types and classes of this graph
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        Renderer::new(&self.types, &self.classes)
    }

    /// Failures and counts of the run that built the graph
    #[must_use]
    pub fn report(&self) -> &ResolutionReport {
        &self.report
    }
}
