//! Materialization of the class graph.
//!
//! The [`Resolver`] turns the flat tables of a [`MetadataSet`] into [`ResolvedClass`]es. Work
//! happens in two phases:
//!
//! 1. **Creation.** [`Resolver::resolve_class`] looks a [`GenericInstantiationKey`] up in the
//!    memo table and, on a miss, creates the class with its names and declaring class only.
//!    The class is in the memo table from that point on, so a member type that refers back to
//!    the class being resolved (`Node<T> next`) finds it instead of recursing.
//! 2. **Completion.** Fields, methods and nested classes of every created class are resolved
//!    in arena order. Resolving members may create further classes, which are completed in a
//!    following round until no new class appears.
//!
//! Generic parameters are substituted while member types are resolved: a `VAR` with position
//! `n` becomes the `n`th class argument of the key. Every instantiation has a depth derived
//! from its key alone, one more than the deepest of its arguments, so equal keys always resolve
//! to the same members no matter which path or thread reached them first. Past
//! [`LoadConfig::max_generic_depth`] the open definition is used instead and the truncation is
//! counted.
//!
//! A dangling index fails the class being completed with
//! [`crate::Error::UnresolvedTypeReference`]. The class is left out of the graph, the failure
//! is recorded, and everything else is resolved as usual. A nested type table entry naming a
//! type declared elsewhere counts as a dangling index of the owner.

use std::{
    ops::Range,
    sync::{
        atomic::{AtomicUsize, Ordering},
        OnceLock,
    },
};

use crossbeam_skiplist::SkipMap;
use dashmap::{mapref::entry::Entry, DashMap};
use rayon::prelude::*;

use crate::{
    config::LoadConfig,
    metadata::{
        decoder::MetadataSet,
        registration::{GenericClass, GenericClassDefinition, RegistrationSet},
        tables::{TypeAttributes, TypeDefinition},
        typedesc::{RawTypeDescriptor, TypeKind, TypePayload},
    },
    typegraph::{
        class::{
            GenericInstantiationKey, ResolvedClass, ResolvedField, ResolvedMethod,
            ResolvedParameter,
        },
        naming::{method_signature, qualified_name, unique_ids, Renderer},
        types::{ClassId, ResolvedType, TypeId, TypeInterner},
        ImageEntry, TypeGraph,
    },
    Error, Result,
};

/// Longest chain of pointer, array and by-reference descriptors followed for one type
const MAX_DESCRIPTOR_NESTING: usize = 64;

/// Deepest declaring chain followed for one nested type
const MAX_DECLARING_CHAIN: usize = 64;

/// Generic arguments in scope while resolving a type.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericContext<'k> {
    /// Substitutes for `VAR` parameters
    pub class_args: &'k [TypeId],
    /// Substitutes for `MVAR` parameters
    pub method_args: &'k [TypeId],
}

/// Where a type to resolve comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSource {
    /// Index into the registration `types` table
    Index(u32),
    /// Address of a type descriptor in the native image
    Address(u64),
    /// Type definition index, naming the non-generic class or open definition
    Definition(u32),
}

/// A class, type definition or registration entry that could not be resolved.
#[derive(Debug)]
pub struct ResolutionFailure {
    /// The type definition involved, when known
    pub definition: Option<u32>,
    /// What was being resolved
    pub subject: String,
    /// Why it failed
    pub error: Error,
}

/// Outcome of a resolution run.
#[derive(Debug, Default)]
pub struct ResolutionReport {
    /// Failures, ordered by type definition index; failures without one come last
    pub failures: Vec<ResolutionFailure>,
    /// Number of fully resolved classes, instantiations included
    pub classes: usize,
    /// Number of fully resolved generic instantiations
    pub instantiations: usize,
    /// Number of instantiations replaced by their open definition at the depth bound
    pub truncated: usize,
}

impl ResolutionReport {
    /// Whether every class resolved without failure or truncation
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.truncated == 0
    }
}

/// Everything of a class but its members.
struct ClassShell {
    image: Option<usize>,
    namespace: String,
    name: String,
    qualified_name: String,
    declaring: Option<ClassId>,
    generic_args: Vec<TypeId>,
    flags: TypeAttributes,
    is_valuetype: bool,
    is_enum: bool,
    token: Option<u32>,
    depth: usize,
}

/// Builds a [`TypeGraph`] from a decoded metadata set.
///
/// # Examples
///
/// ```rust,no_run
/// use il2scope::{
///     metadata::decoder::MetadataSet,
///     typegraph::{GenericInstantiationKey, Resolver},
///     LoadConfig,
/// };
///
/// # fn example(set: &MetadataSet<'_>) -> il2scope::Result<()> {
/// let resolver = Resolver::new(set, &LoadConfig::default());
/// let player = resolver.resolve_class(&GenericInstantiationKey::definition(0))?;
/// resolver.run();
///
/// let graph = resolver.into_graph();
/// println!("{}", graph.class(player).unwrap().qualified_name);
/// # Ok(())
/// # }
/// ```
pub struct Resolver<'m, 'a> {
    metadata: &'m MetadataSet<'a>,
    config: LoadConfig,
    types: TypeInterner,
    classes: boxcar::Vec<ResolvedClass>,
    memo: DashMap<GenericInstantiationKey, ClassId>,
    image_of: Vec<Option<usize>>,
    failures: SkipMap<(u32, usize), ResolutionFailure>,
    materialize_failures: AtomicUsize,
    truncated: AtomicUsize,
}

impl<'m, 'a> Resolver<'m, 'a> {
    /// Creates a resolver over `metadata`. Nothing is resolved yet.
    #[must_use]
    pub fn new(metadata: &'m MetadataSet<'a>, config: &LoadConfig) -> Self {
        let mut image_of = vec![None; metadata.type_definitions.len()];
        for (image_index, image) in metadata.images.iter().enumerate() {
            let Ok(start) = usize::try_from(image.type_start) else {
                continue;
            };
            let end = start
                .saturating_add(image.type_count as usize)
                .min(image_of.len());
            for slot in image_of.iter_mut().take(end).skip(start) {
                *slot = Some(image_index);
            }
        }

        Resolver {
            metadata,
            config: *config,
            types: TypeInterner::new(),
            classes: boxcar::Vec::new(),
            memo: DashMap::new(),
            image_of,
            failures: SkipMap::new(),
            materialize_failures: AtomicUsize::new(0),
            truncated: AtomicUsize::new(0),
        }
    }

    fn registration(&self) -> &'m RegistrationSet<'a> {
        &self.metadata.registration
    }

    /// The interned types created so far
    #[must_use]
    pub fn types(&self) -> &TypeInterner {
        &self.types
    }

    /// The class behind `id`, resolved or not
    #[must_use]
    pub fn class(&self, id: ClassId) -> Option<&ResolvedClass> {
        self.classes.get(id.index())
    }

    /// A renderer over the classes created so far
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        Renderer::new(&self.types, &self.classes)
    }

    /// Resolves every type definition, the registration's generic classes if configured, and
    /// then the members of every class reached.
    pub fn run(&self) {
        let definitions = u32::try_from(self.metadata.type_definitions.len()).unwrap_or(u32::MAX);
        let seed = |definition: u32| {
            if let Err(error) = self.resolve_definition(definition, 0) {
                self.record(
                    (definition, usize::MAX),
                    Some(definition),
                    format!("type definition {definition}"),
                    error,
                );
            }
        };
        if self.config.parallel {
            (0..definitions).into_par_iter().for_each(seed);
        } else {
            (0..definitions).for_each(seed);
        }

        if self.config.materialize_generic_instances {
            let classes = self.registration().generic_classes();
            let materialize = |(position, &va): (usize, &u64)| {
                let context = GenericContext::default();
                if let Err(error) = self.resolve_generic_class(va, &context, 0) {
                    self.materialize_failures.fetch_add(1, Ordering::Relaxed);
                    self.record(
                        (u32::MAX, position),
                        None,
                        format!("generic class 0x{va:X}"),
                        error,
                    );
                }
            };
            if self.config.parallel {
                classes.par_iter().enumerate().for_each(materialize);
            } else {
                classes.iter().enumerate().for_each(materialize);
            }
        }

        self.complete_pending();
    }

    /// Completes classes in arena order until no class is left without members.
    #[allow(clippy::cast_possible_truncation)]
    fn complete_pending(&self) {
        let complete = |index: usize| {
            let id = ClassId(index as u32);
            if let Err(error) = self.complete(id) {
                let (definition, subject) = match self.class(id) {
                    Some(class) => (class.definition(), self.renderer().class_full_display(id)),
                    None => (u32::MAX, format!("class {index}")),
                };
                self.record((definition, index), Some(definition), subject, error);
            }
        };

        let mut done = 0;
        loop {
            let end = self.classes.count();
            if done >= end {
                break;
            }

            if self.config.parallel {
                (done..end).into_par_iter().for_each(complete);
            } else {
                (done..end).for_each(complete);
            }
            done = end;
        }
    }

    fn record(&self, key: (u32, usize), definition: Option<u32>, subject: String, error: Error) {
        if error.is_recoverable() {
            log::warn!("failed to resolve {}: {}", subject, error);
        } else {
            log::error!("failed to resolve {}: {}", subject, error);
        }
        self.failures.insert(
            key,
            ResolutionFailure {
                definition,
                subject,
                error,
            },
        );
    }

    /// Resolves a type in `context`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedTypeReference`] for a dangling index, or an address
    /// space error for a descriptor the image does not back.
    pub fn resolve_type(&self, source: TypeSource, context: &GenericContext<'_>) -> Result<TypeId> {
        match source {
            TypeSource::Index(index) => {
                let descriptor = self.descriptor(index)?;
                self.resolve_descriptor(&descriptor, context, 0)
            }
            TypeSource::Address(va) => {
                let descriptor = self.registration().type_at(va)?;
                self.resolve_descriptor(&descriptor, context, 0)
            }
            TypeSource::Definition(definition) => {
                let class = self.resolve_definition(definition, 0)?;
                Ok(self.types.intern(ResolvedType::Class(class)))
            }
        }
    }

    /// Returns the class for `key`, creating it on first request.
    ///
    /// Equal keys always yield the same [`ClassId`]. Members of a newly created class are
    /// resolved by the next [`Resolver::run`].
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedTypeReference`] if the definition or its declaring
    /// chain refers to missing entries.
    pub fn resolve_class(&self, key: &GenericInstantiationKey) -> Result<ClassId> {
        if !key.is_instantiation() {
            return self.resolve_definition(key.definition, 0);
        }
        if let Some(id) = self.memo.get(key) {
            return Ok(*id);
        }

        let shell = self.instance_shell(key)?;
        Ok(self.insert(key.clone(), shell))
    }

    /// Generic nesting depth of `key`: zero for a definition, otherwise one more than the
    /// deepest argument.
    fn key_depth(&self, key: &GenericInstantiationKey) -> usize {
        if !key.is_instantiation() {
            return 0;
        }
        key.class_args
            .iter()
            .chain(&key.method_args)
            .map(|&arg| self.type_depth(arg))
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Nesting depth of a resolved type; arrays, pointers and references add a level.
    fn type_depth(&self, id: TypeId) -> usize {
        match self.types.get(id) {
            Some(ResolvedType::Class(class)) => self.class(*class).map_or(0, |class| class.depth),
            Some(
                ResolvedType::Array { element, .. }
                | ResolvedType::Pointer(element)
                | ResolvedType::ByRef(element),
            ) => self.type_depth(*element) + 1,
            _ => 0,
        }
    }

    fn resolve_definition(&self, definition: u32, chain: usize) -> Result<ClassId> {
        let key = GenericInstantiationKey::definition(definition);
        if let Some(id) = self.memo.get(&key) {
            return Ok(*id);
        }

        let shell = self.definition_shell(definition, chain)?;
        Ok(self.insert(key, shell))
    }

    /// Publishes a class for `key`, unless another thread got there first.
    #[allow(clippy::cast_possible_truncation)]
    fn insert(&self, key: GenericInstantiationKey, shell: ClassShell) -> ClassId {
        match self.memo.entry(key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let index = self.classes.push(ResolvedClass {
                    key: entry.key().clone(),
                    image: shell.image,
                    namespace: shell.namespace,
                    name: shell.name,
                    qualified_name: shell.qualified_name,
                    declaring: shell.declaring,
                    generic_args: shell.generic_args,
                    flags: shell.flags,
                    is_valuetype: shell.is_valuetype,
                    is_enum: shell.is_enum,
                    token: shell.token,
                    depth: shell.depth,
                    underlying: OnceLock::new(),
                    nested: OnceLock::new(),
                    fields: OnceLock::new(),
                    methods: OnceLock::new(),
                });
                let id = ClassId(index as u32);
                entry.insert(id);
                id
            }
        }
    }

    fn definition_shell(&self, definition: u32, chain: usize) -> Result<ClassShell> {
        if chain > MAX_DECLARING_CHAIN {
            return Err(unresolved_error!(
                "declaring chain of type definition {} is deeper than {}",
                definition,
                MAX_DECLARING_CHAIN
            ));
        }

        let def = self.definition(definition)?;
        let declaring = match def.declaring_type_index {
            Some(index) => {
                let descriptor = self.descriptor(index)?;
                let outer = self.definition_of(&descriptor)?;
                Some(self.resolve_definition(outer, chain + 1)?)
            }
            None => None,
        };

        let name = self.metadata.string(def.name_index)?.to_string();
        let (namespace, qualified) = match declaring.and_then(|id| self.class(id)) {
            Some(outer) => (
                outer.namespace.clone(),
                qualified_name("", Some(&outer.qualified_name), &name),
            ),
            None => {
                let namespace = self.metadata.string(def.namespace_index)?.to_string();
                let qualified = qualified_name(&namespace, None, &name);
                (namespace, qualified)
            }
        };

        Ok(ClassShell {
            image: self.image_of.get(definition as usize).copied().flatten(),
            namespace,
            name,
            qualified_name: qualified,
            declaring,
            generic_args: self.generic_parameters(def)?,
            flags: def.attributes(),
            is_valuetype: def.is_valuetype(),
            is_enum: def.is_enum(),
            token: def.token,
            depth: 0,
        })
    }

    fn instance_shell(&self, key: &GenericInstantiationKey) -> Result<ClassShell> {
        let definition = self.resolve_definition(key.definition, 0)?;
        let base = self.class(definition).ok_or_else(|| {
            unresolved_error!("class {} of type definition {}", definition.index(), key.definition)
        })?;

        Ok(ClassShell {
            image: base.image,
            namespace: base.namespace.clone(),
            name: base.name.clone(),
            qualified_name: base.qualified_name.clone(),
            declaring: base.declaring,
            generic_args: key.class_args.clone(),
            flags: base.flags,
            is_valuetype: base.is_valuetype,
            is_enum: base.is_enum,
            token: base.token,
            depth: self.key_depth(key),
        })
    }

    /// Open parameters of a generic definition, as unsubstituted generic parameter types
    fn generic_parameters(&self, def: &TypeDefinition) -> Result<Vec<TypeId>> {
        let Some(container_index) = def.generic_container_index else {
            return Ok(Vec::new());
        };
        let container = self
            .metadata
            .generic_containers
            .get(container_index as usize)
            .ok_or_else(|| {
                unresolved_error!(
                    "generic container {} outside the {} declared",
                    container_index,
                    self.metadata.generic_containers.len()
                )
            })?;

        let count = container.type_argc as usize;
        let start = match container.generic_parameter_start {
            Some(start) => start as usize,
            None if count == 0 => 0,
            None => {
                return Err(unresolved_error!(
                    "generic container {} declares {} parameters without a first one",
                    container_index,
                    count
                ))
            }
        };
        let range = checked_range(start, count, self.metadata.generic_parameters.len())
            .ok_or_else(|| {
                unresolved_error!(
                    "generic parameters {}..{} of container {} outside the {} declared",
                    start,
                    start + count,
                    container_index,
                    self.metadata.generic_parameters.len()
                )
            })?;

        self.metadata.generic_parameters[range]
            .iter()
            .map(|parameter| {
                Ok(self.types.intern(ResolvedType::GenericParameter {
                    index: parameter.num,
                    method_level: false,
                    name: self.metadata.string(parameter.name_index)?.to_string(),
                }))
            })
            .collect()
    }

    /// Resolves the members of a created class and publishes them.
    fn complete(&self, id: ClassId) -> Result<()> {
        let class = self
            .class(id)
            .ok_or_else(|| unresolved_error!("class {} is not in the arena", id.index()))?;
        let def = self.definition(class.definition())?;
        let context = GenericContext {
            class_args: &class.key.class_args,
            method_args: &class.key.method_args,
        };

        let underlying = match def.element_type_index {
            Some(index) if class.is_enum => Some(self.resolve_type(TypeSource::Index(index), &context)?),
            _ => None,
        };
        let fields = self.resolve_fields(id, def, &context)?;
        let methods = self.resolve_methods(id, class, def, &context)?;
        let nested = if class.is_instantiation() {
            Vec::new()
        } else {
            self.resolve_nested(id, class.definition(), def)?
        };

        if let Some(underlying) = underlying {
            let _ = class.underlying.set(underlying);
        }
        let _ = class.nested.set(nested);
        let _ = class.fields.set(fields);
        let _ = class.methods.set(methods);
        Ok(())
    }

    fn resolve_fields(
        &self,
        id: ClassId,
        def: &TypeDefinition,
        context: &GenericContext<'_>,
    ) -> Result<Vec<ResolvedField>> {
        let range = member_range(
            "field",
            def.field_start,
            usize::from(def.field_count),
            self.metadata.fields.len(),
        )?;

        let mut fields = self.metadata.fields[range]
            .iter()
            .map(|field| {
                let name = self.metadata.string(field.name_index)?.to_string();
                let index = field
                    .type_index
                    .ok_or_else(|| unresolved_error!("field {} has no type", name))?;
                let descriptor = self.descriptor(index)?;

                Ok(ResolvedField {
                    is_static: descriptor.is_static(),
                    ty: self.resolve_descriptor(&descriptor, context, 0)?,
                    declaring: id,
                    token: field.token,
                    name,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        fields.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fields)
    }

    fn resolve_methods(
        &self,
        id: ClassId,
        class: &ResolvedClass,
        def: &TypeDefinition,
        context: &GenericContext<'_>,
    ) -> Result<Vec<ResolvedMethod>> {
        let range = member_range(
            "method",
            def.method_start,
            usize::from(def.method_count),
            self.metadata.methods.len(),
        )?;
        let image_name = class.image.and_then(|image| self.metadata.image_name(image));
        let renderer = self.renderer();

        let mut methods = Vec::with_capacity(range.len());
        for method in &self.metadata.methods[range] {
            let name = self.metadata.string(method.name_index)?.to_string();
            let return_type = match method.return_type {
                Some(index) => self.resolve_type(TypeSource::Index(index), context)?,
                None => self.types.intern(ResolvedType::Void),
            };

            let parameter_range = member_range(
                "parameter",
                method.parameter_start,
                usize::from(method.parameter_count),
                self.metadata.parameters.len(),
            )?;
            let parameters = self.metadata.parameters[parameter_range]
                .iter()
                .map(|parameter| {
                    let name = self.metadata.string(parameter.name_index)?.to_string();
                    let index = parameter
                        .type_index
                        .ok_or_else(|| unresolved_error!("parameter {} has no type", name))?;
                    Ok(ResolvedParameter {
                        ty: self.resolve_type(TypeSource::Index(index), context)?,
                        name,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let rendered: Vec<(String, String)> = parameters
                .iter()
                .map(|parameter| (renderer.display(parameter.ty), parameter.name.clone()))
                .collect();
            let signature = method_signature(
                method.is_static(),
                &renderer.display(return_type),
                &name,
                &rendered,
            );

            // Instantiations share the code of their definition or a shared generic variant
            let address = if class.is_instantiation() {
                None
            } else {
                image_name.and_then(|image| self.registration().method_address(image, method))
            };

            methods.push(ResolvedMethod {
                name,
                unique_id: String::new(),
                signature,
                is_static: method.is_static(),
                return_type,
                parameters,
                declaring: id,
                token: method.token,
                address,
            });
        }

        methods.sort_by(|a, b| a.signature.cmp(&b.signature));
        let ids = unique_ids(
            &methods
                .iter()
                .map(|method| (method.name.as_str(), method.parameters.len()))
                .collect::<Vec<_>>(),
        );
        for (method, unique_id) in methods.iter_mut().zip(ids) {
            method.unique_id = unique_id;
        }
        Ok(methods)
    }

    /// Nested classes of `owner`; every entry must be declared by `owner` itself.
    fn resolve_nested(
        &self,
        owner: ClassId,
        definition: u32,
        def: &TypeDefinition,
    ) -> Result<Vec<ClassId>> {
        let range = member_range(
            "nested type",
            def.nested_types_start,
            usize::from(def.nested_type_count),
            self.metadata.nested_types.len(),
        )?;

        self.metadata.nested_types[range]
            .iter()
            .map(|&nested| {
                let index = u32::try_from(nested).map_err(|_| {
                    unresolved_error!("type definition {} nests type {}", definition, nested)
                })?;
                let id = self.resolve_definition(index, 0)?;
                let declaring = self.class(id).and_then(|class| class.declaring);
                if declaring != Some(owner) {
                    return Err(unresolved_error!(
                        "type definition {} nests type definition {}, which is not declared by it",
                        definition,
                        index
                    ));
                }
                Ok(id)
            })
            .collect()
    }

    fn resolve_descriptor(
        &self,
        descriptor: &RawTypeDescriptor,
        context: &GenericContext<'_>,
        nesting: usize,
    ) -> Result<TypeId> {
        if nesting > MAX_DESCRIPTOR_NESTING {
            return Err(unresolved_error!(
                "{:?} descriptor nested deeper than {}",
                descriptor.kind,
                MAX_DESCRIPTOR_NESTING
            ));
        }

        let id = match (descriptor.kind, descriptor.payload) {
            (TypeKind::Void, _) => self.types.intern(ResolvedType::Void),
            (_, TypePayload::ClassIndex(definition)) => {
                let class = self.resolve_definition(definition, 0)?;
                self.types.intern(ResolvedType::Class(class))
            }
            (TypeKind::Ptr, TypePayload::ElementType(va)) => {
                let element = self.resolve_address(va, context, nesting)?;
                self.types.intern(ResolvedType::Pointer(element))
            }
            (TypeKind::ByRef, TypePayload::ElementType(va)) => {
                let element = self.resolve_address(va, context, nesting)?;
                self.types.intern(ResolvedType::ByRef(element))
            }
            (_, TypePayload::ElementType(va)) => {
                let element = self.resolve_address(va, context, nesting)?;
                self.types.intern(ResolvedType::Array { element, rank: 1 })
            }
            (_, TypePayload::ArrayType(va)) => {
                let array = self.registration().array_type_at(va)?;
                let element = self.resolve_address(array.etype, context, nesting)?;
                self.types.intern(ResolvedType::Array {
                    element,
                    rank: array.rank.max(1),
                })
            }
            (kind, TypePayload::GenericParameterIndex(index)) => {
                self.resolve_generic_parameter(index, kind == TypeKind::MVar, context)?
            }
            (_, TypePayload::GenericClass(va)) => {
                self.resolve_generic_class(va, context, nesting)?
            }
            (kind, TypePayload::None) => self.types.intern(ResolvedType::Primitive(kind)),
        };

        if descriptor.byref && descriptor.kind != TypeKind::ByRef {
            Ok(self.types.intern(ResolvedType::ByRef(id)))
        } else {
            Ok(id)
        }
    }

    fn resolve_address(
        &self,
        va: u64,
        context: &GenericContext<'_>,
        nesting: usize,
    ) -> Result<TypeId> {
        let descriptor = self.registration().type_at(va)?;
        self.resolve_descriptor(&descriptor, context, nesting + 1)
    }

    fn resolve_generic_parameter(
        &self,
        index: u32,
        method_level: bool,
        context: &GenericContext<'_>,
    ) -> Result<TypeId> {
        let parameter = self
            .metadata
            .generic_parameters
            .get(index as usize)
            .ok_or_else(|| {
                unresolved_error!(
                    "generic parameter {} outside the {} declared",
                    index,
                    self.metadata.generic_parameters.len()
                )
            })?;

        let args = if method_level {
            context.method_args
        } else {
            context.class_args
        };
        if let Some(&arg) = args.get(usize::from(parameter.num)) {
            return Ok(arg);
        }

        Ok(self.types.intern(ResolvedType::GenericParameter {
            index: parameter.num,
            method_level,
            name: self.metadata.string(parameter.name_index)?.to_string(),
        }))
    }

    /// Resolves the `Il2CppGenericClass` at `va` into an instantiated class type.
    fn resolve_generic_class(
        &self,
        va: u64,
        context: &GenericContext<'_>,
        nesting: usize,
    ) -> Result<TypeId> {
        let generic = self.registration().generic_class_at(va)?;
        let definition = self.generic_definition(&generic)?;

        let key = GenericInstantiationKey {
            definition,
            class_args: self.resolve_generic_inst(generic.class_inst, context, nesting)?,
            method_args: self.resolve_generic_inst(generic.method_inst, context, nesting)?,
        };

        // `Node<T>` inside `Node<T>` is the definition itself
        let open = self.resolve_definition(definition, 0)?;
        let is_open = key.method_args.is_empty()
            && self
                .class(open)
                .is_some_and(|class| class.generic_args == key.class_args);
        if is_open {
            return Ok(self.types.intern(ResolvedType::Class(open)));
        }

        if self.key_depth(&key) > self.config.max_generic_depth {
            self.truncated.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "instantiation of type definition {} at 0x{:X} is nested deeper than {}, using the open definition",
                definition,
                va,
                self.config.max_generic_depth
            );
            return Ok(self.types.intern(ResolvedType::Class(open)));
        }

        let class = self.resolve_class(&key)?;
        Ok(self.types.intern(ResolvedType::Class(class)))
    }

    fn resolve_generic_inst(
        &self,
        va: u64,
        context: &GenericContext<'_>,
        nesting: usize,
    ) -> Result<Vec<TypeId>> {
        if va == 0 {
            return Ok(Vec::new());
        }

        let inst = self.registration().generic_inst_at(va)?;
        inst.arguments(self.registration().adapter())?
            .into_iter()
            .map(|argument| self.resolve_address(argument, context, nesting))
            .collect()
    }

    fn generic_definition(&self, generic: &GenericClass) -> Result<u32> {
        match generic.definition {
            GenericClassDefinition::TypeDefinitionIndex(index) => Ok(index),
            GenericClassDefinition::Type(va) => match self.registration().type_at(va)?.payload {
                TypePayload::ClassIndex(index) => Ok(index),
                payload => Err(unresolved_error!(
                    "generic class definition at 0x{:X} is {:?}, not a type definition",
                    va,
                    payload
                )),
            },
        }
    }

    /// The type definition a declaring type descriptor names
    fn definition_of(&self, descriptor: &RawTypeDescriptor) -> Result<u32> {
        match descriptor.payload {
            TypePayload::ClassIndex(index) => Ok(index),
            TypePayload::GenericClass(va) => {
                let generic = self.registration().generic_class_at(va)?;
                self.generic_definition(&generic)
            }
            payload => Err(unresolved_error!(
                "declaring type is {:?}, not a type definition",
                payload
            )),
        }
    }

    fn descriptor(&self, index: u32) -> Result<RawTypeDescriptor> {
        let types = self.registration().types();
        types.get(index as usize).copied().ok_or_else(|| {
            unresolved_error!(
                "type index {} outside the {} registered types",
                index,
                types.len()
            )
        })
    }

    fn definition(&self, index: u32) -> Result<&'m TypeDefinition> {
        let definitions = &self.metadata.type_definitions;
        definitions.get(index as usize).ok_or_else(|| {
            unresolved_error!(
                "type definition {} outside the {} definitions",
                index,
                definitions.len()
            )
        })
    }

    /// Finishes the run and hands the classes over to a [`TypeGraph`].
    #[must_use]
    pub fn into_graph(self) -> TypeGraph {
        let resolved = |id: ClassId| self.class(id).is_some_and(ResolvedClass::is_resolved);

        let images = self
            .metadata
            .images
            .iter()
            .enumerate()
            .map(|(image_index, image)| {
                let start = usize::try_from(image.type_start).unwrap_or(usize::MAX);
                let types = (0..image.type_count as usize)
                    .filter_map(|offset| {
                        let definition = u32::try_from(start.checked_add(offset)?).ok()?;
                        let id = *self.memo.get(&GenericInstantiationKey::definition(definition))?;
                        let class = self.class(id)?;
                        (resolved(id) && class.declaring.is_none()).then_some(id)
                    })
                    .collect();

                ImageEntry {
                    name: self
                        .metadata
                        .image_name(image_index)
                        .unwrap_or_default()
                        .to_string(),
                    types,
                }
            })
            .collect();

        let mut report = ResolutionReport {
            truncated: self.truncated.load(Ordering::Relaxed),
            ..ResolutionReport::default()
        };
        for (_, class) in self.classes.iter() {
            if class.is_resolved() {
                report.classes += 1;
                if class.is_instantiation() {
                    report.instantiations += 1;
                }
            }
        }
        report.failures = self.failures.into_iter().map(|(_, failure)| failure).collect();

        log::info!(
            "resolved {} classes ({} generic instantiations), {} failures, {} truncated",
            report.classes,
            report.instantiations,
            report.failures.len(),
            report.truncated
        );
        if self.materialize_failures.load(Ordering::Relaxed) > 0 {
            log::info!(
                "{} registered generic classes could not be materialized",
                self.materialize_failures.load(Ordering::Relaxed)
            );
        }

        TypeGraph {
            types: self.types,
            classes: self.classes,
            memo: self.memo,
            images,
            report,
        }
    }
}

/// A member range of `count` entries from `start` inside a table of `len` entries.
fn member_range(what: &str, start: i32, count: usize, len: usize) -> Result<Range<usize>> {
    if count == 0 {
        return Ok(0..0);
    }

    usize::try_from(start)
        .ok()
        .and_then(|start| checked_range(start, count, len))
        .ok_or_else(|| {
            unresolved_error!(
                "{} range {}..{} outside the {} declared",
                what,
                start,
                i64::from(start) + count as i64,
                len
            )
        })
}

fn checked_range(start: usize, count: usize, len: usize) -> Option<Range<usize>> {
    let end = start.checked_add(count)?;
    (end <= len).then_some(start..end)
}
