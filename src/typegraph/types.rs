//! Interned resolved types.
//!
//! Every type a member signature mentions is reduced to a [`ResolvedType`] and interned once,
//! so two occurrences of `List<int>[]` anywhere in the graph share one [`TypeId`]. Classes are
//! referenced by [`ClassId`]; the class itself lives in the graph's class arena.

use dashmap::{mapref::entry::Entry, DashMap};

use crate::metadata::typedesc::TypeKind;

/// Handle of an interned [`ResolvedType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Position in the type arena
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of a resolved class, stable for the lifetime of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    /// Position in the class arena
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A fully resolved type.
///
/// Generic parameters which were substituted during resolution never appear here; a
/// `GenericParameter` is one that is still open in its context, such as `T` inside the
/// definition of `List<T>` or a method level parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedType {
    /// `void`
    Void,
    /// A type fully described by its kind: integers, floats, `string`, `object`, ...
    Primitive(TypeKind),
    /// A class, value type, enum or interface, possibly a generic instantiation
    Class(ClassId),
    /// An array; single-dimension zero-based arrays have rank 1
    Array {
        /// The element type
        element: TypeId,
        /// Number of dimensions
        rank: u8,
    },
    /// An unmanaged pointer
    Pointer(TypeId),
    /// A by-reference parameter or return
    ByRef(TypeId),
    /// An unsubstituted generic parameter
    GenericParameter {
        /// Position within the owning type or method
        index: u16,
        /// Owned by a method (`MVAR`) rather than a type (`VAR`)
        method_level: bool,
        /// Declared name, `T` in `List<T>`
        name: String,
    },
}

/// Concurrent interner handing out one [`TypeId`] per distinct [`ResolvedType`].
pub struct TypeInterner {
    ids: DashMap<ResolvedType, TypeId>,
    types: boxcar::Vec<ResolvedType>,
}

impl TypeInterner {
    /// Creates an empty interner
    #[must_use]
    pub fn new() -> Self {
        TypeInterner {
            ids: DashMap::new(),
            types: boxcar::Vec::new(),
        }
    }

    /// Returns the id of `ty`, adding it on first sight.
    #[allow(clippy::cast_possible_truncation)]
    pub fn intern(&self, ty: ResolvedType) -> TypeId {
        if let Some(id) = self.ids.get(&ty) {
            return *id;
        }

        match self.ids.entry(ty) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let index = self.types.push(entry.key().clone());
                let id = TypeId(index as u32);
                entry.insert(id);
                id
            }
        }
    }

    /// The type behind `id`
    #[must_use]
    pub fn get(&self, id: TypeId) -> Option<&ResolvedType> {
        self.types.get(id.index())
    }

    /// Number of distinct types
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.count()
    }

    /// Whether nothing was interned yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.count() == 0
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}
