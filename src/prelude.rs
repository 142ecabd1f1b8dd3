//! # il2scope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the il2scope library. Import this module to get quick access to everything needed to
//! decode a metadata blob and resolve its type graph.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all il2scope operations
pub use crate::Error;

/// The result type used throughout il2scope
pub use crate::Result;

/// Load options
pub use crate::LoadConfig;

// ================================================================================================
// File Access
// ================================================================================================

/// The metadata blob and native address spaces
pub use crate::file::{
    image::BinaryImage, AddressSpace, Endianness, FlatImage, MetadataFile, PointerWidth,
};

/// Low-level parsing utilities
pub use crate::Parser;

// ================================================================================================
// Decoding
// ================================================================================================

/// Version handling
pub use crate::metadata::version::{Version, VersionPair, SUPPORTED_VERSIONS};

/// Decoding entry points
pub use crate::metadata::decoder::{decode, detect_version, load, MetadataSet};

/// Where the registration tables live
pub use crate::metadata::registration::{RegistrationSet, RegistrationSource};

/// Layouts and raw records
pub use crate::metadata::layout::{compute_layout, struct_size, Record, StructKind};

/// Type descriptors
pub use crate::metadata::typedesc::{RawTypeDescriptor, TypeKind, TypePayload};

// ================================================================================================
// Type Graph
// ================================================================================================

/// The resolved graph and its identifiers
pub use crate::typegraph::{
    class::{GenericInstantiationKey, ResolvedClass, ResolvedField, ResolvedMethod},
    resolver::{ResolutionFailure, ResolutionReport},
    types::{ClassId, ResolvedType, TypeId},
    ImageInfo, MethodInfo, TypeGraph, TypeInfo,
};
