//! Load configuration
//!
//! Options which influence version detection and type graph resolution. The defaults resolve
//! every type definition in parallel and leave generic instantiations to be materialized on
//! demand, as they are reached from member signatures.

use crate::metadata::version::Version;

/// Configuration for decoding and resolving a metadata set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadConfig {
    /// Forces the metadata blob revision instead of detecting it from the header
    pub metadata_version: Option<Version>,

    /// Forces the registration table revision; defaults to the metadata revision
    pub registration_version: Option<Version>,

    /// Resolve type definitions on the rayon thread pool
    pub parallel: bool,

    /// How deeply generic arguments may nest while expanding an instantiation (default: 8)
    /// Instantiations past the bound are recorded as truncated and not materialized
    pub max_generic_depth: usize,

    /// Resolve every generic class listed in the registration tables, not only the ones
    /// referenced from member signatures
    pub materialize_generic_instances: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            metadata_version: None,
            registration_version: None,
            parallel: true,
            max_generic_depth: 8,
            materialize_generic_instances: false,
        }
    }
}

impl LoadConfig {
    /// Sequential resolution of what member signatures reach, with a shallow generic bound
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            metadata_version: None,
            registration_version: None,
            parallel: false,
            max_generic_depth: 4,
            materialize_generic_instances: false,
        }
    }

    /// Resolves every generic instantiation the registration tables list
    #[must_use]
    pub fn comprehensive() -> Self {
        Self {
            materialize_generic_instances: true,
            max_generic_depth: 16,
            ..Self::default()
        }
    }

    /// Sets both version overrides
    #[must_use]
    pub fn with_versions(mut self, metadata: Version, registration: Version) -> Self {
        self.metadata_version = Some(metadata);
        self.registration_version = Some(registration);
        self
    }
}
