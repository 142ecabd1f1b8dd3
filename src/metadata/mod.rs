//! IL2CPP metadata parsing and representation.
//!
//! This module contains everything that is read verbatim from the metadata blob and from the
//! registration tables of the native image. Nothing here follows an index; the resulting
//! [`decoder::MetadataSet`] is a flat, version-independent view of the raw data which the
//! [`crate::typegraph`] resolver walks.
//!
//! # Key Components
//!
//! - [`version`] - revisions, the supported matrix and the metadata/registration pair
//! - [`layout`] - declarative structure layouts and the generic record reader
//! - [`streams`] - the header, the identifier heap and string literals
//! - [`tables`] - typed rows of every fixed-size section
//! - [`typedesc`] - packed type descriptors
//! - [`registration`] - code and metadata registration tables
//! - [`decoder`] - version detection and the single decoding entry point
//!
//! # Examples
//!
//! ```rust,no_run
//! use il2scope::prelude::*;
//!
//! let metadata = MetadataFile::from_file("global-metadata.dat".as_ref())?;
//! let image = BinaryImage::from_file("libil2cpp.so".as_ref())?;
//! let source = RegistrationSource {
//!     adapter: &image,
//!     code_registration: 0x0234_5678,
//!     metadata_registration: 0x0234_9000,
//! };
//!
//! let set = load(metadata.data(), source, &LoadConfig::default())?;
//! println!("{}: {} type definitions", set.pair, set.type_definitions.len());
//! # Ok::<(), il2scope::Error>(())
//! ```

/// Version detection and decoding of a complete metadata set
pub mod decoder;
/// Declarative, version-aware structure layouts
pub mod layout;
/// Native code and metadata registration tables
pub mod registration;
/// Header, string heap and string literals of the metadata blob
pub mod streams;
/// Typed rows of the metadata sections
pub mod tables;
/// Packed type descriptors
pub mod typedesc;
/// Format revisions and the supported matrix
pub mod version;
