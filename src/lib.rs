// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # il2scope
//!
//! A version-adaptive decoder for IL2CPP `global-metadata.dat` files and the registration
//! tables of the matching native image, plus a resolver which turns the raw tables into a
//! graph of fully named classes, fields and methods.
//!
//! IL2CPP changes the shape of its structures between Unity releases. Instead of one
//! hand-written struct per release, every structure is described once by a declarative layout
//! whose fields carry the version windows in which they exist. Decoding a blob means picking
//! the [`VersionPair`] and reading each table with the layout computed for it.
//!
//! ## Features
//!
//! - **Version matrix** - metadata and registration revisions 16 through 31, including the
//!   24.x and 27.x / 29.x minor revisions
//! - **Declarative layouts** - field presence per version is data, struct sizes are derived
//! - **Native images** - PE, ELF and Mach-O through goblin, or a flat memory dump
//! - **Type graph** - generic instantiations memoized by key, cycles and runaway expansion
//!   bounded, failures isolated per type
//! - **Emitter names** - sanitized qualified names, C# display names, native storage names and
//!   stable method identifiers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use il2scope::prelude::*;
//! use std::path::Path;
//!
//! let metadata = MetadataFile::from_file(Path::new("global-metadata.dat"))?;
//! let image = BinaryImage::from_file(Path::new("GameAssembly.dll"))?;
//! let source = RegistrationSource {
//!     adapter: &image,
//!     code_registration: 0x1_8200_0000,
//!     metadata_registration: 0x1_8200_1000,
//! };
//!
//! let config = LoadConfig::default();
//! let set = load(metadata.data(), source, &config)?;
//! let graph = TypeGraph::build(&set, &config);
//!
//! for image in graph.images() {
//!     println!("{}: {} types", image.name, image.types().len());
//! }
//! # Ok::<(), il2scope::Error>(())
//! ```
//!
//! ## Layers
//!
//! - [`file`] - byte access: the metadata blob, native images and the [`AddressSpace`] trait
//! - [`metadata`] - versions, layouts, header and sections, tables, type descriptors and the
//!   registration tables, decoded into a [`MetadataSet`]
//! - [`typegraph`] - resolution of a [`MetadataSet`] into a [`TypeGraph`]
//!
//! Decoding is all or nothing. Resolution is not: a type that cannot be resolved is reported in
//! [`typegraph::resolver::ResolutionReport`] and everything else is still produced.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
#[allow(missing_docs)]
pub(crate) mod test;

/// Load options.
///
/// See [`LoadConfig`] for the presets and the individual switches.
pub mod config;

/// Byte level access to the metadata blob and to native images.
///
/// # Key Types
///
/// - [`MetadataFile`] - the metadata blob, memory mapped or owned
/// - [`AddressSpace`] - virtual address translation and reads over a native image
/// - [`file::image::BinaryImage`] - PE / ELF / Mach-O images
/// - [`FlatImage`] - a raw dump with explicit segments
/// - [`Parser`] - sequential reads over a byte slice
///
/// # Examples
///
/// ```rust,no_run
/// use il2scope::file::{AddressSpace, Endianness, FlatImage, PointerWidth};
///
/// let image = FlatImage::from_mem(vec![0u8; 0x100], PointerWidth::Bits64, Endianness::Little)
///     .with_segment(0x1000, 0, 0x100);
/// assert_eq!(image.va_to_offset(0x1010)?, 0x10);
/// # Ok::<(), il2scope::Error>(())
/// ```
pub mod file;

/// IL2CPP metadata: versions, layouts, sections, tables, type descriptors and registration.
///
/// # Examples
///
/// ```rust,no_run
/// use il2scope::{metadata::decoder::detect_version, LoadConfig, MetadataFile};
/// use std::path::Path;
///
/// let file = MetadataFile::from_file(Path::new("global-metadata.dat"))?;
/// let pair = detect_version(file.data(), &LoadConfig::default())?;
/// println!("{}", pair);
/// # Ok::<(), il2scope::Error>(())
/// ```
pub mod metadata;

/// Resolution of decoded metadata into a graph of classes and members.
pub mod typegraph;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use il2scope::prelude::*;
///
/// let metadata = MetadataFile::from_file("global-metadata.dat".as_ref())?;
/// let pair = detect_version(metadata.data(), &LoadConfig::default())?;
/// # Ok::<(), il2scope::Error>(())
/// ```
pub mod prelude;

/// `il2scope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `il2scope` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use il2scope::{Error, MetadataFile};
///
/// match MetadataFile::from_file(std::path::Path::new("global-metadata.dat")) {
///     Ok(file) => println!("{} bytes", file.len()),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// Load options for version detection and resolution.
pub use config::LoadConfig;

/// Byte access: the metadata blob, address spaces and the sequential [`Parser`].
pub use file::{
    image::BinaryImage, parser::Parser, AddressSpace, Endianness, FlatImage, MetadataFile,
    PointerWidth,
};

/// Decoding entry points.
pub use metadata::{
    decoder::{decode, detect_version, load, MetadataSet},
    registration::RegistrationSource,
    version::{Version, VersionPair},
};

/// The resolved type graph.
pub use typegraph::TypeGraph;
