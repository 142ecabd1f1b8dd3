//! Header and heaps of the metadata blob.
//!
//! - [`MetadataHeader`] - sanity, version and the offset/size pair of every section
//! - [`Strings`] - the identifier string heap
//! - [`StringLiterals`] - string literals used by managed code

mod header;
pub use header::{MetadataHeader, Section, SectionId, METADATA_SANITY};

mod strings;
pub use strings::{StringLiterals, Strings};
