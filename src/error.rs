use thiserror::Error;

use crate::metadata::{layout::StructKind, version::Version};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! unresolved_error {
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::UnresolvedTypeReference {
            context: format!($fmt, $($arg)*),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants fall into three groups, and the group decides how a failure propagates:
///
/// ## Decoder errors (fatal)
/// - [`Error::UnsupportedVersion`] - The detected version pair has no known layout
/// - [`Error::CorruptData`] - A section header points outside of the metadata blob
/// - [`Error::OutOfBounds`] / [`Error::UnmappedAddress`] - Address space access failures
/// - [`Error::Malformed`] - Any other structural inconsistency
///
/// A partially decoded metadata set is not usable, so all of these abort the decode.
///
/// ## Contract violations
/// - [`Error::FieldNotPresentForVersion`] - A record field was requested which the computed
///   layout excludes for the active version pair. Correct client code never triggers this.
///
/// ## Resolver errors (recoverable)
/// - [`Error::UnresolvedTypeReference`] - A dangling index encountered while materializing a
///   class. The resolver drops the offending class, records the failure in the
///   [`crate::typegraph::ResolutionReport`] and continues with the remaining types.
///
/// # Examples
///
/// ```rust,no_run
/// use il2scope::{Error, MetadataFile};
///
/// match MetadataFile::from_file("global-metadata.dat".as_ref()) {
///     Ok(file) => println!("Loaded {} bytes", file.len()),
///     Err(Error::UnsupportedVersion { metadata, registration }) => {
///         eprintln!("No layout for {metadata}/{registration}");
///     }
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The detected (or configured) version pair has no declared layout.
    ///
    /// Raised before any structure is read.
    #[error("Unsupported version pair - metadata {metadata}, registration {registration}")]
    UnsupportedVersion {
        /// Metadata blob revision
        metadata: Version,
        /// Registration table revision
        registration: Version,
    },

    /// A section of the metadata blob lies outside of the available data.
    #[error("Corrupt data in section '{section}' at offset 0x{offset:X}")]
    CorruptData {
        /// Name of the section whose header was out of bounds
        section: &'static str,
        /// The offending offset
        offset: usize,
    },

    /// A field was accessed which the layout excludes for this version pair.
    #[error("Field '{field}' of {structure} is not present for version {version}")]
    FieldNotPresentForVersion {
        /// The structure the record was read as
        structure: StructKind,
        /// The requested field
        field: &'static str,
        /// The version on the axis the structure belongs to
        version: Version,
    },

    /// A dangling index or address was hit during type graph resolution.
    #[error("Unresolved type reference - {context}")]
    UnresolvedTypeReference {
        /// Human readable description of the reference which could not be followed
        context: String,
    },

    /// A virtual address is not backed by any section of the image.
    #[error("Virtual address 0x{0:X} is not mapped")]
    UnmappedAddress(u64),

    /// The file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate while mapping a native image.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),
}

impl Error {
    /// Returns `true` for failures the resolver treats as per-type and recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UnresolvedTypeReference { .. })
    }
}
