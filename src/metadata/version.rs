//! Format revisions of the metadata blob and the registration tables.
//!
//! IL2CPP versions its metadata blob with an integer in the header (`24`, `27`, `29`, ...), but
//! several incompatible layouts were shipped under the same integer. The community convention,
//! used here as well, is a decimal revision (`24.1`, `24.2`, ...) where the fractional part
//! distinguishes those layouts.
//!
//! The metadata blob and the native registration tables evolved independently, so every layout
//! decision is made against a [`VersionPair`]: one [`Version`] per [`VersionAxis`].

use std::{fmt, str::FromStr};

use crate::{Error, Result};

/// A decimal format revision such as `24.1`.
///
/// Ordering is numeric on `(major, minor)`, so `24.5 < 27 < 27.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Integer revision as stored in the metadata header
    pub major: u16,
    /// Sub-revision, detected heuristically or configured
    pub minor: u16,
}

impl Version {
    /// Create a new version
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Version { major, minor }
    }

    /// Whether this version is part of the [`SUPPORTED_VERSIONS`] matrix
    #[must_use]
    pub fn is_supported(&self) -> bool {
        SUPPORTED_VERSIONS.contains(self)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.minor == 0 {
            write!(f, "{}", self.major)
        } else {
            write!(f, "{}.{}", self.major, self.minor)
        }
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (major, minor) = match s.trim().split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s.trim(), "0"),
        };

        let major = major
            .parse::<u16>()
            .map_err(|_| malformed_error!("Invalid version - {}", s))?;
        let minor = minor
            .parse::<u16>()
            .map_err(|_| malformed_error!("Invalid version - {}", s))?;
        Ok(Version { major, minor })
    }
}

/// Shorthand for declaring versions in the layout tables
pub(crate) const fn v(major: u16, minor: u16) -> Version {
    Version::new(major, minor)
}

/// Every revision for which the layout tables declare a complete structure set.
pub const SUPPORTED_VERSIONS: &[Version] = &[
    v(16, 0),
    v(19, 0),
    v(20, 0),
    v(21, 0),
    v(22, 0),
    v(23, 0),
    v(24, 0),
    v(24, 1),
    v(24, 2),
    v(24, 3),
    v(24, 4),
    v(24, 5),
    v(27, 0),
    v(27, 1),
    v(27, 2),
    v(29, 0),
    v(29, 1),
    v(31, 0),
];

/// The two independently evolving halves of the on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionAxis {
    /// Structures inside the metadata blob
    Metadata,
    /// Structures inside the native code/metadata registration tables
    Registration,
}

/// The version of the metadata blob and the version of the registration tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionPair {
    /// Revision of the metadata blob
    pub metadata: Version,
    /// Revision of the registration tables
    pub registration: Version,
}

impl VersionPair {
    /// Create a pair from two revisions
    #[must_use]
    pub const fn new(metadata: Version, registration: Version) -> Self {
        VersionPair {
            metadata,
            registration,
        }
    }

    /// A pair where both halves share the same revision, which is the case for every
    /// unmodified Unity build.
    #[must_use]
    pub const fn uniform(version: Version) -> Self {
        VersionPair {
            metadata: version,
            registration: version,
        }
    }

    /// The revision on `axis`
    #[must_use]
    pub fn get(&self, axis: VersionAxis) -> Version {
        match axis {
            VersionAxis::Metadata => self.metadata,
            VersionAxis::Registration => self.registration,
        }
    }

    /// Verifies both halves are part of the supported matrix.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedVersion`] otherwise.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.metadata.is_supported() && self.registration.is_supported() {
            Ok(())
        } else {
            Err(Error::UnsupportedVersion {
                metadata: self.metadata,
                registration: self.registration,
            })
        }
    }
}

impl fmt::Display for VersionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.metadata, self.registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(v(24, 5) < v(27, 0));
        assert!(v(27, 0) < v(27, 1));
        assert!(v(24, 0) < v(24, 1));
        assert_eq!(v(29, 0).max(v(24, 5)), v(29, 0));
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("24.1".parse::<Version>().unwrap(), v(24, 1));
        assert_eq!("29".parse::<Version>().unwrap(), v(29, 0));
        assert_eq!(v(27, 2).to_string(), "27.2");
        assert_eq!(v(31, 0).to_string(), "31");
        assert!("x.1".parse::<Version>().is_err());
    }

    #[test]
    fn supported() {
        assert!(VersionPair::uniform(v(24, 2)).ensure_supported().is_ok());
        assert!(VersionPair::new(v(29, 0), v(29, 1)).ensure_supported().is_ok());
        assert!(matches!(
            VersionPair::new(v(25, 0), v(24, 0)).ensure_supported(),
            Err(Error::UnsupportedVersion { .. })
        ));
        assert!(VersionPair::new(v(24, 0), v(28, 0))
            .ensure_supported()
            .is_err());
    }
}
