//! Version algebra for pkgenv.
//!
//! Provides [`Version`] parsing and ordering, [`VersionRange`] set algebra
//! over canonical bound lists, and [`Requirement`] parsing for the
//! `[!|~]name[range]` syntax used by package definitions and requests.

mod error;
mod range;
mod requirement;
#[cfg(feature = "serde")]
mod serde_impl;
mod version;

pub use error::ParseError;
pub use range::{Bound, LowerBound, UpperBound, VersionRange};
pub use requirement::{is_valid_name, Requirement, RequirementKind};
pub use version::{Version, VersionToken};

/// Parse a version string
pub fn parse_version(text: &str) -> Result<Version, ParseError> {
    Version::parse(text)
}

/// Parse a range string
pub fn parse_range(text: &str) -> Result<VersionRange, ParseError> {
    VersionRange::parse(text)
}

/// Parse a requirement string
pub fn parse_requirement(text: &str) -> Result<Requirement, ParseError> {
    Requirement::parse(text)
}

/// Check whether `version` satisfies the range written in `range`
pub fn satisfies(version: &str, range: &str) -> Result<bool, ParseError> {
    Ok(VersionRange::parse(range)?.contains(&Version::parse(version)?))
}

/// Sort versions ascending
pub fn sort(versions: &mut [Version]) {
    versions.sort();
}

/// Sort versions descending
pub fn rsort(versions: &mut [Version]) {
    versions.sort_by(|a, b| b.cmp(a));
}
