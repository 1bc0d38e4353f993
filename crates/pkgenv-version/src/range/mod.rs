//! Version ranges: canonical unions of disjoint intervals.

mod bound;
mod parser;

use std::fmt;
use std::str::FromStr;

pub use bound::{Bound, LowerBound, UpperBound};

use crate::error::ParseError;
use crate::version::Version;

pub(crate) use parser::parse_range_in;

/// A set of versions expressed as sorted, disjoint, non-touching bounds.
///
/// Every constructor canonicalizes, so two ranges admitting the same
/// intervals compare and hash equal no matter how they were written:
/// `>=1,<2`, `1+<2` and `<2,>=1` are the same value.
///
/// An empty bound list is the empty range: no version satisfies it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    bounds: Vec<Bound>,
}

impl VersionRange {
    /// The range admitting every version
    pub fn any() -> Self {
        Self {
            bounds: vec![Bound::any()],
        }
    }

    /// The range admitting no version
    pub fn empty() -> Self {
        Self { bounds: Vec::new() }
    }

    /// The range admitting exactly `version`
    pub fn exact(version: Version) -> Self {
        Self {
            bounds: vec![Bound::exact(version)],
        }
    }

    /// The range admitting `version` and every version it prefixes
    pub fn family(version: Version) -> Self {
        Self {
            bounds: vec![Bound::family(version)],
        }
    }

    /// Build a canonical range from arbitrary bounds
    pub fn from_bounds(bounds: impl IntoIterator<Item = Bound>) -> Self {
        let mut sorted: Vec<Bound> = bounds.into_iter().collect();
        sorted.sort();

        let mut merged: Vec<Bound> = Vec::with_capacity(sorted.len());
        for bound in sorted {
            match merged.last_mut() {
                Some(last) if last.touches(&bound) => *last = last.merge(&bound),
                _ => merged.push(bound),
            }
        }

        Self { bounds: merged }
    }

    /// Parse a range string such as `>=1,<2|3+`
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse_range_in(text, 0)
    }

    pub fn bounds(&self) -> &[Bound] {
        &self.bounds
    }

    /// Whether the range is unbounded on both ends with no holes
    pub fn is_any(&self) -> bool {
        matches!(self.bounds.as_slice(), [b] if b.is_any())
    }

    /// Whether no version satisfies the range
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.bounds.iter().any(|b| b.contains(version))
    }

    /// Intersection; an empty result is a legal value, never an error
    pub fn intersect(&self, other: &VersionRange) -> VersionRange {
        if self.is_any() {
            return other.clone();
        }
        if other.is_any() {
            return self.clone();
        }

        let pieces = self
            .bounds
            .iter()
            .flat_map(|a| other.bounds.iter().filter_map(move |b| a.intersect(b)));
        VersionRange::from_bounds(pieces)
    }

    pub fn union(&self, other: &VersionRange) -> VersionRange {
        VersionRange::from_bounds(self.bounds.iter().chain(other.bounds.iter()).cloned())
    }

    /// Whether the two ranges share at least one version
    pub fn intersects(&self, other: &VersionRange) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Whether every version admitted by `self` is admitted by `other`
    pub fn is_subset(&self, other: &VersionRange) -> bool {
        self.intersect(other) == *self
    }

    /// Filter and keep the versions admitted by this range, preserving order
    pub fn filter<'a, I>(&'a self, versions: I) -> impl Iterator<Item = &'a Version> + 'a
    where
        I: IntoIterator<Item = &'a Version>,
        I::IntoIter: 'a,
    {
        versions.into_iter().filter(move |v| self.contains(v))
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        VersionRange::any()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bounds.is_empty() {
            return f.write_str("!*");
        }
        for (i, bound) in self.bounds.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{}", bound)?;
        }
        Ok(())
    }
}

impl FromStr for VersionRange {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

impl From<Version> for VersionRange {
    fn from(version: Version) -> Self {
        VersionRange::exact(version)
    }
}
