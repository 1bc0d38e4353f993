//! Package requirements: a name, a version range and a kind.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ParseError;
use crate::range::{parse_range_in, VersionRange};
use crate::version::Version;

lazy_static! {
    static ref NAME_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap();
}

/// How a requirement constrains a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum RequirementKind {
    /// The package must be present with a version inside the range
    #[default]
    Normal,
    /// If the package is present its version must be inside the range;
    /// the requirement alone never pulls the package in
    Weak,
    /// The package, if present, must have a version outside the range
    Conflict,
}

impl RequirementKind {
    fn prefix(self) -> &'static str {
        match self {
            RequirementKind::Normal => "",
            RequirementKind::Weak => "~",
            RequirementKind::Conflict => "!",
        }
    }
}

/// A constraint on one package.
///
/// Text form is `[!|~]name[range]`, where a bare version range may be
/// attached with a dash: `foo`, `foo-1.2`, `foo>=1,<2`, `!foo==1.0`,
/// `~bar-2+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requirement {
    name: String,
    range: VersionRange,
    kind: RequirementKind,
}

impl Requirement {
    pub fn new(name: impl Into<String>, range: VersionRange) -> Self {
        Self::with_kind(name, range, RequirementKind::Normal)
    }

    pub fn weak(name: impl Into<String>, range: VersionRange) -> Self {
        Self::with_kind(name, range, RequirementKind::Weak)
    }

    pub fn conflict(name: impl Into<String>, range: VersionRange) -> Self {
        Self::with_kind(name, range, RequirementKind::Conflict)
    }

    pub fn with_kind(name: impl Into<String>, range: VersionRange, kind: RequirementKind) -> Self {
        Self {
            name: name.into(),
            range,
            kind,
        }
    }

    /// Parse a requirement string
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let body = text.trim_end();
        let start = body.len() - body.trim_start().len();

        let (kind, name_start) = match body[start..].chars().next() {
            Some('!') => (RequirementKind::Conflict, start + 1),
            Some('~') => (RequirementKind::Weak, start + 1),
            Some(_) => (RequirementKind::Normal, start),
            None => return Err(ParseError::requirement(text, start, "empty requirement")),
        };

        let name = NAME_RE
            .find(&body[name_start..])
            .map(|m| m.as_str())
            .ok_or_else(|| ParseError::requirement(text, name_start, "expected package name"))?;

        let mut range_start = name_start + name.len();
        if body[range_start..].starts_with('-') {
            range_start += 1;
            if range_start == body.len() {
                return Err(ParseError::requirement(
                    text,
                    range_start,
                    "expected version after '-'",
                ));
            }
        }

        let range = parse_range_in(body, range_start).map_err(|err| match err {
            ParseError::MalformedRange {
                position, reason, ..
            }
            | ParseError::InvalidVersion {
                position, reason, ..
            }
            | ParseError::MalformedRequirement {
                position, reason, ..
            } => ParseError::range(text, position, reason),
        })?;

        Ok(Self::with_kind(name, range, kind))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> &VersionRange {
        &self.range
    }

    pub fn kind(&self) -> RequirementKind {
        self.kind
    }

    pub fn is_weak(&self) -> bool {
        self.kind == RequirementKind::Weak
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == RequirementKind::Conflict
    }

    /// Whether a present package at `version` satisfies this requirement
    pub fn admits(&self, version: &Version) -> bool {
        match self.kind {
            RequirementKind::Normal | RequirementKind::Weak => self.range.contains(version),
            RequirementKind::Conflict => !self.range.contains(version),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.name)?;
        if self.range.is_any() {
            return Ok(());
        }

        let range = self.range.to_string();
        if range.starts_with(['=', '<', '>', '!', '*']) {
            write!(f, "{}", range)
        } else {
            write!(f, "-{}", range)
        }
    }
}

impl FromStr for Requirement {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Requirement::parse(s)
    }
}

/// Check whether a string is a valid package name
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.find(name).map(|m| m.len()) == Some(name.len()) && !name.is_empty()
}
