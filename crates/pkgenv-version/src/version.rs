//! Version implementation
//!
//! A version is a sequence of tokens separated by `.` or `-`. Each token is
//! itself split into runs of digits and runs of letters/underscores
//! ("sub-tokens"). Ordering is lexicographic over tokens, and within a token
//! over sub-tokens:
//!
//! - numeric sub-tokens compare by value,
//! - alphabetic sub-tokens compare lexically,
//! - a numeric sub-token sorts before an alphabetic one,
//! - a shorter sequence that is a prefix of a longer one sorts first.
//!
//! The empty version sorts before every other version.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// One run of digits or of non-digit characters inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SubToken {
    Numeric { value: u64, text: String },
    Alpha(String),
}

impl Ord for SubToken {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                SubToken::Numeric { value: a, text: ta },
                SubToken::Numeric { value: b, text: tb },
            ) => a.cmp(b).then_with(|| ta.cmp(tb)),
            (SubToken::Numeric { .. }, SubToken::Alpha(_)) => Ordering::Less,
            (SubToken::Alpha(_), SubToken::Numeric { .. }) => Ordering::Greater,
            (SubToken::Alpha(a), SubToken::Alpha(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for SubToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SubToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubToken::Numeric { text, .. } => f.write_str(text),
            SubToken::Alpha(text) => f.write_str(text),
        }
    }
}

/// A single dot/dash separated token of a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionToken {
    parts: Vec<SubToken>,
}

impl VersionToken {
    /// Whether the token is a plain number
    pub fn is_numeric(&self) -> bool {
        matches!(self.parts.as_slice(), [SubToken::Numeric { .. }])
    }

    /// Numeric value of the token, if it is a plain number
    pub fn as_number(&self) -> Option<u64> {
        match self.parts.as_slice() {
            [SubToken::Numeric { value, .. }] => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

/// A parsed, immutable version.
///
/// Equality and hashing are structural (tokens and separators), and the
/// ordering compares tokens first and separators only as a final tie-break,
/// so `Ord` stays consistent with `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    tokens: Vec<VersionToken>,
    separators: Vec<char>,
}

impl Version {
    /// The empty version, lower than any other version
    pub fn empty() -> Self {
        Version {
            tokens: Vec::new(),
            separators: Vec::new(),
        }
    }

    /// Parse a version string
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse_version(text).map_err(|(position, reason)| ParseError::InvalidVersion {
            text: text.to_string(),
            position,
            reason: reason.to_string(),
        })
    }

    /// Check if this is the empty version
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// The version tokens
    pub fn tokens(&self) -> &[VersionToken] {
        &self.tokens
    }

    /// Whether `self` is a token-wise prefix of `other`.
    ///
    /// `1.2` is a prefix of `1.2` and `1.2.5` but not of `1.20` or `1.2a`.
    /// The empty version is a prefix of everything.
    pub fn is_prefix_of(&self, other: &Version) -> bool {
        self.tokens.len() <= other.tokens.len()
            && self
                .tokens
                .iter()
                .zip(other.tokens.iter())
                .all(|(a, b)| a == b)
    }

    /// Compare two versions
    pub fn compare(&self, other: &Version) -> Ordering {
        self.cmp(other)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tokens
            .cmp(&other.tokens)
            .then_with(|| self.separators.cmp(&other.separators))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.separators[i - 1])?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::empty()
    }
}

/// Parse a version, reporting the byte offset and reason on failure.
///
/// Kept separate from [`Version::parse`] so range and requirement parsers can
/// rebase the position onto their own input.
pub(crate) fn parse_version(text: &str) -> Result<Version, (usize, &'static str)> {
    if text.is_empty() {
        return Ok(Version::empty());
    }

    let mut tokens = Vec::new();
    let mut separators = Vec::new();
    let mut parts: Vec<SubToken> = Vec::new();
    let mut current = String::new();
    let mut current_numeric = false;
    let mut token_start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '.' | '-' => {
                if current.is_empty() && parts.is_empty() {
                    return Err((i, "empty token"));
                }
                parts.push(finish_sub_token(&current, current_numeric, token_start)?);
                current.clear();
                tokens.push(VersionToken {
                    parts: std::mem::take(&mut parts),
                });
                separators.push(c);
                token_start = i + 1;
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let numeric = c.is_ascii_digit();
                if !current.is_empty() && numeric != current_numeric {
                    parts.push(finish_sub_token(&current, current_numeric, i)?);
                    current.clear();
                }
                current_numeric = numeric;
                current.push(c);
            }
            _ => return Err((i, "unexpected character")),
        }
    }

    if current.is_empty() {
        return Err((text.len(), "empty token"));
    }
    parts.push(finish_sub_token(&current, current_numeric, token_start)?);
    tokens.push(VersionToken { parts });

    Ok(Version { tokens, separators })
}

fn finish_sub_token(
    text: &str,
    numeric: bool,
    position: usize,
) -> Result<SubToken, (usize, &'static str)> {
    if numeric {
        let value = text
            .parse::<u64>()
            .map_err(|_| (position, "numeric token too large"))?;
        Ok(SubToken::Numeric {
            value,
            text: text.to_string(),
        })
    } else {
        Ok(SubToken::Alpha(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_version_parse_and_display() {
        assert_eq!(v("1.2.3").to_string(), "1.2.3");
        assert_eq!(v("1.2-beta3").to_string(), "1.2-beta3");
        assert_eq!(v("2021_03.a").to_string(), "2021_03.a");
        assert_eq!(v("").to_string(), "");
        assert_eq!(v("1.2.3").len(), 3);
    }

    #[test]
    fn test_version_parse_errors() {
        let err = Version::parse("1..2").unwrap_err();
        assert_eq!(err.position(), 2);

        let err = Version::parse("1.2.").unwrap_err();
        assert_eq!(err.position(), 4);

        let err = Version::parse("1.2+3").unwrap_err();
        assert_eq!(err.position(), 3);
        assert_eq!(err.text(), "1.2+3");

        assert!(Version::parse(".1").is_err());
        assert!(Version::parse("99999999999999999999999").is_err());
    }

    #[test]
    fn test_numeric_tokens_compare_numerically() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("2") > v("1.99.99"));
        assert!(v("1.0.0") == v("1.0.0"));
    }

    #[test]
    fn test_numeric_before_alpha() {
        assert!(v("1.0") < v("1.a"));
        assert!(v("1.999") < v("1.alpha"));
        assert!(v("1.alpha") < v("1.beta"));
    }

    #[test]
    fn test_shorter_prefix_is_lower() {
        assert!(v("1") < v("1.0"));
        assert!(v("1.2") < v("1.2.0"));
        assert!(v("") < v("0"));
        assert!(v("1.2") < v("1.2a"));
        assert!(v("1.2.9") < v("1.2a"));
    }

    #[test]
    fn test_leading_zero_tie_break() {
        let a = v("1.01");
        let b = v("1.1");
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn test_separator_tie_break() {
        let a = v("1.0");
        let b = v("1-0");
        assert_ne!(a, b);
        assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
    }

    #[test]
    fn test_total_order_antisymmetry() {
        let samples = ["", "0", "1", "1.0", "1.0.1", "1.a", "1.b2", "1.b10", "2", "10", "1-0", "1.01"];
        for a in samples {
            for b in samples {
                let (va, vb) = (v(a), v(b));
                assert_eq!(va.cmp(&vb), vb.cmp(&va).reverse(), "{} vs {}", a, b);
                assert_eq!(va.cmp(&vb) == Ordering::Equal, va == vb, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_is_prefix_of() {
        assert!(v("1.2").is_prefix_of(&v("1.2")));
        assert!(v("1.2").is_prefix_of(&v("1.2.5")));
        assert!(!v("1.2").is_prefix_of(&v("1.20")));
        assert!(!v("1.2").is_prefix_of(&v("1.2a")));
        assert!(!v("1.2.5").is_prefix_of(&v("1.2")));
        assert!(Version::empty().is_prefix_of(&v("3")));
    }

    #[test]
    fn test_token_accessors() {
        let version = v("3.b1");
        assert!(version.tokens()[0].is_numeric());
        assert_eq!(version.tokens()[0].as_number(), Some(3));
        assert!(!version.tokens()[1].is_numeric());
        assert_eq!(version.tokens()[1].as_number(), None);
    }
}
