//! Range string parser.
//!
//! Alternatives are separated by `|` and intersected terms by `,`. Each term
//! is one of:
//!
//! | Term        | Meaning                                   |
//! |-------------|-------------------------------------------|
//! | `*`, empty  | any version                               |
//! | `!*`        | no version                                |
//! | `==v`, `=v` | exactly `v`                               |
//! | `>=v`, `>v` | lower bound                               |
//! | `<=v`, `<v` | upper bound (`<=v*` includes the family)  |
//! | `!=v`       | anything but `v`                          |
//! | `v+`        | `v` or higher, optionally `v+<w`/`v+<=w`   |
//! | `v..w`      | between `v` and `w`, both inclusive       |
//! | `v`, `v*`   | `v` and every version it prefixes         |

use super::{Bound, LowerBound, UpperBound, VersionRange};
use crate::error::ParseError;
use crate::version::{parse_version, Version};

const OPERATORS: &[&str] = &["==", ">=", "<=", "!=", "=", ">", "<"];

/// Parse the range written in `full[start..]`.
///
/// Error positions are reported relative to `full`, so a requirement parser
/// can hand over its whole input and get positions that point into it.
pub(crate) fn parse_range_in(full: &str, start: usize) -> Result<VersionRange, ParseError> {
    let text = &full[start..];
    if text.trim().is_empty() {
        return Ok(VersionRange::any());
    }

    let mut bounds = Vec::new();
    let mut offset = start;
    for alternative in text.split('|') {
        let range = parse_alternative(full, alternative, offset)?;
        bounds.extend(range.bounds);
        offset += alternative.len() + 1;
    }

    Ok(VersionRange::from_bounds(bounds))
}

fn parse_alternative(full: &str, text: &str, offset: usize) -> Result<VersionRange, ParseError> {
    let mut range = VersionRange::any();
    let mut pos = offset;
    for term in text.split(',') {
        let leading = term.len() - term.trim_start().len();
        let trimmed = term.trim();
        if trimmed.is_empty() {
            return Err(ParseError::range(full, pos + leading, "empty constraint"));
        }
        range = range.intersect(&parse_term(full, trimmed, pos + leading)?);
        pos += term.len() + 1;
    }
    Ok(range)
}

fn parse_term(full: &str, term: &str, pos: usize) -> Result<VersionRange, ParseError> {
    match term {
        "*" => return Ok(VersionRange::any()),
        "!*" => return Ok(VersionRange::empty()),
        _ => {}
    }

    if let Some(op) = OPERATORS.iter().find(|op| term.starts_with(**op)) {
        let rest = &term[op.len()..];
        let vpos = pos + op.len() + (rest.len() - rest.trim_start().len());
        return parse_operator(full, op, rest.trim(), vpos);
    }

    if let Some((low, high)) = term.split_once("..") {
        let lower = version_at(full, low, pos)?;
        let upper = version_at(full, high, pos + low.len() + 2)?;
        return Ok(single(LowerBound::new(lower, true), UpperBound::Inclusive(upper)));
    }

    if let Some((low, tail)) = term.split_once('+') {
        let lower = LowerBound::new(version_at(full, low, pos)?, true);
        let tail_pos = pos + low.len() + 1;
        let upper = if tail.is_empty() {
            UpperBound::Unbounded
        } else if let Some(v) = tail.strip_prefix("<=") {
            UpperBound::Inclusive(version_at(full, v, tail_pos + 2)?)
        } else if let Some(v) = tail.strip_prefix('<') {
            UpperBound::Exclusive(version_at(full, v, tail_pos + 1)?)
        } else {
            return Err(ParseError::range(full, tail_pos, "expected '<' or '<=' after '+'"));
        };
        return Ok(single(lower, upper));
    }

    let prefix = term.strip_suffix('*').unwrap_or(term);
    Ok(VersionRange::family(version_at(full, prefix, pos)?))
}

fn parse_operator(
    full: &str,
    op: &str,
    rest: &str,
    pos: usize,
) -> Result<VersionRange, ParseError> {
    if op == "<=" {
        if let Some(prefix) = rest.strip_suffix('*') {
            let version = version_at(full, prefix, pos)?;
            return Ok(single(LowerBound::min(), UpperBound::family(version)));
        }
    }

    let version = version_at(full, rest, pos)?;
    let range = match op {
        "==" | "=" => VersionRange::exact(version),
        ">=" => single(LowerBound::new(version, true), UpperBound::Unbounded),
        ">" => single(LowerBound::new(version, false), UpperBound::Unbounded),
        "<=" => single(LowerBound::min(), UpperBound::Inclusive(version)),
        "<" => single(LowerBound::min(), UpperBound::Exclusive(version)),
        "!=" => VersionRange::from_bounds(
            Bound::new(LowerBound::min(), UpperBound::Exclusive(version.clone()))
                .into_iter()
                .chain(Bound::new(LowerBound::new(version, false), UpperBound::Unbounded)),
        ),
        _ => return Err(ParseError::range(full, pos, "unknown operator")),
    };
    Ok(range)
}

fn single(lower: LowerBound, upper: UpperBound) -> VersionRange {
    VersionRange::from_bounds(Bound::new(lower, upper))
}

fn version_at(full: &str, text: &str, pos: usize) -> Result<Version, ParseError> {
    parse_version(text).map_err(|(offset, reason)| ParseError::range(full, pos + offset, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_operators() {
        let r = VersionRange::parse(">1.0").unwrap();
        assert!(!r.contains(&v("1.0")));
        assert!(r.contains(&v("1.0.1")));

        let r = VersionRange::parse("<=2").unwrap();
        assert!(r.contains(&v("2")));
        assert!(!r.contains(&v("2.1")));

        let r = VersionRange::parse("<=2*").unwrap();
        assert!(r.contains(&v("2.1")));
        assert!(!r.contains(&v("3")));

        let r = VersionRange::parse("=1.5").unwrap();
        assert_eq!(r, VersionRange::exact(v("1.5")));
    }

    #[test]
    fn test_plus_forms() {
        let r = VersionRange::parse("1.2+").unwrap();
        assert!(r.contains(&v("1.2")));
        assert!(r.contains(&v("99")));
        assert!(!r.contains(&v("1.1")));

        let r = VersionRange::parse("1+<=2").unwrap();
        assert!(r.contains(&v("2")));
        assert!(!r.contains(&v("2.0")));
    }

    #[test]
    fn test_whitespace_is_ignored() {
        assert_eq!(
            VersionRange::parse(" >=1 , <2 | 3+ ").unwrap(),
            VersionRange::parse(">=1,<2|3+").unwrap()
        );
    }

    #[test]
    fn test_reversed_interval_is_empty() {
        assert!(VersionRange::parse("3..1").unwrap().is_empty());
        assert!(VersionRange::parse(">=2,<1").unwrap().is_empty());
    }

    #[test]
    fn test_error_positions() {
        let err = VersionRange::parse(">=1..2").unwrap_err();
        assert!(matches!(err, ParseError::MalformedRange { .. }));
        assert_eq!(err.text(), ">=1..2");
        assert_eq!(err.position(), 4);

        let err = VersionRange::parse("1|>=x$").unwrap_err();
        assert_eq!(err.position(), 5);

        let err = VersionRange::parse("1,,2").unwrap_err();
        assert_eq!(err.position(), 2);

        let err = VersionRange::parse("1+>2").unwrap_err();
        assert_eq!(err.position(), 2);

        let err = VersionRange::parse("1..2.").unwrap_err();
        assert_eq!(err.position(), 5);
    }

    #[test]
    fn test_rebased_positions() {
        let err = parse_range_in("foo>=1.$", 3).unwrap_err();
        assert_eq!(err.text(), "foo>=1.$");
        assert_eq!(err.position(), 7);
    }
}
