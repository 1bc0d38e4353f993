//! Single contiguous intervals of versions.

use std::cmp::Ordering;
use std::fmt;

use crate::version::Version;

/// Lower end of an interval.
///
/// There is no separate "unbounded" lower end: the empty version is the
/// smallest version, so `>= ""` already admits everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LowerBound {
    version: Version,
    inclusive: bool,
}

impl LowerBound {
    pub fn new(version: Version, inclusive: bool) -> Self {
        Self { version, inclusive }
    }

    /// The lowest possible lower bound
    pub fn min() -> Self {
        Self::new(Version::empty(), true)
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    pub fn is_min(&self) -> bool {
        self.inclusive && self.version.is_empty()
    }

    pub fn admits(&self, version: &Version) -> bool {
        match version.cmp(&self.version) {
            Ordering::Greater => true,
            Ordering::Equal => self.inclusive,
            Ordering::Less => false,
        }
    }
}

impl Ord for LowerBound {
    fn cmp(&self, other: &Self) -> Ordering {
        // an inclusive bound starts before an exclusive one on the same version
        self.version
            .cmp(&other.version)
            .then_with(|| other.inclusive.cmp(&self.inclusive))
    }
}

impl PartialOrd for LowerBound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Upper end of an interval.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpperBound {
    /// `<= v`
    Inclusive(Version),
    /// `< v`
    Exclusive(Version),
    /// `v` itself and every version that has `v` as a token prefix
    Family(Version),
    Unbounded,
}

impl UpperBound {
    /// Build a family bound, collapsing the empty family to `Unbounded`.
    pub fn family(version: Version) -> Self {
        if version.is_empty() {
            UpperBound::Unbounded
        } else {
            UpperBound::Family(version)
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, UpperBound::Unbounded)
    }

    pub fn version(&self) -> Option<&Version> {
        match self {
            UpperBound::Inclusive(v) | UpperBound::Exclusive(v) | UpperBound::Family(v) => Some(v),
            UpperBound::Unbounded => None,
        }
    }

    pub fn admits(&self, version: &Version) -> bool {
        match self {
            UpperBound::Inclusive(u) => version <= u,
            UpperBound::Exclusive(u) => version < u,
            UpperBound::Family(u) => version < u || u.is_prefix_of(version),
            UpperBound::Unbounded => true,
        }
    }
}

impl Ord for UpperBound {
    fn cmp(&self, other: &Self) -> Ordering {
        use UpperBound::*;

        // Versions extending a family prefix form one contiguous block right
        // after the prefix, so a family bound sits past every version it
        // prefixes and otherwise orders like its prefix.
        match (self, other) {
            (Unbounded, Unbounded) => Ordering::Equal,
            (Unbounded, _) => Ordering::Greater,
            (_, Unbounded) => Ordering::Less,
            (Family(a), Family(b)) => {
                if a == b {
                    Ordering::Equal
                } else if a.is_prefix_of(b) {
                    Ordering::Greater
                } else if b.is_prefix_of(a) {
                    Ordering::Less
                } else {
                    a.cmp(b)
                }
            }
            (Family(a), Inclusive(b) | Exclusive(b)) => {
                if a.is_prefix_of(b) {
                    Ordering::Greater
                } else {
                    a.cmp(b)
                }
            }
            (Inclusive(_) | Exclusive(_), Family(_)) => other.cmp(self).reverse(),
            (Inclusive(a), Inclusive(b)) | (Exclusive(a), Exclusive(b)) => a.cmp(b),
            (Inclusive(a), Exclusive(b)) => a.cmp(b).then(Ordering::Greater),
            (Exclusive(a), Inclusive(b)) => a.cmp(b).then(Ordering::Less),
        }
    }
}

impl PartialOrd for UpperBound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A non-empty contiguous interval of versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bound {
    lower: LowerBound,
    upper: UpperBound,
}

impl Bound {
    /// Create a bound, or `None` if no version lies between the two ends
    pub fn new(lower: LowerBound, upper: UpperBound) -> Option<Self> {
        if spans(&lower, &upper) {
            Some(Self { lower, upper })
        } else {
            None
        }
    }

    /// The bound admitting every version
    pub fn any() -> Self {
        Self {
            lower: LowerBound::min(),
            upper: UpperBound::Unbounded,
        }
    }

    /// The bound admitting exactly one version
    pub fn exact(version: Version) -> Self {
        Self {
            lower: LowerBound::new(version.clone(), true),
            upper: UpperBound::Inclusive(version),
        }
    }

    /// The bound admitting a version and everything it prefixes
    pub fn family(version: Version) -> Self {
        Self {
            lower: LowerBound::new(version.clone(), true),
            upper: UpperBound::family(version),
        }
    }

    pub fn lower(&self) -> &LowerBound {
        &self.lower
    }

    pub fn upper(&self) -> &UpperBound {
        &self.upper
    }

    pub fn is_any(&self) -> bool {
        self.lower.is_min() && self.upper.is_unbounded()
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.lower.admits(version) && self.upper.admits(version)
    }

    pub fn intersect(&self, other: &Bound) -> Option<Bound> {
        let lower = std::cmp::max(&self.lower, &other.lower).clone();
        let upper = std::cmp::min(&self.upper, &other.upper).clone();
        Bound::new(lower, upper)
    }

    /// Whether `next` (which starts at or after `self`) overlaps or abuts
    /// `self`, so the two can be merged into one interval.
    pub(crate) fn touches(&self, next: &Bound) -> bool {
        if spans(&next.lower, &self.upper) {
            return true;
        }
        match &self.upper {
            UpperBound::Exclusive(u) => next.lower.inclusive && next.lower.version == *u,
            UpperBound::Inclusive(u) => !next.lower.inclusive && next.lower.version == *u,
            UpperBound::Family(_) | UpperBound::Unbounded => false,
        }
    }

    /// Merge with a touching bound
    pub(crate) fn merge(&self, next: &Bound) -> Bound {
        Bound {
            lower: std::cmp::min(&self.lower, &next.lower).clone(),
            upper: std::cmp::max(&self.upper, &next.upper).clone(),
        }
    }
}

/// Whether at least one version lies between `lower` and `upper`.
fn spans(lower: &LowerBound, upper: &UpperBound) -> bool {
    match upper {
        UpperBound::Unbounded => true,
        UpperBound::Inclusive(u) => lower.version < *u || (lower.version == *u && lower.inclusive),
        UpperBound::Exclusive(u) => lower.version < *u,
        UpperBound::Family(u) => lower.version < *u || u.is_prefix_of(&lower.version),
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return f.write_str("*");
        }

        match &self.upper {
            UpperBound::Inclusive(u) if self.lower.inclusive && self.lower.version == *u => {
                return write!(f, "=={}", u);
            }
            UpperBound::Family(u) if self.lower.inclusive && self.lower.version == *u => {
                return write!(f, "{}", u);
            }
            _ => {}
        }

        let mut parts = Vec::with_capacity(2);
        if !self.lower.is_min() {
            let op = if self.lower.inclusive { ">=" } else { ">" };
            parts.push(format!("{}{}", op, self.lower.version));
        }
        match &self.upper {
            UpperBound::Inclusive(u) => parts.push(format!("<={}", u)),
            UpperBound::Exclusive(u) => parts.push(format!("<{}", u)),
            UpperBound::Family(u) => parts.push(format!("<={}*", u)),
            UpperBound::Unbounded => {}
        }
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_lower_bound_ordering() {
        let inc = LowerBound::new(v("1"), true);
        let exc = LowerBound::new(v("1"), false);
        assert!(inc < exc);
        assert!(LowerBound::min() < inc);
    }

    #[test]
    fn test_upper_bound_ordering() {
        let exc = UpperBound::Exclusive(v("2"));
        let inc = UpperBound::Inclusive(v("2"));
        let fam = UpperBound::Family(v("2"));
        assert!(exc < inc);
        assert!(inc < fam);
        assert!(fam < UpperBound::Inclusive(v("3")));
        assert!(fam > UpperBound::Inclusive(v("2.9.9")));
        assert!(UpperBound::Family(v("1.2")) < UpperBound::Family(v("1")));
        assert!(UpperBound::Family(v("1")) < UpperBound::Exclusive(v("3")));
        assert!(fam < UpperBound::Unbounded);
    }

    #[test]
    fn test_bound_contains() {
        let b = Bound::new(LowerBound::new(v("1"), true), UpperBound::Exclusive(v("2"))).unwrap();
        assert!(b.contains(&v("1")));
        assert!(b.contains(&v("1.9")));
        assert!(!b.contains(&v("2")));
        assert!(!b.contains(&v("0.9")));

        let fam = Bound::family(v("1.2"));
        assert!(fam.contains(&v("1.2")));
        assert!(fam.contains(&v("1.2.7")));
        assert!(!fam.contains(&v("1.20")));
        assert!(!fam.contains(&v("1.3")));
    }

    #[test]
    fn test_empty_bounds_rejected() {
        assert!(Bound::new(LowerBound::new(v("2"), true), UpperBound::Exclusive(v("2"))).is_none());
        assert!(Bound::new(LowerBound::new(v("2"), false), UpperBound::Inclusive(v("2"))).is_none());
        assert!(Bound::new(LowerBound::new(v("3"), true), UpperBound::Family(v("2"))).is_none());
        assert!(Bound::new(LowerBound::new(v("2.5"), false), UpperBound::Family(v("2"))).is_some());
        assert!(Bound::new(LowerBound::min(), UpperBound::Exclusive(Version::empty())).is_none());
    }

    #[test]
    fn test_intersect() {
        let a = Bound::new(LowerBound::new(v("1"), true), UpperBound::Exclusive(v("3"))).unwrap();
        let b = Bound::new(LowerBound::new(v("2"), true), UpperBound::Unbounded).unwrap();
        let c = a.intersect(&b).unwrap();
        assert_eq!(c.lower().version(), &v("2"));
        assert_eq!(c.upper(), &UpperBound::Exclusive(v("3")));

        let d = Bound::exact(v("5"));
        assert!(a.intersect(&d).is_none());
    }

    #[test]
    fn test_touches() {
        let a = Bound::new(LowerBound::min(), UpperBound::Exclusive(v("2"))).unwrap();
        let b = Bound::new(LowerBound::new(v("2"), true), UpperBound::Unbounded).unwrap();
        assert!(a.touches(&b));
        assert!(a.merge(&b).is_any());

        let c = Bound::new(LowerBound::new(v("2"), false), UpperBound::Unbounded).unwrap();
        assert!(!a.touches(&c));
    }

    #[test]
    fn test_display() {
        assert_eq!(Bound::any().to_string(), "*");
        assert_eq!(Bound::exact(v("1.0")).to_string(), "==1.0");
        assert_eq!(Bound::family(v("1.2")).to_string(), "1.2");
        let b = Bound::new(LowerBound::new(v("1"), true), UpperBound::Exclusive(v("2"))).unwrap();
        assert_eq!(b.to_string(), ">=1,<2");
        let b = Bound::new(LowerBound::new(v("1.5"), false), UpperBound::Family(v("1"))).unwrap();
        assert_eq!(b.to_string(), ">1.5,<=1*");
    }
}
