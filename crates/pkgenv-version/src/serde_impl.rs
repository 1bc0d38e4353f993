//! String-based serde support for versions, ranges and requirements.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Requirement, Version, VersionRange};

struct FromStrVisitor<T>(PhantomData<T>, &'static str);

impl<T> Visitor<'_> for FromStrVisitor<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.1)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<T, E> {
        value.parse().map_err(E::custom)
    }
}

macro_rules! string_serde {
    ($ty:ty, $expecting:literal) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_str(FromStrVisitor(PhantomData, $expecting))
            }
        }
    };
}

string_serde!(Version, "a version string");
string_serde!(VersionRange, "a version range string");
string_serde!(Requirement, "a requirement string");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_as_strings() {
        let req = Requirement::parse("foo>=1,<2").unwrap();
        assert_eq!(serde_json::to_string(&req).unwrap(), "\"foo>=1,<2\"");

        let version: Version = serde_json::from_str("\"1.2-beta\"").unwrap();
        assert_eq!(version.to_string(), "1.2-beta");

        let range: VersionRange = serde_json::from_str("\"1+<2\"").unwrap();
        assert_eq!(range, VersionRange::parse(">=1,<2").unwrap());
    }

    #[test]
    fn test_deserialize_error_mentions_text() {
        let err = serde_json::from_str::<Requirement>("\"9bad\"").unwrap_err();
        assert!(err.to_string().contains("9bad"));
    }
}
