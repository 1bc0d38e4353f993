use std::fmt;

use pkgenv_version::{Requirement, Version};
use serde::{Deserialize, Serialize};

/// One buildable instance of a package version.
///
/// Variants of the same version differ only by their extra requirements;
/// `index` is the declaration order among siblings. The `commands` payload
/// is carried unevaluated until the context is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageVariant {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub index: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<Requirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<String>,
    /// Install location handed to the command evaluator as `{root}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl PackageVariant {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            index: 0,
            requires: Vec::new(),
            commands: None,
            root: None,
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn with_requires(mut self, requires: Vec<Requirement>) -> Self {
        self.requires = requires;
        self
    }

    pub fn with_commands(mut self, commands: impl Into<String>) -> Self {
        self.commands = Some(commands.into());
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// `name-version`, or just `name` for an unversioned package
    pub fn qualified_name(&self) -> String {
        if self.version.is_empty() {
            self.name.clone()
        } else {
            format!("{}-{}", self.name, self.version)
        }
    }
}

impl fmt::Display for PackageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())?;
        if self.index > 0 {
            write!(f, "[{}]", self.index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let variant = PackageVariant::new("python", Version::parse("3.9").unwrap());
        assert_eq!(variant.to_string(), "python-3.9");
        assert_eq!(variant.with_index(2).to_string(), "python-3.9[2]");

        let bare = PackageVariant::new("tools", Version::empty());
        assert_eq!(bare.to_string(), "tools");
    }

    #[test]
    fn test_serde_skips_empty_fields() {
        let variant = PackageVariant::new("foo", Version::parse("1.0").unwrap())
            .with_requires(vec![Requirement::parse("bar>=2").unwrap()]);
        let json = serde_json::to_value(&variant).unwrap();
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["requires"][0], "bar>=2");
        assert!(json.get("commands").is_none());

        let back: PackageVariant = serde_json::from_value(json).unwrap();
        assert_eq!(back, variant);
    }
}
