use serde::{Deserialize, Serialize};

/// A package definition as read from a repository source.
///
/// Requirement and version fields stay textual here; they are parsed when
/// the definition is converted into [`PackageVariant`](super::PackageVariant)s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDefinition {
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    /// Extra requirements per variant, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl PackageDefinition {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            requires: Vec::new(),
            variants: Vec::new(),
            commands: None,
            root: None,
        }
    }

    pub fn require(mut self, requirement: impl Into<String>) -> Self {
        self.requires.push(requirement.into());
        self
    }

    pub fn variant<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variants
            .push(requirements.into_iter().map(Into::into).collect());
        self
    }

    pub fn commands(mut self, commands: impl Into<String>) -> Self {
        self.commands = Some(commands.into());
        self
    }

    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }
}
