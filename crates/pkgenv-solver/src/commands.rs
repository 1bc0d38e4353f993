//! Environment actions and the evaluators that produce them.
//!
//! A package's `commands` payload is opaque to the solver. Once a solve
//! succeeds, a [`CommandEvaluator`] turns each chosen variant's payload into
//! an ordered list of [`EnvAction`]s.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::CommandError;
use crate::package::PackageVariant;

lazy_static! {
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\{(\w+)\}").unwrap();
}

/// One mutation of the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EnvAction {
    Set { name: String, value: String },
    Unset { name: String },
    /// Add `value` at the end of a separator-joined list
    Append { name: String, value: String },
    /// Add `value` at the front of a separator-joined list
    Prepend { name: String, value: String },
}

impl EnvAction {
    /// Name of the variable the action touches
    pub fn name(&self) -> &str {
        match self {
            EnvAction::Set { name, .. }
            | EnvAction::Unset { name }
            | EnvAction::Append { name, .. }
            | EnvAction::Prepend { name, .. } => name,
        }
    }
}

/// Capability that turns a variant's command payload into actions.
pub trait CommandEvaluator: Send + Sync {
    fn evaluate(&self, variant: &PackageVariant) -> Result<Vec<EnvAction>, CommandError>;
}

/// Ignores every payload
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvaluator;

impl CommandEvaluator for NoopEvaluator {
    fn evaluate(&self, _variant: &PackageVariant) -> Result<Vec<EnvAction>, CommandError> {
        Ok(Vec::new())
    }
}

/// Evaluates a line-oriented payload.
///
/// ```text
/// # comment
/// setenv FOO_ROOT {root}
/// prependenv PATH {root}/bin
/// appendenv MANPATH {root}/man
/// unsetenv FOO_DEBUG
/// ```
///
/// `{root}`, `{name}` and `{version}` expand to the variant's install root,
/// package name and version. Unknown placeholders are left as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineEvaluator;

impl LineEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn expand(&self, text: &str, variant: &PackageVariant) -> String {
        PLACEHOLDER_RE
            .replace_all(text, |caps: &Captures| match &caps[1] {
                "root" => variant.root.clone().unwrap_or_default(),
                "name" => variant.name.clone(),
                "version" => variant.version.to_string(),
                _ => caps[0].to_string(),
            })
            .into_owned()
    }
}

impl CommandEvaluator for LineEvaluator {
    fn evaluate(&self, variant: &PackageVariant) -> Result<Vec<EnvAction>, CommandError> {
        let Some(payload) = variant.commands.as_deref() else {
            return Ok(Vec::new());
        };

        let mut actions = Vec::new();
        for (i, raw) in payload.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line_no = i + 1;

            let mut parts = line.splitn(3, char::is_whitespace);
            let command = parts.next().unwrap_or_default();
            let name = parts.next().map(str::trim).unwrap_or_default();
            let value = parts.next().map(str::trim).unwrap_or_default();

            let invalid = |message: &str| CommandError::Invalid {
                package: variant.qualified_name(),
                line: line_no,
                message: message.to_string(),
            };

            if name.is_empty() {
                return Err(invalid("missing variable name"));
            }
            let name = name.to_string();
            let value = self.expand(value, variant);

            let action = match command {
                "setenv" => EnvAction::Set { name, value },
                "appendenv" | "prependenv" if value.is_empty() => {
                    return Err(invalid("missing value"));
                }
                "appendenv" => EnvAction::Append { name, value },
                "prependenv" => EnvAction::Prepend { name, value },
                "unsetenv" if !value.is_empty() => {
                    return Err(invalid("unsetenv takes no value"));
                }
                "unsetenv" => EnvAction::Unset { name },
                other => {
                    return Err(CommandError::UnknownCommand {
                        package: variant.qualified_name(),
                        line: line_no,
                        command: other.to_string(),
                    })
                }
            };
            actions.push(action);
        }

        Ok(actions)
    }
}
