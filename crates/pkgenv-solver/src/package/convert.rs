//! Conversion from textual package definitions to solver variants.

use pkgenv_version::{is_valid_name, Requirement, Version};

use super::{PackageDefinition, PackageVariant};
use crate::error::RepositoryError;

impl PackageDefinition {
    /// Parse the definition's version
    pub fn parsed_version(&self) -> Result<Version, RepositoryError> {
        Version::parse(&self.version).map_err(|source| RepositoryError::Malformed {
            package: self.name.clone(),
            source,
        })
    }

    /// Expand the definition into its variants.
    ///
    /// Variant `i` requires the common requirements followed by
    /// `variants[i]`. A definition without variants yields a single
    /// variant with index 0.
    pub fn to_variants(&self) -> Result<Vec<PackageVariant>, RepositoryError> {
        if !is_valid_name(&self.name) {
            return Err(RepositoryError::InvalidName(self.name.clone()));
        }

        let version = self.parsed_version()?;
        let common = self.parse_requirements(&self.requires)?;

        let mut extras = Vec::with_capacity(self.variants.len().max(1));
        if self.variants.is_empty() {
            extras.push(Vec::new());
        } else {
            for requirements in &self.variants {
                extras.push(self.parse_requirements(requirements)?);
            }
        }

        let variants = extras
            .into_iter()
            .enumerate()
            .map(|(index, extra)| {
                let mut requires = common.clone();
                requires.extend(extra);
                PackageVariant {
                    name: self.name.clone(),
                    version: version.clone(),
                    index,
                    requires,
                    commands: self.commands.clone(),
                    root: self.root.clone(),
                }
            })
            .collect();

        Ok(variants)
    }

    fn parse_requirements(&self, texts: &[String]) -> Result<Vec<Requirement>, RepositoryError> {
        texts
            .iter()
            .map(|text| {
                Requirement::parse(text).map_err(|source| RepositoryError::Malformed {
                    package: format!("{}-{}", self.name, self.version),
                    source,
                })
            })
            .collect()
    }
}

impl From<&PackageVariant> for PackageDefinition {
    fn from(variant: &PackageVariant) -> Self {
        PackageDefinition {
            name: variant.name.clone(),
            version: variant.version.to_string(),
            requires: variant.requires.iter().map(ToString::to_string).collect(),
            variants: Vec::new(),
            commands: variant.commands.clone(),
            root: variant.root.clone(),
        }
    }
}
