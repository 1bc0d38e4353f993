use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use pkgenv_version::Version;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{Repository, Versions};
use crate::error::RepositoryError;
use crate::package::{PackageDefinition, PackageVariant};

/// Repository backed by in-memory package definitions.
///
/// Each family's fingerprint is a SHA-256 over its definitions, so any
/// change to a family invalidates cached solves that touched it. An
/// explicit token can be set instead with [`set_fingerprint`](Self::set_fingerprint),
/// for sources that track modification marks themselves.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    name: String,
    families: BTreeMap<String, Family>,
}

#[derive(Debug, Default)]
struct Family {
    versions: BTreeMap<Version, Vec<Arc<PackageVariant>>>,
    definitions: BTreeMap<Version, PackageDefinition>,
    fingerprint: Option<String>,
}

impl Family {
    fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for definition in self.definitions.values() {
            // serializing a plain struct of strings cannot fail
            if let Ok(bytes) = serde_json::to_vec(definition) {
                hasher.update(&bytes);
            }
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// Accepted JSON layouts: a bare array of definitions, or a document with a
/// `packages` array and an optional repository name.
#[derive(Deserialize)]
#[serde(untagged)]
enum RepositoryDocument {
    List(Vec<PackageDefinition>),
    Document {
        #[serde(default)]
        name: Option<String>,
        packages: Vec<PackageDefinition>,
    },
}

impl MemoryRepository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            families: BTreeMap::new(),
        }
    }

    /// Build a repository from a list of definitions
    pub fn from_definitions<I>(name: impl Into<String>, definitions: I) -> Result<Self, RepositoryError>
    where
        I: IntoIterator<Item = PackageDefinition>,
    {
        let mut repo = Self::new(name);
        for definition in definitions {
            repo.add_definition(definition)?;
        }
        Ok(repo)
    }

    /// Parse a JSON repository document
    pub fn from_json_str(name: impl Into<String>, json: &str) -> Result<Self, RepositoryError> {
        let (doc_name, definitions) = match serde_json::from_str(json)? {
            RepositoryDocument::List(definitions) => (None, definitions),
            RepositoryDocument::Document { name, packages } => (name, packages),
        };
        let name = doc_name.unwrap_or_else(|| name.into());
        Self::from_definitions(name, definitions)
    }

    /// Read a JSON repository document from disk
    pub fn from_json_file(path: &Path) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path).map_err(|source| RepositoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let default_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "memory".to_string());
        Self::from_json_str(default_name, &content)
    }

    /// Add one package version; a second definition of the same version replaces the first
    pub fn add_definition(&mut self, definition: PackageDefinition) -> Result<(), RepositoryError> {
        let variants = definition.to_variants()?;
        let version = definition.parsed_version()?;
        let family = self.families.entry(definition.name.clone()).or_default();

        if family.definitions.contains_key(&version) {
            warn!(
                "{}: replacing duplicate definition of {}-{}",
                self.name, definition.name, version
            );
        }
        debug!(
            "{}: added {}-{} ({} variant(s))",
            self.name,
            definition.name,
            version,
            variants.len()
        );

        family
            .versions
            .insert(version.clone(), variants.into_iter().map(Arc::new).collect());
        family.definitions.insert(version, definition);
        Ok(())
    }

    /// Override the fingerprint token of a family
    pub fn set_fingerprint(&mut self, family: &str, token: impl Into<String>) {
        self.families.entry(family.to_string()).or_default().fingerprint = Some(token.into());
    }

    /// Number of package versions across all families
    pub fn len(&self) -> usize {
        self.families.values().map(|f| f.versions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Repository for MemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_versions(&self, name: &str) -> Result<Versions<'_>, RepositoryError> {
        match self.families.get(name) {
            Some(family) if !family.versions.is_empty() => {
                Ok(Box::new(family.versions.keys().rev().cloned()))
            }
            _ => Err(RepositoryError::PackageNotFound {
                name: name.to_string(),
            }),
        }
    }

    fn get_variants(
        &self,
        name: &str,
        version: &Version,
    ) -> Result<Vec<Arc<PackageVariant>>, RepositoryError> {
        let family = self
            .families
            .get(name)
            .ok_or_else(|| RepositoryError::PackageNotFound {
                name: name.to_string(),
            })?;
        Ok(family.versions.get(version).cloned().unwrap_or_default())
    }

    fn fingerprint(&self, family: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self.families.get(family).map(|f| match &f.fingerprint {
            Some(token) => token.clone(),
            None => f.content_hash(),
        }))
    }
}
