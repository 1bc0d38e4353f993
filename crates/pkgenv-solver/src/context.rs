//! Resolved contexts.
//!
//! A [`Context`] is the immutable result of a successful resolve: the
//! ordered packages, the environment actions their commands produced and
//! metadata describing the solve. Contexts serialize to JSON for the cache
//! and for `pkgenv resolve --json`.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use pkgenv_version::{Requirement, RequirementKind};
use serde::{Deserialize, Serialize};

use crate::cache::RepositoryFingerprint;
use crate::commands::{CommandEvaluator, EnvAction};
use crate::error::{CacheError, Result};
use crate::solver::{Origin, Provenance, ResolvedPackage, Solution};

/// How a context was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveMetadata {
    pub created: DateTime<Utc>,
    /// Candidates the solver tried
    pub steps: usize,
    /// Name of the repository solved against
    pub repository: String,
    /// Fingerprints of every family the solve touched
    pub fingerprint: RepositoryFingerprint,
}

/// The resolved environment for a set of requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub requests: Vec<Requirement>,
    pub packages: Vec<ResolvedPackage>,
    pub actions: Vec<EnvAction>,
    pub metadata: SolveMetadata,
}

impl Context {
    /// Build a context from a solution, evaluating each package's commands
    /// in context order
    pub fn assemble(
        solution: Solution,
        requests: &[Requirement],
        evaluator: &dyn CommandEvaluator,
        metadata: SolveMetadata,
    ) -> Result<Self> {
        let mut actions = Vec::new();
        for package in &solution.packages {
            actions.extend(evaluator.evaluate(&package.variant)?);
        }

        Ok(Self {
            requests: requests.to_vec(),
            packages: solution.packages,
            actions,
            metadata,
        })
    }

    pub fn packages(&self) -> &[ResolvedPackage] {
        &self.packages
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedPackage> {
        self.packages.iter().find(|p| p.name() == name)
    }

    /// The requirements that placed a resolved package in the context
    pub fn why(&self, name: &str) -> Option<&[Provenance]> {
        self.get(name).map(|p| p.required_by.as_slice())
    }

    /// Apply the actions on top of `base`, joining list variables with
    /// `separator`
    pub fn apply(&self, base: IndexMap<String, String>, separator: &str) -> IndexMap<String, String> {
        self.actions.iter().fold(base, |mut env, action| {
            match action {
                EnvAction::Set { name, value } => {
                    env.insert(name.clone(), value.clone());
                }
                EnvAction::Unset { name } => {
                    env.shift_remove(name);
                }
                EnvAction::Append { name, value } => {
                    let joined = match env.get(name) {
                        Some(current) if !current.is_empty() => {
                            format!("{}{}{}", current, separator, value)
                        }
                        _ => value.clone(),
                    };
                    env.insert(name.clone(), joined);
                }
                EnvAction::Prepend { name, value } => {
                    let joined = match env.get(name) {
                        Some(current) if !current.is_empty() => {
                            format!("{}{}{}", value, separator, current)
                        }
                        _ => value.clone(),
                    };
                    env.insert(name.clone(), joined);
                }
            }
            env
        })
    }

    /// The same solve seen from a reordering of its requests.
    ///
    /// Request provenance is renumbered and listed in the new request
    /// order ahead of package provenance, roots are sorted into the new
    /// request order and the actions are evaluated again to follow them.
    pub fn reordered(self, requests: &[Requirement], evaluator: &dyn CommandEvaluator) -> Result<Self> {
        if self.requests == requests {
            return Ok(self);
        }

        let positions = request_positions(&self.requests, requests);
        let mut packages = self.packages;
        for package in &mut packages {
            for provenance in &mut package.required_by {
                if let Origin::Request { index } = &mut provenance.origin {
                    if let Some(Some(position)) = positions.get(*index) {
                        *index = *position;
                    }
                }
            }
            package.required_by.sort_by_key(|p| match p.origin {
                Origin::Request { index } => (0, index),
                _ => (1, 0),
            });
        }
        packages.sort_by_key(|p| (root_index(p).unwrap_or(usize::MAX), p.name().to_string()));

        let solution = Solution {
            packages,
            families: self.metadata.fingerprint.families.keys().cloned().collect(),
            steps: self.metadata.steps,
        };
        Self::assemble(solution, requests, evaluator, self.metadata)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).map_err(CacheError::from)?)
    }
}

/// New position of every old request. Equal requests take the new
/// positions in turn, so duplicates stay distinct.
fn request_positions(old: &[Requirement], new: &[Requirement]) -> Vec<Option<usize>> {
    let mut taken = vec![false; new.len()];
    old.iter()
        .map(|request| {
            let position = new
                .iter()
                .enumerate()
                .position(|(i, r)| !taken[i] && r == request)?;
            taken[position] = true;
            Some(position)
        })
        .collect()
}

/// Lowest request position of a normal root requirement on the package
fn root_index(package: &ResolvedPackage) -> Option<usize> {
    package
        .required_by
        .iter()
        .filter(|p| p.requirement.kind() == RequirementKind::Normal)
        .filter_map(|p| match p.origin {
            Origin::Request { index } => Some(index),
            _ => None,
        })
        .min()
}
