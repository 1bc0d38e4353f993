//! Requirement graph owned by one solve attempt.
//!
//! Every mutation first records the node's previous state in an undo log,
//! so the solver can return to any earlier mark in reverse order.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use log::trace;
use pkgenv_version::{Requirement, RequirementKind, Version, VersionRange};
use serde::{Deserialize, Serialize};

use super::problem::{self, Conflict, ConflictCause, ConflictReason};
use crate::package::PackageVariant;

/// Where a requirement placed on the graph came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// Root request at this position in the request list
    Request { index: usize },
    /// Sub-requirement of a chosen variant
    Package {
        name: String,
        version: Version,
        variant: usize,
    },
    /// The solver's tentative choice of a variant
    Decision { variant: usize },
}

/// A requirement together with its origin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    pub requirement: Requirement,
    pub origin: Origin,
}

impl Provenance {
    pub fn new(requirement: Requirement, origin: Origin) -> Self {
        Self {
            requirement,
            origin,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Origin::Request { .. } => write!(f, "request '{}'", self.requirement),
            Origin::Package {
                name,
                version,
                variant,
            } => {
                if version.is_empty() {
                    write!(f, "{}", name)?;
                } else {
                    write!(f, "{}-{}", name, version)?;
                }
                if *variant > 0 {
                    write!(f, "[{}]", variant)?;
                }
                write!(f, " requires '{}'", self.requirement)
            }
            Origin::Decision { .. } => write!(f, "tentative choice '{}'", self.requirement),
        }
    }
}

/// Accumulated state of one package name
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    range: VersionRange,
    excluded: VersionRange,
    required: bool,
    chosen: Option<Arc<PackageVariant>>,
    sources: Vec<Provenance>,
}

impl Node {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            range: VersionRange::any(),
            excluded: VersionRange::empty(),
            required: false,
            chosen: None,
            sources: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Intersection of all normal and weak requirements
    pub fn range(&self) -> &VersionRange {
        &self.range
    }

    /// Union of all conflict requirements
    pub fn excluded(&self) -> &VersionRange {
        &self.excluded
    }

    /// Whether a normal requirement forces the package into the solve
    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn chosen(&self) -> Option<&Arc<PackageVariant>> {
        self.chosen.as_ref()
    }

    pub fn sources(&self) -> &[Provenance] {
        &self.sources
    }

    /// Whether `version` passes both the range and the exclusions
    pub fn allows(&self, version: &Version) -> bool {
        self.range.contains(version) && !self.excluded.contains(version)
    }

    /// Lowest index of a normal root request on this package
    pub fn request_index(&self) -> Option<usize> {
        self.sources
            .iter()
            .filter(|p| p.requirement.kind() == RequirementKind::Normal)
            .filter_map(|p| match p.origin {
                Origin::Request { index } => Some(index),
                _ => None,
            })
            .min()
    }

    pub fn is_root(&self) -> bool {
        self.request_index().is_some()
    }

    /// The first normal requirement that pulled the package in
    pub fn reason(&self) -> Option<&Provenance> {
        self.sources
            .iter()
            .find(|p| p.requirement.kind() == RequirementKind::Normal)
    }

    /// Causes of an inconsistency: every source plus the current choice
    fn causes(&self) -> Vec<Provenance> {
        let mut causes = self.sources.clone();
        if let Some(chosen) = &self.chosen {
            causes.push(Provenance::new(
                Requirement::new(&self.name, VersionRange::exact(chosen.version.clone())),
                Origin::Decision {
                    variant: chosen.index,
                },
            ));
        }
        causes
    }

    fn is_consistent(&self) -> bool {
        match &self.chosen {
            Some(chosen) => self.allows(&chosen.version),
            None if self.required => {
                !self.range.is_empty() && !self.range.is_subset(&self.excluded)
            }
            None => true,
        }
    }
}

/// Per-package accumulated requirements, choices and provenance.
#[derive(Debug, Default)]
pub struct RequirementGraph {
    nodes: BTreeMap<String, Node>,
    undo: Vec<(String, Option<Node>)>,
}

impl RequirementGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// All nodes, sorted by package name
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Required nodes without a chosen variant, sorted by name
    pub fn unresolved(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .values()
            .filter(|n| n.required && n.chosen.is_none())
    }

    /// Position in the undo log to roll back to later
    pub fn mark(&self) -> usize {
        self.undo.len()
    }

    /// Undo every mutation made since `mark`
    pub fn rollback(&mut self, mark: usize) {
        while self.undo.len() > mark {
            let Some((name, previous)) = self.undo.pop() else {
                break;
            };
            trace!("undo {}", name);
            match previous {
                Some(node) => {
                    self.nodes.insert(name, node);
                }
                None => {
                    self.nodes.remove(&name);
                }
            }
        }
    }

    fn node_mut(&mut self, name: &str) -> &mut Node {
        self.undo.push((name.to_string(), self.nodes.get(name).cloned()));
        self.nodes
            .entry(name.to_string())
            .or_insert_with(|| Node::new(name))
    }

    /// Place a requirement on its package
    pub fn add(&mut self, requirement: Requirement, origin: Origin) -> Result<(), Conflict> {
        let name = requirement.name().to_string();
        let node = self.node_mut(&name);
        match requirement.kind() {
            RequirementKind::Normal => {
                node.range = node.range.intersect(requirement.range());
                node.required = true;
            }
            RequirementKind::Weak => node.range = node.range.intersect(requirement.range()),
            RequirementKind::Conflict => node.excluded = node.excluded.union(requirement.range()),
        }
        node.sources.push(Provenance::new(requirement, origin));

        if node.is_consistent() {
            Ok(())
        } else {
            Err(self.incompatible(&name))
        }
    }

    /// Choose a variant for its package and propagate its requirements
    pub fn choose(&mut self, variant: Arc<PackageVariant>) -> Result<(), Conflict> {
        let name = variant.name.clone();
        let node = self.node_mut(&name);
        node.chosen = Some(Arc::clone(&variant));
        if !node.is_consistent() {
            return Err(self.incompatible(&name));
        }

        let origin = Origin::Package {
            name,
            version: variant.version.clone(),
            variant: variant.index,
        };
        for requirement in &variant.requires {
            self.add(requirement.clone(), origin.clone())?;
        }
        Ok(())
    }

    /// Whether `requirement` could be added without conflicting
    pub fn admits(&self, requirement: &Requirement) -> bool {
        let Some(node) = self.nodes.get(requirement.name()) else {
            return true;
        };

        match requirement.kind() {
            RequirementKind::Normal | RequirementKind::Weak => match &node.chosen {
                Some(chosen) => requirement.range().contains(&chosen.version),
                None => {
                    let range = node.range.intersect(requirement.range());
                    !range.is_empty() && !range.is_subset(&node.excluded)
                }
            },
            RequirementKind::Conflict => match &node.chosen {
                Some(chosen) => !requirement.range().contains(&chosen.version),
                None => {
                    !node.required
                        || !node
                            .range
                            .is_subset(&node.excluded.union(requirement.range()))
                }
            },
        }
    }

    /// Minimal explanation of an inconsistent node
    pub fn incompatible(&self, name: &str) -> Conflict {
        let causes = self
            .nodes
            .get(name)
            .map(Node::causes)
            .unwrap_or_default();
        let minimal = problem::minimize(causes, problem::incompatible);
        self.conflict(name, ConflictReason::Incompatible, minimal)
    }

    /// Minimal explanation of a required node none of `versions` satisfies
    pub fn unavailable(&self, name: &str, versions: &[Version]) -> Conflict {
        let causes = self
            .nodes
            .get(name)
            .map(Node::causes)
            .unwrap_or_default();
        let minimal = problem::minimize(causes, |set| problem::unavailable(set, versions));
        self.conflict(name, ConflictReason::Unavailable, minimal)
    }

    /// Explanation of a required node the repository does not know
    pub fn missing(&self, name: &str) -> Conflict {
        let causes = self
            .nodes
            .get(name)
            .and_then(Node::reason)
            .cloned()
            .into_iter()
            .collect();
        self.conflict(name, ConflictReason::NotFound, causes)
    }

    fn conflict(&self, name: &str, reason: ConflictReason, causes: Vec<Provenance>) -> Conflict {
        let causes = causes
            .into_iter()
            .map(|provenance| ConflictCause {
                chain: self.chain(&provenance),
                provenance,
            })
            .collect();
        Conflict {
            package: name.to_string(),
            reason,
            causes,
        }
    }

    /// The requirements that brought the origin of `provenance` into the
    /// graph, outermost first
    pub fn chain(&self, provenance: &Provenance) -> Vec<Provenance> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = match &provenance.origin {
            Origin::Request { .. } => return chain,
            Origin::Package { name, .. } => name.clone(),
            Origin::Decision { .. } => provenance.requirement.name().to_string(),
        };

        while seen.insert(current.clone()) {
            let Some(reason) = self.nodes.get(&current).and_then(Node::reason) else {
                break;
            };
            chain.push(reason.clone());
            match &reason.origin {
                Origin::Package { name, .. } => current = name.clone(),
                _ => break,
            }
        }

        chain.reverse();
        chain
    }
}
