use std::fmt;

use pkgenv_version::{Requirement, RequirementKind, Version, VersionRange};
use serde::{Deserialize, Serialize};

use super::graph::{Origin, Provenance};

/// Why a package could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// The accumulated requirements admit no version
    Incompatible,
    /// Versions exist, but none of them satisfies the requirements
    Unavailable,
    /// The repository does not know the package
    NotFound,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::Incompatible => f.write_str("incompatible requirements"),
            ConflictReason::Unavailable => f.write_str("no matching version"),
            ConflictReason::NotFound => f.write_str("package not found"),
        }
    }
}

/// One requirement taking part in a conflict, with the chain of
/// requirements that brought its origin into the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConflictCause {
    pub provenance: Provenance,
    /// Outermost first: a root request, then each sub-requirement leading to
    /// the package that placed `provenance`
    pub chain: Vec<Provenance>,
}

impl ConflictCause {
    pub fn requirement(&self) -> &Requirement {
        &self.provenance.requirement
    }

    fn render(&self) -> String {
        let mut steps: Vec<String> = self.chain.iter().map(ToString::to_string).collect();
        steps.push(self.provenance.to_string());
        steps.join(" -> ")
    }
}

/// A point where the requirements on one package admit no choice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conflict {
    pub package: String,
    pub reason: ConflictReason,
    pub causes: Vec<ConflictCause>,
}

impl Conflict {
    /// Whether the package tightened a requirement on itself, directly or
    /// through the packages it pulled in
    pub fn is_cyclic(&self) -> bool {
        self.causes.iter().any(|cause| {
            std::iter::once(&cause.provenance)
                .chain(cause.chain.iter())
                .any(|p| matches!(&p.origin, Origin::Package { name, .. } if *name == self.package))
        })
    }

    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.causes.iter().map(ConflictCause::requirement)
    }

    /// The first cause whose chain loops back to the conflicting package
    pub fn cycle(&self) -> Option<&ConflictCause> {
        self.causes.iter().find(|cause| {
            cause
                .chain
                .iter()
                .chain(std::iter::once(&cause.provenance))
                .any(|p| matches!(&p.origin, Origin::Package { name, .. } if *name == self.package))
        })
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "conflict on {} ({}):", self.package, self.reason)?;
        for cause in &self.causes {
            writeln!(f, "    - {}", cause.render())?;
        }
        Ok(())
    }
}

/// Explanation attached to a failed resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub conflicts: Vec<Conflict>,
    /// Number of conflicts met during the search, including unreported ones
    pub total_conflicts: usize,
    pub steps: usize,
    /// Set when the search stopped on the step budget rather than exhaustion
    pub budget_exhausted: bool,
}

impl FailureReport {
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// Names of packages the repository did not know
    pub fn missing_packages(&self) -> Vec<&str> {
        self.conflicts
            .iter()
            .filter(|c| c.reason == ConflictReason::NotFound)
            .map(|c| c.package.as_str())
            .collect()
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.budget_exhausted {
            writeln!(f, "resolve gave up after {} step(s)", self.steps)?;
        } else {
            writeln!(f, "no solution found after {} step(s)", self.steps)?;
        }
        for conflict in &self.conflicts {
            write!(f, "  {}", conflict)?;
        }
        let hidden = self.total_conflicts.saturating_sub(self.conflicts.len());
        if hidden > 0 {
            writeln!(f, "  ... and {} more conflict(s)", hidden)?;
        }
        Ok(())
    }
}

/// Conflicts collected over one solve attempt.
#[derive(Debug)]
pub(crate) struct ConflictLog {
    kept: Vec<Conflict>,
    limit: usize,
    total: usize,
    acyclic: bool,
}

impl ConflictLog {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            kept: Vec::new(),
            limit,
            total: 0,
            acyclic: false,
        }
    }

    pub(crate) fn record(&mut self, conflict: Conflict) {
        self.total += 1;
        if !conflict.is_cyclic() {
            self.acyclic = true;
        }
        if self.kept.len() < self.limit && !self.kept.contains(&conflict) {
            self.kept.push(conflict);
        }
    }

    pub(crate) fn all_cyclic(&self) -> bool {
        self.total > 0 && !self.acyclic
    }

    pub(crate) fn into_report(self, steps: usize, budget_exhausted: bool) -> FailureReport {
        FailureReport {
            conflicts: self.kept,
            total_conflicts: self.total,
            steps,
            budget_exhausted,
        }
    }
}

/// Drop causes one at a time while the rest stays unsatisfiable.
///
/// `unsat` must be monotone: removing causes never turns a satisfiable set
/// into an unsatisfiable one. The result is then minimal, every remaining
/// cause is needed.
pub(crate) fn minimize<F>(causes: Vec<Provenance>, unsat: F) -> Vec<Provenance>
where
    F: Fn(&[&Provenance]) -> bool,
{
    let all: Vec<&Provenance> = causes.iter().collect();
    if !unsat(&all) {
        return causes;
    }

    let mut kept = causes;
    let mut i = 0;
    while i < kept.len() {
        let trial: Vec<&Provenance> = kept
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, p)| p)
            .collect();
        if unsat(&trial) {
            kept.remove(i);
        } else {
            i += 1;
        }
    }
    kept
}

/// No version can satisfy the set, judged on ranges alone
pub(crate) fn incompatible(set: &[&Provenance]) -> bool {
    let (present, allowed, excluded) = fold_ranges(set);
    present && (allowed.is_empty() || allowed.is_subset(&excluded))
}

/// None of `versions` satisfies the set
pub(crate) fn unavailable(set: &[&Provenance], versions: &[Version]) -> bool {
    let present = set
        .iter()
        .any(|p| p.requirement.kind() == RequirementKind::Normal);
    present
        && !versions
            .iter()
            .any(|v| set.iter().all(|p| p.requirement.admits(v)))
}

fn fold_ranges(set: &[&Provenance]) -> (bool, VersionRange, VersionRange) {
    let mut present = false;
    let mut allowed = VersionRange::any();
    let mut excluded = VersionRange::empty();
    for provenance in set {
        let requirement = &provenance.requirement;
        match requirement.kind() {
            RequirementKind::Normal => {
                present = true;
                allowed = allowed.intersect(requirement.range());
            }
            RequirementKind::Weak => allowed = allowed.intersect(requirement.range()),
            RequirementKind::Conflict => excluded = excluded.union(requirement.range()),
        }
    }
    (present, allowed, excluded)
}
