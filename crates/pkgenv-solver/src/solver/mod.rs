//! Backtracking dependency solver.
//!
//! A solve attempt runs as an explicit state machine over a
//! [`RequirementGraph`]:
//!
//! - **Initializing** seeds the graph with the root requests. Conflict
//!   requests become exclusions that are never rolled back.
//! - **Expanding** looks up the candidates of every required, unresolved
//!   package: versions admitted by the accumulated range, newest first.
//! - **Choosing** pushes a decision frame for the most constrained package
//!   (fewest candidates, then name) and tries its first candidate,
//!   propagating the variant's requirements into the graph.
//! - **Backtracking** rolls the graph back to the innermost frame's mark and
//!   tries its next candidate, popping exhausted frames.
//! - **Solved** / **Failed** end the attempt.
//!
//! Repository answers are memoized for the duration of one attempt only.
//!
//! # Example
//!
//! ```ignore
//! use pkgenv_solver::repository::MemoryRepository;
//! use pkgenv_solver::solver::Solver;
//!
//! let repo = MemoryRepository::from_json_file(path)?;
//! let solution = Solver::new(&repo).solve(&requests)?;
//! ```

mod decisions;
mod graph;
mod policy;
mod problem;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, trace};
use pkgenv_version::{Requirement, Version};
use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, Result, SolveError};
use crate::package::PackageVariant;
use crate::repository::Repository;

pub use decisions::{DecisionStack, Frame};
pub use graph::{Node, Origin, Provenance, RequirementGraph};
pub use policy::VariantSelector;
pub use problem::{Conflict, ConflictCause, ConflictReason, FailureReport};

use problem::ConflictLog;

/// States of one solve attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveState {
    Initializing,
    Expanding,
    Choosing,
    Backtracking,
    Solved,
    Failed,
}

/// A package chosen by the solver, with the requirements placed on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    pub variant: PackageVariant,
    pub required_by: Vec<Provenance>,
}

impl ResolvedPackage {
    pub fn name(&self) -> &str {
        &self.variant.name
    }
}

/// Outcome of a successful solve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    /// Root packages in request order, then the rest by name
    pub packages: Vec<ResolvedPackage>,
    /// Every package family the repository was asked about, sorted
    pub families: Vec<String>,
    /// Candidates tried
    pub steps: usize,
}

/// Resolves requests against one repository.
pub struct Solver<'a> {
    repository: &'a dyn Repository,
    selector: VariantSelector,
    max_steps: Option<usize>,
    max_reported_conflicts: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Solver<'a> {
    pub fn new(repository: &'a dyn Repository) -> Self {
        Self {
            repository,
            selector: VariantSelector::new(),
            max_steps: None,
            max_reported_conflicts: 10,
            cancel: None,
        }
    }

    pub fn with_selector(mut self, selector: VariantSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Give up after trying this many candidates
    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_reported_conflicts(mut self, limit: usize) -> Self {
        self.max_reported_conflicts = limit.max(1);
        self
    }

    /// Flag checked before every expansion and choice
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Resolve `requests` into a consistent set of variants
    pub fn solve(&self, requests: &[Requirement]) -> Result<Solution> {
        let mut attempt = Attempt::new(self);
        let mut state = SolveState::Initializing;

        loop {
            trace!("solver state {:?} at depth {}", state, attempt.stack.depth());
            state = match state {
                SolveState::Initializing => attempt.initialize(requests),
                SolveState::Expanding => {
                    self.check_cancelled()?;
                    if self.max_steps.is_some_and(|max| attempt.steps >= max) {
                        attempt.budget_exhausted = true;
                        SolveState::Failed
                    } else {
                        attempt.expand()?
                    }
                }
                SolveState::Choosing => {
                    self.check_cancelled()?;
                    attempt.choose()
                }
                SolveState::Backtracking => attempt.backtrack(),
                SolveState::Solved => {
                    let solution = attempt.into_solution();
                    info!(
                        "resolved {} request(s) to {} package(s) in {} step(s)",
                        requests.len(),
                        solution.packages.len(),
                        solution.steps
                    );
                    return Ok(solution);
                }
                SolveState::Failed => return Err(attempt.into_error()),
            };
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Acquire) => {
                debug!("resolve cancelled");
                Err(SolveError::Cancelled)
            }
            _ => Ok(()),
        }
    }
}

/// Mutable state of one solve attempt
struct Attempt<'s> {
    repository: &'s dyn Repository,
    selector: VariantSelector,
    graph: RequirementGraph,
    stack: DecisionStack,
    conflicts: ConflictLog,
    /// `None` records a family the repository does not know
    versions: BTreeMap<String, Option<Vec<Version>>>,
    variants: HashMap<(String, Version), Vec<Arc<PackageVariant>>>,
    pending: Option<(String, Vec<Arc<PackageVariant>>)>,
    steps: usize,
    budget_exhausted: bool,
}

impl<'s> Attempt<'s> {
    fn new(solver: &Solver<'s>) -> Self {
        Self {
            repository: solver.repository,
            selector: solver.selector,
            graph: RequirementGraph::new(),
            stack: DecisionStack::new(),
            conflicts: ConflictLog::new(solver.max_reported_conflicts),
            versions: BTreeMap::new(),
            variants: HashMap::new(),
            pending: None,
            steps: 0,
            budget_exhausted: false,
        }
    }

    fn initialize(&mut self, requests: &[Requirement]) -> SolveState {
        for (index, request) in requests.iter().enumerate() {
            if let Err(conflict) = self.graph.add(request.clone(), Origin::Request { index }) {
                debug!("requests conflict on {} before any search", conflict.package);
                self.conflicts.record(conflict);
                return SolveState::Failed;
            }
        }
        SolveState::Expanding
    }

    fn expand(&mut self) -> Result<SolveState> {
        let pending: Vec<String> = self
            .graph
            .unresolved()
            .map(|node| node.name().to_string())
            .collect();
        if pending.is_empty() {
            return Ok(SolveState::Solved);
        }

        let mut best: Option<(String, Vec<Arc<PackageVariant>>)> = None;
        for name in pending {
            let Some(candidates) = self.candidates(&name)? else {
                let conflict = self.graph.missing(&name);
                self.conflicts.record(conflict);
                if self.graph.node(&name).is_some_and(Node::is_root) {
                    debug!("requested package {} does not exist", name);
                    return Ok(SolveState::Failed);
                }
                return Ok(SolveState::Backtracking);
            };

            if candidates.is_empty() {
                let known = self.known_versions(&name);
                let conflict = self.graph.unavailable(&name, &known);
                trace!("no candidates left for {}", name);
                self.conflicts.record(conflict);
                return Ok(SolveState::Backtracking);
            }

            let better = match &best {
                Some((_, current)) => candidates.len() < current.len(),
                None => true,
            };
            if better {
                best = Some((name, candidates));
            }
        }

        self.pending = best;
        Ok(SolveState::Choosing)
    }

    fn choose(&mut self) -> SolveState {
        let Some((name, candidates)) = self.pending.take() else {
            return SolveState::Expanding;
        };

        let ranked = self.selector.rank_by_version(&candidates, &self.graph);
        debug!(
            "level {}: choosing {} from {} candidate(s)",
            self.stack.depth() + 1,
            name,
            ranked.len()
        );
        self.stack.push(Frame::new(name, ranked, self.graph.mark()));

        if self.advance() {
            SolveState::Expanding
        } else {
            self.stack.pop();
            SolveState::Backtracking
        }
    }

    fn backtrack(&mut self) -> SolveState {
        while !self.stack.is_empty() {
            if self.advance() {
                return SolveState::Expanding;
            }
            if let Some(frame) = self.stack.pop() {
                trace!("exhausted {} after {} candidate(s)", frame.node(), frame.tried());
            }
        }
        SolveState::Failed
    }

    /// Try the innermost frame's remaining candidates until one propagates
    /// without conflict
    fn advance(&mut self) -> bool {
        let Some(frame) = self.stack.top_mut() else {
            return false;
        };

        while let Some(candidate) = frame.next_candidate() {
            self.steps += 1;
            self.graph.rollback(frame.mark());
            trace!("trying {}", candidate);
            match self.graph.choose(candidate) {
                Ok(()) => return true,
                Err(conflict) => self.conflicts.record(conflict),
            }
        }

        self.graph.rollback(frame.mark());
        false
    }

    /// Variants of `name` admitted by its node, newest version first.
    ///
    /// `None` when the repository does not know the package.
    fn candidates(&mut self, name: &str) -> Result<Option<Vec<Arc<PackageVariant>>>> {
        let Some(versions) = self.versions_of(name)?.cloned() else {
            return Ok(None);
        };
        let Some(node) = self.graph.node(name) else {
            return Ok(Some(Vec::new()));
        };
        let allowed: Vec<Version> = versions.iter().filter(|v| node.allows(v)).cloned().collect();

        let mut candidates = Vec::new();
        for version in allowed {
            candidates.extend(self.variants_of(name, version)?);
        }
        Ok(Some(candidates))
    }

    fn versions_of(&mut self, name: &str) -> Result<Option<&Vec<Version>>> {
        if !self.versions.contains_key(name) {
            let fetched = match self.repository.get_versions(name) {
                Ok(versions) => Some(versions.collect::<Vec<_>>()),
                Err(RepositoryError::PackageNotFound { .. }) => None,
                Err(err) => return Err(err.into()),
            };
            debug!(
                "{}: {} version(s) of {}",
                self.repository.name(),
                fetched.as_ref().map_or(0, Vec::len),
                name
            );
            self.versions.insert(name.to_string(), fetched);
        }
        Ok(self.versions.get(name).and_then(Option::as_ref))
    }

    fn variants_of(&mut self, name: &str, version: Version) -> Result<Vec<Arc<PackageVariant>>> {
        let key = (name.to_string(), version);
        if let Some(variants) = self.variants.get(&key) {
            return Ok(variants.clone());
        }
        let variants = self.repository.get_variants(name, &key.1)?;
        self.variants.insert(key, variants.clone());
        Ok(variants)
    }

    fn known_versions(&self, name: &str) -> Vec<Version> {
        self.versions
            .get(name)
            .and_then(Option::clone)
            .unwrap_or_default()
    }

    fn into_solution(self) -> Solution {
        let mut chosen: Vec<&Node> = self
            .graph
            .nodes()
            .filter(|node| node.chosen().is_some())
            .collect();
        chosen.sort_by_key(|node| (node.request_index().unwrap_or(usize::MAX), node.name().to_string()));

        let packages = chosen
            .into_iter()
            .filter_map(|node| {
                node.chosen().map(|variant| ResolvedPackage {
                    variant: PackageVariant::clone(variant),
                    required_by: node.sources().to_vec(),
                })
            })
            .collect();

        Solution {
            packages,
            families: self.versions.keys().cloned().collect(),
            steps: self.steps,
        }
    }

    fn into_error(self) -> SolveError {
        let cyclic = !self.budget_exhausted && self.conflicts.all_cyclic();
        let report = self.conflicts.into_report(self.steps, self.budget_exhausted);

        if cyclic {
            let cycle = report
                .conflicts
                .iter()
                .find_map(|c| c.cycle().map(|cause| (c.package.clone(), cause)));
            if let Some((package, cause)) = cycle {
                let chain = cause
                    .chain
                    .iter()
                    .chain(std::iter::once(&cause.provenance))
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return SolveError::CyclicRequirement {
                    package,
                    chain,
                    report: Box::new(report),
                };
            }
        }

        info!(
            "resolve failed after {} step(s) with {} conflict(s)",
            report.steps, report.total_conflicts
        );
        SolveError::ResolveFailed(Box::new(report))
    }
}
