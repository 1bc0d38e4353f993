//! Solver scenario tests.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use pkgenv_version::{Requirement, Version};

use super::*;
use crate::error::{RepositoryError, SolveError};
use crate::package::PackageDefinition;
use crate::repository::{MemoryRepository, Repository, Versions};

/// Helper to create a package with a given name and version
fn pkg(name: &str, version: &str) -> PackageDefinition {
    PackageDefinition::new(name, version)
}

/// Helper to create a package with requirements
fn pkg_with_requires(name: &str, version: &str, requires: &[&str]) -> PackageDefinition {
    requires
        .iter()
        .fold(PackageDefinition::new(name, version), |p, r| p.require(*r))
}

/// Helper to create a package with variants
fn pkg_with_variants(name: &str, version: &str, variants: &[&[&str]]) -> PackageDefinition {
    variants
        .iter()
        .fold(PackageDefinition::new(name, version), |p, v| {
            p.variant(v.iter().copied())
        })
}

fn repo(definitions: Vec<PackageDefinition>) -> MemoryRepository {
    MemoryRepository::from_definitions("test", definitions).unwrap()
}

fn requests(texts: &[&str]) -> Vec<Requirement> {
    texts.iter().map(|t| Requirement::parse(t).unwrap()).collect()
}

/// Resolved packages rendered as `name-version[index]`, in solution order
fn resolved(solution: &Solution) -> Vec<String> {
    solution
        .packages
        .iter()
        .map(|p| p.variant.to_string())
        .collect()
}

fn failure(err: SolveError) -> Box<FailureReport> {
    match err {
        SolveError::ResolveFailed(report) => report,
        other => panic!("expected ResolveFailed, got {:?}", other),
    }
}

// ============================================================================
// Basic resolution
// ============================================================================

#[test]
fn test_solver_resolve_single() {
    let repo = repo(vec![pkg("a", "1.0"), pkg("a", "2.0")]);
    let solution = Solver::new(&repo).solve(&requests(&["a"])).unwrap();
    assert_eq!(resolved(&solution), vec!["a-2.0"]);
    assert_eq!(solution.steps, 1);
}

#[test]
fn test_solver_empty_request() {
    let repo = repo(vec![pkg("a", "1.0")]);
    let solution = Solver::new(&repo).solve(&[]).unwrap();
    assert!(solution.packages.is_empty());
    assert_eq!(solution.steps, 0);
}

#[test]
fn test_solver_pulls_in_dependencies() {
    let repo = repo(vec![
        pkg_with_requires("app", "1.0", &["lib-1"]),
        pkg("lib", "1.2"),
        pkg("lib", "1.4"),
        pkg("lib", "2.0"),
    ]);
    let solution = Solver::new(&repo).solve(&requests(&["app"])).unwrap();
    assert_eq!(resolved(&solution), vec!["app-1.0", "lib-1.4"]);

    let lib = &solution.packages[1];
    assert_eq!(lib.required_by.len(), 1);
    assert_eq!(lib.required_by[0].to_string(), "app-1.0 requires 'lib-1'");
}

#[test]
fn test_solver_backtracks_past_incompatible_version() {
    let repo = repo(vec![
        pkg("pkgA", "1.0"),
        pkg("pkgA", "1.5"),
        pkg("pkgA", "2.0"),
        pkg_with_requires("pkgB", "1.0", &["pkgA>=2"]),
        pkg_with_requires("pkgB", "0.9", &["pkgA>=1,<2"]),
    ]);
    let solution = Solver::new(&repo)
        .solve(&requests(&["pkgA>=1,<2", "pkgB"]))
        .unwrap();

    assert_eq!(resolved(&solution), vec!["pkgA-1.5", "pkgB-0.9"]);
    // pkgA-1.5, pkgB-1.0 (rejected), pkgB-0.9
    assert_eq!(solution.steps, 3);
}

#[test]
fn test_solver_most_constrained_first() {
    let repo = repo(vec![
        pkg_with_requires("app", "2.0", &["lib-2"]),
        pkg_with_requires("app", "1.0", &["lib-1"]),
        pkg("lib", "1.0"),
        pkg("lib", "2.0"),
        pkg_with_requires("tool", "1.0", &["lib<2"]),
    ]);
    let solution = Solver::new(&repo)
        .solve(&requests(&["app", "tool"]))
        .unwrap();
    assert_eq!(resolved(&solution), vec!["app-1.0", "tool-1.0", "lib-1.0"]);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_solver_self_conflicting_request() {
    let repo = repo(vec![pkg("pkgX", "1.0")]);
    let err = Solver::new(&repo)
        .solve(&requests(&["pkgX==1.0", "!pkgX==1.0"]))
        .unwrap_err();

    let report = failure(err);
    assert_eq!(report.steps, 0);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].package, "pkgX");
    assert_eq!(report.conflicts[0].reason, ConflictReason::Incompatible);
}

#[test]
fn test_solver_missing_root() {
    let repo = repo(vec![pkg("a", "1.0")]);
    let err = Solver::new(&repo).solve(&requests(&["ghost"])).unwrap_err();

    let report = failure(err);
    assert_eq!(report.missing_packages(), vec!["ghost"]);
    assert_eq!(report.steps, 0);
}

#[test]
fn test_solver_missing_dependency_backtracks() {
    let repo = repo(vec![
        pkg_with_requires("app", "2.0", &["ghost"]),
        pkg("app", "1.0"),
    ]);
    let solution = Solver::new(&repo).solve(&requests(&["app"])).unwrap();
    assert_eq!(resolved(&solution), vec!["app-1.0"]);
    assert_eq!(solution.families, vec!["app", "ghost"]);
}

#[test]
fn test_solver_no_matching_version() {
    let repo = repo(vec![pkg("a", "1.0"), pkg("a", "2.0")]);
    let err = Solver::new(&repo).solve(&requests(&["a>=3"])).unwrap_err();

    let report = failure(err);
    assert_eq!(report.conflicts[0].reason, ConflictReason::Unavailable);
    let texts: Vec<String> = report.conflicts[0]
        .requirements()
        .map(|r| r.to_string())
        .collect();
    assert_eq!(texts, vec!["a>=3"]);
}

#[test]
fn test_solver_conflicts_are_minimal() {
    let repo = repo(vec![pkg("pkgA", "1.0"), pkg("pkgA", "2.0")]);
    let err = Solver::new(&repo)
        .solve(&requests(&["pkgA", "pkgA>=2", "pkgA<2"]))
        .unwrap_err();

    let report = failure(err);
    let conflict = &report.conflicts[0];
    let texts: Vec<String> = conflict.requirements().map(|r| r.to_string()).collect();
    assert_eq!(texts, vec!["pkgA>=2", "pkgA<2"]);

    // dropping any one cause leaves a satisfiable set
    for skip in 0..conflict.causes.len() {
        let range = conflict
            .requirements()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .fold(pkgenv_version::VersionRange::any(), |acc, (_, r)| {
                acc.intersect(r.range())
            });
        assert!(!range.is_empty());
    }
}

#[test]
fn test_solver_cyclic_requirement() {
    let repo = repo(vec![
        pkg_with_requires("c", "1", &["d"]),
        pkg_with_requires("d", "1", &["c>=2"]),
    ]);
    let err = Solver::new(&repo).solve(&requests(&["c"])).unwrap_err();

    match err {
        SolveError::CyclicRequirement {
            package, chain, ..
        } => {
            assert_eq!(package, "c");
            assert_eq!(
                chain,
                "request 'c' -> c-1 requires 'd' -> d-1 requires 'c>=2'"
            );
        }
        other => panic!("expected CyclicRequirement, got {:?}", other),
    }
}

#[test]
fn test_solver_step_budget() {
    let repo = repo(vec![
        pkg("pkgA", "1.5"),
        pkg_with_requires("pkgB", "1.0", &["pkgA>=2"]),
        pkg("pkgB", "0.9"),
    ]);
    let err = Solver::new(&repo)
        .with_max_steps(Some(1))
        .solve(&requests(&["pkgA", "pkgB"]))
        .unwrap_err();

    let report = failure(err);
    assert!(report.budget_exhausted);
    assert_eq!(report.steps, 1);
}

#[test]
fn test_solver_reported_conflicts_limit() {
    let repo = repo(vec![
        pkg_with_requires("app", "3", &["ghost3"]),
        pkg_with_requires("app", "2", &["ghost2"]),
        pkg_with_requires("app", "1", &["ghost1"]),
    ]);
    let err = Solver::new(&repo)
        .with_max_reported_conflicts(2)
        .solve(&requests(&["app"]))
        .unwrap_err();

    let report = failure(err);
    assert_eq!(report.conflicts.len(), 2);
    assert_eq!(report.total_conflicts, 3);
}

// ============================================================================
// Requirement kinds
// ============================================================================

#[test]
fn test_solver_weak_requirement_does_not_pull_in() {
    let repo = repo(vec![
        pkg_with_requires("app", "1", &["~py-3"]),
        pkg("py", "2.7"),
        pkg("py", "3.9"),
        pkg("py", "4.0"),
    ]);

    let solution = Solver::new(&repo).solve(&requests(&["app"])).unwrap();
    assert_eq!(resolved(&solution), vec!["app-1"]);

    let solution = Solver::new(&repo)
        .solve(&requests(&["app", "py"]))
        .unwrap();
    assert_eq!(resolved(&solution), vec!["app-1", "py-3.9"]);
}

#[test]
fn test_solver_conflict_requirement_excludes_versions() {
    let repo = repo(vec![pkg("lib", "1.0"), pkg("lib", "2.0")]);
    let solution = Solver::new(&repo)
        .solve(&requests(&["lib", "!lib-2"]))
        .unwrap();
    assert_eq!(resolved(&solution), vec!["lib-1.0"]);

    // a conflict on an absent package is satisfied by leaving it out
    let solution = Solver::new(&repo)
        .solve(&requests(&["!ghost", "lib-1"]))
        .unwrap();
    assert_eq!(resolved(&solution), vec!["lib-1.0"]);
}

// ============================================================================
// Variants
// ============================================================================

#[test]
fn test_solver_equal_variants_pick_lowest_index() {
    let repo = repo(vec![
        pkg_with_variants("pkgY", "1.0", &[&["zlib"], &["bzip2"]]),
        pkg("zlib", "1.2"),
        pkg("bzip2", "1.0"),
    ]);
    let solution = Solver::new(&repo).solve(&requests(&["pkgY"])).unwrap();
    assert_eq!(resolved(&solution), vec!["pkgY-1.0", "zlib-1.2"]);
    assert_eq!(solution.packages[0].variant.index, 0);
}

#[test]
fn test_solver_prefers_compatible_variant() {
    let repo = repo(vec![
        pkg_with_variants("pkgY", "1.0", &[&["python-2"], &["python-3"]]),
        pkg("python", "2.7"),
        pkg("python", "3.9"),
    ]);
    let solution = Solver::new(&repo)
        .solve(&requests(&["python-3", "pkgY"]))
        .unwrap();
    assert_eq!(resolved(&solution), vec!["python-3.9", "pkgY-1.0[1]"]);
}

#[test]
fn test_solver_skips_incompatible_variant() {
    let repo = repo(vec![
        pkg_with_variants("tool", "1.0", &[&["lib>=2"], &["lib<2"]]),
        pkg("lib", "1.0"),
        pkg_with_requires("app", "1.0", &["lib-1"]),
    ]);
    let solution = Solver::new(&repo)
        .solve(&requests(&["app", "tool"]))
        .unwrap();
    assert_eq!(resolved(&solution), vec!["app-1.0", "tool-1.0[1]", "lib-1.0"]);
}

// ============================================================================
// Determinism and control
// ============================================================================

#[test]
fn test_solver_is_deterministic() {
    let repo = repo(vec![
        pkg_with_requires("app", "1.0", &["b", "a"]),
        pkg_with_variants("a", "1.0", &[&["c"], &["c"]]),
        pkg("b", "1.0"),
        pkg("b", "1.1"),
        pkg("c", "0.1"),
    ]);
    let reqs = requests(&["app"]);
    let first = Solver::new(&repo).solve(&reqs).unwrap();
    let second = Solver::new(&repo).solve(&reqs).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_solver_orders_roots_first() {
    let repo = repo(vec![
        pkg_with_requires("zed", "1", &["mid", "beta"]),
        pkg("alpha", "1"),
        pkg("beta", "1"),
        pkg("mid", "1"),
    ]);
    let solution = Solver::new(&repo)
        .solve(&requests(&["zed", "alpha"]))
        .unwrap();
    assert_eq!(resolved(&solution), vec!["zed-1", "alpha-1", "beta-1", "mid-1"]);
}

#[test]
fn test_solver_cancelled() {
    let repo = repo(vec![pkg("a", "1.0")]);
    let flag = Arc::new(AtomicBool::new(true));
    let err = Solver::new(&repo)
        .with_cancel_flag(flag)
        .solve(&requests(&["a"]))
        .unwrap_err();
    assert!(matches!(err, SolveError::Cancelled));
}

/// Repository whose backend is unreachable
struct OfflineRepository;

impl Repository for OfflineRepository {
    fn name(&self) -> &str {
        "offline"
    }

    fn get_versions(&self, _name: &str) -> Result<Versions<'_>, RepositoryError> {
        Err(RepositoryError::Backend("connection refused".to_string()))
    }

    fn get_variants(
        &self,
        _name: &str,
        _version: &Version,
    ) -> Result<Vec<Arc<crate::package::PackageVariant>>, RepositoryError> {
        Err(RepositoryError::Backend("connection refused".to_string()))
    }

    fn fingerprint(&self, _family: &str) -> Result<Option<String>, RepositoryError> {
        Ok(None)
    }
}

#[test]
fn test_solver_propagates_repository_errors() {
    let err = Solver::new(&OfflineRepository)
        .solve(&requests(&["a"]))
        .unwrap_err();
    assert!(matches!(
        err,
        SolveError::Repository(RepositoryError::Backend(_))
    ));
}
