//! Package environment resolver.
//!
//! Given textual requests such as `python-3`, `~openssl>=1.1` or
//! `!legacy`, find one variant of every required package so that all
//! requirements hold at once, then assemble the resulting environment.
//!
//! ```ignore
//! use std::sync::Arc;
//! use pkgenv_solver::{MemoryRepository, Resolver};
//!
//! let repo = Arc::new(MemoryRepository::from_json_file(path)?);
//! let context = Resolver::new(repo).resolve(&["app-2", "python-3"], None)?;
//! for package in context.packages() {
//!     println!("{}", package.variant);
//! }
//! ```

pub mod cache;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod package;
pub mod repository;
pub mod resolver;
pub mod solver;

pub use cache::{CacheKey, ContextStore, DiskCache, MemoryCache, RepositoryFingerprint};
pub use commands::{CommandEvaluator, EnvAction, LineEvaluator, NoopEvaluator};
pub use config::Config;
pub use context::{Context, SolveMetadata};
pub use error::{CacheError, CommandError, ConfigError, RepositoryError, Result, SolveError};
pub use package::{PackageDefinition, PackageVariant};
pub use repository::{MemoryRepository, Repository};
pub use resolver::Resolver;
pub use solver::{
    Conflict, ConflictReason, FailureReport, Provenance, ResolvedPackage, Solution, Solver,
};

pub use pkgenv_version::{ParseError, Requirement, RequirementKind, Version, VersionRange};
