use std::path::PathBuf;

use pkgenv_version::ParseError;
use thiserror::Error;

use crate::solver::FailureReport;

/// Errors raised by repository implementations
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("package not found: {name}")]
    PackageNotFound { name: String },

    #[error("invalid definition for package {package}: {source}")]
    Malformed {
        package: String,
        #[source]
        source: ParseError,
    },

    #[error("invalid package name: {0}")]
    InvalidName(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid repository document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::PackageNotFound { .. })
    }
}

/// Errors raised while turning opaque command payloads into actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("{package}: line {line}: unknown command '{command}'")]
    UnknownCommand {
        package: String,
        line: usize,
        command: String,
    },

    #[error("{package}: line {line}: {message}")]
    Invalid {
        package: String,
        line: usize,
        message: String,
    },
}

/// Errors raised by context stores
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt cache entry {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode context: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors surfaced by a resolve
#[derive(Error, Debug)]
pub enum SolveError {
    /// A request or definition could not be parsed
    #[error(transparent)]
    MalformedRange(#[from] ParseError),

    /// The search was exhausted
    #[error("{0}")]
    ResolveFailed(Box<FailureReport>),

    /// Every explored conflict was caused by a package tightening its own requirement
    #[error("cyclic requirement on {package}: {chain}")]
    CyclicRequirement {
        package: String,
        chain: String,
        report: Box<FailureReport>,
    },

    #[error("resolve cancelled")]
    Cancelled,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl SolveError {
    /// The failure report, for errors caused by an exhausted search
    pub fn report(&self) -> Option<&FailureReport> {
        match self {
            SolveError::ResolveFailed(report) => Some(report),
            SolveError::CyclicRequirement { report, .. } => Some(report),
            _ => None,
        }
    }
}

pub type Result<T, E = SolveError> = std::result::Result<T, E>;
