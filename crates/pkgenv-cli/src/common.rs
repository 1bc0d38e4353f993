//! Shared argument groups and helpers for the subcommands.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;
use log::{debug, info};

use pkgenv_solver::{Config, Context, DiskCache, MemoryRepository, Resolver, SolveError};

/// Where packages come from and how results are cached
#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Repository document: a JSON list of package definitions
    #[arg(short = 'r', long = "repo", value_name = "FILE")]
    pub repo: PathBuf,

    /// Configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Neither read nor write the context cache
    #[arg(long)]
    pub no_cache: bool,
}

/// Load the config file, if any, then apply `PKGENV_*` overrides
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env();
    Ok(config)
}

pub fn build_resolver(args: &RepoArgs) -> Result<Resolver> {
    let mut config = load_config(args.config.as_deref())?;
    if args.no_cache {
        config.cache_enabled = false;
    }

    let repo = MemoryRepository::from_json_file(&args.repo)
        .with_context(|| format!("Failed to load repository {}", args.repo.display()))?;
    info!(
        "loaded {} package version(s) from {}",
        repo.len(),
        args.repo.display()
    );

    let mut resolver = Resolver::new(Arc::new(repo));
    if config.cache_enabled {
        let mut cache = DiskCache::new(config.cache_dir());
        cache.set_read_only(config.cache_read_only);
        debug!("context cache at {}", cache.root().display());
        resolver = resolver.with_cache(Arc::new(cache));
    }
    Ok(resolver.with_config(config))
}

/// Cancellation flag raised by Ctrl-C
pub fn cancel_on_ctrl_c() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let raised = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            raised.store(true, Ordering::Release);
        }
    });
    flag
}

/// Resolve on a blocking task so the runtime stays free for signals
pub async fn resolve_blocking(
    resolver: &Resolver,
    requests: Vec<String>,
    cancel: Arc<AtomicBool>,
) -> Result<std::result::Result<Context, SolveError>> {
    let resolver = resolver.clone();
    tokio::task::spawn_blocking(move || resolver.resolve(&requests, Some(cancel)))
        .await
        .context("Resolve task failed")
}

/// Print a resolve error and return the exit code for it
pub fn report_error(err: &SolveError) -> u8 {
    let label = style("Error:").red().bold();
    match err {
        SolveError::MalformedRange(e) => {
            eprintln!("{} {}", label, e);
            eprintln!("  {}", e.text());
            eprintln!("  {}{}", " ".repeat(e.position()), style("^").yellow());
            2
        }
        SolveError::ResolveFailed(report) => {
            eprintln!("{} Unable to resolve the requested packages", label);
            eprint!("{}", report);
            1
        }
        SolveError::CyclicRequirement { package, chain, .. } => {
            eprintln!("{} Package '{}' requires itself", label, package);
            eprintln!("  {}", chain);
            1
        }
        SolveError::Cancelled => {
            eprintln!("{} Resolve cancelled", style("Warning:").yellow().bold());
            130
        }
        other => {
            eprintln!("{} {}", label, other);
            1
        }
    }
}
