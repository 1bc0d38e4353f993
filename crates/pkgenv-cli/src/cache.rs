//! Cache command - inspect and prune the context cache.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use console::style;

use pkgenv_solver::DiskCache;

use crate::common::load_config;

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Remove every cached context
    Clear(CacheArgs),

    /// Remove cached contexts older than the configured TTL
    Gc(GcArgs),

    /// Show the disk space used by cached contexts
    Size(CacheArgs),
}

#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct GcArgs {
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Maximum age in seconds, overriding the configured TTL
    #[arg(long, value_name = "SECONDS")]
    pub ttl: Option<u64>,
}

fn open(args: &CacheArgs) -> Result<(DiskCache, pkgenv_solver::Config)> {
    let config = load_config(args.config.as_deref())?;
    let mut cache = DiskCache::new(config.cache_dir());
    cache.set_read_only(config.cache_read_only);
    cache.set_enabled(config.cache_enabled);
    Ok((cache, config))
}

pub async fn execute(command: CacheCommands) -> Result<u8> {
    match command {
        CacheCommands::Clear(args) => {
            let (cache, _) = open(&args)?;
            cache
                .clear()
                .with_context(|| format!("Failed to clear {}", cache.root().display()))?;
            println!(
                "{} Cleared {}",
                style("Success:").green().bold(),
                cache.root().display()
            );
        }
        CacheCommands::Gc(args) => {
            let (cache, config) = open(&args.cache)?;
            let ttl = args.ttl.map(Duration::from_secs).unwrap_or_else(|| config.cache_ttl());
            let freed = cache.gc(ttl).context("Failed to collect cache garbage")?;
            println!(
                "{} Freed {}",
                style("Success:").green().bold(),
                format_bytes(freed)
            );
        }
        CacheCommands::Size(args) => {
            let (cache, _) = open(&args)?;
            let size = cache.size().context("Failed to measure cache")?;
            println!("{}: {}", cache.root().display(), format_bytes(size));
        }
    }
    Ok(0)
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
