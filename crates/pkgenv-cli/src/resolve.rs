//! Resolve command - turn requests into a package environment.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;
use indexmap::IndexMap;
use serde_json::json;

use pkgenv_solver::{Context, Resolver};

use crate::common::{build_resolver, cancel_on_ctrl_c, report_error, resolve_blocking, RepoArgs};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Output the resolved context as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the environment variables the context sets
    #[arg(long)]
    pub env: bool,

    /// Resolve every request set in FILE (one per line) concurrently
    #[arg(long, value_name = "FILE", conflicts_with = "requests")]
    pub batch: Option<PathBuf>,

    /// Requests such as `python-3`, `~openssl>=1.1` or `!legacy`
    #[arg(value_name = "REQUEST", required_unless_present = "batch")]
    pub requests: Vec<String>,
}

pub async fn execute(args: ResolveArgs) -> Result<u8> {
    let resolver = build_resolver(&args.repo)?;

    if let Some(batch) = &args.batch {
        return execute_batch(&resolver, batch, args.json).await;
    }

    let cancel = cancel_on_ctrl_c();
    let context = match resolve_blocking(&resolver, args.requests.clone(), cancel).await? {
        Ok(context) => context,
        Err(e) => return Ok(report_error(&e)),
    };

    if args.json {
        println!("{}", context.to_json()?);
    } else {
        print_packages(&context);
        if args.env {
            println!();
            print_env(&context, &resolver.config().path_separator);
        }
    }
    Ok(0)
}

fn print_packages(context: &Context) {
    println!(
        "{} Resolved {} package(s) in {} step(s)",
        style("Success:").green().bold(),
        context.packages().len(),
        context.metadata.steps
    );
    for package in context.packages() {
        let variant = &package.variant;
        let index = if variant.index > 0 {
            format!(" [variant {}]", variant.index)
        } else {
            String::new()
        };
        println!(
            "  {} {}{}",
            style(&variant.name).green(),
            style(&variant.version).yellow(),
            style(index).dim()
        );
    }
}

/// Print the variables touched by the context after applying it to the
/// current process environment
fn print_env(context: &Context, separator: &str) {
    let base: IndexMap<String, String> = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();
    let env = context.apply(base, separator);

    let mut seen = HashSet::new();
    for action in &context.actions {
        let name = action.name();
        if !seen.insert(name) {
            continue;
        }
        match env.get(name) {
            Some(value) => println!("{}={}", name, value),
            None => println!("unset {}", name),
        }
    }
}

/// Request sets from a batch file: one whitespace-separated set per line,
/// blank lines and `#` comments skipped
pub fn parse_batch(content: &str) -> Vec<Vec<String>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.split_whitespace().map(String::from).collect())
        .collect()
}

async fn execute_batch(resolver: &Resolver, path: &Path, as_json: bool) -> Result<u8> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read batch file {}", path.display()))?;
    let sets = parse_batch(&content);

    let cancel = cancel_on_ctrl_c();
    let handles: Vec<_> = sets
        .iter()
        .map(|requests| {
            let resolver = resolver.clone();
            let requests = requests.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { resolve_blocking(&resolver, requests, cancel).await })
        })
        .collect();

    let mut failed = 0;
    let mut results = Vec::new();
    for (requests, handle) in sets.iter().zip(handles) {
        let outcome = handle.await.context("Resolve task failed")??;
        let line = requests.join(" ");
        match outcome {
            Ok(context) => {
                if as_json {
                    results.push(json!({ "requests": requests, "context": context }));
                } else {
                    let packages: Vec<String> = context
                        .packages()
                        .iter()
                        .map(|p| p.variant.to_string())
                        .collect();
                    println!("{} {}", style(&line).cyan(), packages.join(" "));
                }
            }
            Err(e) => {
                failed += 1;
                if as_json {
                    results.push(json!({ "requests": requests, "error": e.to_string() }));
                } else {
                    eprintln!("{} {}", style(&line).cyan(), style("failed").red().bold());
                    report_error(&e);
                }
            }
        }
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(if failed > 0 { 1 } else { 0 })
}
