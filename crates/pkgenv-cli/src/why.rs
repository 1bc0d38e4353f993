//! Why command - show which requirements placed a package in an environment.

use anyhow::Result;
use clap::Args;
use console::style;

use pkgenv_solver::solver::Origin;
use pkgenv_solver::Provenance;

use crate::common::{build_resolver, cancel_on_ctrl_c, report_error, resolve_blocking, RepoArgs};

#[derive(Args, Debug)]
pub struct WhyArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Package to explain
    #[arg(value_name = "PACKAGE")]
    pub package: String,

    /// Requests the environment is resolved from
    #[arg(value_name = "REQUEST", required = true)]
    pub requests: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: WhyArgs) -> Result<u8> {
    let resolver = build_resolver(&args.repo)?;
    let context = match resolve_blocking(&resolver, args.requests.clone(), cancel_on_ctrl_c()).await? {
        Ok(context) => context,
        Err(e) => return Ok(report_error(&e)),
    };

    let (Some(package), Some(reasons)) = (context.get(&args.package), context.why(&args.package)) else {
        eprintln!(
            "{} Package '{}' is not part of the resolved environment",
            style("Error:").red().bold(),
            args.package
        );
        return Ok(1);
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(reasons)?);
        return Ok(0);
    }

    println!(
        "{} is required by:",
        style(package.variant.to_string()).green().bold()
    );
    for reason in reasons {
        println!("  {}", describe(reason));
    }
    Ok(0)
}

fn describe(reason: &Provenance) -> String {
    match &reason.origin {
        Origin::Request { index } => format!(
            "{} (request #{})",
            style(reason.requirement.to_string()).cyan(),
            index + 1
        ),
        _ => reason.to_string(),
    }
}
