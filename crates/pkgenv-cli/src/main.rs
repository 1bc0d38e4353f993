//! pkgenv - resolve package environments from the command line.

mod cache;
mod common;
mod resolve;
mod why;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use console::style;

#[derive(Parser, Debug)]
#[command(name = "pkgenv", version, about = "Resolve package environments")]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve requests into an environment
    Resolve(resolve::ResolveArgs),

    /// Show why a package is part of a resolved environment
    Why(why::WhyArgs),

    /// Manage the context cache
    #[command(subcommand)]
    Cache(cache::CacheCommands),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Resolve(args) => resolve::execute(args).await,
        Commands::Why(args) => why::execute(args).await,
        Commands::Cache(command) => cache::execute(command).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
