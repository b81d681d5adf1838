//! CLI command definitions and execution
//!
//! The configuration file is loaded once per invocation. Its `defaults`
//! section fills in output settings no flag asked for, and its storage
//! settings (with `GSW_*` overrides) build the [`Client`] each command runs
//! one public operation on. Results are rendered through the [`Formatter`].

use std::sync::Arc;

use clap::{Parser, Subcommand};
use gsw_core::{BatchExecutor, Client, Config, ConfigManager};
use gsw_s3::S3Client;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

pub mod cat;
pub mod completions;
pub mod cp;
pub mod hash;
pub mod ls;
pub mod pipe;
pub mod rm;
pub mod stat;

/// gsw - gsutil-compatible file operations
///
/// Lists, copies and removes objects in Google Cloud Storage with gsutil's
/// path semantics, and copies between local paths the same way.
#[derive(Parser, Debug)]
#[command(name = "gsw")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinner
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List objects and prefixes under an address
    Ls(ls::LsArgs),

    /// Copy between local paths and cloud addresses
    Cp(cp::CpArgs),

    /// Remove objects
    Rm(rm::RmArgs),

    /// Show object metadata
    Stat(stat::StatArgs),

    /// Display object contents
    Cat(cat::CatArgs),

    /// Stream stdin to an object
    Pipe(pipe::PipeArgs),

    /// Print MD5 hex digests of objects
    Hash(hash::HashArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let flags = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    let command = match cli.command {
        Commands::Completions(args) => return completions::execute(args),
        command => command,
    };

    let config = match ConfigManager::new().and_then(|manager| manager.load_with_env()) {
        Ok(config) => config,
        Err(e) => return Formatter::new(flags).fail(&e),
    };
    let output_config = flags.with_defaults(&config.defaults);

    match command {
        Commands::Ls(args) => ls::execute(args, &config, output_config).await,
        Commands::Cp(args) => cp::execute(args, &config, output_config).await,
        Commands::Rm(args) => rm::execute(args, &config, output_config).await,
        Commands::Stat(args) => stat::execute(args, &config, output_config).await,
        Commands::Cat(args) => cat::execute(args, &config, output_config).await,
        Commands::Pipe(args) => pipe::execute(args, &config, output_config).await,
        Commands::Hash(args) => hash::execute(args, &config, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Build a client from the loaded configuration
async fn connect(config: &Config, formatter: &Formatter) -> Result<Client, ExitCode> {
    let store = S3Client::new(&config.storage)
        .await
        .map_err(|e| formatter.fail(&e))?;

    Ok(Client::new(
        Arc::new(store),
        BatchExecutor::new(&config.executor),
    ))
}
