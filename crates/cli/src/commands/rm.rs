//! rm command - Remove objects
//!
//! Without `--recursive` each address must name an object exactly. With it,
//! everything under the address is removed along with the exact object.

use clap::Args;
use gsw_core::Config;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Spinner};

/// Remove objects
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Cloud addresses to remove (gs://bucket/key)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Remove everything under each address
    #[arg(short, long)]
    pub recursive: bool,

    /// Delete one object at a time
    #[arg(long)]
    pub sequential: bool,

    /// Keep going after an address fails
    #[arg(short = 'f', long)]
    pub continue_on_error: bool,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    status: &'static str,
    deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<String>,
    total: usize,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let client = match super::connect(config, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    let mut exit_code = ExitCode::Success;

    let spinner = Spinner::start(formatter.config(), "Removing...");
    for path in &args.paths {
        match client.rm(path, args.recursive, !args.sequential).await {
            Ok(removed) => deleted.extend(removed),
            Err(e) => {
                exit_code = formatter.fail(&e);
                failed.push(path.clone());
                if !args.continue_on_error {
                    break;
                }
            }
        }
    }
    spinner.finish();

    if formatter.is_json() {
        formatter.json(&RmOutput {
            status: if failed.is_empty() { "success" } else { "partial" },
            total: deleted.len(),
            deleted,
            failed,
        });
    } else {
        for address in &deleted {
            formatter.println(&format!("Removing {address}"));
        }
        if failed.is_empty() {
            formatter.success(&format!("Removed {} object(s)", deleted.len()));
        } else {
            formatter.warning(&format!(
                "Removed {} object(s), {} address(es) failed",
                deleted.len(),
                failed.len()
            ));
        }
    }

    exit_code
}
