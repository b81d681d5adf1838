//! hash command - Print MD5 hex digests of objects
//!
//! With `--compare`, checks a local file against a single object instead.

use std::path::{Path, PathBuf};

use clap::Args;
use gsw_core::{Client, Config};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Print MD5 hex digests of objects
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Object addresses (gs://bucket/key)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Compare the object's MD5 with this local file
    #[arg(long, value_name = "LOCAL")]
    pub compare: Option<PathBuf>,

    /// Fetch one digest at a time
    #[arg(long)]
    pub sequential: bool,
}

#[derive(Debug, Serialize)]
struct HashEntry<'a> {
    address: &'a str,
    md5: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CompareOutput<'a> {
    address: &'a str,
    local: String,
    same_md5: bool,
}

/// Execute the hash command
pub async fn execute(args: HashArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    if args.compare.is_some() && args.paths.len() != 1 {
        formatter.error("--compare takes exactly one object address");
        return ExitCode::UsageError;
    }

    let client = match super::connect(config, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    match &args.compare {
        Some(local) => compare(&client, local, &args.paths[0], &formatter).await,
        None => digests(&client, &args, &formatter).await,
    }
}

async fn digests(client: &Client, args: &HashArgs, formatter: &Formatter) -> ExitCode {
    let digests = match client.md5_hexdigests(&args.paths, !args.sequential).await {
        Ok(d) => d,
        Err(e) => return formatter.fail(&e),
    };

    let entries: Vec<HashEntry<'_>> = args
        .paths
        .iter()
        .zip(&digests)
        .map(|(address, md5)| HashEntry {
            address,
            md5: md5.as_deref(),
        })
        .collect();

    if formatter.is_json() {
        formatter.json(&entries);
    } else {
        for entry in &entries {
            match entry.md5 {
                Some(md5) => formatter.println(&format!("{md5}  {}", entry.address)),
                None => formatter.warning(&format!("No URL matched: {}", entry.address)),
            }
        }
    }

    if entries.iter().any(|e| e.md5.is_none()) {
        ExitCode::NotFound
    } else {
        ExitCode::Success
    }
}

async fn compare(
    client: &Client,
    local: &Path,
    address: &str,
    formatter: &Formatter,
) -> ExitCode {
    let same = match client.same_md5(local, address).await {
        Ok(same) => same,
        Err(e) => return formatter.fail(&e),
    };

    if formatter.is_json() {
        formatter.json(&CompareOutput {
            address,
            local: local.display().to_string(),
            same_md5: same,
        });
    } else if same {
        formatter.success(&format!("{} matches {address}", local.display()));
    } else {
        formatter.println(&format!("{} differs from {address}", local.display()));
    }

    if same {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    }
}
