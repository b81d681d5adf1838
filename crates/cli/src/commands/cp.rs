//! cp command - Copy objects and files
//!
//! Copies between local paths and cloud addresses in any direction. Several
//! sources may be given; they are all planned against the one destination
//! before anything is transferred.

use clap::Args;
use gsw_core::{Config, CopyOptions, CopyReport};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Spinner};

/// Copy objects and files
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source paths followed by the destination (local path or gs://bucket/key)
    #[arg(required = true, num_args = 2.., value_name = "PATH")]
    pub paths: Vec<String>,

    /// Copy directories and prefixes recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Skip destinations that already exist
    #[arg(short, long)]
    pub no_clobber: bool,

    /// Preserve POSIX attributes (times, owner, mode) in object metadata
    #[arg(short = 'P', long)]
    pub preserve_posix: bool,

    /// Copy one item at a time
    #[arg(long)]
    pub sequential: bool,
}

impl CpArgs {
    /// Pair every source with the destination
    pub fn pairs(&self) -> Vec<(String, String)> {
        let Some((dst, sources)) = self.paths.split_last() else {
            return Vec::new();
        };
        sources
            .iter()
            .map(|src| (src.clone(), dst.clone()))
            .collect()
    }

    /// Copy options selected by the flags
    pub fn options(&self) -> CopyOptions {
        CopyOptions {
            recursive: self.recursive,
            no_clobber: self.no_clobber,
            parallel: !self.sequential,
            preserve_posix: self.preserve_posix,
        }
    }
}

#[derive(Debug, Serialize)]
struct CpOutput {
    status: &'static str,
    copied: usize,
    skipped: usize,
    entries: Vec<CpEntry>,
}

#[derive(Debug, Serialize)]
struct CpEntry {
    source: String,
    destination: String,
    skipped: bool,
}

impl From<&CopyReport> for CpOutput {
    fn from(report: &CopyReport) -> Self {
        Self {
            status: "success",
            copied: report.copied().count(),
            skipped: report.skipped().count(),
            entries: report
                .entries
                .iter()
                .map(|entry| CpEntry {
                    source: entry.source.to_string(),
                    destination: entry.destination.to_string(),
                    skipped: entry.skip,
                })
                .collect(),
        }
    }
}

/// Execute the cp command
pub async fn execute(args: CpArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let client = match super::connect(config, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let spinner = Spinner::start(formatter.config(), "Copying...");
    let result = client.cp_many_to_many(&args.pairs(), args.options()).await;
    spinner.finish();

    match result {
        Ok(report) => {
            let output = CpOutput::from(&report);
            if formatter.is_json() {
                formatter.json(&output);
            } else {
                for entry in &output.entries {
                    if entry.skipped {
                        formatter.println(&format!("Skipping existing item: {}", entry.destination));
                    } else {
                        formatter.println(&format!("{} -> {}", entry.source, entry.destination));
                    }
                }
                formatter.success(&format!(
                    "Copied {} item(s), skipped {}",
                    output.copied, output.skipped
                ));
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail(&e),
    }
}
