//! pipe command - Stream stdin to an object
//!
//! Reads stdin to the end and writes it as a single object. Useful for
//! piping output from other commands.

use clap::Args;
use gsw_core::Config;
use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Stream stdin to an object
#[derive(Args, Debug)]
pub struct PipeArgs {
    /// Destination address (gs://bucket/key)
    pub target: String,
}

#[derive(Debug, Serialize)]
struct PipeOutput {
    status: &'static str,
    target: String,
    size_bytes: usize,
    size_human: String,
}

/// Execute the pipe command
pub async fn execute(args: PipeArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let client = match super::connect(config, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let mut buffer = Vec::new();
    if let Err(e) = tokio::io::stdin().read_to_end(&mut buffer).await {
        formatter.error(&format!("Failed to read from stdin: {e}"));
        return ExitCode::GeneralError;
    }

    let size = buffer.len();
    if let Err(e) = client.write_bytes(&args.target, buffer).await {
        return formatter.fail(&e);
    }

    let size_human = humansize::format_size(size as u64, humansize::BINARY);
    if formatter.is_json() {
        formatter.json(&PipeOutput {
            status: "success",
            target: args.target,
            size_bytes: size,
            size_human,
        });
    } else {
        formatter.success(&format!("Uploaded to {} ({size_human})", args.target));
    }
    ExitCode::Success
}
