//! cat command - Display object contents
//!
//! Writes the raw bytes of each object to stdout, in argument order.

use std::io::{self, Write};

use clap::Args;
use gsw_core::Config;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Display object contents
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Object addresses (gs://bucket/key)
    #[arg(required = true)]
    pub paths: Vec<String>,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let client = match super::connect(config, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let mut stdout = io::stdout().lock();
    for path in &args.paths {
        let data = match client.read_bytes(path).await {
            Ok(data) => data,
            Err(e) => return formatter.fail(&e),
        };

        if let Err(e) = stdout.write_all(&data) {
            // Closed pipe (e.g. `| head`) is not a failure
            if e.kind() == io::ErrorKind::BrokenPipe {
                return ExitCode::Success;
            }
            formatter.error(&format!("Failed to write output: {e}"));
            return ExitCode::GeneralError;
        }
    }

    if let Err(e) = stdout.flush()
        && e.kind() != io::ErrorKind::BrokenPipe
    {
        formatter.error(&format!("Failed to write output: {e}"));
        return ExitCode::GeneralError;
    }

    ExitCode::Success
}
