//! gsw - gsutil-compatible file operations
//!
//! Command-line front end over the gsw-core operations, talking to Google
//! Cloud Storage through its S3-interoperable endpoint.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use gs_wrap::commands::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // `--debug` wins over RUST_LOG
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
