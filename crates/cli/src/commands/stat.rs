//! stat command - Show object metadata
//!
//! Displays the stat record of an object, including POSIX attributes stored
//! by `cp --preserve-posix`.

use std::collections::BTreeMap;

use clap::Args;
use gsw_core::{BlobStat, Config, PosixMetadata};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Show object metadata
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Object address (gs://bucket/key)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    creation_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    update_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crc32c: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    md5: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    posix: Option<PosixMetadata>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
}

impl StatOutput {
    fn new(address: &str, stat: BlobStat) -> Self {
        Self {
            address: address.to_string(),
            creation_time: stat.creation_time.map(|t| t.to_string()),
            update_time: stat.update_time.map(|t| t.to_string()),
            storage_class: stat.storage_class,
            content_length: stat.content_length,
            content_type: stat.content_type,
            crc32c: stat.crc32c.map(hex::encode),
            md5: stat.md5.map(hex::encode),
            posix: stat.posix,
            metadata: stat.metadata.into_iter().collect(),
        }
    }
}

/// Execute the stat command
pub async fn execute(args: StatArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let client = match super::connect(config, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    let stat = match client.stat(&args.path).await {
        Ok(Some(stat)) => stat,
        Ok(None) => {
            formatter.error(&format!("No URL matched: {}", args.path));
            return ExitCode::NotFound;
        }
        Err(e) => return formatter.fail(&e),
    };

    let output = StatOutput::new(&args.path, stat);
    if formatter.is_json() {
        formatter.json(&output);
    } else {
        for line in render(&output) {
            formatter.println(&line);
        }
    }
    ExitCode::Success
}

fn render(output: &StatOutput) -> Vec<String> {
    let mut lines = vec![format!("{}:", output.address)];
    let mut field = |name: &str, value: Option<String>| {
        if let Some(value) = value {
            lines.push(format!("    {:<18}{value}", format!("{name}:")));
        }
    };

    field("Creation time", output.creation_time.clone());
    field("Update time", output.update_time.clone());
    field("Storage class", output.storage_class.clone());
    field("Content-Length", output.content_length.map(|n| n.to_string()));
    field("Content-Type", output.content_type.clone());
    field("Hash (crc32c)", output.crc32c.clone());
    field("Hash (md5)", output.md5.clone());
    if let Some(posix) = &output.posix {
        field("POSIX mtime", posix.mtime.map(|t| t.to_string()));
        field("POSIX uid", posix.uid.map(|n| n.to_string()));
        field("POSIX gid", posix.gid.map(|n| n.to_string()));
        field("POSIX mode", posix.mode.map(|m| format!("{m:03o}")));
    }

    if !output.metadata.is_empty() {
        lines.push("    Metadata:".to_string());
        for (key, value) in &output.metadata {
            lines.push(format!("        {key}: {value}"));
        }
    }
    lines
}
