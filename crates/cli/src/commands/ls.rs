//! ls command - List objects and prefixes
//!
//! Objects at the requested level come first, then the prefixes below it.

use clap::Args;
use gsw_core::location::cloud_address;
use gsw_core::{Client, Config, Error, ListingEntry, classify};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// List objects and prefixes
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Cloud address (gs://bucket[/prefix])
    pub path: String,

    /// List every object below the address
    #[arg(short, long)]
    pub recursive: bool,

    /// Show size and update time for objects
    #[arg(short, long)]
    pub long: bool,

    /// Summarize output (show totals)
    #[arg(long)]
    pub summarize: bool,
}

/// Output structure for ls command (JSON format)
#[derive(Debug, Serialize)]
struct LsOutput<'a> {
    items: &'a [LsItem],
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct LsItem {
    address: String,
    is_prefix: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_objects: usize,
    total_size_bytes: i64,
    total_size_human: String,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let client = match super::connect(config, &formatter).await {
        Ok(c) => c,
        Err(code) => return code,
    };

    match list(&client, &args).await {
        Ok(items) => {
            render(&items, &args, &formatter);
            ExitCode::Success
        }
        Err(e) => formatter.fail(&e),
    }
}

async fn list(client: &Client, args: &LsArgs) -> gsw_core::Result<Vec<LsItem>> {
    let location = classify(&args.path)?;
    let bucket = location
        .bucket()
        .ok_or_else(|| Error::InvalidPath(format!("Not a cloud address: {}", args.path)))?
        .to_string();

    let entries = client.list_entries(&args.path, args.recursive).await?;
    Ok(entries
        .into_iter()
        .map(|entry| to_item(&bucket, entry))
        .collect())
}

fn to_item(bucket: &str, entry: ListingEntry) -> LsItem {
    match entry {
        ListingEntry::Object(info) => LsItem {
            address: cloud_address(bucket, &info.key),
            is_prefix: false,
            size_bytes: info.size_bytes,
            last_modified: info.last_modified.map(|t| t.to_string()),
        },
        ListingEntry::Prefix(prefix) => LsItem {
            address: cloud_address(bucket, &prefix),
            is_prefix: true,
            size_bytes: None,
            last_modified: None,
        },
    }
}

fn summarize(items: &[LsItem]) -> Summary {
    let objects: Vec<&LsItem> = items.iter().filter(|i| !i.is_prefix).collect();
    let total_size: i64 = objects.iter().filter_map(|i| i.size_bytes).sum();
    Summary {
        total_objects: objects.len(),
        total_size_bytes: total_size,
        total_size_human: humansize::format_size(total_size.max(0) as u64, humansize::BINARY),
    }
}

fn render(items: &[LsItem], args: &LsArgs, formatter: &Formatter) {
    if formatter.is_json() {
        formatter.json(&LsOutput {
            items,
            summary: args.summarize.then(|| summarize(items)),
        });
        return;
    }

    for item in items {
        if !args.long {
            formatter.println(&item.address);
        } else if item.is_prefix {
            formatter.println(&format!("{:>10}  {:<25}  {}", "", "", item.address));
        } else {
            let size = item.size_bytes.unwrap_or(0);
            let date = item.last_modified.as_deref().unwrap_or("");
            formatter.println(&format!("{size:>10}  {date:<25}  {}", item.address));
        }
    }

    if args.summarize {
        let summary = summarize(items);
        formatter.println(&format!(
            "TOTAL: {} objects, {} bytes ({})",
            summary.total_objects, summary.total_size_bytes, summary.total_size_human
        ));
    }
}
