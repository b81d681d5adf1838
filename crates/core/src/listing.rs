//! Listing engine
//!
//! Resolves what exists under a cloud key and orders it the way gsutil
//! prints it: objects first in store order, then common prefixes sorted.

use crate::error::{Error, Result};
use crate::location::cloud_address;
use crate::path::{PathState, SEPARATOR};
use crate::traits::{ListResult, ObjectInfo, ObjectStore};

/// One line of a listing
#[derive(Debug, Clone, PartialEq)]
pub enum ListingEntry {
    /// A stored object
    Object(ObjectInfo),
    /// A directory-like common prefix (ends with the separator)
    Prefix(String),
}

impl ListingEntry {
    /// Key of the object or the prefix itself
    pub fn key(&self) -> &str {
        match self {
            ListingEntry::Object(info) => &info.key,
            ListingEntry::Prefix(prefix) => prefix,
        }
    }

    /// Check if this entry is a common prefix
    pub fn is_prefix(&self) -> bool {
        matches!(self, ListingEntry::Prefix(_))
    }
}

/// Grouping delimiter for a listing: none when recursive
pub fn delimiter_for(recursive: bool) -> &'static str {
    if recursive { "" } else { "/" }
}

/// Merge a store response: objects in store order, then sorted prefixes
pub fn merge(result: ListResult) -> Vec<ListingEntry> {
    let mut prefixes = result.prefixes;
    prefixes.sort();
    prefixes.dedup();

    result
        .objects
        .into_iter()
        .map(ListingEntry::Object)
        .chain(prefixes.into_iter().map(ListingEntry::Prefix))
        .collect()
}

/// List a cloud key.
///
/// If the key (written without a trailing separator) names an existing
/// object the query uses the exact key and
/// keeps only the object itself and what lies under `key/`. Otherwise the
/// key is treated as a directory and queried with a trailing separator, so
/// `some` never widens to a sibling such as `something`.
pub async fn list(
    store: &dyn ObjectStore,
    bucket: &str,
    path: &PathState,
    recursive: bool,
) -> Result<Vec<ListingEntry>> {
    let key = path.cloud_key();
    let delimiter = delimiter_for(recursive);

    let entries = if key.is_empty() {
        merge(store.list_objects(bucket, "", delimiter).await?)
    } else if !path.had_trailing_separator() && store.head_object(bucket, &key).await?.is_some() {
        tracing::debug!(bucket, key = %key, "listing exact object");
        let nested = format!("{key}{SEPARATOR}");
        merge(store.list_objects(bucket, &key, delimiter).await?)
            .into_iter()
            .filter(|entry| entry.key() == key || entry.key().starts_with(&nested))
            .collect()
    } else {
        let prefix = path.to_key(true, true, true);
        tracing::debug!(bucket, prefix = %prefix, "listing directory");
        merge(store.list_objects(bucket, &prefix, delimiter).await?)
    };

    if entries.is_empty() {
        return Err(Error::NoMatch(cloud_address(
            bucket,
            &path.cloud_key_as_given(),
        )));
    }
    Ok(entries)
}
