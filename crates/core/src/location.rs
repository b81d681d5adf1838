//! Resource locator
//!
//! Classifies an address string as either a local filesystem path or a
//! cloud object location (`gs://bucket/key`). Pure parsing, no I/O.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::path::PathState;

/// URI scheme of cloud addresses
pub const CLOUD_SCHEME: &str = "gs";

static WILDCARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\*\*|\*|\?|\[[^\]]+\])").expect("valid wildcard pattern")
});

/// A classified address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    /// Local filesystem path
    Local { path: PathState },
    /// Object (or key prefix) inside a bucket
    Cloud { bucket: String, path: PathState },
}

impl ResourceLocation {
    /// Build a cloud location from a bucket and a key
    pub fn cloud(bucket: impl Into<String>, key: &str) -> Self {
        ResourceLocation::Cloud {
            bucket: bucket.into(),
            path: PathState::new(key),
        }
    }

    /// Build a local location from a path string
    pub fn local(path: &str) -> Self {
        ResourceLocation::Local {
            path: PathState::new(path),
        }
    }

    /// Check if this is a cloud location
    pub fn is_cloud(&self) -> bool {
        matches!(self, ResourceLocation::Cloud { .. })
    }

    /// Path part of the location
    pub fn path(&self) -> &PathState {
        match self {
            ResourceLocation::Local { path } | ResourceLocation::Cloud { path, .. } => path,
        }
    }

    /// Bucket name for cloud locations
    pub fn bucket(&self) -> Option<&str> {
        match self {
            ResourceLocation::Cloud { bucket, .. } => Some(bucket),
            ResourceLocation::Local { .. } => None,
        }
    }

    /// Object key for cloud locations (never has a leading separator)
    pub fn key(&self) -> Option<String> {
        match self {
            ResourceLocation::Cloud { path, .. } => Some(path.cloud_key()),
            ResourceLocation::Local { .. } => None,
        }
    }

    /// Same side (and bucket) with a different path
    pub fn with_path(&self, path: PathState) -> Self {
        match self {
            ResourceLocation::Cloud { bucket, .. } => ResourceLocation::Cloud {
                bucket: bucket.clone(),
                path,
            },
            ResourceLocation::Local { .. } => ResourceLocation::Local { path },
        }
    }
}

impl std::fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceLocation::Cloud { bucket, path } => {
                write!(f, "{CLOUD_SCHEME}://{bucket}/{}", path.cloud_key_as_given())
            }
            ResourceLocation::Local { path } => {
                let local = path.local_path();
                if path.had_trailing_separator() && !local.ends_with('/') {
                    write!(f, "{local}/")
                } else {
                    write!(f, "{local}")
                }
            }
        }
    }
}

/// Render a full cloud address for a bucket and key
pub fn cloud_address(bucket: &str, key: &str) -> String {
    format!("{CLOUD_SCHEME}://{bucket}/{key}")
}

/// Classify an address into a local or cloud location.
///
/// - `gs://bucket/key` yields `Cloud`
/// - no scheme, a drive letter, or `file://` yields `Local`
/// - any other scheme fails with `UnsupportedScheme`
pub fn classify(address: &str) -> Result<ResourceLocation> {
    let Some(scheme) = scheme_of(address) else {
        return Ok(ResourceLocation::local(address));
    };

    match scheme.to_ascii_lowercase().as_str() {
        CLOUD_SCHEME => parse_cloud(address),
        "file" => parse_file(address),
        // Windows drive letters parse as one-letter schemes
        s if s.len() == 1 => Ok(ResourceLocation::local(address)),
        _ => Err(Error::UnsupportedScheme {
            scheme: scheme.to_string(),
            address: address.to_string(),
        }),
    }
}

/// Check if an address contains glob metacharacters
pub fn contains_wildcard(address: &str) -> bool {
    WILDCARD_RE.is_match(address)
}

/// Fail with `WildcardRejected` if the address contains glob metacharacters
pub fn reject_wildcard(address: &str) -> Result<()> {
    if contains_wildcard(address) {
        return Err(Error::WildcardRejected(address.to_string()));
    }
    Ok(())
}

/// Return the URI scheme of an address, if it has one
fn scheme_of(address: &str) -> Option<&str> {
    let (scheme, _) = address.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    chars
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        .then_some(scheme)
}

fn parse_cloud(address: &str) -> Result<ResourceLocation> {
    let rest = address
        .get(CLOUD_SCHEME.len() + 1..)
        .and_then(|r| r.strip_prefix("//"))
        .ok_or_else(|| {
            Error::InvalidPath(format!(
                "'{address}' is not a valid URL. Use format: {CLOUD_SCHEME}://bucket[/key]"
            ))
        })?;

    let (bucket, raw_key) = match rest.find('/') {
        Some(pos) => (&rest[..pos], &rest[pos..]),
        None => (rest, ""),
    };

    if bucket.is_empty() {
        return Err(Error::InvalidPath(format!(
            "Bucket name cannot be empty: {address}"
        )));
    }

    // Validates the bucket as a URL host
    url::Url::parse(&format!("{CLOUD_SCHEME}://{bucket}/"))?;

    Ok(ResourceLocation::Cloud {
        bucket: bucket.to_string(),
        path: PathState::new(raw_key),
    })
}

fn parse_file(address: &str) -> Result<ResourceLocation> {
    let url = url::Url::parse(address)?;
    let path = url
        .to_file_path()
        .map_err(|_| Error::InvalidPath(format!("Not a local file URL: {address}")))?;

    let mut path = path.to_string_lossy().to_string();
    if address.ends_with('/') && !path.ends_with('/') {
        path.push('/');
    }
    Ok(ResourceLocation::local(&path))
}
