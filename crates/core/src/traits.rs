//! ObjectStore trait definition
//!
//! This trait defines the storage collaborator the core needs: named-object
//! operations addressed by bucket and key. It keeps the planner and the
//! listing engine decoupled from any specific SDK.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata for an object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,

    /// Size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,

    /// Human-readable size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,

    /// Creation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,

    /// Last update timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// ETag as returned by the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Raw MD5 digest of the content, when the backend exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5: Option<Vec<u8>>,

    /// Raw CRC32C checksum, when the backend exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crc32c: Option<Vec<u8>>,

    /// Storage class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// User metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for an object of the given size
    pub fn file(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: Some(size),
            size_human: Some(humansize::format_size(size.max(0) as u64, humansize::BINARY)),
            ..Default::default()
        }
    }
}

/// Result of a grouped listing: objects plus directory-like common prefixes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResult {
    /// Objects in backend order
    pub objects: Vec<ObjectInfo>,

    /// Common prefixes (only produced when a delimiter is given)
    pub prefixes: Vec<String>,
}

/// Storage collaborator for object operations
///
/// Implemented by the S3 adapter and by the in-memory store; mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object under `prefix`, grouped by `delimiter` unless it
    /// is empty.
    ///
    /// Implementations follow continuation tokens until the listing is
    /// complete.
    async fn list_objects(&self, bucket: &str, prefix: &str, delimiter: &str)
    -> Result<ListResult>;

    /// Point lookup; `Ok(None)` when the object does not exist
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectInfo>>;

    /// Upload a local file, attaching the given user metadata
    async fn put_object_from_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        metadata: HashMap<String, String>,
    ) -> Result<ObjectInfo>;

    /// Download an object into a local file, returning its metadata
    async fn get_object_to_file(&self, bucket: &str, key: &str, path: &Path)
    -> Result<ObjectInfo>;

    /// Server-side copy; user metadata travels with the object
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<ObjectInfo>;

    /// Delete an object
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Upload bytes
    async fn put_object_bytes(&self, bucket: &str, key: &str, data: Vec<u8>)
    -> Result<ObjectInfo>;

    /// Download an object as bytes
    async fn get_object_bytes(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Merge `metadata` into the object's user metadata
    async fn patch_metadata(
        &self,
        bucket: &str,
        key: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()>;
}
