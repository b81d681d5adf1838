//! Public operations
//!
//! `Client` is the gsutil-style surface (`ls`, `cp`, `rm`, `stat`, read and
//! write helpers, integrity checks) over any [`ObjectStore`]. Every call
//! names its bucket explicitly; the client keeps no per-bucket state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jiff::Timestamp;

use crate::error::{Error, Result};
use crate::executor::BatchExecutor;
use crate::integrity;
use crate::listing::{self, ListingEntry};
use crate::local;
use crate::location::{ResourceLocation, classify, cloud_address, reject_wildcard};
use crate::metadata::PosixMetadata;
use crate::path::PathState;
use crate::planner::{CopyOptions, CopyPlanEntry, CopyReport, plan_copy};
use crate::traits::{ObjectInfo, ObjectStore};

/// Stat record of a remote object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlobStat {
    pub creation_time: Option<Timestamp>,
    pub update_time: Option<Timestamp>,
    pub storage_class: Option<String>,
    pub content_length: Option<i64>,
    pub content_type: Option<String>,
    /// Raw CRC32C checksum
    pub crc32c: Option<Vec<u8>>,
    /// Raw MD5 digest
    pub md5: Option<Vec<u8>>,
    /// Present only when the object carries reserved POSIX keys
    pub posix: Option<PosixMetadata>,
    /// User metadata as stored
    pub metadata: HashMap<String, String>,
}

impl From<ObjectInfo> for BlobStat {
    fn from(info: ObjectInfo) -> Self {
        Self {
            creation_time: info.created,
            update_time: info.last_modified,
            storage_class: info.storage_class,
            content_length: info.size_bytes,
            content_type: info.content_type,
            crc32c: info.crc32c,
            md5: info.md5,
            posix: PosixMetadata::from_metadata(&info.metadata),
            metadata: info.metadata,
        }
    }
}

/// gsutil-compatible operations over an object store
#[derive(Clone)]
pub struct Client {
    store: Arc<dyn ObjectStore>,
    executor: BatchExecutor,
}

impl Client {
    /// Create a client over `store` running batches on `executor`
    pub fn new(store: Arc<dyn ObjectStore>, executor: BatchExecutor) -> Self {
        Self { store, executor }
    }

    /// Create a client with a default-sized worker pool
    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        Self::new(store, BatchExecutor::default())
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// List a cloud address, returning full `gs://` addresses
    pub async fn ls(&self, address: &str, recursive: bool) -> Result<Vec<String>> {
        let (bucket, _) = cloud_target(address)?;
        let entries = self.list_entries(address, recursive).await?;
        Ok(entries
            .iter()
            .map(|entry| cloud_address(&bucket, entry.key()))
            .collect())
    }

    /// List a cloud address, keeping object details
    pub async fn list_entries(&self, address: &str, recursive: bool) -> Result<Vec<ListingEntry>> {
        let (bucket, path) = cloud_target(address)?;
        listing::list(self.store.as_ref(), &bucket, &path, recursive).await
    }

    /// Copy between any combination of local paths and cloud addresses
    pub async fn cp(&self, src: &str, dst: &str, options: CopyOptions) -> Result<CopyReport> {
        self.cp_many_to_many(&[(src.to_string(), dst.to_string())], options)
            .await
    }

    /// Plan every `(src, dst)` pair, then run all unit copies as one batch.
    ///
    /// Planning errors surface before anything is copied.
    pub async fn cp_many_to_many(
        &self,
        pairs: &[(String, String)],
        options: CopyOptions,
    ) -> Result<CopyReport> {
        let mut plan = Vec::new();
        for (src, dst) in pairs {
            let src = parse_address(src)?;
            let dst = parse_address(dst)?;
            plan.extend(plan_copy(self.store.as_ref(), &src, &dst, &options).await?);
        }

        let store = Arc::clone(&self.store);
        let entries = self
            .executor
            .run(plan, options.parallel, move |entry| {
                transfer(Arc::clone(&store), entry, options)
            })
            .await?;
        Ok(CopyReport { entries })
    }

    /// Remove an object, or with `recursive` everything under `key/` plus
    /// the object named exactly `key`. Returns the removed addresses.
    ///
    /// An address ending in a separator names the directory placeholder
    /// object `key/`.
    pub async fn rm(&self, address: &str, recursive: bool, parallel: bool) -> Result<Vec<String>> {
        let (bucket, path) = cloud_target(address)?;
        let key = path.cloud_key_as_given();

        let mut keys = Vec::new();
        // a recursive listing already holds the placeholder
        if !key.is_empty() && !(recursive && path.had_trailing_separator()) {
            if let Some(info) = self.store.head_object(&bucket, &key).await? {
                keys.push(info.key);
            }
        }
        if recursive {
            let prefix = path.to_key(true, true, true);
            let listed = self.store.list_objects(&bucket, &prefix, "").await?;
            keys.extend(listed.objects.into_iter().map(|info| info.key));
        }
        if keys.is_empty() {
            return Err(Error::NoMatch(address.to_string()));
        }

        tracing::debug!(bucket = %bucket, count = keys.len(), "removing objects");
        let store = Arc::clone(&self.store);
        let bucket: Arc<str> = bucket.into();
        self.executor
            .run(keys, parallel, move |key| {
                let store = Arc::clone(&store);
                let bucket = Arc::clone(&bucket);
                async move {
                    store.delete_object(&bucket, &key).await?;
                    Ok(cloud_address(&bucket, &key))
                }
            })
            .await
    }

    /// Stat an object; `None` when it does not exist
    pub async fn stat(&self, address: &str) -> Result<Option<BlobStat>> {
        let (bucket, path) = cloud_target(address)?;
        let key = path.cloud_key();
        if key.is_empty() {
            return Ok(None);
        }
        Ok(self
            .store
            .head_object(&bucket, &key)
            .await?
            .map(BlobStat::from))
    }

    /// Read a whole object
    pub async fn read_bytes(&self, address: &str) -> Result<Vec<u8>> {
        let (bucket, key) = object_target(address)?;
        self.store.get_object_bytes(&bucket, &key).await
    }

    /// Read a whole object as UTF-8 text
    pub async fn read_text(&self, address: &str) -> Result<String> {
        let bytes = self.read_bytes(address).await?;
        String::from_utf8(bytes)
            .map_err(|e| Error::InvalidData(format!("{address} is not valid UTF-8: {e}")))
    }

    /// Write (replace) a whole object
    pub async fn write_bytes(&self, address: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        let (bucket, key) = object_target(address)?;
        self.store
            .put_object_bytes(&bucket, &key, data.into())
            .await?;
        Ok(())
    }

    /// Write (replace) a whole object from UTF-8 text
    pub async fn write_text(&self, address: &str, text: &str) -> Result<()> {
        self.write_bytes(address, text.as_bytes()).await
    }

    /// Whether a local file has the same MD5 as a remote object.
    ///
    /// Fails with `NotFound` for a missing object and `SourceMissing` for a
    /// missing local file.
    pub async fn same_md5(&self, path: &Path, address: &str) -> Result<bool> {
        let remote = self.head_required(address).await?;
        let local = integrity::local_md5(path).await?;
        Ok(integrity::md5_matches(&local, &remote))
    }

    /// Whether a local file's mtime (whole seconds) equals the preserved
    /// POSIX mtime of a remote object.
    pub async fn same_mod_time(&self, path: &Path, address: &str) -> Result<bool> {
        let remote = self.head_required(address).await?;
        let local = integrity::local_mtime(path).await?;
        Ok(integrity::mtime_matches(local, &remote))
    }

    /// Hex MD5 digests in input order; `None` for missing objects or
    /// objects without an MD5
    pub async fn md5_hexdigests(
        &self,
        addresses: &[String],
        parallel: bool,
    ) -> Result<Vec<Option<String>>> {
        let targets = addresses
            .iter()
            .map(|address| object_target(address))
            .collect::<Result<Vec<_>>>()?;

        let store = Arc::clone(&self.store);
        self.executor
            .run(targets, parallel, move |(bucket, key)| {
                let store = Arc::clone(&store);
                async move {
                    let info = store.head_object(&bucket, &key).await?;
                    Ok(info
                        .and_then(|info| info.md5)
                        .map(|md5| integrity::hex_digest(&md5)))
                }
            })
            .await
    }

    async fn head_required(&self, address: &str) -> Result<ObjectInfo> {
        let (bucket, key) = object_target(address)?;
        self.store
            .head_object(&bucket, &key)
            .await?
            .ok_or_else(|| Error::NotFound(address.to_string()))
    }
}

/// Reject wildcards, then classify
fn parse_address(address: &str) -> Result<ResourceLocation> {
    reject_wildcard(address)?;
    classify(address)
}

/// Bucket and path of an address that must be a cloud location
fn cloud_target(address: &str) -> Result<(String, PathState)> {
    match parse_address(address)? {
        ResourceLocation::Cloud { bucket, path } => Ok((bucket, path)),
        ResourceLocation::Local { .. } => Err(Error::InvalidPath(format!(
            "{address} is not a Google Cloud Storage URL"
        ))),
    }
}

/// Bucket and key of an address that must name a single object
fn object_target(address: &str) -> Result<(String, String)> {
    let (bucket, path) = cloud_target(address)?;
    let key = path.cloud_key();
    if key.is_empty() {
        return Err(Error::InvalidPath(format!(
            "{address} does not name an object"
        )));
    }
    Ok((bucket, key))
}

async fn exists(store: &dyn ObjectStore, location: &ResourceLocation) -> Result<bool> {
    match location {
        ResourceLocation::Cloud { bucket, path } => {
            Ok(store.head_object(bucket, &path.cloud_key()).await?.is_some())
        }
        ResourceLocation::Local { path } => Ok(tokio::fs::try_exists(path.local_path()).await?),
    }
}

/// Run one planned unit copy
async fn transfer(
    store: Arc<dyn ObjectStore>,
    mut entry: CopyPlanEntry,
    options: CopyOptions,
) -> Result<CopyPlanEntry> {
    if options.no_clobber && exists(store.as_ref(), &entry.destination).await? {
        tracing::debug!(destination = %entry.destination, "destination exists, skipping");
        entry.skip = true;
        return Ok(entry);
    }

    match (&entry.source, &entry.destination) {
        (
            ResourceLocation::Cloud {
                bucket: src_bucket,
                path: src,
            },
            ResourceLocation::Cloud {
                bucket: dst_bucket,
                path: dst,
            },
        ) => {
            store
                .copy_object(src_bucket, &src.cloud_key(), dst_bucket, &dst.cloud_key())
                .await?;
        }
        (ResourceLocation::Cloud { bucket, path }, ResourceLocation::Local { path: target }) => {
            let target = PathBuf::from(target.local_path());
            local::ensure_parent(&target)?;
            let info = store
                .get_object_to_file(bucket, &path.cloud_key(), &target)
                .await?;
            if options.preserve_posix {
                if let Some(posix) = PosixMetadata::from_metadata(&info.metadata) {
                    posix.apply(&target);
                }
            }
        }
        (ResourceLocation::Local { path }, ResourceLocation::Cloud { bucket, path: dst }) => {
            let source = PathBuf::from(path.local_path());
            let metadata = if options.preserve_posix {
                PosixMetadata::from_local(&tokio::fs::metadata(&source).await?).to_metadata()
            } else {
                HashMap::new()
            };
            store
                .put_object_from_file(bucket, &dst.cloud_key(), &source, metadata)
                .await?;
        }
        (ResourceLocation::Local { path }, ResourceLocation::Local { path: target }) => {
            let source = PathBuf::from(path.local_path());
            let target = PathBuf::from(target.local_path());
            let preserve = options.preserve_posix;
            tokio::task::spawn_blocking(move || copy_local(&source, &target, preserve))
                .await
                .map_err(|e| Error::General(format!("local copy failed: {e}")))??;
        }
    }

    tracing::debug!(source = %entry.source, destination = %entry.destination, "copied");
    Ok(entry)
}

fn copy_local(source: &Path, target: &Path, preserve_posix: bool) -> Result<()> {
    if source.is_file() {
        let written = local::copy_file(source, target)?;
        if preserve_posix {
            PosixMetadata::from_local(&std::fs::metadata(source)?).apply(&written);
        }
    } else {
        local::copy_tree(source, target, preserve_posix)?;
    }
    Ok(())
}
