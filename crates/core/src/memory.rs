//! In-memory object store
//!
//! A process-local `ObjectStore` backend. Buckets must be created before
//! use. Every write advances a logical clock, so update timestamps are
//! strictly increasing and two writes never share one.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use jiff::Timestamp;
use md5::{Digest, Md5};

use crate::error::{Error, Result};
use crate::traits::{ListResult, ObjectInfo, ObjectStore};

/// First second handed out by the logical clock
const CLOCK_EPOCH: i64 = 1_700_000_000;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    info: ObjectInfo,
}

type Buckets = BTreeMap<String, BTreeMap<String, StoredObject>>;

/// Object store kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: Mutex<Buckets>,
    clock: AtomicI64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bucket; creating an existing bucket is a no-op
    pub fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.lock()?.entry(bucket.to_string()).or_default();
        Ok(())
    }

    /// All keys of a bucket in lexicographic order
    pub fn keys(&self, bucket: &str) -> Result<Vec<String>> {
        let buckets = self.lock()?;
        let objects = bucket_ref(&buckets, bucket)?;
        Ok(objects.keys().cloned().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Buckets>> {
        self.buckets
            .lock()
            .map_err(|_| Error::General("memory store lock poisoned".into()))
    }

    fn tick(&self) -> Timestamp {
        let second = CLOCK_EPOCH + self.clock.fetch_add(1, Ordering::SeqCst);
        Timestamp::from_second(second).unwrap_or(Timestamp::UNIX_EPOCH)
    }

    fn store(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> Result<ObjectInfo> {
        let now = self.tick();
        let digest = Md5::digest(&data).to_vec();

        let mut info = ObjectInfo::file(key, data.len() as i64);
        info.created = Some(now);
        info.last_modified = Some(now);
        info.etag = Some(hex::encode(&digest));
        info.md5 = Some(digest);
        info.storage_class = Some("STANDARD".to_string());
        info.content_type = mime_guess::from_path(key)
            .first()
            .map(|m| m.essence_str().to_string());
        info.metadata = metadata;

        let mut buckets = self.lock()?;
        let objects = bucket_mut(&mut buckets, bucket)?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                info: info.clone(),
            },
        );
        Ok(info)
    }

    fn fetch(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        let buckets = self.lock()?;
        bucket_ref(&buckets, bucket)?
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("gs://{bucket}/{key}")))
    }
}

fn bucket_ref<'a>(
    buckets: &'a Buckets,
    bucket: &str,
) -> Result<&'a BTreeMap<String, StoredObject>> {
    buckets
        .get(bucket)
        .ok_or_else(|| Error::NotFound(format!("Bucket not found: {bucket}")))
}

fn bucket_mut<'a>(
    buckets: &'a mut Buckets,
    bucket: &str,
) -> Result<&'a mut BTreeMap<String, StoredObject>> {
    buckets
        .get_mut(bucket)
        .ok_or_else(|| Error::NotFound(format!("Bucket not found: {bucket}")))
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> Result<ListResult> {
        let buckets = self.lock()?;
        let objects = bucket_ref(&buckets, bucket)?;

        let mut result = ListResult::default();
        let mut prefixes = BTreeSet::new();
        for (key, stored) in objects.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            match rest.find(delimiter).filter(|_| !delimiter.is_empty()) {
                Some(pos) => {
                    prefixes.insert(format!("{prefix}{}", &rest[..pos + delimiter.len()]));
                }
                None => result.objects.push(stored.info.clone()),
            }
        }
        result.prefixes = prefixes.into_iter().collect();
        Ok(result)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectInfo>> {
        let buckets = self.lock()?;
        Ok(bucket_ref(&buckets, bucket)?
            .get(key)
            .map(|stored| stored.info.clone()))
    }

    async fn put_object_from_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        metadata: HashMap<String, String>,
    ) -> Result<ObjectInfo> {
        let data = tokio::fs::read(path).await?;
        self.store(bucket, key, data, metadata)
    }

    async fn get_object_to_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<ObjectInfo> {
        let stored = self.fetch(bucket, key)?;
        tokio::fs::write(path, &stored.data).await?;
        Ok(stored.info)
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<ObjectInfo> {
        let stored = self.fetch(src_bucket, src_key)?;
        self.store(dst_bucket, dst_key, stored.data, stored.info.metadata)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let mut buckets = self.lock()?;
        bucket_mut(&mut buckets, bucket)?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("gs://{bucket}/{key}")))
    }

    async fn put_object_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
    ) -> Result<ObjectInfo> {
        self.store(bucket, key, data, HashMap::new())
    }

    async fn get_object_bytes(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        Ok(self.fetch(bucket, key)?.data)
    }

    async fn patch_metadata(
        &self,
        bucket: &str,
        key: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let now = self.tick();
        let mut buckets = self.lock()?;
        let stored = bucket_mut(&mut buckets, bucket)?
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(format!("gs://{bucket}/{key}")))?;
        stored.info.metadata.extend(metadata);
        stored.info.last_modified = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with(keys: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        store.create_bucket("bucket").unwrap();
        for key in keys {
            store
                .put_object_bytes("bucket", key, b"test file".to_vec())
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_list_with_delimiter_groups_prefixes() {
        let store = store_with(&["d1/f11", "d1/d11/f111", "d1/d11/f112", "d2/f21"]).await;

        let result = store.list_objects("bucket", "d1/", "/").await.unwrap();
        let keys: Vec<_> = result.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["d1/f11"]);
        assert_eq!(result.prefixes, vec!["d1/d11/"]);
    }

    #[tokio::test]
    async fn test_list_without_delimiter_is_flat() {
        let store = store_with(&["d1/f11", "d1/d11/f111", "d2/f21"]).await;

        let result = store.list_objects("bucket", "d1/", "").await.unwrap();
        assert_eq!(result.objects.len(), 2);
        assert!(result.prefixes.is_empty());
    }

    #[tokio::test]
    async fn test_writes_advance_update_time() {
        let store = store_with(&["a"]).await;
        let first = store.head_object("bucket", "a").await.unwrap().unwrap();
        store
            .put_object_bytes("bucket", "a", b"again".to_vec())
            .await
            .unwrap();
        let second = store.head_object("bucket", "a").await.unwrap().unwrap();
        assert!(second.last_modified > first.last_modified);
    }

    #[tokio::test]
    async fn test_missing_bucket_and_object() {
        let store = MemoryStore::new();
        assert!(store.head_object("nope", "a").await.is_err());

        let store = store_with(&[]).await;
        assert!(store.head_object("bucket", "a").await.unwrap().is_none());
        assert!(matches!(
            store.get_object_bytes("bucket", "a").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_copy_keeps_metadata() {
        let store = store_with(&[]).await;
        store
            .put_object_bytes("bucket", "src", b"x".to_vec())
            .await
            .unwrap();
        let mut meta = HashMap::new();
        meta.insert("k".to_string(), "v".to_string());
        store.patch_metadata("bucket", "src", meta).await.unwrap();

        let copied = store
            .copy_object("bucket", "src", "bucket", "dst")
            .await
            .unwrap();
        assert_eq!(copied.metadata.get("k").map(String::as_str), Some("v"));
    }
}
