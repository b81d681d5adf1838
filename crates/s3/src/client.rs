//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from gsw-core.
//! Pointed at `https://storage.googleapis.com` it speaks the Google Cloud
//! Storage XML API through HMAC credentials.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{RequestChecksumCalculation, ResponseChecksumValidation};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::types::{ChecksumMode, MetadataDirective};
use jiff::Timestamp;

use gsw_core::{Error, ListResult, ObjectInfo, ObjectStore, Result, StorageConfig};

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from the storage configuration
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint);

        // Without static keys the SDK's default credential chain applies
        if let Some((access_key, secret_key)) = config.credentials() {
            let credentials = aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                None, // session token
                None, // expiry
                "gsw-static-credentials",
            );
            loader = loader.credentials_provider(credentials);
        }

        let sdk_config = loader.load().await;

        // GCS rejects the SDK's default flexible checksums
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();

        tracing::debug!(endpoint = %config.endpoint, "created storage client");
        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    async fn head_required(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        self.head_object(bucket, key)
            .await?
            .ok_or_else(|| Error::NotFound(target(bucket, key)))
    }
}

fn target(bucket: &str, key: &str) -> String {
    format!("gs://{bucket}/{key}")
}

/// Map an SDK failure onto the core error taxonomy
fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, target: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();

    match (status, code.as_deref()) {
        (Some(404), _) | (_, Some("NoSuchKey" | "NotFound" | "NoSuchBucket")) => {
            Error::NotFound(target.to_string())
        }
        (Some(401 | 403), _)
        | (_, Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch")) => {
            Error::Auth(message)
        }
        (Some(409 | 412), _) => Error::Conflict(message),
        _ => Error::Network(message),
    }
}

fn timestamp(value: Option<&DateTime>) -> Option<Timestamp> {
    value.and_then(|dt| Timestamp::from_second(dt.secs()).ok())
}

/// Fill both modification and creation time from `Last-Modified`.
///
/// The interoperable API has no creation-time header, and every write
/// through it (metadata patches included) creates a new object generation,
/// so a generation is created when it was last modified.
fn apply_last_modified(info: &mut ObjectInfo, value: Option<&DateTime>) {
    info.last_modified = timestamp(value);
    info.created = info.last_modified;
}

/// Single-part ETags are the hex MD5 of the content
fn md5_from_etag(etag: &str) -> Option<Vec<u8>> {
    (etag.len() == 32)
        .then(|| hex::decode(etag).ok())
        .flatten()
}

fn crc32c_from_base64(value: Option<&str>) -> Option<Vec<u8>> {
    aws_smithy_types::base64::decode(value?).ok()
}

fn apply_etag(info: &mut ObjectInfo, etag: Option<&str>) {
    if let Some(etag) = etag {
        let etag = etag.trim_matches('"');
        info.md5 = md5_from_etag(etag);
        info.etag = Some(etag.to_string());
    }
}

fn content_type_for(key: &str) -> Option<String> {
    mime_guess::from_path(key)
        .first()
        .map(|m| m.essence_str().to_string())
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> Result<ListResult> {
        let mut result = ListResult::default();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.inner.list_objects_v2().bucket(bucket);
            if !prefix.is_empty() {
                request = request.prefix(prefix);
            }
            if !delimiter.is_empty() {
                request = request.delimiter(delimiter);
            }
            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| map_sdk_error(e, &target(bucket, prefix)))?;

            for common in response.common_prefixes() {
                if let Some(p) = common.prefix() {
                    result.prefixes.push(p.to_string());
                }
            }

            for object in response.contents() {
                let key = object.key().unwrap_or_default();
                let mut info = ObjectInfo::file(key, object.size().unwrap_or(0));
                info.last_modified = timestamp(object.last_modified());
                apply_etag(&mut info, object.e_tag());
                info.storage_class = object.storage_class().map(|sc| sc.as_str().to_string());
                result.objects.push(info);
            }

            continuation_token = response
                .next_continuation_token()
                .filter(|_| response.is_truncated().unwrap_or(false))
                .map(str::to_string);
            if continuation_token.is_none() {
                break;
            }
            tracing::debug!(bucket, prefix, "fetching next listing page");
        }

        Ok(result)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectInfo>> {
        let response = match self
            .inner
            .head_object()
            .bucket(bucket)
            .key(key)
            .checksum_mode(ChecksumMode::Enabled)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return match map_sdk_error(e, &target(bucket, key)) {
                    Error::NotFound(_) => Ok(None),
                    other => Err(other),
                };
            }
        };

        let mut info = ObjectInfo::file(key, response.content_length().unwrap_or(0));
        apply_last_modified(&mut info, response.last_modified());
        apply_etag(&mut info, response.e_tag());
        info.crc32c = crc32c_from_base64(response.checksum_crc32_c());
        info.content_type = response.content_type().map(str::to_string);
        info.storage_class = response.storage_class().map(|sc| sc.as_str().to_string());
        info.metadata = response.metadata().cloned().unwrap_or_default();

        Ok(Some(info))
    }

    async fn put_object_from_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        metadata: HashMap<String, String>,
    ) -> Result<ObjectInfo> {
        let size = tokio::fs::metadata(path).await?.len() as i64;
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| Error::General(format!("Failed to read {}: {e}", path.display())))?;

        let mut request = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body);
        if let Some(ct) = content_type_for(key) {
            request = request.content_type(ct);
        }
        if !metadata.is_empty() {
            request = request.set_metadata(Some(metadata.clone()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &target(bucket, key)))?;

        let mut info = ObjectInfo::file(key, size);
        apply_etag(&mut info, response.e_tag());
        info.last_modified = Some(Timestamp::now());
        info.metadata = metadata;
        Ok(info)
    }

    async fn get_object_to_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<ObjectInfo> {
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &target(bucket, key)))?;

        let mut info = ObjectInfo::file(key, response.content_length().unwrap_or(0));
        apply_last_modified(&mut info, response.last_modified());
        apply_etag(&mut info, response.e_tag());
        info.content_type = response.content_type().map(str::to_string);
        info.storage_class = response.storage_class().map(|sc| sc.as_str().to_string());
        info.metadata = response.metadata().cloned().unwrap_or_default();

        let mut reader = response.body.into_async_read();
        let mut file = tokio::fs::File::create(path).await?;
        tokio::io::copy(&mut reader, &mut file).await?;

        Ok(info)
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<ObjectInfo> {
        let copy_source = format!("{src_bucket}/{}", urlencoding::encode(src_key));

        self.inner
            .copy_object()
            .copy_source(&copy_source)
            .bucket(dst_bucket)
            .key(dst_key)
            .metadata_directive(MetadataDirective::Copy)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &target(src_bucket, src_key)))?;

        // Copy responses carry no size or metadata
        self.head_required(dst_bucket, dst_key).await
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &target(bucket, key)))?;

        Ok(())
    }

    async fn put_object_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
    ) -> Result<ObjectInfo> {
        let size = data.len() as i64;
        let mut request = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data));
        if let Some(ct) = content_type_for(key) {
            request = request.content_type(ct);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &target(bucket, key)))?;

        let mut info = ObjectInfo::file(key, size);
        apply_etag(&mut info, response.e_tag());
        info.last_modified = Some(Timestamp::now());
        Ok(info)
    }

    async fn get_object_bytes(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &target(bucket, key)))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn patch_metadata(
        &self,
        bucket: &str,
        key: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let current = self.head_required(bucket, key).await?;
        let mut merged = current.metadata;
        merged.extend(metadata);

        // Metadata can only be replaced by copying the object onto itself
        let copy_source = format!("{bucket}/{}", urlencoding::encode(key));
        let mut request = self
            .inner
            .copy_object()
            .copy_source(&copy_source)
            .bucket(bucket)
            .key(key)
            .metadata_directive(MetadataDirective::Replace)
            .set_metadata(Some(merged));
        if let Some(ct) = current.content_type {
            request = request.content_type(ct);
        }

        request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &target(bucket, key)))?;

        Ok(())
    }
}
