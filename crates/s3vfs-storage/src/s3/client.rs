//! Object-store client seam.
//!
//! [`ObjectClient`] is the small set of S3 calls the adapter needs. [`S3Client`] implements it
//! with `aws-sdk-s3`; tests substitute an in-memory implementation.

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use bytes::Bytes;
use s3vfs_core::constants::FALLBACK_REGION;
use s3vfs_core::StorageConfig;
use std::time::Duration;

use crate::traits::{StorageError, StorageResult};

/// One page of a prefix listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Token for the next page; `None` on the last page
    pub next_token: Option<String>,
}

/// The object-store operations the S3 adapter is built on
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Bucket every call operates on
    fn bucket(&self) -> &str;

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()>;

    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// `true` if an object exists at exactly `key`
    async fn head_object(&self, key: &str) -> StorageResult<bool>;

    /// One page of keys starting with `prefix`, continuing from `continuation`.
    async fn list_page(&self, prefix: &str, continuation: Option<&str>) -> StorageResult<ListPage>;

    /// Presigned GET URL for `key`, valid for `expires_in`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String>;
}

/// `aws-sdk-s3` implementation of [`ObjectClient`]
///
/// Built once from [`StorageConfig`] and shared by every call; the SDK client is cheap to
/// clone and safe to use from many tasks.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
    acl: Option<ObjectCannedAcl>,
}

impl S3Client {
    /// Create a client from the connection options in `config`.
    ///
    /// * Endpoint: `host:port` when both are set, otherwise the public AWS endpoint.
    /// * Region: configured region, then the SDK default chain, then `us-east-1`.
    /// * Credentials: the static key pair when both halves are set, otherwise the SDK
    ///   default chain (environment, profile, instance metadata).
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let options = &config.connection;
        let endpoint_url = options.endpoint_url();

        let region_provider =
            RegionProviderChain::first_try(options.region.clone().map(Region::new))
                .or_default_provider()
                .or_else(Region::from_static(FALLBACK_REGION));

        let attempts = u32::try_from(options.num_retries.saturating_add(1)).unwrap_or(u32::MAX);
        let retry_config = RetryConfig::standard().with_max_attempts(attempts);
        let timeout_config = TimeoutConfig::builder()
            .operation_attempt_timeout(options.timeout)
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some((access_key, secret_key)) = config.credentials.static_pair() {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "s3vfs-settings",
            ));
        }

        let sdk_config = loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(options.use_path_style);
        if let Some(ref endpoint) = endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        tracing::info!(
            bucket = %config.bucket_name,
            endpoint = ?endpoint_url,
            region = ?sdk_config.region(),
            path_style = options.use_path_style,
            max_attempts = attempts,
            "S3 client configured"
        );

        Ok(Self::from_client(client, &config.bucket_name, &config.acl))
    }

    /// Wrap an already configured SDK client. An empty `acl` sends no canned ACL.
    pub fn from_client(client: Client, bucket: impl Into<String>, acl: &str) -> Self {
        let acl = match acl.trim() {
            "" => None,
            acl => Some(ObjectCannedAcl::from(acl)),
        };

        Self {
            client,
            bucket: bucket.into(),
            acl,
        }
    }
}

#[async_trait]
impl ObjectClient for S3Client {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()> {
        let size = body.len() as u64;
        let start = std::time::Instant::now();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .set_acl(self.acl.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StorageError::s3(e)
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                StorageError::s3(e)
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn head_object(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(HeadObjectError::is_not_found)
                    .unwrap_or(false);
                if not_found {
                    Ok(false)
                } else {
                    Err(StorageError::s3(e))
                }
            }
        }
    }

    async fn list_page(&self, prefix: &str, continuation: Option<&str>) -> StorageResult<ListPage> {
        let start = std::time::Instant::now();

        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_continuation_token(continuation.map(String::from))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    prefix = %prefix,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 list failed"
                );
                StorageError::s3(e)
            })?;

        let keys: Vec<String> = output
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .map(String::from)
            .collect();

        tracing::debug!(
            bucket = %self.bucket,
            prefix = %prefix,
            count = keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 list page fetched"
        );

        Ok(ListPage {
            keys,
            next_token: output.next_continuation_token().map(String::from),
        })
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presigning_config = PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(StorageError::s3)?;

        Ok(presigned_request.uri().to_string())
    }
}
