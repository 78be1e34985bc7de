// S3 backend built on rust-s3

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, TryStreamExt};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::Bucket;
use tracing::debug;

use super::{ListingPage, ObjectEntry, ObjectMeta, ObjectStore, MAX_KEYS_PER_PAGE};
use crate::config::StorageConfig;
use crate::types::{AppError, AppResult};

pub struct S3Store {
    bucket: Bucket,
    concurrency: usize,
}

impl S3Store {
    pub fn new(config: &StorageConfig, concurrency: usize) -> Result<Self> {
        let region = match &config.s3_endpoint {
            Some(endpoint) => Region::Custom {
                region: config.s3_region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config.s3_region.parse::<Region>()?,
        };
        let credentials = Credentials::new(
            config.s3_access_key_id.as_deref(),
            config.s3_secret_access_key.as_deref(),
            None,
            None,
            None,
        )?;

        let mut bucket = Bucket::new(&config.s3_bucket, region, credentials)?;
        if config.s3_path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            concurrency: concurrency.max(1),
        })
    }
}

/// Attach the key to provider errors so a 404 says which object was missing.
fn for_key(key: &str) -> impl FnOnce(S3Error) -> AppError + '_ {
    move |e| match e {
        S3Error::HttpFailWithBody(404, _) => AppError::NotFound(format!("Object '{}' does not exist", key)),
        other => AppError::Storage(format!("{} ({})", other, key)),
    }
}

fn ensure_success(status: u16, key: &str) -> AppResult<()> {
    match status {
        200..=299 => Ok(()),
        404 => Err(AppError::NotFound(format!("Object '{}' does not exist", key))),
        code => Err(AppError::Storage(format!(
            "unexpected status {} from provider ({})",
            code, key
        ))),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn provider(&self) -> &'static str {
        "s3"
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<()> {
        debug!("PUT {} ({} bytes)", key, data.len());
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(for_key(key))?;
        ensure_success(response.status_code(), key)
    }

    async fn get(&self, key: &str) -> AppResult<Bytes> {
        debug!("GET {}", key);
        let response = self.bucket.get_object(key).await.map_err(for_key(key))?;
        ensure_success(response.status_code(), key)?;
        Ok(response.bytes().clone())
    }

    async fn head(&self, key: &str) -> AppResult<ObjectMeta> {
        let (head, status) = self.bucket.head_object(key).await.map_err(for_key(key))?;
        ensure_success(status, key)?;
        Ok(ObjectMeta {
            size: head.content_length.unwrap_or(0).max(0) as u64,
            content_type: head.content_type,
            last_modified: head.last_modified,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        debug!("DELETE {}", key);
        let response = self.bucket.delete_object(key).await.map_err(for_key(key))?;
        ensure_success(response.status_code(), key)
    }

    // rust-s3 has no multi-object delete, so issue single deletes with the
    // same cap the folder engine uses.
    async fn delete_many(&self, keys: &[String]) -> AppResult<usize> {
        stream::iter(keys.iter().map(Ok::<_, AppError>))
            .try_for_each_concurrent(self.concurrency, |key| self.delete(key))
            .await?;
        Ok(keys.len())
    }

    async fn list_page(&self, prefix: &str, delimiter: Option<&str>) -> AppResult<ListingPage> {
        let (result, status) = self
            .bucket
            .list_page(
                prefix.to_string(),
                delimiter.map(str::to_string),
                None,
                None,
                Some(MAX_KEYS_PER_PAGE),
            )
            .await
            .map_err(for_key(prefix))?;
        ensure_success(status, prefix)?;

        Ok(ListingPage {
            objects: result
                .contents
                .into_iter()
                .map(|o| ObjectEntry {
                    key: o.key,
                    size: o.size,
                    last_modified: Some(o.last_modified),
                })
                .collect(),
            common_prefixes: result
                .common_prefixes
                .unwrap_or_default()
                .into_iter()
                .map(|p| p.prefix)
                .collect(),
            is_truncated: result.is_truncated,
        })
    }

    async fn copy(&self, from: &str, to: &str) -> AppResult<()> {
        debug!("COPY {} -> {}", from, to);
        let status = self
            .bucket
            .copy_object_internal(from, to)
            .await
            .map_err(for_key(from))?;
        ensure_success(status, from)
    }

    async fn presign_get(&self, key: &str, expires_secs: u32) -> AppResult<String> {
        self.bucket
            .presign_get(key, expires_secs, None)
            .await
            .map_err(for_key(key))
    }
}
