//! Object storage layer
//!
//! Everything the HTTP layer and the folder engine need from an
//! S3-compatible bucket goes through the [`ObjectStore`] trait:
//! - `S3Store` talks to a real bucket through `rust-s3`
//! - `MemoryStore` keeps objects in process (local development and tests)

pub mod memory;
pub mod s3_client;

pub use memory::MemoryStore;
pub use s3_client::S3Store;

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::types::AppResult;

/// Largest number of entries a single listing call returns.
pub const MAX_KEYS_PER_PAGE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub size: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
}

/// One page of a prefix listing. Continuation tokens are never followed,
/// so `is_truncated` means entries past the first page were dropped.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub objects: Vec<ObjectEntry>,
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
}

impl ListingPage {
    pub fn keys(&self) -> Vec<String> {
        self.objects.iter().map(|o| o.key.clone()).collect()
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name reported by the health route.
    fn provider(&self) -> &'static str;

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<()>;

    async fn get(&self, key: &str) -> AppResult<Bytes>;

    async fn head(&self, key: &str) -> AppResult<ObjectMeta>;

    /// Deleting a key that does not exist succeeds, as it does on S3.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Removes every key in `keys` and returns how many were removed.
    async fn delete_many(&self, keys: &[String]) -> AppResult<usize>;

    async fn list_page(&self, prefix: &str, delimiter: Option<&str>) -> AppResult<ListingPage>;

    async fn copy(&self, from: &str, to: &str) -> AppResult<()>;

    async fn presign_get(&self, key: &str, expires_secs: u32) -> AppResult<String>;
}

/// Build the store selected by `STORAGE_PROVIDER`.
pub fn build_store(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    match config.storage.provider.as_str() {
        "s3" => {
            let store = S3Store::new(&config.storage, config.transform.concurrency)?;
            info!(
                "Using S3 bucket '{}' in region '{}'",
                config.storage.s3_bucket, config.storage.s3_region
            );
            Ok(Arc::new(store))
        }
        "memory" => {
            info!("Using in-memory object store");
            Ok(Arc::new(MemoryStore::new(&config.storage.s3_bucket)))
        }
        other => bail!("Unknown STORAGE_PROVIDER '{}' (expected 's3' or 'memory')", other),
    }
}

/// Listing prefix for a folder name: `"docs"` and `"docs/"` both become `"docs/"`.
/// An empty folder is the bucket root, matching [`object_key`].
pub fn folder_prefix(folder: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        String::new()
    } else {
        format!("{}/", folder)
    }
}

/// Object key for a file inside a folder. An empty folder means the bucket root.
pub fn object_key(folder: &str, file_name: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", folder, file_name)
    }
}
