// In-process object store for local development and tests

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;
use tokio::sync::RwLock;

use super::{ListingPage, ObjectEntry, ObjectMeta, ObjectStore, MAX_KEYS_PER_PAGE};
use crate::types::{AppError, AppResult};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    last_modified: String,
}

/// A bucket held in a `BTreeMap`, so listings come back in key order like S3.
///
/// Copies and deletes can be made to fail for chosen keys, which is how the
/// partial-failure behaviour of folder operations is exercised.
pub struct MemoryStore {
    bucket: String,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    failing_copies: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: RwLock::new(BTreeMap::new()),
            failing_copies: Mutex::new(HashSet::new()),
            failing_deletes: Mutex::new(HashSet::new()),
        }
    }

    /// Make every copy whose source is `key` fail with a storage error.
    pub fn fail_copies_from(&self, key: &str) {
        if let Ok(mut failing) = self.failing_copies.lock() {
            failing.insert(key.to_string());
        }
    }

    /// Make every delete of `key` fail with a storage error.
    pub fn fail_deletes_of(&self, key: &str) {
        if let Ok(mut failing) = self.failing_deletes.lock() {
            failing.insert(key.to_string());
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    fn is_failing(set: &Mutex<HashSet<String>>, key: &str) -> bool {
        set.lock().map(|s| s.contains(key)).unwrap_or(false)
    }

    fn not_found(key: &str) -> AppError {
        AppError::NotFound(format!("Object '{}' does not exist", key))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn provider(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<()> {
        let object = StoredObject {
            data: Bytes::copy_from_slice(data),
            content_type: content_type.to_string(),
            last_modified: chrono::Utc::now().to_rfc3339(),
        };
        self.objects.write().await.insert(key.to_string(), object);
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Bytes> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| Self::not_found(key))
    }

    async fn head(&self, key: &str) -> AppResult<ObjectMeta> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| ObjectMeta {
                size: o.data.len() as u64,
                content_type: Some(o.content_type.clone()),
                last_modified: Some(o.last_modified.clone()),
            })
            .ok_or_else(|| Self::not_found(key))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        // Let other in-flight operations interleave, as they would over the network.
        tokio::task::yield_now().await;
        if Self::is_failing(&self.failing_deletes, key) {
            return Err(AppError::Storage(format!("injected delete failure ({})", key)));
        }
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> AppResult<usize> {
        if let Some(key) = keys.iter().find(|k| Self::is_failing(&self.failing_deletes, k)) {
            return Err(AppError::Storage(format!("injected delete failure ({})", key)));
        }
        let mut objects = self.objects.write().await;
        for key in keys {
            objects.remove(key);
        }
        Ok(keys.len())
    }

    async fn list_page(&self, prefix: &str, delimiter: Option<&str>) -> AppResult<ListingPage> {
        let objects = self.objects.read().await;
        let mut page = ListingPage::default();
        let mut prefixes = BTreeSet::new();
        let mut entries = 0;

        for (key, object) in objects.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            let rest = &key[prefix.len()..];
            let grouped = delimiter
                .filter(|d| !d.is_empty())
                .and_then(|d| rest.find(d).map(|i| format!("{}{}", prefix, &rest[..i + d.len()])));

            match grouped {
                Some(common) => {
                    if prefixes.contains(&common) {
                        continue;
                    }
                    if entries == MAX_KEYS_PER_PAGE {
                        page.is_truncated = true;
                        break;
                    }
                    prefixes.insert(common);
                }
                None => {
                    if entries == MAX_KEYS_PER_PAGE {
                        page.is_truncated = true;
                        break;
                    }
                    page.objects.push(ObjectEntry {
                        key: key.clone(),
                        size: object.data.len() as u64,
                        last_modified: Some(object.last_modified.clone()),
                    });
                }
            }
            entries += 1;
        }

        page.common_prefixes = prefixes.into_iter().collect();
        Ok(page)
    }

    async fn copy(&self, from: &str, to: &str) -> AppResult<()> {
        tokio::task::yield_now().await;
        if Self::is_failing(&self.failing_copies, from) {
            return Err(AppError::Storage(format!("injected copy failure ({})", from)));
        }
        let mut objects = self.objects.write().await;
        let mut object = objects.get(from).cloned().ok_or_else(|| Self::not_found(from))?;
        object.last_modified = chrono::Utc::now().to_rfc3339();
        objects.insert(to.to_string(), object);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_secs: u32) -> AppResult<String> {
        Ok(format!(
            "memory://{}/{}?X-Amz-Expires={}",
            self.bucket, key, expires_secs
        ))
    }
}
