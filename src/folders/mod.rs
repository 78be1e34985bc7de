//! Folder operations
//!
//! S3 has no real folders, only keys sharing a `folder/` prefix. Duplicating,
//! renaming or emptying a folder therefore means listing the prefix and acting
//! on every key it returns:
//! - `duplicate` copies each key to the target prefix
//! - `rename` copies each key and then deletes the original
//! - `delete_all` bulk-deletes every key under the prefix
//!
//! None of these are atomic. Per-object work runs concurrently up to the
//! configured cap; the first failure stops new work and is reported, and
//! whatever already completed stays in place.

use futures::stream::{self, TryStreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::storage::{folder_prefix, ObjectStore};
use crate::types::{AppError, AppResult};

pub struct FolderEngine {
    store: Arc<dyn ObjectStore>,
    concurrency: usize,
}

/// Key under the target folder: the first textual occurrence of `source` is
/// replaced and later occurrences are left alone, so `a/sub/a/file` renamed
/// from `a` to `b` becomes `b/sub/a/file`.
pub fn substitute_prefix(key: &str, source: &str, target: &str) -> String {
    key.replacen(source, target, 1)
}

/// Folder name without trailing slashes; empty names would address the whole bucket.
fn folder_name(folder: &str) -> AppResult<&str> {
    let name = folder.trim_end_matches('/');
    if name.trim().is_empty() {
        return Err(AppError::InvalidRequest("Folder name must not be empty".to_string()));
    }
    Ok(name)
}

/// Normalized source and target of a copy or move. Moving a folder onto
/// itself would copy every key onto itself and then delete it.
fn transform_names<'a>(source: &'a str, target: &'a str) -> AppResult<(&'a str, &'a str)> {
    let source = folder_name(source)?;
    let target = folder_name(target)?;
    if source == target {
        return Err(AppError::InvalidRequest(format!(
            "Source and target folder are both '{}'",
            source
        )));
    }
    Ok((source, target))
}

impl FolderEngine {
    pub fn new(store: Arc<dyn ObjectStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Keys directly or transitively under `folder`, from a single listing page.
    async fn keys_under(&self, folder: &str) -> AppResult<Vec<String>> {
        let prefix = folder_prefix(folder);
        let page = self.store.list_page(&prefix, None).await?;
        if page.is_truncated {
            warn!(
                "Listing of '{}' was truncated at {} keys; remaining objects are not included",
                prefix,
                page.objects.len()
            );
        }
        Ok(page.keys())
    }

    async fn existing_keys(&self, folder: &str) -> AppResult<Vec<String>> {
        let keys = self.keys_under(folder).await?;
        if keys.is_empty() {
            return Err(AppError::NotFound(format!("Folder '{}' not found", folder)));
        }
        Ok(keys)
    }

    /// Copy every object under `source` to the matching key under `target`.
    /// Returns the number of objects copied.
    pub async fn duplicate(&self, source: &str, target: &str) -> AppResult<usize> {
        let (source, target) = transform_names(source, target)?;
        let keys = self.existing_keys(source).await?;
        let total = keys.len();
        let copied = AtomicUsize::new(0);
        info!("Duplicating folder '{}' to '{}' ({} objects)", source, target, total);

        let store = &self.store;
        let copied_ref = &copied;
        stream::iter(keys.into_iter().map(Ok::<_, AppError>))
            .try_for_each_concurrent(self.concurrency, |key| async move {
                let new_key = substitute_prefix(&key, source, target);
                store.copy(&key, &new_key).await?;
                copied_ref.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .map_err(|e| partial(copied.load(Ordering::SeqCst), total, e))?;

        Ok(total)
    }

    /// Move every object under `source` to `target` by copy-then-delete.
    /// Returns the number of objects moved.
    ///
    /// On failure the folder is left mixed: finished objects live only under
    /// `target`, the rest stay under `source`, and an object whose copy
    /// succeeded but whose delete failed exists under both.
    pub async fn rename(&self, source: &str, target: &str) -> AppResult<usize> {
        let (source, target) = transform_names(source, target)?;
        let keys = self.existing_keys(source).await?;
        let total = keys.len();
        let moved = AtomicUsize::new(0);
        info!("Renaming folder '{}' to '{}' ({} objects)", source, target, total);

        let store = &self.store;
        let moved_ref = &moved;
        stream::iter(keys.into_iter().map(Ok::<_, AppError>))
            .try_for_each_concurrent(self.concurrency, |key| async move {
                let new_key = substitute_prefix(&key, source, target);
                store.copy(&key, &new_key).await?;
                store.delete(&key).await?;
                moved_ref.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .map_err(|e| partial(moved.load(Ordering::SeqCst), total, e))?;

        Ok(total)
    }

    /// Delete every object under `folder` in one bulk call.
    pub async fn delete_all(&self, folder: &str) -> AppResult<usize> {
        let folder = folder_name(folder)?;
        let keys = self.existing_keys(folder).await?;
        let deleted = self.store.delete_many(&keys).await?;
        info!("Deleted {} objects under '{}'", deleted, folder);
        Ok(deleted)
    }
}

fn partial(completed: usize, total: usize, cause: AppError) -> AppError {
    warn!("Folder operation failed after {} of {} objects: {}", completed, total, cause);
    AppError::PartialTransform {
        completed,
        total,
        message: cause.to_string(),
    }
}
