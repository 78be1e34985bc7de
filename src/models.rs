use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::folders::FolderEngine;
use crate::storage::{ObjectEntry, ObjectStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ObjectStore>,
    pub folders: Arc<FolderEngine>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        let folders = Arc::new(FolderEngine::new(store.clone(), config.transform.concurrency));
        Self {
            config,
            store,
            folders,
        }
    }
}

// API Request/Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileRequest {
    pub folder: String,
    pub file_name: String,
    pub content: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLocation {
    pub folder: String,
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
pub struct FolderQuery {
    pub folder: String,
}

#[derive(Debug, Deserialize)]
pub struct FileUrlsQuery {
    pub folder: String,
    /// Seconds; defaults to one hour
    pub expires: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderTransformRequest {
    pub source_folder: String,
    pub target_folder: String,
}

#[derive(Debug, Serialize)]
pub struct WriteFileResponse {
    pub message: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteFileResponse {
    pub message: String,
    pub deleted: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListing {
    pub key: String,
    pub name: String,
    pub size: u64,
    pub last_modified: Option<String>,
}

impl FileListing {
    pub fn from_entry(entry: ObjectEntry, prefix: &str) -> Self {
        let name = entry.key.strip_prefix(prefix).unwrap_or(&entry.key).to_string();
        Self {
            name,
            key: entry.key,
            size: entry.size,
            last_modified: entry.last_modified,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub folder: String,
    pub files: Vec<FileListing>,
    pub folders: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ListFoldersResponse {
    pub folders: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DuplicateFolderResponse {
    pub message: String,
    pub copied: usize,
}

#[derive(Debug, Serialize)]
pub struct RenameFolderResponse {
    pub message: String,
    pub moved: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub key: String,
    pub size: usize,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct UploadFilesResponse {
    pub message: String,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Serialize)]
pub struct FileUrl {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct FileUrlsResponse {
    pub folder: String,
    pub expires: u32,
    pub urls: Vec<FileUrl>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub storage: String,
}
