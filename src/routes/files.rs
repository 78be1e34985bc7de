//! File routes
//!
//! JSON documents are stored as `<folder>/<fileName>`; uploads store raw
//! bytes under the same key scheme.

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::models::{
    AppState, DeleteFileResponse, FileListing, FileLocation, FileUrl, FileUrlsQuery,
    FileUrlsResponse, FolderQuery, ListFilesResponse, UploadFilesResponse, UploadedFile,
    WriteFileRequest, WriteFileResponse,
};
use crate::storage::{folder_prefix, object_key};
use crate::types::{AppError, AppResult};

/// Most files accepted by one `/upload-files` request.
pub const MAX_UPLOAD_FILES: usize = 50;
/// Presigned URL lifetime when the request does not name one.
pub const DEFAULT_URL_EXPIRY_SECS: u32 = 3600;
/// Longest lifetime S3 accepts for a SigV4 presigned URL (7 days).
pub const MAX_URL_EXPIRY_SECS: u32 = 604_800;

const WILDCARD: &str = "*";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/create-file", post(create_file))
        .route("/update-file", put(update_file))
        .route("/read-file", get(read_file))
        .route("/delete-file", delete(delete_file))
        .route("/list-files", get(list_files))
        .route("/upload-files", post(upload_files))
        .route("/get-file-urls", get(get_file_urls))
        .with_state(state)
}

fn require(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidRequest(format!("'{}' must not be empty", field)));
    }
    Ok(())
}

async fn write_json(state: &AppState, request: &WriteFileRequest) -> AppResult<String> {
    require(&request.folder, "folder")?;
    require(&request.file_name, "fileName")?;

    let key = object_key(&request.folder, &request.file_name);
    let body = serde_json::to_vec(&request.content)?;
    state.store.put(&key, &body, "application/json").await?;
    Ok(key)
}

/// POST /create-file
async fn create_file(
    State(state): State<AppState>,
    Json(request): Json<WriteFileRequest>,
) -> AppResult<(StatusCode, Json<WriteFileResponse>)> {
    let key = write_json(&state, &request).await?;
    info!("Created file {}", key);

    Ok((
        StatusCode::CREATED,
        Json(WriteFileResponse {
            message: "File created successfully".to_string(),
            key,
        }),
    ))
}

/// PUT /update-file
async fn update_file(
    State(state): State<AppState>,
    Json(request): Json<WriteFileRequest>,
) -> AppResult<Json<WriteFileResponse>> {
    let key = write_json(&state, &request).await?;
    info!("Updated file {}", key);

    Ok(Json(WriteFileResponse {
        message: "File updated successfully".to_string(),
        key,
    }))
}

/// GET /read-file?folder&fileName
async fn read_file(
    State(state): State<AppState>,
    Query(location): Query<FileLocation>,
) -> AppResult<Json<serde_json::Value>> {
    let key = object_key(&location.folder, &location.file_name);
    let data = state.store.get(&key).await?;
    let content = serde_json::from_slice(&data).map_err(|e| {
        AppError::Internal(format!("Stored object '{}' is not valid JSON: {}", key, e))
    })?;
    Ok(Json(content))
}

/// DELETE /delete-file, `fileName: "*"` empties the whole folder
async fn delete_file(
    State(state): State<AppState>,
    Json(location): Json<FileLocation>,
) -> AppResult<Json<DeleteFileResponse>> {
    require(&location.folder, "folder")?;

    if location.file_name == WILDCARD {
        let deleted = state.folders.delete_all(&location.folder).await?;
        return Ok(Json(DeleteFileResponse {
            message: format!("Deleted all files in folder '{}'", location.folder),
            deleted,
        }));
    }

    require(&location.file_name, "fileName")?;
    let key = object_key(&location.folder, &location.file_name);
    // S3 deletes of missing keys succeed silently, so check first
    state.store.head(&key).await?;
    state.store.delete(&key).await?;
    info!("Deleted file {}", key);

    Ok(Json(DeleteFileResponse {
        message: format!("File '{}' deleted successfully", key),
        deleted: 1,
    }))
}

/// GET /list-files?folder
async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<FolderQuery>,
) -> AppResult<Json<ListFilesResponse>> {
    let prefix = folder_prefix(&query.folder);
    let page = state.store.list_page(&prefix, Some("/")).await?;
    debug!(
        "Listed {} files and {} folders under {}",
        page.objects.len(),
        page.common_prefixes.len(),
        prefix
    );

    Ok(Json(ListFilesResponse {
        folder: query.folder,
        files: page
            .objects
            .into_iter()
            .map(|entry| FileListing::from_entry(entry, &prefix))
            .collect(),
        folders: page
            .common_prefixes
            .into_iter()
            .map(|p| p.trim_end_matches('/').to_string())
            .collect(),
    }))
}

struct PendingUpload {
    file_name: String,
    content_type: String,
    data: bytes::Bytes,
}

/// POST /upload-files, multipart with up to 50 `files` parts and an optional `folder` field
async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadFilesResponse>> {
    let mut folder = String::new();
    let mut pending = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("folder") => folder = field.text().await?,
            Some("files") => {
                if pending.len() == MAX_UPLOAD_FILES {
                    return Err(AppError::InvalidRequest(format!(
                        "At most {} files can be uploaded at once",
                        MAX_UPLOAD_FILES
                    )));
                }
                let file_name = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        AppError::InvalidRequest("Every uploaded file needs a file name".to_string())
                    })?;
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&file_name)
                            .first_or_octet_stream()
                            .to_string()
                    });
                let data = field.bytes().await?;
                pending.push(PendingUpload {
                    file_name,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }

    if pending.is_empty() {
        return Err(AppError::InvalidRequest("No files provided".to_string()));
    }

    let store = &state.store;
    let folder = folder.as_str();
    let files: Vec<UploadedFile> = stream::iter(pending)
        .map(|upload| async move {
            let key = object_key(folder, &upload.file_name);
            store.put(&key, &upload.data, &upload.content_type).await?;
            Ok::<_, AppError>(UploadedFile {
                key,
                size: upload.data.len(),
                content_type: upload.content_type,
            })
        })
        .buffered(state.config.transform.concurrency.max(1))
        .try_collect()
        .await?;
    info!("Uploaded {} files", files.len());

    Ok(Json(UploadFilesResponse {
        message: format!("{} files uploaded successfully", files.len()),
        files,
    }))
}

/// GET /get-file-urls?folder&expires
async fn get_file_urls(
    State(state): State<AppState>,
    Query(query): Query<FileUrlsQuery>,
) -> AppResult<Json<FileUrlsResponse>> {
    let expires = query.expires.unwrap_or(DEFAULT_URL_EXPIRY_SECS);
    if expires == 0 || expires > MAX_URL_EXPIRY_SECS {
        return Err(AppError::InvalidRequest(format!(
            "'expires' must be between 1 and {} seconds",
            MAX_URL_EXPIRY_SECS
        )));
    }

    let page = state
        .store
        .list_page(&folder_prefix(&query.folder), None)
        .await?;

    let mut urls = Vec::with_capacity(page.objects.len());
    for entry in page.objects {
        let url = state.store.presign_get(&entry.key, expires).await?;
        urls.push(FileUrl { key: entry.key, url });
    }

    Ok(Json(FileUrlsResponse {
        folder: query.folder,
        expires,
        urls,
    }))
}
