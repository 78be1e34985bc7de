use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use tracing::info;

use crate::models::{
    AppState, DuplicateFolderResponse, FolderTransformRequest, ListFoldersResponse,
    RenameFolderResponse,
};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/list-folders", get(list_folders))
        .route("/duplicate-folder", post(duplicate_folder))
        .route("/rename-folder", put(rename_folder))
        .with_state(state)
}

// An empty folder name would address the whole bucket.
fn validate(request: &FolderTransformRequest) -> AppResult<()> {
    if request.source_folder.trim().is_empty() || request.target_folder.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "'sourceFolder' and 'targetFolder' must not be empty".to_string(),
        ));
    }
    if request.source_folder.trim_end_matches('/') == request.target_folder.trim_end_matches('/') {
        return Err(AppError::InvalidRequest(
            "'sourceFolder' and 'targetFolder' must differ".to_string(),
        ));
    }
    Ok(())
}

/// GET /list-folders - top-level folders of the bucket
async fn list_folders(State(state): State<AppState>) -> AppResult<Json<ListFoldersResponse>> {
    let page = state.store.list_page("", Some("/")).await?;
    let folders = page
        .common_prefixes
        .into_iter()
        .map(|p| p.trim_end_matches('/').to_string())
        .collect();

    Ok(Json(ListFoldersResponse { folders }))
}

/// POST /duplicate-folder
async fn duplicate_folder(
    State(state): State<AppState>,
    Json(request): Json<FolderTransformRequest>,
) -> AppResult<Json<DuplicateFolderResponse>> {
    validate(&request)?;
    let copied = state
        .folders
        .duplicate(&request.source_folder, &request.target_folder)
        .await?;
    info!(
        "Duplicated {} objects from '{}' to '{}'",
        copied, request.source_folder, request.target_folder
    );

    Ok(Json(DuplicateFolderResponse {
        message: format!(
            "Folder '{}' duplicated to '{}'",
            request.source_folder, request.target_folder
        ),
        copied,
    }))
}

/// PUT /rename-folder
async fn rename_folder(
    State(state): State<AppState>,
    Json(request): Json<FolderTransformRequest>,
) -> AppResult<Json<RenameFolderResponse>> {
    validate(&request)?;
    let moved = state
        .folders
        .rename(&request.source_folder, &request.target_folder)
        .await?;
    info!(
        "Renamed '{}' to '{}' ({} objects)",
        request.source_folder, request.target_folder, moved
    );

    Ok(Json(RenameFolderResponse {
        message: format!(
            "Folder '{}' renamed to '{}'",
            request.source_folder, request.target_folder
        ),
        moved,
    }))
}
