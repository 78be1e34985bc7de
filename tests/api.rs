//! API Integration Tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot` against an
//! in-memory object store. No network I/O.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bucket_gate::{create_router, storage::MemoryStore, storage::ObjectStore, AppState, Config};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "XBUCKETGATEBOUNDARY";

fn create_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new("test-bucket"));
    let state = AppState::new(Config::default(), store.clone());
    (create_router(state), store)
}

async fn seed(store: &MemoryStore, keys: &[&str]) {
    for key in keys {
        store.put(key, b"{\"seeded\":true}", "application/json").await.unwrap();
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

/// Helper to read response body as JSON.
async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn multipart_request(folder: Option<&str>, files: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    if let Some(folder) = folder {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\n{}\r\n",
            BOUNDARY, folder
        ));
    }
    for (name, content) in files {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, content
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    Request::builder()
        .method("POST")
        .uri("/upload-files")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

// ============================================================================
// File Operations Tests
// ============================================================================

#[tokio::test]
async fn test_create_then_read_file() {
    let (app, _store) = create_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/create-file",
            json!({"folder": "docs", "fileName": "a.json", "content": {"title": "hello", "n": 3}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["key"], "docs/a.json");

    let response = app
        .oneshot(get("/read-file?folder=docs&fileName=a.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"title": "hello", "n": 3}));
}

#[tokio::test]
async fn test_update_file_overwrites() {
    let (app, store) = create_app();
    seed(&store, &["docs/a.json"]).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/update-file",
            json!({"folder": "docs", "fileName": "a.json", "content": [1, 2, 3]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/read-file?folder=docs&fileName=a.json"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!([1, 2, 3]));
}

#[tokio::test]
async fn test_read_missing_file_is_404() {
    let (app, _store) = create_app();

    let response = app
        .oneshot(get("/read-file?folder=docs&fileName=missing.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_read_file_with_corrupt_content_is_500() {
    let (app, store) = create_app();
    store.put("docs/broken.json", b"not json", "application/json").await.unwrap();

    let response = app
        .oneshot(get("/read-file?folder=docs&fileName=broken.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "internal_error");
}

#[tokio::test]
async fn test_read_file_missing_query_is_400() {
    let (app, _store) = create_app();

    let response = app.oneshot(get("/read-file?folder=docs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_file_with_empty_name_is_400() {
    let (app, store) = create_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/create-file",
            json!({"folder": "docs", "fileName": "", "content": {}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_delete_single_file() {
    let (app, store) = create_app();
    seed(&store, &["docs/a.json", "docs/b.json"]).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            "/delete-file",
            json!({"folder": "docs", "fileName": "a.json"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["deleted"], 1);
    assert!(!store.contains("docs/a.json").await);
    assert!(store.contains("docs/b.json").await);

    // Deleting it again reports it missing
    let response = app
        .oneshot(json_request(
            "DELETE",
            "/delete-file",
            json!({"folder": "docs", "fileName": "a.json"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wildcard_delete() {
    let (app, store) = create_app();
    seed(&store, &["tmp/1.json", "tmp/2.json", "tmp/nested/3.json", "keep/4.json"]).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            "/delete-file",
            json!({"folder": "tmp", "fileName": "*"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["deleted"], 3);
    assert_eq!(store.len().await, 1);

    // Nothing left to match
    let response = app
        .oneshot(json_request(
            "DELETE",
            "/delete-file",
            json!({"folder": "tmp", "fileName": "*"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Listing Tests
// ============================================================================

#[tokio::test]
async fn test_list_files() {
    let (app, store) = create_app();
    seed(&store, &["docs/a.json", "docs/b.json", "docs/old/c.json", "other/d.json"]).await;

    let response = app.oneshot(get("/list-files?folder=docs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let names: Vec<&str> = body["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a.json", "b.json"]);
    assert_eq!(body["files"][0]["key"], "docs/a.json");
    assert_eq!(body["folders"], json!(["docs/old"]));
}

#[tokio::test]
async fn test_list_folders() {
    let (app, store) = create_app();
    seed(&store, &["alpha/1.json", "alpha/x/2.json", "beta/3.json", "root.json"]).await;

    let response = app.oneshot(get("/list-folders")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"folders": ["alpha", "beta"]}));
}

// ============================================================================
// Folder Transform Tests
// ============================================================================

#[tokio::test]
async fn test_duplicate_folder() {
    let (app, store) = create_app();
    seed(&store, &["src/1.json", "src/2.json", "src/deep/3.json"]).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/duplicate-folder",
            json!({"sourceFolder": "src", "targetFolder": "copy"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["copied"], 3);
    assert_eq!(store.len().await, 6);
    assert!(store.contains("copy/deep/3.json").await);
    assert!(store.contains("src/deep/3.json").await);
}

#[tokio::test]
async fn test_rename_folder() {
    let (app, store) = create_app();
    seed(&store, &["src/1.json", "src/2.json"]).await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/rename-folder",
            json!({"sourceFolder": "src", "targetFolder": "dst"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["moved"], 2);
    assert!(store.contains("dst/1.json").await);
    assert!(!store.contains("src/1.json").await);
}

#[tokio::test]
async fn test_rename_missing_folder_is_404() {
    let (app, store) = create_app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/rename-folder",
            json!({"sourceFolder": "ghost", "targetFolder": "dst"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_rename_partial_failure_is_reported() {
    let (app, store) = create_app();
    seed(&store, &["src/1.json", "src/2.json", "src/3.json"]).await;
    store.fail_copies_from("src/2.json");

    let response = app
        .oneshot(json_request(
            "PUT",
            "/rename-folder",
            json!({"sourceFolder": "src", "targetFolder": "dst"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "partial_transform");
    assert_eq!(body["total"], 3);
    assert!(store.contains("src/2.json").await);
}

#[tokio::test]
async fn test_rename_folder_onto_itself_is_400() {
    let (app, store) = create_app();
    seed(&store, &["a/x.json"]).await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/rename-folder",
            json!({"sourceFolder": "a", "targetFolder": "a/"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.contains("a/x.json").await);
}

#[tokio::test]
async fn test_rename_folder_with_trailing_slash() {
    let (app, store) = create_app();
    seed(&store, &["docs/x.json"]).await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/rename-folder",
            json!({"sourceFolder": "docs/", "targetFolder": "arch"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.contains("arch/x.json").await);
    assert!(!store.contains("archx.json").await);
}

#[tokio::test]
async fn test_folder_transform_rejects_empty_names() {
    let (app, _store) = create_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/duplicate-folder",
            json!({"sourceFolder": "", "targetFolder": "dst"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Upload and URL Tests
// ============================================================================

#[tokio::test]
async fn test_upload_files() {
    let (app, store) = create_app();

    let response = app
        .oneshot(multipart_request(
            Some("uploads"),
            &[("notes.txt", "hello"), ("data.json", "{\"a\":1}")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["files"].as_array().unwrap().len(), 2);
    assert_eq!(body["files"][0]["key"], "uploads/notes.txt");
    assert_eq!(body["files"][0]["contentType"], "text/plain");
    assert_eq!(body["files"][1]["contentType"], "application/json");

    assert_eq!(
        store.get("uploads/notes.txt").await.unwrap(),
        bytes::Bytes::from_static(b"hello")
    );
}

#[tokio::test]
async fn test_upload_to_root_is_listed_and_presigned() {
    let (app, store) = create_app();

    let response = app
        .clone()
        .oneshot(multipart_request(None, &[("readme.txt", "hi")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.contains("readme.txt").await);

    let response = app.clone().oneshot(get("/list-files?folder=")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["files"][0]["key"], "readme.txt");
    assert_eq!(body["files"][0]["name"], "readme.txt");

    let response = app.oneshot(get("/get-file-urls?folder=")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["urls"][0]["key"], "readme.txt");
}

#[tokio::test]
async fn test_upload_too_many_files_is_400() {
    let (app, store) = create_app();
    let names: Vec<String> = (0..51).map(|i| format!("f{}.txt", i)).collect();
    let files: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "x")).collect();

    let response = app.oneshot(multipart_request(None, &files)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_upload_without_files_is_400() {
    let (app, _store) = create_app();

    let response = app
        .oneshot(multipart_request(Some("uploads"), &[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_file_urls() {
    let (app, store) = create_app();
    seed(&store, &["docs/a.json", "docs/sub/b.json"]).await;

    let response = app
        .oneshot(get("/get-file-urls?folder=docs&expires=120"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["expires"], 120);
    assert_eq!(
        body["urls"],
        json!([
            {"key": "docs/a.json", "url": "memory://test-bucket/docs/a.json?X-Amz-Expires=120"},
            {"key": "docs/sub/b.json", "url": "memory://test-bucket/docs/sub/b.json?X-Amz-Expires=120"},
        ])
    );
}

#[tokio::test]
async fn test_get_file_urls_rejects_out_of_range_expiry() {
    let (app, _store) = create_app();

    let response = app
        .oneshot(get("/get-file-urls?folder=docs&expires=999999999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let (app, _store) = create_app();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}
