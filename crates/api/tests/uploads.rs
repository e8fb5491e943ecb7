//! Integration tests for multipart uploads and the temporary asset store.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::{body_json, build_test_app, files_in, post_multipart, Call, MultipartBody};
use modelgate_core::staging::DEFAULT_MAX_FILE_BYTES;
use modelgate_upstream::UpstreamError;
use serde_json::json;

const PNG: &str = "image/png";

fn image(len: usize) -> Vec<u8> {
    vec![0x89; len]
}

// ---------------------------------------------------------------------------
// Test: size ceiling is inclusive
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_at_size_limit_is_accepted() {
    let app = build_test_app();
    let form = MultipartBody::new().file("file", "exact.png", PNG, &image(DEFAULT_MAX_FILE_BYTES as usize));

    let response = post_multipart(app.router.clone(), "/api/generation/upload/sts", form).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_matches!(&app.generation.calls()[0], Call::Multipart { path, parts } => {
        assert_eq!(path, "/upload/sts");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name, "file");
        assert_eq!(parts[0].file_len, Some(DEFAULT_MAX_FILE_BYTES));
    });
    assert_eq!(app.staging.outstanding(), 0);
    assert_eq!(files_in(app.upload_dir.path()), 0);
}

#[tokio::test]
async fn file_one_byte_over_limit_is_rejected() {
    let app = build_test_app();
    let form = MultipartBody::new().file(
        "file",
        "big.png",
        PNG,
        &image(DEFAULT_MAX_FILE_BYTES as usize + 1),
    );

    let response = post_multipart(app.router.clone(), "/api/generation/upload/sts", form).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["code"], "FILE_TOO_LARGE");
    assert_eq!(app.generation.call_count(), 0);
    assert_eq!(app.staging.outstanding(), 0);
    assert_eq!(files_in(app.upload_dir.path()), 0);
}

// ---------------------------------------------------------------------------
// Test: only images are staged
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_image_upload_is_rejected() {
    let app = build_test_app();
    let form = MultipartBody::new().file("file", "notes.txt", "text/plain", b"hello");

    let response = post_multipart(app.router.clone(), "/api/generation/upload/sts", form).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_MEDIA_TYPE");
    assert_eq!(app.generation.call_count(), 0);
}

#[tokio::test]
async fn missing_file_is_rejected() {
    let app = build_test_app();
    let form = MultipartBody::new().text("prompt", "a chair");

    let response =
        post_multipart(app.router.clone(), "/api/generation/multiview-to-model", form).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_REQUEST");
    assert_eq!(app.generation.call_count(), 0);
}

// ---------------------------------------------------------------------------
// Test: multiview uploads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn multiview_upload_streams_all_views() {
    let app = build_test_app();
    let form = MultipartBody::new()
        .file("images", "front.png", PNG, &image(1024))
        .file("images", "left.jpg", "image/jpeg", &image(2048))
        .file("images", "back.webp", "image/webp", &image(512))
        .text("prompt", "a wooden chair");

    let response =
        post_multipart(app.router.clone(), "/api/generation/multiview-to-model", form).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_matches!(&app.generation.calls()[0], Call::Multipart { path, parts } => {
        assert_eq!(path, "/task");
        let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["type", "images", "images", "images", "prompt"]);
        assert_eq!(parts[0].text.as_deref(), Some("multiview_to_model"));
        assert_eq!(parts[2].file_len, Some(2048));
        assert_eq!(parts[2].media_type.as_deref(), Some("image/jpeg"));
        assert_eq!(parts[4].text.as_deref(), Some("a wooden chair"));
    });
    assert_eq!(app.staging.outstanding(), 0);
    assert_eq!(files_in(app.upload_dir.path()), 0);
}

#[tokio::test]
async fn too_many_views_are_rejected() {
    let app = build_test_app();
    let mut form = MultipartBody::new();
    for i in 0..7 {
        form = form.file("images", &format!("view-{i}.png"), PNG, &image(64));
    }

    let response =
        post_multipart(app.router.clone(), "/api/generation/multiview-to-model", form).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "TOO_MANY_FILES");
    assert_eq!(app.generation.call_count(), 0);
    assert_eq!(app.staging.outstanding(), 0);
    assert_eq!(files_in(app.upload_dir.path()), 0);
}

// ---------------------------------------------------------------------------
// Test: staged files are released when upstream fails
// ---------------------------------------------------------------------------

#[tokio::test]
async fn staged_files_released_after_upstream_failure() {
    let app = build_test_app();
    app.generation.respond(Err(UpstreamError::from_response(
        503,
        json!({ "message": "busy" }),
    )));
    let form = MultipartBody::new()
        .file("images", "front.png", PNG, &image(128))
        .file("images", "side.png", PNG, &image(128));

    let response =
        post_multipart(app.router.clone(), "/api/generation/multiview-to-model", form).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    // The files existed while upstream was being called.
    assert_matches!(&app.generation.calls()[0], Call::Multipart { parts, .. } => {
        assert_eq!(parts[1].file_len, Some(128));
    });
    assert_eq!(app.staging.outstanding(), 0);
    assert_eq!(files_in(app.upload_dir.path()), 0);
}

// ---------------------------------------------------------------------------
// Test: test-upload describes the file without calling upstream
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_upload_echoes_metadata() {
    let app = build_test_app();
    let form = MultipartBody::new().file("file", "../../etc/thumb.png", PNG, &image(300));

    let response = post_multipart(app.router.clone(), "/api/generation/test-upload", form).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["file"]["media_type"], PNG);
    assert_eq!(json["file"]["size"], 300);
    let staged_name = json["file"]["staged_name"].as_str().unwrap();
    assert!(staged_name.ends_with("thumb.png"));
    assert!(!staged_name.contains('/'));
    assert_eq!(app.generation.call_count(), 0);
    assert_eq!(files_in(app.upload_dir.path()), 0);
}
