//! Web API File Tests
//!
//! Integration tests for the upload and retrieval endpoints.

#![cfg(not(any(feature = "postgres", feature = "mysql")))]

mod common;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fileshelf::file::RecordKind;
use serde_json::{json, Value};

use common::{TestApp, PNG_BYTES};

fn file_part(name: &str, mime: &str, content: &[u8]) -> Part {
    Part::bytes(content.to_vec())
        .file_name(name.to_string())
        .mime_type(mime.to_string())
}

async fn upload_single(app: &TestApp, form: MultipartForm) -> axum_test::TestResponse {
    app.server.post("/api/file/upload-single").multipart(form).await
}

fn header(response: &axum_test::TestResponse, name: &str) -> String {
    response.header(name).to_str().unwrap().to_string()
}

// ============================================================================
// Single Upload Tests
// ============================================================================

#[tokio::test]
async fn test_upload_then_retrieve() {
    let app = TestApp::new().await;

    let form =
        MultipartForm::new().add_part("file", file_part("notes.txt", "text/plain", b"hello shelf"));
    let response = upload_single(&app, form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "File uploaded successfully");
    let file = &body["file"];
    assert_eq!(file["originalname"], "notes.txt");
    assert_eq!(file["mimetype"], "text/plain");
    assert_eq!(file["size"], 11);
    let filename = file["filename"].as_str().unwrap();
    assert!(filename.ends_with(".txt"));
    assert_eq!(file["uri"], format!("/api/file/{filename}"));

    let response = app.server.get(&format!("/api/file/{filename}")).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"hello shelf");
    assert_eq!(header(&response, "content-type"), "text/plain");
    assert_eq!(header(&response, "content-length"), "11");
    assert_eq!(
        header(&response, "content-disposition"),
        "inline; filename=\"notes.txt\""
    );
}

#[tokio::test]
async fn test_retrieve_as_attachment() {
    let app = TestApp::new().await;

    let form = MultipartForm::new().add_part("file", file_part("cat.png", "image/png", PNG_BYTES));
    let body: Value = upload_single(&app, form).await.json();
    let filename = body["file"]["filename"].as_str().unwrap().to_string();

    let response = app
        .server
        .get(&format!("/api/file/{filename}"))
        .add_query_param("download", "true")
        .await;

    response.assert_status_ok();
    assert_eq!(header(&response, "content-type"), "image/png");
    assert_eq!(
        header(&response, "content-disposition"),
        "attachment; filename=\"cat.png\""
    );
    assert_eq!(response.as_bytes().as_ref(), PNG_BYTES);
}

#[tokio::test]
async fn test_upload_into_folder() {
    let app = TestApp::new().await;

    let form = MultipartForm::new()
        .add_text("folder", "Team Docs")
        .add_part("file", file_part("a.txt", "text/plain", b"data"));
    let response = upload_single(&app, form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    let filename = body["file"]["filename"].as_str().unwrap();
    assert!(app.upload_root().join("team_docs").join(filename).is_file());
}

#[tokio::test]
async fn test_upload_traversal_folder_forbidden() {
    let app = TestApp::new().await;

    let form = MultipartForm::new()
        .add_text("folder", "../outside")
        .add_part("file", file_part("a.txt", "text/plain", b"data"));
    let response = upload_single(&app, form).await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(app.count(RecordKind::File).await, 0);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn test_upload_without_file() {
    let app = TestApp::new().await;

    let form = MultipartForm::new().add_text("folder", "docs");
    let response = upload_single(&app, form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body, json!({"error": "file not provided", "code": "BAD_REQUEST"}));
}

#[tokio::test]
async fn test_upload_oversized() {
    let app = TestApp::with_config(|config| config.files.max_upload_size_mb = 1).await;

    let content = vec![0x42u8; 1024 * 1024 + 1];
    let form = MultipartForm::new().add_part(
        "file",
        file_part("big.bin", "application/octet-stream", &content),
    );
    let response = upload_single(&app, form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "size exceeds limit");
    assert_eq!(app.count(RecordKind::File).await, 0);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn test_upload_sniffs_generic_type() {
    let app = TestApp::new().await;

    let form = MultipartForm::new().add_part(
        "file",
        file_part("pixel", "application/octet-stream", PNG_BYTES),
    );
    let response = upload_single(&app, form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["file"]["mimetype"], "image/png");
    assert!(body["file"]["filename"].as_str().unwrap().ends_with(".png"));
}

// ============================================================================
// Retrieval Tests
// ============================================================================

#[tokio::test]
async fn test_retrieve_unknown_file() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/file/does-not-exist.png").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body, json!({"error": "file not found", "code": "NOT_FOUND"}));
}

#[tokio::test]
async fn test_retrieve_traversal_forbidden() {
    let app = TestApp::new().await;
    std::fs::write(app.upload_root().join("secret.txt"), b"secret").unwrap();

    for path in [
        "/api/file/..%2Fsecret.txt",
        "/api/file/uploads%2F..%2Fsecret.txt",
        "/api/file/a%5Cb.txt",
        "/api/file/product/image/..%2F..%2Fsecret.txt",
    ] {
        let response = app.server.get(path).await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["code"], "FORBIDDEN", "{path}");
    }
}

#[tokio::test]
async fn test_retrieve_public_fallback() {
    let app = TestApp::new().await;
    std::fs::write(app.public_dir().join("robots.txt"), b"User-agent: *").unwrap();

    let response = app.server.get("/api/file/robots.txt").await;

    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"User-agent: *");
    assert_eq!(header(&response, "content-type"), "text/plain");
    assert_eq!(
        header(&response, "content-disposition"),
        "inline; filename=\"robots.txt\""
    );
}

#[tokio::test]
async fn test_retrieve_missing_bytes() {
    let app = TestApp::new().await;

    let form = MultipartForm::new().add_part("file", file_part("a.txt", "text/plain", b"data"));
    let body: Value = upload_single(&app, form).await.json();
    let filename = body["file"]["filename"].as_str().unwrap().to_string();

    std::fs::remove_file(app.upload_root().join(&filename)).unwrap();

    let response = app.server.get(&format!("/api/file/{filename}")).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({"error": "file missing on disk", "code": "INTERNAL_ERROR"})
    );
}

#[tokio::test]
async fn test_non_ascii_display_name() {
    let app = TestApp::new().await;

    let form =
        MultipartForm::new().add_part("file", file_part("résumé.txt", "text/plain", b"cv"));
    let body: Value = upload_single(&app, form).await.json();
    let filename = body["file"]["filename"].as_str().unwrap().to_string();

    let response = app
        .server
        .get(&format!("/api/file/{filename}"))
        .add_query_param("download", "true")
        .await;

    response.assert_status_ok();
    let disposition = header(&response, "content-disposition");
    assert!(disposition.starts_with("attachment; "));
    assert!(disposition.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.txt"));
}

// ============================================================================
// Base64 Upload Tests
// ============================================================================

#[tokio::test]
async fn test_base64_upload_then_retrieve() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/file/upload-base64")
        .json(&json!({
            "folder": "Profile Pictures",
            "image": format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES)),
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let filename = body["file"]["filename"].as_str().unwrap().to_string();
    assert_eq!(body["file"]["mimetype"], "image/png");
    assert!(filename.ends_with(".png"));
    assert!(app
        .upload_root()
        .join("profile_pictures")
        .join(&filename)
        .is_file());

    let response = app.server.get(&format!("/api/file/{filename}")).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), PNG_BYTES);
    assert_eq!(header(&response, "content-type"), "image/png");
}

#[tokio::test]
async fn test_base64_invalid_data() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/file/upload-base64")
        .json(&json!({"folder": "avatars", "image": "***not base64***"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid base64 data");
    assert_eq!(app.count(RecordKind::File).await, 0);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn test_base64_traversal_folder() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/file/upload-base64")
        .json(&json!({"folder": "../../etc", "image": STANDARD.encode(b"x")}))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn test_base64_empty_payload() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/file/upload-base64")
        .json(&json!({"folder": "avatars", "image": "data:image/png;base64,"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "file verification failed");
    assert_eq!(app.count(RecordKind::File).await, 0);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn test_base64_missing_fields() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/file/upload-base64")
        .json(&json!({"folder": "avatars"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// Product Image Tests
// ============================================================================

#[tokio::test]
async fn test_product_single_upload() {
    let app = TestApp::new().await;

    let form = MultipartForm::new().add_part("file", file_part("shoe.png", "image/png", PNG_BYTES));
    let response = app
        .server
        .post("/api/file/product/upload-image")
        .multipart(form)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let filename = body["file"]["filename"].as_str().unwrap().to_string();
    assert_eq!(
        body["file"]["uri"],
        format!("/api/file/product/image/{filename}")
    );
    assert!(app.upload_root().join("products").join(&filename).is_file());
    assert_eq!(app.count(RecordKind::ProductImage).await, 1);
    assert_eq!(app.count(RecordKind::File).await, 0);

    let response = app
        .server
        .get(&format!("/api/file/product/image/{filename}"))
        .await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), PNG_BYTES);

    // Product images are not visible through the generic route
    let response = app.server.get(&format!("/api/file/{filename}")).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_batch_upload() {
    let app = TestApp::new().await;

    let form = MultipartForm::new()
        .add_part("files", file_part("a.png", "image/png", PNG_BYTES))
        .add_part("files", file_part("b.png", "image/png", PNG_BYTES))
        .add_part("images", file_part("c.png", "image/png", PNG_BYTES));
    let response = app
        .server
        .post("/api/file/product/upload-image")
        .multipart(form)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(files[0]["originalname"], "a.png");
    assert_eq!(files[2]["originalname"], "c.png");
    assert_eq!(app.count(RecordKind::ProductImage).await, 3);
}

#[tokio::test]
async fn test_product_batch_aborts_on_invalid_file() {
    let app = TestApp::new().await;

    let form = MultipartForm::new()
        .add_part("files", file_part("a.png", "image/png", PNG_BYTES))
        .add_part("files", file_part("b.png", "image/png", PNG_BYTES))
        .add_part("files", file_part("readme.txt", "text/plain", b"not an image"))
        .add_part("files", file_part("d.png", "image/png", PNG_BYTES));
    let response = app
        .server
        .post("/api/file/product/upload-image")
        .multipart(form)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "unsupported file type");
    assert!(body.get("files").is_none());
    assert_eq!(app.count(RecordKind::ProductImage).await, 0);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn test_product_too_many_files() {
    let app = TestApp::new().await;

    let mut form = MultipartForm::new();
    for i in 0..=fileshelf::file::MAX_BATCH_FILES {
        form = form.add_part("files", file_part(&format!("{i}.png"), "image/png", PNG_BYTES));
    }
    let response = app
        .server
        .post("/api/file/product/upload-image")
        .multipart(form)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(app.count(RecordKind::ProductImage).await, 0);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn test_product_upload_without_file() {
    let app = TestApp::new().await;

    let form = MultipartForm::new().add_text("note", "no files here");
    let response = app
        .server
        .post("/api/file/product/upload-image")
        .multipart(form)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_image_fallback_directory() {
    let app = TestApp::new().await;
    let products = app.upload_root().join("products");
    std::fs::create_dir_all(&products).unwrap();
    std::fs::write(products.join("legacy.png"), PNG_BYTES).unwrap();

    let response = app.server.get("/api/file/product/image/legacy.png").await;

    response.assert_status_ok();
    assert_eq!(header(&response, "content-type"), "image/png");
    assert_eq!(response.as_bytes().as_ref(), PNG_BYTES);
}

// ============================================================================
// Ambient Routes
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new().await;

    let response = app.server.get("/nope").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body, json!({"error": "Cannot GET /nope"}));
}

#[tokio::test]
async fn test_static_public_files() {
    let app = TestApp::new().await;
    std::fs::write(app.public_dir().join("index.txt"), b"static").unwrap();

    let response = app.server.get("/public/index.txt").await;

    response.assert_status_ok();
    assert_eq!(response.text(), "static");
}

#[tokio::test]
async fn test_openapi_document() {
    let app = TestApp::new().await;

    let response = app.server.get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["paths"]["/api/file/upload-single"].is_object());
}

#[tokio::test]
async fn test_custom_api_prefix() {
    let app = TestApp::with_config(|config| config.web.api_prefix = "/v2".to_string()).await;

    let form = MultipartForm::new().add_part("file", file_part("a.txt", "text/plain", b"data"));
    let response = app
        .server
        .post("/v2/file/upload-single")
        .multipart(form)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let uri = body["file"]["uri"].as_str().unwrap().to_string();
    assert!(uri.starts_with("/v2/file/"));

    app.server.get(&uri).await.assert_status_ok();
}

#[tokio::test]
async fn test_served_files_carry_nosniff() {
    let app = TestApp::new().await;

    let form = MultipartForm::new().add_part("file", file_part("page.html", "text/html", b"<p>"));
    let body: Value = upload_single(&app, form).await.json();
    let filename = body["file"]["filename"].as_str().unwrap().to_string();

    let response = app.server.get(&format!("/api/file/{filename}")).await;

    response.assert_status_ok();
    assert_eq!(header(&response, "x-content-type-options"), "nosniff");
    assert!(header(&response, "content-security-policy").contains("sandbox"));
}

#[tokio::test]
async fn test_base64_rejects_header_breaking_type() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/file/upload-base64")
        .json(&json!({
            "folder": "avatars",
            "image": "data:text/plain\r\nX-Evil: 1;base64,aGVsbG8=",
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid base64 data");
    assert_eq!(app.count(RecordKind::File).await, 0);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn test_base64_rejects_non_image() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/file/upload-base64")
        .json(&json!({
            "folder": "avatars",
            "image": format!("data:text/html;base64,{}", STANDARD.encode("<script>alert(1)</script>")),
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "unsupported file type");
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn test_generic_upload_cannot_target_products_folder() {
    let app = TestApp::new().await;

    let form = MultipartForm::new()
        .add_text("folder", "products")
        .add_part("file", file_part("page.html", "text/html", b"<p>hi</p>"));
    let response = upload_single(&app, form).await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(app.count(RecordKind::File).await, 0);
    assert!(!app.upload_root().join("products").exists());
}
