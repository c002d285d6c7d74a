//! File handlers for Web API.

use axum::{
    body::Body,
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::file::{Base64Upload, RetrievedFile, UploadProfile, UploadRequest, MAX_BATCH_FILES};
use crate::web::dto::{
    Base64UploadRequest, BatchUploadResponse, ReadQuery, UploadResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Message returned for successful uploads.
const UPLOAD_SUCCESS: &str = "File uploaded successfully";

/// Served files never run scripts or load resources in the API origin.
const FILE_CSP: &str = "default-src 'none'; style-src 'unsafe-inline'; sandbox";

/// Multipart part names accepted by the product image endpoint.
const PRODUCT_FIELDS: [&str; 3] = ["file", "files", "images"];

/// Generate a safe Content-Disposition header value.
///
/// Control characters (including CR and LF) are stripped. Non-ASCII names
/// get an RFC 5987 `filename*` parameter next to the ASCII fallback.
fn content_disposition_header(disposition: &str, filename: &str) -> String {
    let cleaned: String = filename.chars().filter(|c| !c.is_control()).collect();

    if cleaned.is_ascii() && !cleaned.chars().any(|c| c == '"' || c == '\\') {
        return format!("{disposition}; filename=\"{cleaned}\"");
    }

    // ASCII fallback for clients without filename* support
    let fallback: String = cleaned
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    let encoded = urlencoding::encode(&cleaned);

    format!("{disposition}; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// Stream a located file back to the client.
async fn file_response(file: RetrievedFile) -> Result<Response, ApiError> {
    let handle = tokio::fs::File::open(&file.path).await.map_err(|e| {
        tracing::error!("Failed to open {:?}: {}", file.path, e);
        ApiError::internal("file missing on disk")
    })?;

    let disposition = if file.download { "attachment" } else { "inline" };

    Response::builder()
        .header(header::CONTENT_TYPE, &file.mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(disposition, &file.display_name),
        )
        .header(header::CONTENT_LENGTH, file.size)
        .header(header::CONTENT_SECURITY_POLICY, FILE_CSP)
        .body(Body::from_stream(ReaderStream::new(handle)))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// Read a multipart part, enforcing the size limit while streaming.
async fn read_part(mut field: Field<'_>, limit: u64) -> Result<Vec<u8>, ApiError> {
    let mut content = Vec::new();

    while let Some(chunk) = field.chunk().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::bad_request("size exceeds limit")
        } else {
            tracing::error!("Failed to read file content: {}", e);
            ApiError::bad_request("invalid multipart data")
        }
    })? {
        if (content.len() + chunk.len()) as u64 > limit {
            return Err(ApiError::bad_request("size exceeds limit"));
        }
        content.extend_from_slice(&chunk);
    }

    Ok(content)
}

/// Turn a file part into an upload request.
async fn upload_request(field: Field<'_>, limit: u64) -> Result<UploadRequest, ApiError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let declared_mime = field.content_type().map(|s| s.to_string());
    let content = read_part(field, limit).await?;

    Ok(UploadRequest {
        content,
        original_name,
        declared_mime,
        folder: None,
    })
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::bad_request("size exceeds limit");
    }
    tracing::error!("Failed to read multipart field: {}", e);
    ApiError::bad_request("invalid multipart data")
}

async fn retrieve(
    state: &AppState,
    profile: &UploadProfile,
    filename: &str,
    query: &ReadQuery,
) -> Result<Response, ApiError> {
    let file = state
        .files
        .retrieve(profile, filename, query.wants_download())
        .await?;
    file_response(file).await
}

/// GET /api/file/:filename - Retrieve an uploaded file.
///
/// Falls back to the public directory when no upload matches.
#[utoipa::path(
    get,
    path = "/api/file/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "Stored filename"),
        ReadQuery
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 403, description = "Invalid filename"),
        (status = 404, description = "File not found"),
        (status = 500, description = "File missing on disk")
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(query): Query<ReadQuery>,
) -> Result<Response, ApiError> {
    let profile = state.files.generic_profile();
    retrieve(&state, profile, &filename, &query).await
}

/// GET /api/file/product/image/:filename - Retrieve a product image.
#[utoipa::path(
    get,
    path = "/api/file/product/image/{filename}",
    tag = "products",
    params(
        ("filename" = String, Path, description = "Stored filename"),
        ReadQuery
    ),
    responses(
        (status = 200, description = "Image content", content_type = "image/*"),
        (status = 403, description = "Invalid filename"),
        (status = 404, description = "Image not found")
    )
)]
pub async fn get_product_image(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(query): Query<ReadQuery>,
) -> Result<Response, ApiError> {
    let profile = state.files.products_profile();
    retrieve(&state, profile, &filename, &query).await
}

/// POST /api/file/upload-single - Upload one file.
///
/// Request body: multipart/form-data with a "file" part and an optional
/// "folder" text part.
#[utoipa::path(
    post,
    path = "/api/file/upload-single",
    tag = "files",
    responses(
        (status = 200, description = "File uploaded", body = UploadResponse),
        (status = 400, description = "Missing file or file too large"),
        (status = 403, description = "Invalid folder")
    )
)]
pub async fn upload_single(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let profile = state.files.generic_profile();

    let mut request: Option<UploadRequest> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" if request.is_none() => {
                request = Some(upload_request(field, profile.max_size).await?);
            }
            "folder" => {
                let text = field.text().await.map_err(|e| {
                    tracing::error!("Failed to read folder: {}", e);
                    ApiError::bad_request("invalid folder")
                })?;
                if !text.trim().is_empty() {
                    folder = Some(text);
                }
            }
            _ => {}
        }
    }

    let mut request = request.ok_or_else(|| ApiError::bad_request("file not provided"))?;
    request.folder = folder;

    let outcome = state.files.upload(profile, request).await?;

    Ok(Json(UploadResponse::new(UPLOAD_SUCCESS, outcome)))
}

/// POST /api/file/upload-base64 - Upload a base64 encoded file.
#[utoipa::path(
    post,
    path = "/api/file/upload-base64",
    tag = "files",
    request_body = Base64UploadRequest,
    responses(
        (status = 200, description = "File uploaded", body = UploadResponse),
        (status = 400, description = "Invalid base64 data, empty file or not an image"),
        (status = 403, description = "Invalid folder")
    )
)]
pub async fn upload_base64(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<Base64UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    let outcome = state
        .files
        .upload_base64(Base64Upload {
            folder: req.folder,
            data: req.image,
            filename: req.filename,
        })
        .await?;

    Ok(Json(UploadResponse::new(UPLOAD_SUCCESS, outcome)))
}

/// POST /api/file/product/upload-image - Upload one or more product images.
///
/// Request body: multipart/form-data with parts named "file", "files" or
/// "images". A single part yields `{message, file}`, several yield
/// `{message, files}`. Any failure rejects the whole batch.
#[utoipa::path(
    post,
    path = "/api/file/product/upload-image",
    tag = "products",
    responses(
        (status = 200, description = "Images uploaded", body = BatchUploadResponse),
        (status = 400, description = "Missing file, file too large or not an image")
    )
)]
pub async fn upload_product_images(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let profile = state.files.products_profile();
    let mut requests = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        if !PRODUCT_FIELDS.contains(&name.as_str()) {
            continue;
        }
        if requests.len() == MAX_BATCH_FILES {
            return Err(ApiError::bad_request(format!(
                "too many files (max {MAX_BATCH_FILES})"
            )));
        }
        requests.push(upload_request(field, profile.max_size).await?);
    }

    if requests.is_empty() {
        return Err(ApiError::bad_request("file not provided"));
    }

    let mut outcomes = state.files.upload_batch(profile, requests).await?;

    let response = if outcomes.len() == 1 {
        let outcome = outcomes.remove(0);
        Json(UploadResponse::new(UPLOAD_SUCCESS, outcome)).into_response()
    } else {
        Json(BatchUploadResponse::new("Files uploaded successfully", outcomes)).into_response()
    };

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition_header("inline", "report.pdf"),
            "inline; filename=\"report.pdf\""
        );
        assert_eq!(
            content_disposition_header("attachment", "report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_strips_control_chars() {
        let header = content_disposition_header("attachment", "evil\r\nSet-Cookie: x.txt");
        assert!(!header.contains('\r'));
        assert!(!header.contains('\n'));
        assert_eq!(header, "attachment; filename=\"evilSet-Cookie: x.txt\"");
    }

    #[test]
    fn test_content_disposition_quotes() {
        let header = content_disposition_header("inline", "a\"b.txt");
        assert!(header.starts_with("inline; filename=\"a_b.txt\"; filename*=UTF-8''"));
        assert!(header.ends_with("a%22b.txt"));
    }

    #[test]
    fn test_content_disposition_unicode() {
        let header = content_disposition_header("attachment", "日本.txt");
        assert_eq!(
            header,
            "attachment; filename=\"__.txt\"; filename*=UTF-8''%E6%97%A5%E6%9C%AC.txt"
        );
    }
}
