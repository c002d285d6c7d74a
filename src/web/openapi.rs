//! OpenAPI documentation for the fileshelf API.

use utoipa::OpenApi;

use super::dto::{Base64UploadRequest, BatchUploadResponse, FileView, UploadResponse};
use super::handlers::file;

/// OpenAPI documentation structure.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "fileshelf API",
        description = "File upload and retrieval service"
    ),
    tags(
        (name = "files", description = "Generic file upload and retrieval"),
        (name = "products", description = "Product image upload and retrieval"),
    ),
    paths(
        file::get_file,
        file::upload_single,
        file::upload_base64,
        file::upload_product_images,
        file::get_product_image,
    ),
    components(schemas(
        Base64UploadRequest,
        FileView,
        UploadResponse,
        BatchUploadResponse,
    ))
)]
pub struct ApiDoc;
