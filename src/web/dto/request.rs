//! Request DTOs for Web API.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Base64 upload request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct Base64UploadRequest {
    /// Target folder under the upload root.
    #[validate(length(min = 1, max = 255, message = "folder is required"))]
    pub folder: String,
    /// Base64 content, optionally with a `data:<mime>;base64,` prefix.
    #[validate(length(min = 1, message = "image is required"))]
    pub image: String,
    /// Display name for the stored file.
    #[serde(default)]
    #[validate(length(max = 255))]
    pub filename: Option<String>,
}

/// Query parameters for file retrieval.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReadQuery {
    /// `true` (or `1`) serves the file as an attachment instead of inline.
    #[serde(default)]
    pub download: Option<String>,
}

impl ReadQuery {
    /// Whether an attachment was requested.
    pub fn wants_download(&self) -> bool {
        self.download
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }
}
