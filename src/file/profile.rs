//! Upload profiles.
//!
//! A profile bundles everything that differs between the upload endpoints:
//! where bytes go, which table records them, which names they get and where
//! retrieval looks when the table has no row.

use std::path::PathBuf;

use super::namer::NamingStrategy;
use super::PRODUCTS_DIRECTORY;

/// The metadata table an upload is recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Generic and base64 uploads.
    File,
    /// Product images.
    ProductImage,
}

impl RecordKind {
    /// Table name for this kind.
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::File => "files",
            RecordKind::ProductImage => "product_images",
        }
    }
}

/// Parameterised upload configuration.
#[derive(Debug, Clone)]
pub struct UploadProfile {
    /// Fixed subdirectory under the upload root. `None` lets the request
    /// choose a folder (or use the root itself).
    pub directory: Option<String>,
    /// Maximum accepted content length in bytes.
    pub max_size: u64,
    /// Storage naming policy.
    pub naming: NamingStrategy,
    /// Table the upload is recorded in.
    pub kind: RecordKind,
    /// Directory searched when no metadata row matches.
    pub fallback_dir: PathBuf,
    /// Accept only `image/*` content.
    pub images_only: bool,
    /// Public URI prefix; the stored filename is appended.
    pub uri_prefix: String,
}

impl UploadProfile {
    /// Profile for generic uploads, falling back to the public directory.
    pub fn generic(max_size: u64, public_path: impl Into<PathBuf>, api_prefix: &str) -> Self {
        Self {
            directory: None,
            max_size,
            naming: NamingStrategy::PreserveExtension,
            kind: RecordKind::File,
            fallback_dir: public_path.into(),
            images_only: false,
            uri_prefix: format!("{}/file", api_prefix.trim_end_matches('/')),
        }
    }

    /// Profile for product images.
    pub fn products(max_size: u64, upload_root: impl Into<PathBuf>, api_prefix: &str) -> Self {
        Self {
            directory: Some(PRODUCTS_DIRECTORY.to_string()),
            max_size,
            naming: NamingStrategy::PreserveExtension,
            kind: RecordKind::ProductImage,
            fallback_dir: upload_root.into().join(PRODUCTS_DIRECTORY),
            images_only: true,
            uri_prefix: format!("{}/file/product/image", api_prefix.trim_end_matches('/')),
        }
    }

    /// Whether this profile accepts content of the given type.
    pub fn accepts(&self, mime_type: &str) -> bool {
        !self.images_only || mime_type.starts_with("image/")
    }

    /// Public URI of a stored file.
    pub fn uri_for(&self, filename: &str) -> String {
        format!("{}/{}", self.uri_prefix, filename)
    }
}
