//! File management module for fileshelf.
//!
//! This module provides upload and retrieval functionality including:
//! - UUID storage naming
//! - Upload profiles (generic files, product images)
//! - Atomic disk storage
//! - Metadata records

mod metadata;
mod namer;
mod profile;
mod service;
mod storage;

pub use metadata::{FileRepository, NewStoredFile, StoredFile};
pub use namer::{NamingStrategy, StorageNamer};
pub use profile::{RecordKind, UploadProfile};
pub use service::{
    resolve_mime, Base64Upload, FileService, RetrievedFile, UploadOutcome, UploadRequest,
};
pub use storage::FileStorage;

/// Maximum number of files in one batch upload.
pub const MAX_BATCH_FILES: usize = 20;

/// Subdirectory of the upload root holding product images.
pub const PRODUCTS_DIRECTORY: &str = "products";

/// Content type used when nothing better is known.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
