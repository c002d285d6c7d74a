//! File service for fileshelf.
//!
//! This module provides the high-level file operations:
//! - Upload with size, type and storage checks
//! - Base64 upload into a named folder
//! - All-or-nothing batch upload
//! - Retrieval with metadata lookup and directory fallback

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use mime_guess::mime::Mime;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::{Result, ShelfError};

use super::metadata::{FileRepository, NewStoredFile, StoredFile};
use super::namer::StorageNamer;
use super::profile::UploadProfile;
use super::storage::FileStorage;
use super::{DEFAULT_MIME_TYPE, MAX_BATCH_FILES};

/// Request data for an upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// File content.
    pub content: Vec<u8>,
    /// Client-supplied filename.
    pub original_name: String,
    /// Content type declared by the client, if any.
    pub declared_mime: Option<String>,
    /// Requested folder under the upload root (ignored by fixed-directory profiles).
    pub folder: Option<String>,
}

impl UploadRequest {
    /// Create a new upload request.
    pub fn new(original_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            content,
            original_name: original_name.into(),
            declared_mime: None,
            folder: None,
        }
    }

    /// Set the declared content type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }

    /// Set the target folder.
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }
}

/// Base64 upload payload.
#[derive(Debug, Clone)]
pub struct Base64Upload {
    /// Target folder under the upload root.
    pub folder: String,
    /// Base64 data, optionally prefixed with `data:<mime>;base64,`.
    pub data: String,
    /// Display name for the file.
    pub filename: Option<String>,
}

/// A stored upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// The metadata record.
    pub record: StoredFile,
    /// Public URI for retrieval.
    pub uri: String,
}

/// A file located for retrieval.
#[derive(Debug, Clone)]
pub struct RetrievedFile {
    /// Location of the bytes.
    pub path: PathBuf,
    /// Content type to serve.
    pub mime_type: String,
    /// Suggested download name.
    pub display_name: String,
    /// Length in bytes.
    pub size: u64,
    /// Serve as an attachment rather than inline.
    pub download: bool,
}

/// File service for managing uploads and retrieval.
#[derive(Debug, Clone)]
pub struct FileService {
    db: Database,
    storage: FileStorage,
    generic: UploadProfile,
    base64: UploadProfile,
    products: UploadProfile,
}

impl FileService {
    /// Create a new FileService with explicit profiles.
    pub fn new(
        db: Database,
        storage: FileStorage,
        generic: UploadProfile,
        products: UploadProfile,
    ) -> Self {
        let base64 = UploadProfile {
            images_only: true,
            ..generic.clone()
        };

        Self {
            db,
            storage,
            generic,
            base64,
            products,
        }
    }

    /// Create a FileService from the application configuration.
    pub fn from_config(db: Database, config: &Config) -> Result<Self> {
        let storage = FileStorage::new(&config.files.upload_root)?;
        let max_size = config.files.max_upload_size();
        let generic =
            UploadProfile::generic(max_size, &config.files.public_path, &config.web.api_prefix);
        let products =
            UploadProfile::products(max_size, &config.files.upload_root, &config.web.api_prefix);

        Ok(Self::new(db, storage, generic, products))
    }

    /// Profile for generic multipart uploads.
    pub fn generic_profile(&self) -> &UploadProfile {
        &self.generic
    }

    /// Profile for base64 uploads: the generic table and URIs, images only.
    pub fn base64_profile(&self) -> &UploadProfile {
        &self.base64
    }

    /// Profile for product images.
    pub fn products_profile(&self) -> &UploadProfile {
        &self.products
    }

    /// The underlying storage.
    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    /// Upload a single file.
    pub async fn upload(
        &self,
        profile: &UploadProfile,
        request: UploadRequest,
    ) -> Result<UploadOutcome> {
        if request.content.is_empty() {
            return Err(ShelfError::Validation("file not provided".to_string()));
        }
        self.store(profile, request).await
    }

    /// Decode a base64 payload and store it in the requested folder.
    ///
    /// Only images are accepted. The result is recorded in the generic
    /// table, so it is retrievable like any other upload.
    pub async fn upload_base64(&self, upload: Base64Upload) -> Result<UploadOutcome> {
        let folder = FileStorage::sanitize_folder(&upload.folder)?;
        let (declared_mime, content) = decode_base64(&upload.data)?;

        let original_name = upload
            .filename
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_default();

        let request = UploadRequest {
            content,
            original_name,
            declared_mime,
            folder: Some(folder),
        };

        self.store(&self.base64, request).await
    }

    /// Upload several files as one unit.
    ///
    /// Files are stored in order. The first failure aborts the batch and
    /// everything stored so far is rolled back.
    pub async fn upload_batch(
        &self,
        profile: &UploadProfile,
        requests: Vec<UploadRequest>,
    ) -> Result<Vec<UploadOutcome>> {
        if requests.is_empty() {
            return Err(ShelfError::Validation("file not provided".to_string()));
        }
        if requests.len() > MAX_BATCH_FILES {
            return Err(ShelfError::Validation(format!(
                "too many files (max {MAX_BATCH_FILES})"
            )));
        }

        let mut stored = Vec::with_capacity(requests.len());
        for (index, request) in requests.into_iter().enumerate() {
            match self.upload(profile, request).await {
                Ok(outcome) => stored.push(outcome),
                Err(e) => {
                    warn!(
                        index,
                        stored = stored.len(),
                        "Batch upload aborted, rolling back: {}",
                        e
                    );
                    self.rollback(profile, &stored).await;
                    return Err(e);
                }
            }
        }

        Ok(stored)
    }

    /// Locate a file for retrieval.
    ///
    /// The profile's table is consulted first; when it has no row the
    /// profile's fallback directory is searched.
    pub async fn retrieve(
        &self,
        profile: &UploadProfile,
        filename: &str,
        download: bool,
    ) -> Result<RetrievedFile> {
        FileStorage::validate_filename(filename)?;

        let repo = FileRepository::new(self.db.pool());
        if let Some(record) = repo.get_by_filename(profile.kind, filename).await? {
            let path = PathBuf::from(&record.path);
            let Some(size) = FileStorage::file_size(&path).await else {
                tracing::error!(
                    filename = %record.filename,
                    path = %record.path,
                    "Metadata record has no bytes on disk"
                );
                return Err(ShelfError::Integrity("file missing on disk".to_string()));
            };

            debug!(filename, "Serving recorded file");
            return Ok(RetrievedFile {
                path,
                mime_type: record.mime_type,
                display_name: record.original_name,
                size,
                download,
            });
        }

        let candidate = profile.fallback_dir.join(filename);
        if let Some(size) = FileStorage::file_size(&candidate).await {
            debug!(filename, dir = ?profile.fallback_dir, "Serving fallback file");
            let mime_type = mime_guess::from_path(&candidate)
                .first_raw()
                .unwrap_or(DEFAULT_MIME_TYPE)
                .to_string();
            return Ok(RetrievedFile {
                path: candidate,
                mime_type,
                display_name: filename.to_string(),
                size,
                download,
            });
        }

        Err(ShelfError::NotFound("file".to_string()))
    }

    /// Validate, write and record one file.
    async fn store(&self, profile: &UploadProfile, request: UploadRequest) -> Result<UploadOutcome> {
        if request.content.len() as u64 > profile.max_size {
            return Err(ShelfError::Validation("size exceeds limit".to_string()));
        }

        let mime_type = resolve_mime(
            request.declared_mime.as_deref(),
            &request.content,
            &request.original_name,
        );
        if !profile.accepts(&mime_type) {
            return Err(ShelfError::Validation("unsupported file type".to_string()));
        }

        let subdir = match (&profile.directory, &request.folder) {
            (Some(dir), _) => Some(dir.clone()),
            (None, Some(folder)) => {
                let folder = FileStorage::sanitize_folder(folder)?;
                if self.is_reserved(&folder) {
                    return Err(ShelfError::Forbidden("reserved folder".to_string()));
                }
                Some(folder)
            }
            (None, None) => None,
        };
        let dir = self.storage.resolve_dir(subdir.as_deref()).await?;

        let filename = StorageNamer::name_for(profile.naming, &request.original_name, &mime_type);
        let original_name = if request.original_name.is_empty() {
            filename.clone()
        } else {
            request.original_name
        };

        let path = self
            .storage
            .write_atomic(&dir, &filename, request.content)
            .await?;

        let size = match self.storage.verify(&path).await {
            Ok(size) => size,
            Err(e) => {
                self.discard(&path).await;
                return Err(e);
            }
        };

        let new_file = NewStoredFile::new(
            &filename,
            original_name,
            &mime_type,
            path.to_string_lossy(),
            size as i64,
        );

        let repo = FileRepository::new(self.db.pool());
        let record = match repo.insert(profile.kind, &new_file).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Failed to record upload {}: {}", filename, e);
                self.discard(&path).await;
                return Err(e);
            }
        };

        info!(
            id = record.id,
            filename = %record.filename,
            mime_type = %record.mime_type,
            size = record.size,
            table = profile.kind.table(),
            "File uploaded"
        );

        Ok(UploadOutcome {
            uri: profile.uri_for(&record.filename),
            record,
        })
    }

    /// Whether a folder belongs to a fixed-directory profile.
    fn is_reserved(&self, folder: &str) -> bool {
        self.products.directory.as_deref() == Some(folder)
    }

    /// Undo stored uploads, removing rows and bytes.
    async fn rollback(&self, profile: &UploadProfile, stored: &[UploadOutcome]) {
        let repo = FileRepository::new(self.db.pool());
        for outcome in stored {
            if let Err(e) = repo.delete(profile.kind, outcome.record.id).await {
                tracing::error!(
                    "Failed to roll back record {}: {}",
                    outcome.record.filename,
                    e
                );
            }
            self.discard(&PathBuf::from(&outcome.record.path)).await;
        }
    }

    async fn discard(&self, path: &std::path::Path) {
        if let Err(e) = self.storage.remove(path).await {
            tracing::error!("Failed to remove {:?}: {}", path, e);
        }
    }
}

/// Pick the content type for uploaded bytes.
///
/// A well-formed declared type other than the generic binary type wins,
/// then the sniffed type, then a guess from the name.
pub fn resolve_mime(declared: Option<&str>, content: &[u8], original_name: &str) -> String {
    if let Some(declared) = declared
        .and_then(parse_mime)
        .filter(|m| m.essence_str() != DEFAULT_MIME_TYPE)
    {
        return declared.to_string();
    }

    if let Some(kind) = infer::get(content) {
        return kind.mime_type().to_string();
    }

    mime_guess::from_path(original_name)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

/// Parse a client-declared content type.
///
/// Only printable ASCII is accepted so the value is always a valid header.
fn parse_mime(raw: &str) -> Option<Mime> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| (b' '..=b'~').contains(&b)) {
        return None;
    }
    raw.parse().ok()
}

/// Split an optional data-URI prefix off a base64 payload and decode it.
fn decode_base64(data: &str) -> Result<(Option<String>, Vec<u8>)> {
    let (mime, encoded) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| ShelfError::Validation("invalid base64 data".to_string()))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| ShelfError::Validation("invalid base64 data".to_string()))?;
            let mime = if mime.is_empty() {
                None
            } else {
                let parsed = parse_mime(mime)
                    .ok_or_else(|| ShelfError::Validation("invalid base64 data".to_string()))?;
                Some(parsed.to_string())
            };
            (mime, payload)
        }
        None => (None, data),
    };

    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let content = STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| ShelfError::Validation("invalid base64 data".to_string()))?;

    Ok((mime, content))
}
