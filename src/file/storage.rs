//! Disk storage for uploaded files.
//!
//! This module owns everything that touches the upload directory:
//! - Folder and filename validation
//! - Target directory resolution
//! - Atomic writes (temporary file + rename)
//! - Verification and removal

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::{Result, ShelfError};

/// Physical storage rooted at the configured upload directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Base directory for uploads.
    root: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given root.
    ///
    /// The root directory will be created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        Ok(Self { root })
    }

    /// Get the root path of this storage.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalise a client-supplied folder name.
    ///
    /// The folder is trimmed, lower-cased and has spaces replaced by `_`.
    /// Traversal sequences are forbidden; an empty result is a bad request.
    pub fn sanitize_folder(folder: &str) -> Result<String> {
        let folder = folder.trim().to_lowercase().replace(' ', "_");

        if has_traversal(&folder) {
            return Err(ShelfError::Forbidden("invalid folder".to_string()));
        }
        if folder.is_empty() {
            return Err(ShelfError::Validation("folder is required".to_string()));
        }

        Ok(folder)
    }

    /// Reject filenames that could address anything outside a single directory.
    pub fn validate_filename(filename: &str) -> Result<()> {
        if filename.is_empty() || has_traversal(filename) {
            return Err(ShelfError::Forbidden("invalid filename".to_string()));
        }
        Ok(())
    }

    /// Resolve (and create) the directory for a subfolder of the root.
    ///
    /// `subdir` must already be sanitised.
    pub async fn resolve_dir(&self, subdir: Option<&str>) -> Result<PathBuf> {
        let dir = match subdir {
            Some(sub) => self.root.join(sub),
            None => self.root.clone(),
        };

        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            tracing::error!("Failed to create directory {:?}: {}", dir, e);
            ShelfError::Storage("cannot create directory".to_string())
        })?;

        Ok(dir)
    }

    /// Write `content` to `<dir>/<filename>` atomically.
    ///
    /// The bytes go to a temporary file in `dir` first, which is flushed and
    /// then renamed into place. An existing file is never overwritten. On
    /// failure the temporary file is removed and nothing appears under the
    /// final name.
    pub async fn write_atomic(&self, dir: &Path, filename: &str, content: Vec<u8>) -> Result<PathBuf> {
        Self::validate_filename(filename)?;

        let dir = dir.to_path_buf();
        let target = dir.join(filename);
        let final_path = target.clone();

        let written = tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&content)?;
            tmp.as_file().sync_all()?;
            tmp.persist_noclobber(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));

        match written {
            Ok(Ok(())) => {
                debug!("Stored file at {:?}", final_path);
                Ok(final_path)
            }
            Ok(Err(e)) | Err(e) => {
                tracing::error!("Failed to persist {:?}: {}", final_path, e);
                Err(ShelfError::Storage("cannot persist file".to_string()))
            }
        }
    }

    /// Return the size of a stored file, failing if it is missing or empty.
    pub async fn verify(&self, path: &Path) -> Result<u64> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
            Ok(_) => Err(ShelfError::Validation("file verification failed".to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ShelfError::Validation("file verification failed".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a stored file.
    ///
    /// Returns `true` if the file was deleted, `false` if it didn't exist.
    pub async fn remove(&self, path: &Path) -> Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                warn!("Failed to remove {:?}: {}", path, e);
                Err(e.into())
            }
        }
    }

    /// Size of the regular file at `path`, or `None` if there is none.
    pub async fn file_size(path: &Path) -> Option<u64> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Some(meta.len()),
            _ => None,
        }
    }
}

fn has_traversal(name: &str) -> bool {
    name.contains("..") || name.contains('/') || name.contains('\\') || name.contains('\0')
}
