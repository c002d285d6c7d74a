//! API handlers for fileshelf.

pub mod file;

pub use file::*;

use crate::file::FileService;

/// Application state shared across handlers.
///
/// The database handle lives inside [`FileService`].
#[derive(Clone)]
pub struct AppState {
    /// Upload and retrieval operations.
    pub files: FileService,
}

impl AppState {
    /// Create a new application state.
    pub fn new(files: FileService) -> Self {
        Self { files }
    }
}
