//! Test helpers for HTTP integration tests.
//!
//! Provides a [`TestApp`] wrapping an `axum_test::TestServer` backed by an
//! in-memory database and a temporary storage root.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_test::TestServer;
use tempfile::TempDir;

use fileshelf::config::Config;
use fileshelf::file::{FileRepository, FileService, RecordKind};
use fileshelf::web::{build_app, AppState};
use fileshelf::Database;

/// A minimal valid PNG header, enough for content sniffing.
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00,
];

/// Running application under test.
pub struct TestApp {
    /// HTTP test client.
    pub server: TestServer,
    /// Database handle shared with the app.
    pub db: Database,
    /// Configuration the app was built from.
    pub config: Config,
    _temp_dir: TempDir,
}

impl TestApp {
    /// Build an app with default settings.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build an app, letting the caller adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.files.upload_root = path_string(&temp_dir.path().join("uploads"));
        config.files.public_path = path_string(&temp_dir.path().join("public"));
        adjust(&mut config);

        std::fs::create_dir_all(&config.files.public_path).expect("Failed to create public dir");

        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let files = FileService::from_config(db.clone(), &config)
            .expect("Failed to create file service");
        let app_state = Arc::new(AppState::new(files));

        let router = build_app(app_state, &config);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            db,
            config,
            _temp_dir: temp_dir,
        }
    }

    /// Root directory uploads are written under.
    pub fn upload_root(&self) -> PathBuf {
        PathBuf::from(&self.config.files.upload_root)
    }

    /// Public directory.
    pub fn public_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.files.public_path)
    }

    /// Number of live rows in a metadata table.
    pub async fn count(&self, kind: RecordKind) -> i64 {
        FileRepository::new(self.db.pool())
            .count(kind)
            .await
            .expect("Failed to count records")
    }

    /// Number of regular files anywhere below the upload root.
    pub fn stored_file_count(&self) -> usize {
        count_files(&self.upload_root())
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };

    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}
