//! Database schema and migrations for fileshelf.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded. Each backend carries its own dialect of the same schema.

/// Database migrations (SQLite).
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
#[cfg(not(any(feature = "postgres", feature = "mysql")))]
pub const MIGRATIONS: &[&str] = &[
    // v1: Uploaded file metadata
    r#"
CREATE TABLE files (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    filename        TEXT NOT NULL UNIQUE,    -- generated storage key
    original_name   TEXT NOT NULL,
    mime_type       TEXT NOT NULL,
    path            TEXT NOT NULL,
    size            INTEGER NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    deleted_at      TEXT                     -- soft delete marker
);

CREATE INDEX idx_files_deleted_at ON files(deleted_at);
"#,
    // v2: Product images share the files shape
    r#"
CREATE TABLE product_images (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    filename        TEXT NOT NULL UNIQUE,
    original_name   TEXT NOT NULL,
    mime_type       TEXT NOT NULL,
    path            TEXT NOT NULL,
    size            INTEGER NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    deleted_at      TEXT
);

CREATE INDEX idx_product_images_deleted_at ON product_images(deleted_at);
"#,
];

/// Database migrations (PostgreSQL).
#[cfg(feature = "postgres")]
pub const MIGRATIONS: &[&str] = &[
    // v1: Uploaded file metadata
    r#"
CREATE TABLE files (
    id              BIGSERIAL PRIMARY KEY,
    filename        VARCHAR(255) NOT NULL UNIQUE,
    original_name   VARCHAR(255) NOT NULL,
    mime_type       VARCHAR(150) NOT NULL,
    path            VARCHAR(500) NOT NULL,
    size            BIGINT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    deleted_at      TEXT
);

CREATE INDEX idx_files_deleted_at ON files(deleted_at);
"#,
    // v2: Product images share the files shape
    r#"
CREATE TABLE product_images (
    id              BIGSERIAL PRIMARY KEY,
    filename        VARCHAR(255) NOT NULL UNIQUE,
    original_name   VARCHAR(255) NOT NULL,
    mime_type       VARCHAR(150) NOT NULL,
    path            VARCHAR(500) NOT NULL,
    size            BIGINT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    deleted_at      TEXT
);

CREATE INDEX idx_product_images_deleted_at ON product_images(deleted_at);
"#,
];

/// Database migrations (MySQL).
#[cfg(feature = "mysql")]
pub const MIGRATIONS: &[&str] = &[
    // v1: Uploaded file metadata
    r#"
CREATE TABLE files (
    id              BIGINT AUTO_INCREMENT PRIMARY KEY,
    filename        VARCHAR(255) NOT NULL UNIQUE,
    original_name   VARCHAR(255) NOT NULL,
    mime_type       VARCHAR(150) NOT NULL,
    path            VARCHAR(500) NOT NULL,
    size            BIGINT NOT NULL,
    created_at      VARCHAR(40) NOT NULL,
    updated_at      VARCHAR(40) NOT NULL,
    deleted_at      VARCHAR(40) NULL
) DEFAULT CHARSET = utf8mb4;

CREATE INDEX idx_files_deleted_at ON files(deleted_at);
"#,
    // v2: Product images share the files shape
    r#"
CREATE TABLE product_images (
    id              BIGINT AUTO_INCREMENT PRIMARY KEY,
    filename        VARCHAR(255) NOT NULL UNIQUE,
    original_name   VARCHAR(255) NOT NULL,
    mime_type       VARCHAR(150) NOT NULL,
    path            VARCHAR(500) NOT NULL,
    size            BIGINT NOT NULL,
    created_at      VARCHAR(40) NOT NULL,
    updated_at      VARCHAR(40) NOT NULL,
    deleted_at      VARCHAR(40) NULL
) DEFAULT CHARSET = utf8mb4;

CREATE INDEX idx_product_images_deleted_at ON product_images(deleted_at);
"#,
];

/// DDL for the migration bookkeeping table.
#[cfg(not(any(feature = "postgres", feature = "mysql")))]
pub const SCHEMA_VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
)";

/// DDL for the migration bookkeeping table.
#[cfg(feature = "postgres")]
pub const SCHEMA_VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version     BIGINT PRIMARY KEY,
    applied_at  TIMESTAMPTZ NOT NULL DEFAULT now()
)";

/// DDL for the migration bookkeeping table.
#[cfg(feature = "mysql")]
pub const SCHEMA_VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version     BIGINT PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";
