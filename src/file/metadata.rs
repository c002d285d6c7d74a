//! Stored file metadata and repository.

use chrono::{SecondsFormat, Utc};

use super::profile::RecordKind;
use crate::db::{self, DbPool};
use crate::{Result, ShelfError};

const SELECT_COLUMNS: &str =
    "id, filename, original_name, mime_type, path, size, created_at, updated_at, deleted_at";

/// Metadata for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredFile {
    /// Unique record ID.
    pub id: i64,
    /// Generated storage name, the public lookup key.
    pub filename: String,
    /// Client-supplied display name.
    pub original_name: String,
    /// Declared or sniffed content type.
    pub mime_type: String,
    /// Location of the bytes on disk.
    pub path: String,
    /// File size in bytes.
    pub size: i64,
    /// Creation timestamp (RFC 3339, UTC).
    pub created_at: String,
    /// Last update timestamp (RFC 3339, UTC).
    pub updated_at: String,
    /// Soft-delete marker.
    pub deleted_at: Option<String>,
}

/// Data for creating a new metadata record.
#[derive(Debug, Clone)]
pub struct NewStoredFile {
    /// Generated storage name.
    pub filename: String,
    /// Client-supplied display name.
    pub original_name: String,
    /// Content type.
    pub mime_type: String,
    /// Location of the bytes on disk.
    pub path: String,
    /// File size in bytes.
    pub size: i64,
}

impl NewStoredFile {
    /// Create a new NewStoredFile.
    pub fn new(
        filename: impl Into<String>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
        path: impl Into<String>,
        size: i64,
    ) -> Self {
        Self {
            filename: filename.into(),
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            path: path.into(),
            size,
        }
    }
}

/// Repository for stored file metadata.
///
/// Every operation takes the [`RecordKind`] selecting the table.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new record and return it.
    pub async fn insert(&self, kind: RecordKind, file: &NewStoredFile) -> Result<StoredFile> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        // MySQL has no RETURNING; the id comes from the execute result.
        let returning = if cfg!(feature = "mysql") { "" } else { " RETURNING id" };
        let sql = format!(
            "INSERT INTO {} (filename, original_name, mime_type, path, size, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7){returning}",
            kind.table()
        );
        let sql = db::sql(&sql);

        let query = sqlx::query(&sql)
            .bind(&file.filename)
            .bind(&file.original_name)
            .bind(&file.mime_type)
            .bind(&file.path)
            .bind(file.size)
            .bind(&now)
            .bind(&now);

        #[cfg(feature = "mysql")]
        let id = query
            .execute(self.pool)
            .await
            .map(|result| result.last_insert_id() as i64);
        #[cfg(not(feature = "mysql"))]
        let id = {
            use sqlx::Row;
            match query.fetch_one(self.pool).await {
                Ok(row) => row.try_get::<i64, _>(0),
                Err(e) => Err(e),
            }
        };
        let id = id.map_err(|e| ShelfError::Database(e.to_string()))?;

        self.get_by_id(kind, id)
            .await?
            .ok_or_else(|| ShelfError::NotFound("file".into()))
    }

    /// Get a live record by ID.
    pub async fn get_by_id(&self, kind: RecordKind, id: i64) -> Result<Option<StoredFile>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM {} WHERE id = $1 AND deleted_at IS NULL",
            kind.table()
        );

        let file = sqlx::query_as::<_, StoredFile>(&db::sql(&sql))
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| ShelfError::Database(e.to_string()))?;

        Ok(file)
    }

    /// Get a live record by its storage filename.
    pub async fn get_by_filename(
        &self,
        kind: RecordKind,
        filename: &str,
    ) -> Result<Option<StoredFile>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM {} WHERE filename = $1 AND deleted_at IS NULL",
            kind.table()
        );

        let file = sqlx::query_as::<_, StoredFile>(&db::sql(&sql))
            .bind(filename)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| ShelfError::Database(e.to_string()))?;

        Ok(file)
    }

    /// Count live records.
    pub async fn count(&self, kind: RecordKind) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE deleted_at IS NULL",
            kind.table()
        );

        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(self.pool)
            .await
            .map_err(|e| ShelfError::Database(e.to_string()))?;

        Ok(count)
    }

    /// Permanently delete a record.
    ///
    /// Only used to roll back an upload whose later steps failed.
    /// Returns `true` if a row was removed.
    pub async fn delete(&self, kind: RecordKind, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());

        let result = sqlx::query(&db::sql(&sql))
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| ShelfError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
