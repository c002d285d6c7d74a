//! Response DTOs for Web API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::file::UploadOutcome;

/// Public view of a stored file.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileView {
    /// Record ID.
    pub id: i64,
    /// Generated storage name.
    pub filename: String,
    /// Client-supplied name.
    pub originalname: String,
    /// Content type.
    pub mimetype: String,
    /// Size in bytes.
    pub size: i64,
    /// Retrieval URI.
    pub uri: String,
    /// Upload timestamp (RFC 3339).
    pub created_at: String,
}

impl From<UploadOutcome> for FileView {
    fn from(outcome: UploadOutcome) -> Self {
        let record = outcome.record;
        Self {
            id: record.id,
            filename: record.filename,
            originalname: record.original_name,
            mimetype: record.mime_type,
            size: record.size,
            uri: outcome.uri,
            created_at: record.created_at,
        }
    }
}

/// Response for a single upload.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Status message.
    pub message: String,
    /// The stored file.
    pub file: FileView,
}

impl UploadResponse {
    /// Create a new upload response.
    pub fn new(message: impl Into<String>, file: impl Into<FileView>) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
        }
    }
}

/// Response for a batch upload.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchUploadResponse {
    /// Status message.
    pub message: String,
    /// The stored files, in upload order.
    pub files: Vec<FileView>,
}

impl BatchUploadResponse {
    /// Create a new batch upload response.
    pub fn new(message: impl Into<String>, files: Vec<UploadOutcome>) -> Self {
        Self {
            message: message.into(),
            files: files.into_iter().map(FileView::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::StoredFile;

    fn outcome() -> UploadOutcome {
        UploadOutcome {
            record: StoredFile {
                id: 7,
                filename: "abc.png".to_string(),
                original_name: "cat.png".to_string(),
                mime_type: "image/png".to_string(),
                path: "public/uploads/abc.png".to_string(),
                size: 123,
                created_at: "2024-05-01T10:00:00.000Z".to_string(),
                updated_at: "2024-05-01T10:00:00.000Z".to_string(),
                deleted_at: None,
            },
            uri: "/api/file/abc.png".to_string(),
        }
    }

    #[test]
    fn test_file_view_serialize() {
        let json = serde_json::to_value(FileView::from(outcome())).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["filename"], "abc.png");
        assert_eq!(json["originalname"], "cat.png");
        assert_eq!(json["mimetype"], "image/png");
        assert_eq!(json["size"], 123);
        assert_eq!(json["uri"], "/api/file/abc.png");
        assert!(json.get("path").is_none());
    }

    #[test]
    fn test_batch_response_serialize() {
        let response = BatchUploadResponse::new("uploaded", vec![outcome(), outcome()]);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["message"], "uploaded");
        assert_eq!(json["files"].as_array().unwrap().len(), 2);
    }
}
