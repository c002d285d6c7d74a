//! fileshelf - file upload and retrieval service
//!
//! Clients upload files as multipart parts or base64 JSON payloads. The
//! bytes are stored on local disk under generated names and indexed in a
//! relational table; clients retrieve them later by the generated name.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::{Database, DbPool};
pub use error::{Result, ShelfError};
pub use file::{FileService, StoredFile, UploadProfile};
pub use web::WebServer;
