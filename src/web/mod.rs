//! Web API module for fileshelf.
//!
//! This module provides the HTTP surface: upload and retrieval routes,
//! static files, health check and API documentation.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{build_app, create_router};
pub use server::WebServer;
