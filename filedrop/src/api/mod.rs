//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - `POST /upload`: multipart upload, field `files` (repeatable)
//! - `GET /files`: names of every stored file
//! - `GET /files/{filename}`: raw content of one stored file
//! - `GET /`: the embedded upload page
//!
//! The OpenAPI document is served at `/api-docs/openapi.json` and rendered at `/docs`.

pub mod handlers;
pub mod models;
