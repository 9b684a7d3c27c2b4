//! HTTP request handlers.
//!
//! - [`uploads`]: multipart upload with the type and size filter
//! - [`files`]: directory listing and raw file download
//! - [`static_assets`]: the embedded browser client
//!
//! Handlers return [`crate::errors::Result`], whose error side renders as
//! `{"ok": false, "error": "..."}` with the matching status code.

pub mod files;
pub mod static_assets;
pub mod uploads;
