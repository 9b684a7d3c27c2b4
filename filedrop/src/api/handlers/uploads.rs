//! `POST /upload`: multipart upload with the type and size filter.

use crate::AppState;
use crate::api::models::files::{ManifestEntry, UploadResponse};
use crate::errors::{Error, Result};
use crate::storage::{client_basename, is_plain_filename};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use bytes::{Bytes, BytesMut};

/// Form field every file part has to be sent under
pub const UPLOAD_FIELD: &str = "files";

/// A validated part held in memory until the whole request has been checked
struct PendingFile {
    filename: String,
    content: Bytes,
}

impl From<MultipartError> for Error {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge {
                message: "Request body too large".to_string(),
            }
        } else {
            Error::BadRequest {
                message: format!("Failed to parse multipart data: {}", e.body_text()),
            }
        }
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "uploads",
    summary = "Upload files",
    description = "Upload one or more .txt or .pdf files under the multipart field `files`. \
                   Every part is checked before anything is written; one bad part fails the whole request. \
                   A file with the same name as an existing one replaces it. \
                   A body that is not multipart carries no files and yields an empty manifest.",
    request_body(
        content_type = "multipart/form-data",
        description = "Repeatable `files` parts, at most 10 MiB each by default"
    ),
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 400, description = "Disallowed type, file too large or malformed request", body = crate::errors::ErrorBody),
        (status = 413, description = "Request body over the configured limit", body = crate::errors::ErrorBody),
        (status = 500, description = "Storage directory could not be written", body = crate::errors::ErrorBody)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_files(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    // Without a multipart body there are no file parts to store
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!("Not a multipart body, nothing to upload: {}", rejection.body_text());
            return Ok(Json(UploadResponse { ok: true, files: Vec::new() }));
        }
    };
    let max_file_size = state.config.uploads.max_file_size;
    let type_policy = state.config.uploads.type_policy;

    let mut pending: Vec<PendingFile> = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        // Parts without a filename are ordinary form fields
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            tracing::trace!(field = %field_name, "Ignoring non-file form field");
            continue;
        };

        if field_name != UPLOAD_FIELD {
            return Err(Error::BadRequest {
                message: format!("Unexpected field: {field_name}"),
            });
        }

        let filename = client_basename(&raw_name).to_string();
        if !is_plain_filename(&filename) {
            return Err(Error::BadRequest {
                message: format!("Invalid filename: {raw_name:?}"),
            });
        }

        let content_type = field.content_type().map(str::to_string);
        if !type_policy.allows(content_type.as_deref(), &filename) {
            tracing::info!(
                filename = %filename,
                content_type = ?content_type,
                policy = ?type_policy,
                "Rejecting file with unsupported type"
            );
            return Err(Error::UnsupportedFileType { filename });
        }

        let mut content = BytesMut::new();
        while let Some(chunk) = field.chunk().await? {
            // Fail as soon as the ceiling is crossed instead of buffering the rest
            if (content.len() + chunk.len()) as u64 > max_file_size {
                tracing::info!(
                    filename = %filename,
                    max_file_size = max_file_size,
                    "File size limit exceeded, aborting upload"
                );
                return Err(Error::FileTooLarge {
                    filename,
                    limit: max_file_size,
                });
            }
            content.extend_from_slice(&chunk);
        }

        tracing::debug!(filename = %filename, size = content.len(), "Accepted file part");
        pending.push(PendingFile {
            filename,
            content: content.freeze(),
        });
    }

    let mut manifest = Vec::with_capacity(pending.len());
    for file in &pending {
        let stored = state.storage.put(&file.filename, &file.content).await?;
        manifest.push(ManifestEntry::from(&stored));
    }

    tracing::info!(count = manifest.len(), "Upload complete");

    Ok(Json(UploadResponse { ok: true, files: manifest }))
}
