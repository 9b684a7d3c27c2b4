use crate::AppState;
use crate::api::models::files::FileListResponse;
use crate::errors::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    summary = "List stored files",
    description = "Names of every entry in the storage directory, in directory order.",
    responses(
        (status = 200, description = "Stored file names", body = FileListResponse),
        (status = 500, description = "Storage directory could not be read", body = crate::errors::ErrorBody)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<FileListResponse>> {
    let files = state.storage.list().await?;
    tracing::debug!(count = files.len(), "Listed stored files");
    Ok(Json(FileListResponse { ok: true, files }))
}

#[utoipa::path(
    get,
    path = "/files/{filename}",
    tag = "files",
    summary = "Download a stored file",
    params(
        ("filename" = String, Path, description = "Stored filename, percent-encoded"),
    ),
    responses(
        (status = 200, description = "Raw file content"),
        (status = 404, description = "No such file", body = crate::errors::ErrorBody)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_file(State(state): State<AppState>, Path(filename): Path<String>) -> Result<Response> {
    let content = state.storage.get(&filename).await?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();

    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            // Uploads can replace a file in place, so caches must revalidate
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        content,
    )
        .into_response())
}
