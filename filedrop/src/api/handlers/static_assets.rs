//! HTTP handler for the embedded upload page.

use axum::{
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};

use crate::api::models::files::FILES_PREFIX;
use crate::errors::ErrorBody;
use crate::static_assets::Assets;

fn not_found() -> Response {
    let body = ErrorBody {
        ok: false,
        error: "Not found".to_string(),
    };
    (StatusCode::NOT_FOUND, axum::Json(body)).into_response()
}

/// Serve an embedded asset, with `index.html` standing in for the root path
#[instrument]
pub async fn serve_embedded_asset(uri: Uri) -> Response {
    // Stored files are never embedded assets, even when no filename route matched
    if uri.path().starts_with(&format!("{FILES_PREFIX}/")) {
        debug!("No stored file for {}", uri.path());
        return not_found();
    }

    let mut path = uri.path().trim_start_matches('/');

    if path.is_empty() || path.ends_with('/') {
        path = "index.html";
    }

    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [
                    (header::CONTENT_TYPE, mime.to_string()),
                    (header::CACHE_CONTROL, "no-cache".to_string()),
                ],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => {
            debug!("No embedded asset for {}", uri.path());
            not_found()
        }
    }
}
