//! OpenAPI document for the HTTP surface, served at `/api-docs/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::api;
use crate::errors::ErrorBody;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "filedrop",
        description = "Upload .txt and .pdf files into a flat storage directory and fetch them back."
    ),
    paths(
        api::handlers::uploads::upload_files,
        api::handlers::files::list_files,
        api::handlers::files::get_file,
    ),
    components(
        schemas(
            api::models::files::UploadResponse,
            api::models::files::ManifestEntry,
            api::models::files::FileListResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "uploads", description = "Send files to the server"),
        (name = "files", description = "Browse and download stored files"),
    )
)]
pub struct ApiDoc;
