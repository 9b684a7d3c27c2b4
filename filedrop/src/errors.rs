use crate::filter::UNSUPPORTED_TYPE_MESSAGE;
use crate::storage::StorageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Declared type and extension are both outside the accepted set
    #[error("{filename} is not a .txt or .pdf file")]
    UnsupportedFileType { filename: String },

    /// A single file is over the per-file ceiling
    #[error("{filename} is larger than {limit} bytes")]
    FileTooLarge { filename: String, limit: u64 },

    /// The request body as a whole is over the configured ceiling
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// Malformed request, unexpected field or unusable filename
    #[error("{message}")]
    BadRequest { message: String },

    /// Storage directory failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Body of every failed response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`
    pub ok: bool,
    pub error: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::UnsupportedFileType { .. } | Error::FileTooLarge { .. } | Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Storage(storage_err) => match storage_err {
                StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
                StorageError::InvalidName { .. } => StatusCode::BAD_REQUEST,
                StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field of the response body
    pub fn user_message(&self) -> String {
        match self {
            Error::UnsupportedFileType { .. } => UNSUPPORTED_TYPE_MESSAGE.to_string(),
            Error::FileTooLarge { .. } => "File too large".to_string(),
            Error::PayloadTooLarge { message } | Error::BadRequest { message } => message.clone(),
            Error::Storage(storage_err) => match storage_err {
                StorageError::NotFound { name } => format!("File {name} not found"),
                StorageError::InvalidName { name } => format!("Invalid filename: {name:?}"),
                StorageError::Io(e) => e.to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Storage(StorageError::Io(_)) | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::UnsupportedFileType { .. } | Error::FileTooLarge { .. } | Error::PayloadTooLarge { .. } => {
                tracing::info!("Upload rejected: {}", self);
            }
            Error::BadRequest { .. } | Error::Storage(_) => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = ErrorBody {
            ok: false,
            error: self.user_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;
