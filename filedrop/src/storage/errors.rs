use thiserror::Error;

/// Errors raised by a [`FileStore`](super::FileStore) backend
#[derive(Error, Debug)]
pub enum StorageError {
    /// No stored file under the given name
    #[error("File {name} not found")]
    NotFound { name: String },

    /// The name cannot address a file directly inside the storage directory
    #[error("Invalid filename: {name:?}")]
    InvalidName { name: String },

    /// Underlying filesystem failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;
