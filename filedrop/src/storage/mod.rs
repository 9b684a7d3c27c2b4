//! The storage directory: a single flat directory of uploaded files keyed by filename.
//!
//! There is no index. Whatever `read_dir` returns is the list of stored files, and writing a
//! name that already exists replaces the previous content (last write wins).

pub mod errors;

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub use errors::{Result, StorageError};

/// A file that has been written to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
}

/// Trait for upload storage backends
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write `content` under `name`, replacing any previous file with that name
    async fn put(&self, name: &str, content: &[u8]) -> Result<StoredFile>;

    /// Read back the full content stored under `name`
    async fn get(&self, name: &str) -> Result<Vec<u8>>;

    /// Names of every entry currently in the store, in enumeration order
    async fn list(&self) -> Result<Vec<String>>;
}

/// Local filesystem backend rooted at one directory
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    base_path: PathBuf,
}

impl LocalFileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    /// Create the directory (and parents) if it does not exist yet
    pub async fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(base_path);
        fs::create_dir_all(&store.base_path).await?;
        tracing::info!(path = %store.base_path.display(), "Storage directory ready");
        Ok(store)
    }

    /// Resolve `name` to a path that is a direct child of the base directory.
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        if !is_plain_filename(name) {
            return Err(StorageError::InvalidName { name: name.to_string() });
        }
        Ok(self.base_path.join(name))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, name: &str, content: &[u8]) -> Result<StoredFile> {
        let full_path = self.resolve(name)?;

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;

        tracing::debug!(path = %full_path.display(), size = content.len(), "Stored file");

        Ok(StoredFile {
            name: name.to_string(),
            size: content.len() as u64,
        })
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        let full_path = match self.resolve(name) {
            Ok(path) => path,
            // Anything that cannot name a stored file simply does not exist
            Err(StorageError::InvalidName { name }) => return Err(StorageError::NotFound { name }),
            Err(e) => return Err(e),
        };

        match fs::read(&full_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound { name: name.to_string() }),
            Err(e) => {
                // Directories share the namespace with files but are not servable
                if fs::metadata(&full_path).await.map(|m| m.is_dir()).unwrap_or(false) {
                    return Err(StorageError::NotFound { name: name.to_string() });
                }
                Err(e.into())
            }
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.base_path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

/// True when `name` is a single normal path component: no separators, not `.`/`..`, not empty.
pub fn is_plain_filename(name: &str) -> bool {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains('\0') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}

/// Strip any directory prefix a client attached to an upload's filename.
///
/// Browsers send bare names, but some clients send full paths with either separator.
pub fn client_basename(raw: &str) -> &str {
    raw.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_store_lifecycle() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(temp_dir.path()).await.unwrap();

        let stored = store.put("notes.txt", b"hello").await.unwrap();
        assert_eq!(
            stored,
            StoredFile {
                name: "notes.txt".to_string(),
                size: 5
            }
        );

        assert_eq!(store.get("notes.txt").await.unwrap(), b"hello");
        assert_eq!(store.list().await.unwrap(), vec!["notes.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(temp_dir.path()).await.unwrap();

        store.put("report.pdf", b"first version, longer").await.unwrap();
        store.put("report.pdf", b"second").await.unwrap();

        assert_eq!(store.get("report.pdf").await.unwrap(), b"second");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_creates_missing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("a").join("uploads");

        let store = LocalFileStore::open(&nested).await.unwrap();

        assert!(nested.is_dir());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_file_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(temp_dir.path()).await.unwrap();

        let result = store.get("nope.txt").await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_get_rejects_traversal_as_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store_dir = temp_dir.path().join("uploads");
        let store = LocalFileStore::open(&store_dir).await.unwrap();
        std::fs::write(temp_dir.path().join("secret.txt"), b"outside").unwrap();

        for name in ["../secret.txt", "..", ".", "", "sub/../../secret.txt", "..\\secret.txt"] {
            let result = store.get(name).await;
            assert!(matches!(result, Err(StorageError::NotFound { .. })), "{name:?} should not resolve");
        }
    }

    #[tokio::test]
    async fn test_get_directory_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(temp_dir.path()).await.unwrap();
        std::fs::create_dir(temp_dir.path().join("nested")).unwrap();

        let result = store.get("nested").await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_put_rejects_invalid_names() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(temp_dir.path()).await.unwrap();

        let result = store.put("../escape.txt", b"x").await;
        assert!(matches!(result, Err(StorageError::InvalidName { .. })));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_fails_when_directory_is_gone() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(temp_dir.path().join("never-created"));

        let result = store.list().await;
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[test]
    fn test_client_basename() {
        assert_eq!(client_basename("notes.txt"), "notes.txt");
        assert_eq!(client_basename("/home/me/notes.txt"), "notes.txt");
        assert_eq!(client_basename("C:\\Users\\me\\report.pdf"), "report.pdf");
        assert_eq!(client_basename("dir/"), "");
    }

    #[test]
    fn test_is_plain_filename() {
        assert!(is_plain_filename("notes.txt"));
        assert!(is_plain_filename("my report (final).pdf"));
        assert!(is_plain_filename(".hidden.txt"));
        assert!(!is_plain_filename(""));
        assert!(!is_plain_filename("."));
        assert!(!is_plain_filename(".."));
        assert!(!is_plain_filename("a/b.txt"));
        assert!(!is_plain_filename("a\\b.txt"));
    }
}
