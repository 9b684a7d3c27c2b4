//! HTTP client for a running filedrop server, plus the upload session used by the CLI.
//!
//! [`UploadSession`] walks the same lifecycle as the browser page:
//!
//! ```text
//! Idle ──select──► FilesSelected ──upload──► Uploading ──► Uploaded
//!   ▲                    ▲                       │
//!   └──remove last───────┴──── UploadFailed ◄────┘
//! ```
//!
//! Selecting files replaces the previous selection unless every picked file is refused, in which
//! case only warnings come back and nothing changes. A successful upload marks the
//! selected files as uploaded in place; a failed one keeps them so they can be retried as-is.

use crate::api::models::files::{FileListResponse, ManifestEntry, UploadResponse};
use crate::errors::ErrorBody;
use crate::filter::{TypePolicy, UNSUPPORTED_TYPE_MESSAGE};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error as ThisError;
use tracing::{debug, info, warn};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(ThisError, Debug)]
pub enum ClientError {
    #[error("No files selected")]
    NoFilesSelected,

    /// The server answered with an error envelope
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
}

/// A local file queued for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    /// Name sent to the server (the last path component)
    pub name: String,
    /// Type guessed from the extension, as a browser would declare it
    pub content_type: Option<String>,
    pub size: u64,
    /// Set once the server has confirmed this file
    pub uploaded: bool,
}

impl SelectedFile {
    async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let io_err = |source| ClientError::Io {
            path: path.to_path_buf(),
            source,
        };
        let metadata = tokio::fs::metadata(path).await.map_err(io_err)?;
        if !metadata.is_file() {
            return Err(io_err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file")));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| io_err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")))?;
        let content_type = mime_guess::from_path(path).first().map(|m| m.essence_str().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            content_type,
            size: metadata.len(),
            uploaded: false,
        })
    }
}

/// Thin wrapper over the HTTP API
#[derive(Debug, Clone)]
pub struct UploadClient {
    http: reqwest::Client,
    base_url: Url,
}

impl UploadClient {
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        // Already installed when running under the binary
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base_url })
    }

    /// Absolute download URL for a manifest entry
    pub fn download_url(&self, entry: &ManifestEntry) -> Result<Url, ClientError> {
        Ok(self.base_url.join(&entry.url)?)
    }

    /// Send every file in one multipart request under the `files` field
    pub async fn upload(&self, files: &[SelectedFile]) -> Result<Vec<ManifestEntry>, ClientError> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let content = tokio::fs::read(&file.path).await.map_err(|source| ClientError::Io {
                path: file.path.clone(),
                source,
            })?;
            let mut part = reqwest::multipart::Part::bytes(content).file_name(file.name.clone());
            if let Some(content_type) = &file.content_type {
                part = part.mime_str(content_type)?;
            }
            form = form.part("files", part);
        }

        let url = self.base_url.join("upload")?;
        debug!(%url, count = files.len(), "Sending upload request");
        let response = self.http.post(url).multipart(form).send().await?;
        let body: UploadResponse = Self::parse(response).await?;
        Ok(body.files)
    }

    /// Names of every file stored on the server
    pub async fn list(&self) -> Result<Vec<String>, ClientError> {
        let url = self.base_url.join("files")?;
        let response = self.http.get(url).send().await?;
        let body: FileListResponse = Self::parse(response).await?;
        Ok(body.files)
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response.text().await?;
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.error,
            Err(_) if text.trim().is_empty() => format!("Server returned {status}"),
            Err(_) => text,
        };
        Err(ClientError::Rejected { status, message })
    }
}

/// Where an [`UploadSession`] is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    FilesSelected,
    Uploading,
    Uploaded,
    UploadFailed { error: String },
}

/// Selection, upload and result bookkeeping for one user
#[derive(Debug)]
pub struct UploadSession {
    client: UploadClient,
    state: SessionState,
    selected: Vec<SelectedFile>,
    uploaded: Vec<ManifestEntry>,
    progress: u8,
}

impl UploadSession {
    pub fn new(client: UploadClient) -> Self {
        Self {
            client,
            state: SessionState::Idle,
            selected: Vec::new(),
            uploaded: Vec::new(),
            progress: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn selected(&self) -> &[SelectedFile] {
        &self.selected
    }

    pub fn uploaded(&self) -> &[ManifestEntry] {
        &self.uploaded
    }

    /// 0 until an upload succeeds, then 100
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn client(&self) -> &UploadClient {
        &self.client
    }

    /// Replace the selection with the acceptable files among `paths`.
    ///
    /// Returns one warning per skipped file. Clears the result of any previous upload, except
    /// when no file was acceptable: then the session is left exactly as it was.
    pub async fn select<I, P>(&mut self, paths: I) -> Result<Vec<String>, ClientError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut accepted = Vec::new();
        let mut warnings = Vec::new();

        for path in paths {
            let file = SelectedFile::from_path(path.as_ref()).await?;
            if TypePolicy::Permissive.allows(file.content_type.as_deref(), &file.name) {
                accepted.push(file);
            } else {
                let warning = format!("{} skipped: {}", file.name, UNSUPPORTED_TYPE_MESSAGE);
                warn!("{}", warning);
                warnings.push(warning);
            }
        }

        if accepted.is_empty() {
            return Ok(warnings);
        }

        self.selected = accepted;
        self.uploaded.clear();
        self.progress = 0;
        self.state = SessionState::FilesSelected;

        Ok(warnings)
    }

    /// Drop one file from the selection. Does nothing while an upload is running or once
    /// the selection has been uploaded.
    pub fn remove(&mut self, index: usize) -> Option<SelectedFile> {
        if matches!(self.state, SessionState::Uploading | SessionState::Uploaded) || index >= self.selected.len() {
            return None;
        }
        let removed = self.selected.remove(index);
        if self.selected.is_empty() {
            self.state = SessionState::Idle;
        }
        Some(removed)
    }

    /// Upload the current selection.
    ///
    /// On success the manifest replaces the previous result and every selected file is marked
    /// uploaded; on failure the selection stays untouched.
    pub async fn upload(&mut self) -> Result<&[ManifestEntry], ClientError> {
        if !self.selected.iter().any(|file| !file.uploaded) {
            return Err(ClientError::NoFilesSelected);
        }

        self.state = SessionState::Uploading;
        self.progress = 0;

        match self.client.upload(&self.selected).await {
            Ok(entries) => {
                info!(count = entries.len(), "Upload succeeded");
                self.uploaded = entries;
                for file in &mut self.selected {
                    file.uploaded = true;
                }
                self.progress = 100;
                self.state = SessionState::Uploaded;
                Ok(&self.uploaded)
            }
            Err(e) => {
                warn!("Upload failed: {}", e);
                self.progress = 0;
                self.state = SessionState::UploadFailed { error: e.to_string() };
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_config, spawn_test_server};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_select_filters_and_replaces() {
        let local = tempfile::tempdir().unwrap();
        let notes = write_file(local.path(), "notes.txt", b"hello");
        let photo = write_file(local.path(), "photo.png", b"\x89PNG");
        let report = write_file(local.path(), "REPORT.PDF", b"%PDF");

        let client = UploadClient::new("http://localhost:1".parse().unwrap()).unwrap();
        let mut session = UploadSession::new(client);
        assert_eq!(session.state(), &SessionState::Idle);

        let warnings = session.select([&notes, &photo]).await.unwrap();
        assert_eq!(warnings, vec!["photo.png skipped: Only .txt and .pdf files are allowed".to_string()]);
        assert_eq!(session.state(), &SessionState::FilesSelected);
        assert_eq!(session.selected().len(), 1);
        assert_eq!(session.selected()[0].content_type.as_deref(), Some("text/plain"));

        session.select([&report]).await.unwrap();
        assert_eq!(session.selected().len(), 1);
        assert_eq!(session.selected()[0].name, "REPORT.PDF");
        assert_eq!(session.selected()[0].size, 4);
    }

    #[tokio::test]
    async fn test_select_only_rejected_files_stays_idle() {
        let local = tempfile::tempdir().unwrap();
        let photo = write_file(local.path(), "photo.png", b"\x89PNG");

        let client = UploadClient::new("http://localhost:1".parse().unwrap()).unwrap();
        let mut session = UploadSession::new(client);

        let warnings = session.select([&photo]).await.unwrap();

        assert_eq!(warnings.len(), 1);
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[tokio::test]
    async fn test_fully_rejected_pick_keeps_previous_selection() {
        let local = tempfile::tempdir().unwrap();
        let notes = write_file(local.path(), "notes.txt", b"hello");
        let photo = write_file(local.path(), "photo.png", b"\x89PNG");

        let client = UploadClient::new("http://localhost:1".parse().unwrap()).unwrap();
        let mut session = UploadSession::new(client);
        session.select([&notes]).await.unwrap();

        let warnings = session.select([&photo]).await.unwrap();

        assert_eq!(warnings.len(), 1);
        assert_eq!(session.state(), &SessionState::FilesSelected);
        assert_eq!(session.selected().len(), 1);
        assert_eq!(session.selected()[0].name, "notes.txt");
    }

    #[tokio::test]
    async fn test_remove_last_file_returns_to_idle() {
        let local = tempfile::tempdir().unwrap();
        let a = write_file(local.path(), "a.txt", b"a");
        let b = write_file(local.path(), "b.txt", b"b");

        let client = UploadClient::new("http://localhost:1".parse().unwrap()).unwrap();
        let mut session = UploadSession::new(client);
        session.select([&a, &b]).await.unwrap();

        assert_eq!(session.remove(0).map(|f| f.name), Some("a.txt".to_string()));
        assert_eq!(session.state(), &SessionState::FilesSelected);
        assert!(session.remove(5).is_none());
        assert_eq!(session.remove(0).map(|f| f.name), Some("b.txt".to_string()));
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[tokio::test]
    async fn test_upload_without_selection() {
        let client = UploadClient::new("http://localhost:1".parse().unwrap()).unwrap();
        let mut session = UploadSession::new(client);

        let result = session.upload().await;

        assert!(matches!(result, Err(ClientError::NoFilesSelected)));
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[tokio::test]
    async fn test_select_missing_path_is_io_error() {
        let local = tempfile::tempdir().unwrap();
        let client = UploadClient::new("http://localhost:1".parse().unwrap()).unwrap();
        let mut session = UploadSession::new(client);

        let result = session.select([local.path().join("missing.txt")]).await;

        assert!(matches!(result, Err(ClientError::Io { .. })));
    }

    #[test_log::test(tokio::test)]
    async fn test_upload_against_running_server() {
        let storage = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        let (url, _shutdown) = spawn_test_server(create_test_config(storage.path())).await;
        let notes = write_file(local.path(), "notes.txt", b"hello");
        let report = write_file(local.path(), "q3 report.pdf", b"%PDF-1.4");

        let mut session = UploadSession::new(UploadClient::new(url.clone()).unwrap());
        session.select([&notes, &report]).await.unwrap();
        let manifest = session.upload().await.unwrap().to_vec();

        assert_eq!(session.state(), &SessionState::Uploaded);
        assert_eq!(session.progress(), 100);
        assert_eq!(session.selected().len(), 2);
        assert!(session.selected().iter().all(|file| file.uploaded));
        assert!(session.remove(0).is_none());
        assert!(matches!(session.upload().await, Err(ClientError::NoFilesSelected)));
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest[0].filename, "notes.txt");
        assert_eq!(manifest[0].size, 5);
        assert_eq!(manifest[1].url, "/files/q3%20report.pdf");

        let download = session.client().download_url(&manifest[1]).unwrap();
        assert_eq!(download.as_str(), format!("{url}files/q3%20report.pdf"));
        let fetched = reqwest::get(download).await.unwrap().bytes().await.unwrap();
        assert_eq!(fetched.as_ref(), b"%PDF-1.4");

        let mut listed = session.client().list().await.unwrap();
        listed.sort();
        assert_eq!(listed, vec!["notes.txt".to_string(), "q3 report.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_server_rejection_keeps_selection() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error": "File too large"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let local = tempfile::tempdir().unwrap();
        let notes = write_file(local.path(), "notes.txt", b"hello");

        let mut session = UploadSession::new(UploadClient::new(mock_server.uri().parse().unwrap()).unwrap());
        session.select([&notes]).await.unwrap();
        let result = session.upload().await;

        match result {
            Err(ClientError::Rejected { status, message }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "File too large");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(
            session.state(),
            &SessionState::UploadFailed {
                error: "File too large".to_string()
            }
        );
        assert_eq!(session.selected().len(), 1);
        assert!(!session.selected()[0].uploaded);
        assert_eq!(session.progress(), 0);
    }

    #[tokio::test]
    async fn test_non_json_error_uses_body_text() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&mock_server)
            .await;

        let client = UploadClient::new(mock_server.uri().parse().unwrap()).unwrap();
        let result = client.list().await;

        match result {
            Err(ClientError::Rejected { status, message }) => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
