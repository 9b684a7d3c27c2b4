use crate::storage::StoredFile;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Path prefix under which stored files are served
pub const FILES_PREFIX: &str = "/files";

/// Characters escaped in a file URL: everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`,
/// the same set browsers leave alone in `encodeURIComponent`.
const FILENAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// URL path at which a stored file can be fetched
pub fn file_url(filename: &str) -> String {
    format!("{FILES_PREFIX}/{}", utf8_percent_encode(filename, FILENAME_ESCAPE))
}

/// One accepted file in an upload response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ManifestEntry {
    /// Name the file was stored under
    pub filename: String,
    /// Stored size in bytes
    pub size: u64,
    /// Where to download it, e.g. `/files/my%20notes.txt`
    pub url: String,
}

impl From<&StoredFile> for ManifestEntry {
    fn from(stored: &StoredFile) -> Self {
        Self {
            filename: stored.name.clone(),
            size: stored.size,
            url: file_url(&stored.name),
        }
    }
}

/// Successful upload response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Always `true`
    pub ok: bool,
    pub files: Vec<ManifestEntry>,
}

/// Directory listing response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileListResponse {
    /// Always `true`
    pub ok: bool,
    /// File names in directory enumeration order (not sorted)
    pub files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_url_plain_name() {
        assert_eq!(file_url("notes.txt"), "/files/notes.txt");
    }

    #[test]
    fn test_file_url_matches_encode_uri_component() {
        assert_eq!(file_url("my report.pdf"), "/files/my%20report.pdf");
        assert_eq!(file_url("a+b&c=d?.txt"), "/files/a%2Bb%26c%3Dd%3F.txt");
        assert_eq!(file_url("draft (v2)!.txt"), "/files/draft%20(v2)!.txt");
        assert_eq!(file_url("100%.txt"), "/files/100%25.txt");
        assert_eq!(file_url("résumé.pdf"), "/files/r%C3%A9sum%C3%A9.pdf");
    }

    #[test]
    fn test_manifest_entry_from_stored_file() {
        let stored = StoredFile {
            name: "q3 report.pdf".to_string(),
            size: 42,
        };

        let entry = ManifestEntry::from(&stored);

        assert_eq!(entry.filename, "q3 report.pdf");
        assert_eq!(entry.size, 42);
        assert_eq!(entry.url, "/files/q3%20report.pdf");
    }
}
