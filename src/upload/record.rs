use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs::File;

/// What the caller learns about a successfully stored upload.
///
/// Only produced after the whole stream is on disk. The file system is the
/// only index; deleting the file invalidates the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Stored name (sanitized + unique), also the retrieval key.
    pub filename: String,
    /// Name the client sent, untouched.
    pub original_filename: String,
    pub content_type: String,
    /// Bytes actually persisted.
    pub size_bytes: u64,
    /// Download URL.
    pub url: String,
}

/// Response body of a multi-file upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFiles {
    pub files: Vec<StoredFile>,
}

/// An opened stored file, ready to be streamed back.
#[derive(Debug)]
pub struct RetrievedFile {
    pub path: PathBuf,
    /// Guessed from the extension, `application/octet-stream` otherwise.
    pub content_type: String,
    pub size_bytes: u64,
    pub file: File,
}
