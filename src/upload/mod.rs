//! Bounded file uploads with retrieval and deletion.
//!
//! An upload goes through four steps, and nothing touches the disk until the
//! first three pass:
//!
//! 1. [`sanitize_filename`]: the client's name becomes a safe basename.
//! 2. [`UploadPolicy`]: extension and effective MIME type must both be
//!    allow-listed.
//! 3. [`StorageRoot`]: a unique `{stem}__{token}{ext}` name, verified to sit
//!    inside the storage root.
//! 4. [`write_bounded`]: the stream is copied in chunks under a byte cap. On
//!    overflow, broken input, write failure, or cancellation the partial file
//!    is removed.
//!
//! Retrieval and deletion re-sanitize the requested name and go through the
//! same containment check before any I/O on the target.
//!
//! ```rust,no_run
//! use stowage::config::UploadConfig;
//! use stowage::upload::Uploads;
//!
//! # async fn example() -> Result<(), stowage::upload::UploadError> {
//! let uploads = Uploads::open(UploadConfig::new("/tmp/uploads")).await?;
//!
//! let record = uploads
//!     .upload(Some("report.pdf"), Some("application/pdf"), &b"%PDF-1.7 ..."[..])
//!     .await?;
//!
//! let retrieved = uploads.retrieve(&record.filename).await?;
//! assert_eq!(retrieved.size_bytes, record.size_bytes);
//!
//! uploads.delete(&record.filename).await?;
//! # Ok(())
//! # }
//! ```

mod destination;
mod error;
mod policy;
mod record;
mod sanitize;
mod writer;

use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncRead;
use tracing::info;

use crate::config::UploadConfig;

pub use destination::{Destination, StorageRoot};
pub use error::UploadError;
pub use policy::UploadPolicy;
pub use record::{RetrievedFile, StoredFile, StoredFiles};
pub use sanitize::sanitize_filename;
pub use writer::write_bounded;

/// Name recorded when the client sends none.
pub const DEFAULT_FILENAME: &str = "upload.bin";

/// The upload service: one storage root plus the rules for writing into it.
///
/// Holds no mutable state, so one instance (behind an `Arc`) serves every
/// request concurrently.
#[derive(Debug)]
pub struct Uploads {
    root: StorageRoot,
    policy: UploadPolicy,
    max_file_size: u64,
    chunk_size: usize,
    url_prefix: String,
}

impl Uploads {
    /// Prepares the storage root and freezes the configuration.
    #[tracing::instrument(skip_all, fields(root = %config.root.display()))]
    pub async fn open(config: UploadConfig) -> Result<Self, UploadError> {
        let root = StorageRoot::open(&config.root).await?;
        let policy = UploadPolicy::new(&config.allowed_extensions, &config.allowed_mime_types);

        info!(
            path = %root.path().display(),
            max_file_size = config.max_file_size,
            "upload storage ready"
        );

        Ok(Self {
            root,
            policy,
            max_file_size: config.max_file_size,
            chunk_size: config.chunk_size,
            url_prefix: config.url_prefix.trim_end_matches('/').to_owned(),
        })
    }

    /// Canonical storage root.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Validates, names, and streams one file to disk.
    ///
    /// `original` and `content_type` come from the client and are treated as
    /// untrusted. No record is returned unless every byte was persisted.
    #[tracing::instrument(skip(self, reader))]
    pub async fn upload<R>(
        &self,
        original: Option<&str>,
        content_type: Option<&str>,
        reader: R,
    ) -> Result<StoredFile, UploadError>
    where
        R: AsyncRead,
    {
        let original = original
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILENAME);
        let safe = sanitize_filename(original);
        let content_type = self.policy.check(&safe, content_type)?;
        let dest = self.root.unique_destination(&safe)?;

        let size_bytes = write_bounded(reader, &dest.path, self.max_file_size, self.chunk_size).await?;

        info!(stored = %dest.name, size_bytes, %content_type, "stored upload");

        Ok(StoredFile {
            url: format!("{}/files/{}", self.url_prefix, dest.name),
            filename: dest.name,
            original_filename: original.to_owned(),
            content_type,
            size_bytes,
        })
    }

    /// Opens a stored file for streaming back to the client.
    #[tracing::instrument(skip(self))]
    pub async fn retrieve(&self, stored_name: &str) -> Result<RetrievedFile, UploadError> {
        let (path, meta) = self.locate(stored_name).await?;
        let file = tokio::fs::File::open(&path).await.map_err(not_found_or_storage)?;
        let content_type = policy::guess_content_type(&sanitize_filename(stored_name));

        Ok(RetrievedFile { path, content_type, size_bytes: meta.len(), file })
    }

    /// Removes a stored file. Removal failures are surfaced, never swallowed.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, stored_name: &str) -> Result<(), UploadError> {
        let (path, _) = self.locate(stored_name).await?;
        tokio::fs::remove_file(&path).await.map_err(not_found_or_storage)?;

        info!(path = %path.display(), "deleted upload");
        Ok(())
    }

    /// Best-effort removal of files stored earlier in a request that failed
    /// later on. Errors are logged only.
    pub async fn discard(&self, records: &[StoredFile]) {
        for record in records {
            if let Err(e) = self.delete(&record.filename).await {
                tracing::warn!(stored = %record.filename, "failed to roll back upload: {e}");
            }
        }
    }

    /// Sanitize, contain, and require a regular file. A symlink is returned
    /// as the link itself.
    async fn locate(&self, stored_name: &str) -> Result<(PathBuf, Metadata), UploadError> {
        let safe = sanitize_filename(stored_name);
        let path = self.root.resolve_existing(&safe).await?;
        let meta = tokio::fs::metadata(&path).await.map_err(not_found_or_storage)?;
        if !meta.is_file() {
            return Err(UploadError::NotFound);
        }
        Ok((path, meta))
    }
}

fn not_found_or_storage(e: std::io::Error) -> UploadError {
    if e.kind() == ErrorKind::NotFound {
        UploadError::NotFound
    } else {
        UploadError::Storage(e)
    }
}
