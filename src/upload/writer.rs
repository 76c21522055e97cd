//! Size-bounded streaming writes.
//!
//! The destination is truncated, then filled one buffer at a time while a
//! running total is kept. Every exit other than a clean end of stream
//! removes the partial file, including the future being dropped mid-copy.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use super::error::UploadError;

/// Streams `reader` into `dest`, failing once more than `max_bytes` arrive.
///
/// Returns the number of bytes persisted. `chunk_size` only bounds the read
/// buffer; the outcome does not depend on it.
pub async fn write_bounded<R>(
    reader: R,
    dest: &Path,
    max_bytes: u64,
    chunk_size: usize,
) -> Result<u64, UploadError>
where
    R: AsyncRead,
{
    tokio::pin!(reader);
    // Created inline, not on the blocking pool, so no await separates the
    // file appearing from the guard being armed.
    let mut file = File::from_std(std::fs::File::create(dest)?);
    let guard = PartialFile::new(dest);

    match copy_bounded(&mut reader, &mut file, max_bytes, chunk_size).await {
        Ok(total) => {
            guard.keep();
            Ok(total)
        }
        Err(e) => {
            drop(file);
            guard.discard().await;
            Err(e)
        }
    }
}

async fn copy_bounded<R>(
    reader: &mut R,
    file: &mut File,
    max_bytes: u64,
    chunk_size: usize,
) -> Result<u64, UploadError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total: u64 = 0;

    loop {
        let n = reader.read(&mut buf).await.map_err(UploadError::Incomplete)?;
        if n == 0 {
            break;
        }

        total += n as u64;
        if total > max_bytes {
            return Err(UploadError::PayloadTooLarge { limit: max_bytes });
        }

        file.write_all(&buf[..n]).await?;
    }

    file.flush().await?;
    Ok(total)
}

/// Owns a file that is not yet a finished upload.
///
/// Dropping it removes the file; [`keep`](Self::keep) disarms it.
struct PartialFile {
    path: Option<PathBuf>,
}

impl PartialFile {
    fn new(path: &Path) -> Self {
        Self { path: Some(path.to_path_buf()) }
    }

    fn keep(mut self) {
        self.path = None;
    }

    /// Removes the file now. Failures are logged, never returned: the caller
    /// is already reporting the error that caused the abort.
    async fn discard(mut self) {
        if let Some(path) = self.path.take() {
            report_cleanup(&path, tokio::fs::remove_file(&path).await);
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        // Only reached when the upload future was cancelled mid-stream.
        if let Some(path) = self.path.take() {
            tracing::debug!(path = %path.display(), "upload cancelled, removing partial file");
            report_cleanup(&path, std::fs::remove_file(&path));
        }
    }
}

fn report_cleanup(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial upload"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "failed to remove partial upload: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use tokio_util::io::StreamReader;

    use super::*;

    const CHUNK_SIZES: [usize; 3] = [1, 7, 1024 * 1024];

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn exact_limit_is_accepted_for_any_chunk_size() {
        let dir = tempfile::tempdir().unwrap();
        let data = payload(100);

        for chunk in CHUNK_SIZES {
            let dest = dir.path().join(format!("exact_{chunk}.bin"));
            let total = write_bounded(&data[..], &dest, 100, chunk).await.unwrap();
            assert_eq!(total, 100);
            assert_eq!(std::fs::read(&dest).unwrap(), data);
        }
    }

    #[tokio::test]
    async fn one_byte_over_is_rejected_and_removed_for_any_chunk_size() {
        let dir = tempfile::tempdir().unwrap();
        let data = payload(101);

        for chunk in CHUNK_SIZES {
            let dest = dir.path().join(format!("over_{chunk}.bin"));
            let err = write_bounded(&data[..], &dest, 100, chunk).await.unwrap_err();
            assert!(matches!(err, UploadError::PayloadTooLarge { limit: 100 }), "{err}");
            assert!(!dest.exists(), "partial file left for chunk size {chunk}");
        }
    }

    #[tokio::test]
    async fn limit_on_chunk_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("boundary.bin");

        // 14 bytes with 7-byte chunks: the limit falls exactly on a boundary.
        let total = write_bounded(&payload(14)[..], &dest, 14, 7).await.unwrap();
        assert_eq!(total, 14);

        let err = write_bounded(&payload(15)[..], &dest, 14, 7).await.unwrap_err();
        assert!(matches!(err, UploadError::PayloadTooLarge { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn dropped_after_first_poll_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("first_poll.bin");
        let (tx, rx) = tokio::io::duplex(64);

        let mut upload = Box::pin(write_bounded(rx, &dest, 1024, 4));
        assert!(futures_util::poll!(&mut upload).is_pending());
        drop(upload);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!dest.exists());
        drop(tx);
    }

    #[tokio::test]
    async fn unwritable_destination_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing_dir").join("file.bin");

        let err = write_bounded(&b"data"[..], &dest, 1024, 4).await.unwrap_err();
        assert!(matches!(err, UploadError::Storage(_)), "{err}");
        assert!(!dest.exists());
        assert!(!dir.path().join("missing_dir").exists());
    }

    #[tokio::test]
    async fn existing_destination_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("reused.bin");
        std::fs::write(&dest, b"stale content that is longer").unwrap();

        let total = write_bounded(&b"new"[..], &dest, 100, 4).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn empty_stream_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("empty.bin");
        assert_eq!(write_bounded(&b""[..], &dest, 10, 4).await.unwrap(), 0);
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn broken_stream_is_incomplete_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("broken.bin");
        let stream = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"first part")),
            Err(std::io::Error::new(ErrorKind::ConnectionReset, "client went away")),
        ]);

        let err = write_bounded(StreamReader::new(stream), &dest, 1024, 4).await.unwrap_err();
        assert!(matches!(err, UploadError::Incomplete(_)), "{err}");
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn cancellation_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("cancelled.bin");

        // The sender stays open, so the writer blocks after the first bytes.
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"some bytes").await.unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            write_bounded(rx, &dest, 1024, 4),
        )
        .await;

        assert!(outcome.is_err(), "writer should still be waiting for input");
        assert!(!dest.exists());
        drop(tx);
    }
}
