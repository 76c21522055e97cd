//! Unified infrastructure error type.

/// The error type returned by stowage's server-level operations.
///
/// Upload failures (413, 404, etc.) are expressed as
/// [`UploadError`](crate::upload::UploadError) values and rendered as HTTP
/// responses, not as `Error`s. This type surfaces infrastructure failures:
/// binding to a port, accepting a connection, preparing the storage root.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket-level failure (bind, accept).
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The storage root could not be prepared at startup.
    #[error("storage root: {0}")]
    Storage(#[from] crate::upload::UploadError),
}
