use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::response::{IntoResponse, Response};

/// Everything that can go wrong while storing, serving, or deleting a file.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request did not carry a usable filename or field.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported file extension: {filename}")]
    UnsupportedExtension { filename: String },

    #[error("unsupported content type for {filename}")]
    UnsupportedContentType { filename: String },

    /// The stream exceeded the configured cap. The partial file is gone.
    #[error("file too large, limit is {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// A resolved path would leave the storage root.
    #[error("invalid destination path")]
    InvalidDestination,

    #[error("file not found")]
    NotFound,

    /// The client's byte stream broke off before the end.
    #[error("upload stream interrupted: {0}")]
    Incomplete(#[source] std::io::Error),

    /// Malformed `multipart/form-data` body.
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),

    #[error("no file uploaded")]
    MissingFile,

    /// A non-file form field failed validation.
    #[error("{0}")]
    InvalidForm(String),

    /// The underlying file system failed. Never retried.
    #[error("storage failure: {0}")]
    Storage(#[from] std::io::Error),
}

impl UploadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidInput(_)
            | Self::UnsupportedExtension { .. }
            | Self::UnsupportedContentType { .. }
            | Self::InvalidDestination
            | Self::Incomplete(_)
            | Self::Multipart(_)
            | Self::MissingFile
            | Self::InvalidForm(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show a client. Storage details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) => "storage operation failed".to_owned(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match &self {
            Self::Storage(_) => tracing::error!("upload storage error: {self}"),
            Self::InvalidDestination => tracing::warn!("rejected path outside storage root"),
            _ => tracing::debug!("upload rejected: {self}"),
        }

        Response::builder()
            .status(self.status_code())
            .json(&ErrorBody { detail: self.user_message() })
    }
}
