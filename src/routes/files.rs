//! `/upload/*` handlers.
//!
//! Multipart parsing is delegated to `multer`; each file field is handed to
//! [`Uploads::upload`] as a stream, never buffered.

use std::sync::Arc;

use futures_util::TryStreamExt;
use http::StatusCode;
use http_body_util::BodyExt;
use multer::{Constraints, Field, Multipart, SizeLimit};
use tokio_util::io::{ReaderStream, StreamReader};

use crate::request::Request;
use crate::response::{Json, Response};
use crate::upload::{StoredFile, StoredFiles, UploadError, Uploads};

/// Cap on the non-file form fields of `/upload/with-meta`.
const TEXT_FIELD_LIMIT: u64 = 4 * 1024;
const TITLE_MAX_CHARS: usize = 80;
const DESCRIPTION_MAX_CHARS: usize = 300;

/// `POST /upload/single`: the `file` field, stored → `201 Created`.
pub async fn upload_single(req: Request) -> Result<(StatusCode, Json<StoredFile>), UploadError> {
    let (uploads, mut multipart) = open_multipart(req)?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let record = store_field(&uploads, field).await?;
            return Ok((StatusCode::CREATED, Json(record)));
        }
    }

    Err(UploadError::MissingFile)
}

/// `POST /upload/multiple`: every `files` (or `file`) field.
///
/// All or nothing: if any file is rejected, the ones already stored by this
/// request are removed again.
pub async fn upload_multiple(req: Request) -> Result<Json<StoredFiles>, UploadError> {
    let (uploads, mut multipart) = open_multipart(req)?;
    let mut stored = Vec::new();

    let outcome = async {
        while let Some(field) = multipart.next_field().await? {
            if matches!(field.name(), Some("files" | "file")) {
                stored.push(store_field(&uploads, field).await?);
            }
        }
        Ok::<(), UploadError>(())
    }
    .await;

    if let Err(e) = outcome {
        uploads.discard(&stored).await;
        return Err(e);
    }
    if stored.is_empty() {
        return Err(UploadError::MissingFile);
    }

    Ok(Json(StoredFiles { files: stored }))
}

/// `POST /upload/with-meta`: `title`, optional `description`, and `file`.
///
/// The title must appear in the client's filename. Fields may arrive in any
/// order; when the title comes after the file, the stored file is removed
/// again if the form turns out invalid.
pub async fn upload_with_meta(req: Request) -> Result<Json<StoredFile>, UploadError> {
    let (uploads, mut multipart) = open_multipart(req)?;
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut stored: Option<StoredFile> = None;

    let outcome = async {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("title") => title = Some(field.text().await?),
                Some("description") => description = Some(field.text().await?),
                Some("file") if stored.is_none() => {
                    if let Some(title) = &title {
                        check_meta(title, description.as_deref(), field.file_name().unwrap_or(""))?;
                    }
                    stored = Some(store_field(&uploads, field).await?);
                }
                _ => {}
            }
        }
        Ok::<(), UploadError>(())
    }
    .await;

    let result = outcome.and_then(|()| {
        let record = stored.as_ref().ok_or(UploadError::MissingFile)?;
        let title = title.as_deref().ok_or_else(|| UploadError::InvalidForm("title is required".into()))?;
        check_meta(title, description.as_deref(), &record.original_filename)
    });

    match (result, stored) {
        (Ok(()), Some(record)) => Ok(Json(record)),
        (Ok(()), None) => Err(UploadError::MissingFile),
        (Err(e), stored) => {
            if let Some(record) = stored {
                uploads.discard(std::slice::from_ref(&record)).await;
            }
            Err(e)
        }
    }
}

/// `GET /upload/files/{stored_name}`: streams a stored file back.
pub async fn get_file(req: Request) -> Result<Response, UploadError> {
    let uploads = uploads(&req)?;
    let name = req.param("stored_name").unwrap_or_default().to_owned();

    let retrieved = uploads.retrieve(&name).await?;
    Ok(Response::builder()
        .header("content-length", &retrieved.size_bytes.to_string())
        .stream(&retrieved.content_type, ReaderStream::new(retrieved.file)))
}

/// `DELETE /upload/files/{stored_name}` → `204 No Content`.
pub async fn delete_file(req: Request) -> Result<StatusCode, UploadError> {
    let uploads = uploads(&req)?;
    let name = req.param("stored_name").unwrap_or_default().to_owned();

    uploads.delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /upload/form`: a browser page for trying the three upload routes.
pub async fn form_page(_req: Request) -> Response {
    Response::html(include_str!("form.html"))
}

fn uploads(req: &Request) -> Result<Arc<Uploads>, UploadError> {
    req.extension::<Arc<Uploads>>()
        .cloned()
        .ok_or_else(|| UploadError::Storage(std::io::Error::other("upload storage is not configured")))
}

fn open_multipart(req: Request) -> Result<(Arc<Uploads>, Multipart<'static>), UploadError> {
    let uploads = uploads(&req)?;
    let boundary = req
        .header("content-type")
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| UploadError::InvalidInput("expected a multipart/form-data body".into()))?;

    let constraints = Constraints::new().size_limit(
        SizeLimit::new()
            .for_field("title", TEXT_FIELD_LIMIT)
            .for_field("description", TEXT_FIELD_LIMIT),
    );
    let body = req.into_body().into_data_stream();

    Ok((uploads, Multipart::with_constraints(body, boundary, constraints)))
}

async fn store_field(uploads: &Uploads, field: Field<'static>) -> Result<StoredFile, UploadError> {
    let original = field.file_name().map(str::to_owned);
    let content_type = field.content_type().map(ToString::to_string);
    let reader = StreamReader::new(field.map_err(std::io::Error::other));

    uploads.upload(original.as_deref(), content_type.as_deref(), reader).await
}

fn check_meta(title: &str, description: Option<&str>, filename: &str) -> Result<(), UploadError> {
    let title_len = title.chars().count();
    if title_len == 0 || title_len > TITLE_MAX_CHARS {
        return Err(UploadError::InvalidForm(format!(
            "title must be 1 to {TITLE_MAX_CHARS} characters"
        )));
    }
    if description.is_some_and(|d| d.chars().count() > DESCRIPTION_MAX_CHARS) {
        return Err(UploadError::InvalidForm(format!(
            "description must be at most {DESCRIPTION_MAX_CHARS} characters"
        )));
    }
    if !filename.to_lowercase().contains(&title.to_lowercase()) {
        return Err(UploadError::InvalidForm("title should appear in filename".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_rules() {
        assert!(check_meta("Report", None, "annual-report.pdf").is_ok());
        assert!(check_meta("report", Some("q3 numbers"), "REPORT.pdf").is_ok());

        assert!(matches!(check_meta("", None, "a.pdf"), Err(UploadError::InvalidForm(_))));
        assert!(matches!(
            check_meta(&"x".repeat(81), None, "a.pdf"),
            Err(UploadError::InvalidForm(_))
        ));
        assert!(matches!(
            check_meta("a", Some(&"d".repeat(301)), "a.pdf"),
            Err(UploadError::InvalidForm(_))
        ));
        assert!(matches!(check_meta("invoice", None, "photo.png"), Err(UploadError::InvalidForm(_))));
    }
}
