//! The application's route table.

mod files;

use std::sync::Arc;

use http::Method;

use crate::health;
use crate::router::Router;
use crate::upload::Uploads;

pub use files::{delete_file, form_page, get_file, upload_multiple, upload_single, upload_with_meta};

/// Mount point of every upload route, and the prefix of record URLs.
pub const UPLOAD_PREFIX: &str = "/upload";

/// Builds the full router around a shared [`Uploads`] service.
///
/// ```text
/// POST   /upload/single
/// POST   /upload/multiple
/// POST   /upload/with-meta
/// GET    /upload/files/{stored_name}
/// DELETE /upload/files/{stored_name}
/// GET    /upload/form
/// GET    /healthz
/// GET    /readyz
/// ```
pub fn app(uploads: Arc<Uploads>) -> Router {
    let files = format!("{UPLOAD_PREFIX}/files/{{stored_name}}");

    Router::new()
        .on(Method::POST,   &format!("{UPLOAD_PREFIX}/single"),    upload_single)
        .on(Method::POST,   &format!("{UPLOAD_PREFIX}/multiple"),  upload_multiple)
        .on(Method::POST,   &format!("{UPLOAD_PREFIX}/with-meta"), upload_with_meta)
        .on(Method::GET,    &files,                                get_file)
        .on(Method::DELETE, &files,                                delete_file)
        .on(Method::GET,    &format!("{UPLOAD_PREFIX}/form"),      form_page)
        .on(Method::GET,    "/healthz",                            health::liveness)
        .on(Method::GET,    "/readyz",                             health::readiness)
        .extension(uploads)
}
