//! Extension and MIME allow-lists.
//!
//! A file passes only if its extension is allow-listed AND its effective
//! content type is: the declared type when that is allow-listed, otherwise
//! the type guessed from the extension.

use std::collections::BTreeSet;

use super::error::UploadError;
use super::sanitize::split_extension;

/// Pair of allow-lists applied to every upload.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    extensions: BTreeSet<String>,
    mime_types: BTreeSet<String>,
}

impl UploadPolicy {
    /// Extensions may be given with or without the leading dot and in any
    /// case. MIME types are compared on their lower-cased essence.
    pub fn new<E, M>(extensions: E, mime_types: M) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.as_ref().trim().to_ascii_lowercase();
                if ext.starts_with('.') { ext } else { format!(".{ext}") }
            })
            .collect();
        let mime_types = mime_types
            .into_iter()
            .filter_map(|mime| essence(mime.as_ref()))
            .collect();
        Self { extensions, mime_types }
    }

    /// Checks a sanitized filename and the client's declared type.
    ///
    /// Returns the content type to record for the file.
    pub fn check(&self, filename: &str, declared: Option<&str>) -> Result<String, UploadError> {
        let (_, ext) = split_extension(filename);
        if !self.extensions.contains(&ext.to_ascii_lowercase()) {
            return Err(UploadError::UnsupportedExtension { filename: filename.to_owned() });
        }

        if let Some(declared) = declared.and_then(essence) {
            if self.mime_types.contains(&declared) {
                return Ok(declared);
            }
        }

        mime_guess::from_path(filename)
            .iter_raw()
            .find(|guess| self.mime_types.contains(*guess))
            .map(str::to_owned)
            .ok_or_else(|| UploadError::UnsupportedContentType { filename: filename.to_owned() })
    }
}

/// `"Image/PNG; charset=x"` → `"image/png"`. Blank input yields `None`.
fn essence(mime: &str) -> Option<String> {
    let essence = mime.split(';').next().unwrap_or("").trim();
    (!essence.is_empty()).then(|| essence.to_ascii_lowercase())
}

/// Content type for serving a stored file, from its extension alone.
pub(crate) fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_owned()
}
