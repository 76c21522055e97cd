//! Client filename → safe basename.

use uuid::Uuid;

/// Reduces an untrusted filename to a basename over `[A-Za-z0-9._-]`.
///
/// Only the last path segment survives (`/` and `\` both count as
/// separators). Surrounding whitespace is trimmed, inner whitespace becomes
/// `_`, everything else outside the allow-set is dropped. An empty result is
/// replaced by `file_{random hex}`.
///
/// ```rust
/// use stowage::upload::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd.png"), "passwd.png");
/// assert_eq!(sanitize_filename("  my report (final).pdf "), "my_report_final.pdf");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .last()
        .unwrap_or("");

    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    if cleaned.is_empty() {
        format!("file_{}", Uuid::new_v4().simple())
    } else {
        cleaned
    }
}

/// Splits at the last dot into `(stem, extension)`, the extension keeping its
/// dot. A leading dot (`.env`) or trailing dot (`a.`) does not start one.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => name.split_at(idx),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_safe(name: &str) -> bool {
        !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }

    #[test]
    fn strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("/abs/path/photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename(r"C:\Users\me\scan.pdf"), "scan.pdf");
        assert_eq!(sanitize_filename("dir/sub/"), "sub");
    }

    #[test]
    fn whitespace_and_disallowed_characters() {
        assert_eq!(sanitize_filename("  holiday photo.png  "), "holiday_photo.png");
        assert_eq!(sanitize_filename("test<script>.png"), "testscript.png");
        assert_eq!(sanitize_filename("tab\there.pdf"), "tab_here.pdf");
        assert_eq!(sanitize_filename("nul\0byte.png"), "nulbyte.png");
        assert_eq!(sanitize_filename("résumé.pdf"), "rsum.pdf");
    }

    #[test]
    fn empty_results_are_synthesized() {
        for input in ["", "   ", "////", "???", "日本語"] {
            let name = sanitize_filename(input);
            assert!(name.starts_with("file_"), "{input:?} -> {name}");
            assert_eq!(name.len(), "file_".len() + 32);
            assert!(is_safe(&name));
        }
        assert_ne!(sanitize_filename(""), sanitize_filename(""));
    }

    #[test]
    fn output_is_always_safe_and_idempotent() {
        let inputs = [
            "report.pdf",
            "../../etc/passwd",
            "a b\tc\nd.png",
            "..",
            ".hidden",
            "weird;rm -rf /;.jpg",
            "\u{202e}gnp.exe",
            "x/y\\z.jpeg",
        ];
        for input in inputs {
            let once = sanitize_filename(input);
            assert!(is_safe(&once), "{input:?} -> {once:?}");
            assert_eq!(sanitize_filename(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn extension_split() {
        assert_eq!(split_extension("report.pdf"), ("report", ".pdf"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("noext"), ("noext", ""));
        assert_eq!(split_extension(".env"), (".env", ""));
        assert_eq!(split_extension("trailing."), ("trailing.", ""));
    }
}
