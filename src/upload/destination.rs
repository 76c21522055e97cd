//! Storage root, unique naming, and the containment check.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use super::error::UploadError;
use super::sanitize::split_extension;

/// The canonicalized directory every stored file lives in.
#[derive(Debug, Clone)]
pub struct StorageRoot {
    path: PathBuf,
}

impl StorageRoot {
    /// Creates the directory if needed and canonicalizes it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        tokio::fs::create_dir_all(path).await?;
        let path = tokio::fs::canonicalize(path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh destination for `sanitized`: `{stem}__{token}{ext}`.
    pub fn unique_destination(&self, sanitized: &str) -> Result<Destination, UploadError> {
        let (stem, ext) = split_extension(sanitized);
        let name = format!("{stem}__{}{ext}", Uuid::new_v4().simple());
        let path = self.join_contained(&name)?;
        Ok(Destination { name, path })
    }

    /// Resolves a stored name to an existing entry inside the root.
    ///
    /// The returned path is the entry itself, not its symlink target, so
    /// removing it never touches another file. The target is still checked:
    /// one outside the root is [`UploadError::InvalidDestination`]. A missing
    /// entry is `NotFound`.
    pub async fn resolve_existing(&self, name: &str) -> Result<PathBuf, UploadError> {
        let joined = self.join_contained(name)?;
        let resolved = match tokio::fs::canonicalize(&joined).await {
            Ok(resolved) => resolved,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(UploadError::NotFound),
            Err(e) => return Err(e.into()),
        };
        self.ensure_contained(&resolved)?;
        Ok(joined)
    }

    /// Joins a single plain path component to the root.
    ///
    /// Rejects anything that is not exactly one normal component: empty
    /// names, `.`, `..`, separators, absolute paths.
    fn join_contained(&self, name: &str) -> Result<PathBuf, UploadError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == name && !name.contains('\\') => {}
            _ => return Err(UploadError::InvalidDestination),
        }

        let joined = self.path.join(name);
        self.ensure_contained(&joined)?;
        Ok(joined)
    }

    fn ensure_contained(&self, candidate: &Path) -> Result<(), UploadError> {
        if candidate.starts_with(&self.path) && candidate != self.path {
            Ok(())
        } else {
            Err(UploadError::InvalidDestination)
        }
    }
}

/// Where a new upload will be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// The stored name, also the retrieval key.
    pub name: String,
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unique_names_keep_stem_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let root = StorageRoot::open(dir.path()).await.unwrap();

        let a = root.unique_destination("report.pdf").unwrap();
        let b = root.unique_destination("report.pdf").unwrap();
        assert_ne!(a, b);

        assert!(a.name.starts_with("report__"));
        assert!(a.name.ends_with(".pdf"));
        assert_eq!(a.name.len(), "report__".len() + 32 + ".pdf".len());
        assert_eq!(a.path.parent().unwrap(), root.path());
        assert_eq!(a.path.file_name().unwrap().to_str().unwrap(), a.name);
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root = StorageRoot::open(dir.path()).await.unwrap();

        for name in ["", ".", "..", "../x.png", "a/b.png", "/etc/passwd", r"..\x.png"] {
            assert!(
                matches!(root.join_contained(name), Err(UploadError::InvalidDestination)),
                "{name:?} was accepted"
            );
        }
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let root = StorageRoot::open(dir.path()).await.unwrap();
        assert!(matches!(root.resolve_existing("nope.png").await, Err(UploadError::NotFound)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_escaping_root_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.png");
        std::fs::write(&secret, b"x").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let root = StorageRoot::open(dir.path()).await.unwrap();
        std::os::unix::fs::symlink(&secret, root.path().join("link.png")).unwrap();

        assert!(matches!(
            root.resolve_existing("link.png").await,
            Err(UploadError::InvalidDestination)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_inside_root_resolves_to_the_link() {
        let dir = tempfile::tempdir().unwrap();
        let root = StorageRoot::open(dir.path()).await.unwrap();
        std::fs::write(root.path().join("target.png"), b"x").unwrap();
        std::os::unix::fs::symlink(root.path().join("target.png"), root.path().join("alias.png"))
            .unwrap();

        let path = root.resolve_existing("alias.png").await.unwrap();
        assert_eq!(path, root.path().join("alias.png"));
    }

    #[tokio::test]
    async fn root_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("var").join("uploads");
        let root = StorageRoot::open(&nested).await.unwrap();
        assert!(root.path().is_dir());
        assert!(root.path().is_absolute());
    }
}
