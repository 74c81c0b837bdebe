use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    #[error("Unknown upload category '{0}'")]
    UnknownCategory(String),

    #[error("File type '{0}' is not allowed")]
    UnsupportedType(String),

    #[error("Invalid file name")]
    InvalidFilename,

    #[error("No file was provided")]
    MissingFile,

    #[error("File is empty")]
    EmptyFile,

    #[error("File not found")]
    NotFound,

    #[error("Failed to build file URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadCategory {
    Profiles,
    Courses,
    Marketplace,
    Events,
    Hero,
}

impl UploadCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadCategory::Profiles => "profiles",
            UploadCategory::Courses => "courses",
            UploadCategory::Marketplace => "marketplace",
            UploadCategory::Events => "events",
            UploadCategory::Hero => "hero",
        }
    }
}

impl FromStr for UploadCategory {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profiles" => Ok(UploadCategory::Profiles),
            "courses" => Ok(UploadCategory::Courses),
            "marketplace" => Ok(UploadCategory::Marketplace),
            "events" => Ok(UploadCategory::Events),
            "hero" => Ok(UploadCategory::Hero),
            other => Err(UploadError::UnknownCategory(other.to_string())),
        }
    }
}

/// File extension for an allowed content type.
pub fn extension_for(content_type: &str) -> Result<&'static str, UploadError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        "image/gif" => Ok("gif"),
        "video/mp4" => Ok("mp4"),
        "application/pdf" => Ok("pdf"),
        _ => Err(UploadError::UnsupportedType(content_type.to_string())),
    }
}

/// Rejects names that could escape the category directory.
pub fn validate_filename(name: &str) -> Result<(), UploadError> {
    let bad = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
        || name.contains('\0');
    if bad {
        return Err(UploadError::InvalidFilename);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoredFile {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub content_type: String,
}

/// Local disk storage for uploaded files, laid out as `<root>/<category>/<file>`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    public_base: url::Url,
}

impl UploadStore {
    /// `base_url` is the public server URL; files resolve under `<base_url>/uploads/`.
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Result<Self, UploadError> {
        let mut public_base = url::Url::parse(base_url)?;
        if !public_base.path().ends_with('/') {
            let path = format!("{}/", public_base.path());
            public_base.set_path(&path);
        }

        Ok(Self {
            root: root.into(),
            public_base: public_base.join("uploads/")?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_url(&self, category: UploadCategory, filename: &str) -> Result<String, UploadError> {
        let url = self
            .public_base
            .join(&format!("{}/{}", category.as_str(), filename))?;
        Ok(url.to_string())
    }

    /// Writes `bytes` under a fresh random name and returns where it can be fetched.
    pub async fn save(
        &self,
        category: UploadCategory,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }
        let ext = extension_for(content_type)?;

        let dir = self.root.join(category.as_str());
        tokio::fs::create_dir_all(&dir).await?;

        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(dir.join(&filename), bytes).await?;

        tracing::info!(
            category = category.as_str(),
            filename = %filename,
            size = bytes.len(),
            "File uploaded"
        );

        Ok(StoredFile {
            url: self.public_url(category, &filename)?,
            filename,
            size: bytes.len(),
            content_type: content_type.to_string(),
        })
    }

    pub async fn delete(&self, category: UploadCategory, filename: &str) -> Result<(), UploadError> {
        validate_filename(filename)?;

        let path = self.root.join(category.as_str()).join(filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(category = category.as_str(), filename = %filename, "File deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(UploadError::NotFound),
            Err(e) => Err(UploadError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> UploadStore {
        UploadStore::new(dir, "http://localhost:8080").unwrap()
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("hero".parse::<UploadCategory>().unwrap(), UploadCategory::Hero);
        assert!(matches!(
            "secrets".parse::<UploadCategory>(),
            Err(UploadError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg").unwrap(), "jpg");
        assert_eq!(extension_for("IMAGE/PNG").unwrap(), "png");
        assert_eq!(extension_for("application/pdf; charset=binary").unwrap(), "pdf");
        assert!(extension_for("text/html").is_err());
        assert!(extension_for("application/x-msdownload").is_err());
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("0b7c1e.png").is_ok());
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("a/b.png").is_err());
        assert!(validate_filename("a\\b.png").is_err());
        assert!(validate_filename(".hidden").is_err());
        assert!(validate_filename("").is_err());
    }

    #[test]
    fn test_public_url_with_path_prefix() {
        let store = UploadStore::new("/tmp", "https://example.com/api").unwrap();
        assert_eq!(
            store.public_url(UploadCategory::Courses, "x.png").unwrap(),
            "https://example.com/api/uploads/courses/x.png"
        );
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let stored = store
            .save(UploadCategory::Events, "image/png", b"\x89PNG fake")
            .await
            .unwrap();

        assert!(stored.filename.ends_with(".png"));
        assert_eq!(stored.size, 9);
        assert_eq!(
            stored.url,
            format!("http://localhost:8080/uploads/events/{}", stored.filename)
        );
        assert!(dir.path().join("events").join(&stored.filename).exists());

        store
            .delete(UploadCategory::Events, &stored.filename)
            .await
            .unwrap();
        assert!(!dir.path().join("events").join(&stored.filename).exists());

        assert!(matches!(
            store.delete(UploadCategory::Events, &stored.filename).await,
            Err(UploadError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_save_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        assert!(matches!(
            store.save(UploadCategory::Hero, "image/png", b"").await,
            Err(UploadError::EmptyFile)
        ));
        assert!(matches!(
            store.save(UploadCategory::Hero, "text/html", b"<html>").await,
            Err(UploadError::UnsupportedType(_))
        ));
    }
}
