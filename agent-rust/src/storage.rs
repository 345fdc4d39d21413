use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};
use thiserror::Error;

pub const CATALOG_FILE: &str = "catalog.json";
pub const PERSON_PHOTOS_FILE: &str = "person-photos.json";
pub const WEEKLY_LOG_FILE: &str = "weekly-log.json";
pub const PERSON_PHOTO_DIR: &str = "me";
pub const GENERATED_DIR: &str = "generated";

const IMAGE_LOCATOR_PREFIX: &str = "/api/image?path=";
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Byte-oriented store keyed by relative, `/`-separated paths.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
    async fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError>;
    /// Files directly inside `dir`, as full relative paths, sorted.
    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError>;
    /// Opaque locator handed to the image-serving collaborator.
    fn locator(&self, path: &str) -> String {
        image_locator(path)
    }
}

#[must_use]
pub fn image_locator(path: &str) -> String {
    format!("{IMAGE_LOCATOR_PREFIX}{}", urlencoding::encode(path))
}

/// Inverse of [`image_locator`]. Plain relative paths pass through; remote
/// URLs and data URIs are not resolvable.
#[must_use]
pub fn path_from_locator(locator: &str) -> Option<String> {
    let locator = locator.trim();
    let raw = if let Some(encoded) = locator.strip_prefix(IMAGE_LOCATOR_PREFIX) {
        urlencoding::decode(encoded).ok()?.into_owned()
    } else if locator.contains("://") || locator.starts_with("data:") || locator.contains('?') {
        return None;
    } else {
        locator.to_string()
    };
    normalize_path(&raw).ok().filter(|path| !path.is_empty())
}

#[must_use]
pub fn is_image_file(path: &str) -> bool {
    extension(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

#[must_use]
pub fn mime_type_for(path: &str) -> &'static str {
    match extension(path).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Collapse a path to `a/b/c` form, rejecting anything that would escape the
/// storage root.
pub fn normalize_path(path: &str) -> Result<String, StorageError> {
    let replaced = path.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in replaced.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(StorageError::InvalidPath(path.to_string())),
            other => segments.push(other),
        }
    }
    Ok(segments.join("/"))
}

/// Filesystem storage rooted at the data directory.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<(String, PathBuf), StorageError> {
        let normalized = normalize_path(path)?;
        let full = self.root.join(&normalized);
        Ok((normalized, full))
    }
}

fn io_error(path: String, source: std::io::Error) -> StorageError {
    if source.kind() == ErrorKind::NotFound {
        StorageError::NotFound(path)
    } else {
        StorageError::Io { path, source }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let (normalized, full) = self.resolve(path)?;
        tokio::fs::read(&full)
            .await
            .map_err(|e| io_error(normalized, e))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let (normalized, full) = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(normalized.clone(), e))?;
        }
        tokio::fs::write(&full, data)
            .await
            .map_err(|e| io_error(normalized, e))
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        let (normalized, full) = self.resolve(dir)?;
        let mut entries = tokio::fs::read_dir(&full)
            .await
            .map_err(|e| io_error(normalized.clone(), e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(normalized.clone(), e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
                if normalized.is_empty() {
                    files.push(name.to_string());
                } else {
                    files.push(format!("{normalized}/{name}"));
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

/// In-process storage, used by tests and embedders that keep no files.
#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, replacing any existing content.
    pub fn insert(&self, path: &str, data: impl Into<Vec<u8>>) {
        if let Ok(normalized) = normalize_path(path) {
            self.lock().insert(normalized, data.into());
        }
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        let normalized = normalize_path(path).ok()?;
        self.lock().get(&normalized).cloned()
    }

    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A poisoned map still holds consistent bytes; each write is a single insert.
        self.files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let normalized = normalize_path(path)?;
        self.lock()
            .get(&normalized)
            .cloned()
            .ok_or(StorageError::NotFound(normalized))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let normalized = normalize_path(path)?;
        self.lock().insert(normalized, data.to_vec());
        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        let normalized = normalize_path(dir)?;
        let prefix = if normalized.is_empty() {
            String::new()
        } else {
            format!("{normalized}/")
        };
        Ok(self
            .lock()
            .keys()
            .filter(|key| {
                key.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_round_trips_paths_with_spaces() {
        let locator = image_locator("baggy jeans/blue pair.jpg");
        assert_eq!(locator, "/api/image?path=baggy%20jeans%2Fblue%20pair.jpg");
        assert_eq!(
            path_from_locator(&locator).as_deref(),
            Some("baggy jeans/blue pair.jpg")
        );
    }

    #[test]
    fn plain_paths_pass_through_and_urls_do_not() {
        assert_eq!(path_from_locator("/me/front.png").as_deref(), Some("me/front.png"));
        assert_eq!(path_from_locator("https://example.com/a.png"), None);
        assert_eq!(path_from_locator("/api/generate-outfit?outfit=x"), None);
        assert_eq!(path_from_locator("../secret.png"), None);
        assert_eq!(path_from_locator(""), None);
    }

    #[test]
    fn normalize_rejects_parent_segments() {
        assert_eq!(normalize_path("./a//b/").unwrap(), "a/b");
        assert!(matches!(
            normalize_path("a/../../etc"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn image_files_are_detected_by_extension() {
        assert!(is_image_file("me/Front.JPG"));
        assert!(!is_image_file("catalog.json"));
        assert_eq!(mime_type_for("x.webp"), "image/webp");
    }

    #[tokio::test]
    async fn memory_storage_lists_direct_children_only() {
        let storage = MemoryStorage::new();
        storage.insert("me/a.png", b"a".to_vec());
        storage.insert("me/nested/b.png", b"b".to_vec());
        storage.insert("catalog.json", b"[]".to_vec());

        assert_eq!(storage.list("me").await.unwrap(), vec!["me/a.png"]);
        assert_eq!(storage.list("").await.unwrap(), vec!["catalog.json"]);
        assert!(matches!(
            storage.read("missing.json").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
