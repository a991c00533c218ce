use crate::domain::ports::file_storage::{FileStorage, StoredFile};
use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use crate::infrastructure::storage::public_url_for;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

const STAGING_DIR: &str = "staging";
const PUBLIC_DIR: &str = "public";

/// Disk-backed blob store.
///
/// Files are written under `<base>/staging` and moved to `<base>/public` when
/// made public. The router serves `<base>/public` read-only, so only public
/// files are reachable over HTTP.
#[derive(Clone)]
pub struct LocalFileStorage {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalFileStorage {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Directory holding public files
    pub fn public_dir(&self) -> PathBuf {
        self.base_path.join(PUBLIC_DIR)
    }

    fn staging_dir(&self) -> PathBuf {
        self.base_path.join(STAGING_DIR)
    }

    /// Create the staging and public directories
    pub async fn init(&self) -> ApiResult<()> {
        for dir in [self.staging_dir(), self.public_dir()] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| ApiError::Internal(format!("Failed to create directory: {}", e)))?;
        }
        Ok(())
    }

    /// Resolve a key inside `root`, refusing anything that could escape it
    fn resolve_path(root: &Path, key: &str) -> ApiResult<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && key.split('/').all(|segment| !segment.is_empty() && segment != ".")
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_plain {
            return Err(ApiError::BadRequest(format!("Invalid storage key: {}", key)));
        }

        Ok(root.join(relative))
    }

    async fn ensure_parent(path: &Path) -> ApiResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ApiError::Internal(format!("Failed to create directory: {}", e)))?;
        }
        Ok(())
    }

    async fn exists(path: &Path) -> ApiResult<bool> {
        fs::try_exists(path)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to inspect file: {}", e)))
    }

    async fn remove_if_present(path: &Path) -> ApiResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Internal(format!("Failed to delete file: {}", e))),
        }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, key: &str, content: &[u8], content_type: &str) -> ApiResult<StoredFile> {
        let file_path = Self::resolve_path(&self.staging_dir(), key)?;
        let public_path = Self::resolve_path(&self.public_dir(), key)?;
        Self::ensure_parent(&file_path).await?;

        let replaced = Self::exists(&file_path).await? || Self::exists(&public_path).await?;

        fs::write(&file_path, content)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to write file: {}", e)))?;

        tracing::debug!(key = %key, bytes = content.len(), replaced, "Stored file in staging");

        Ok(StoredFile {
            key: key.to_string(),
            content_type: content_type.to_string(),
            replaced,
        })
    }

    async fn make_public(&self, file: &StoredFile) -> ApiResult<()> {
        let staged = Self::resolve_path(&self.staging_dir(), &file.key)?;
        let public = Self::resolve_path(&self.public_dir(), &file.key)?;
        Self::ensure_parent(&public).await?;

        match fs::rename(&staged, &public).await {
            Ok(()) => Ok(()),
            // Already moved by an earlier call
            Err(e) if e.kind() == ErrorKind::NotFound && public.exists() => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ApiError::NotFound(format!("File {} not found", file.key)))
            }
            Err(e) => Err(ApiError::Internal(format!("Failed to publish file: {}", e))),
        }
    }

    async fn public_url(&self, file: &StoredFile) -> ApiResult<String> {
        Self::resolve_path(&self.public_dir(), &file.key)?;
        Ok(public_url_for(&self.public_base_url, &file.key))
    }

    async fn delete(&self, file: &StoredFile) -> ApiResult<()> {
        Self::remove_if_present(&Self::resolve_path(&self.staging_dir(), &file.key)?).await?;
        Self::remove_if_present(&Self::resolve_path(&self.public_dir(), &file.key)?).await
    }
}
