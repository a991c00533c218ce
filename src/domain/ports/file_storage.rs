use crate::infrastructure::http::middleware::error::ApiResult;
use async_trait::async_trait;

/// Handle to a blob written through [`FileStorage::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub key: String,
    pub content_type: String,
    /// An object already existed under `key` and was overwritten
    pub replaced: bool,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store content under `key`, tagged with its declared content type.
    /// Overwrites any existing object and reports it through [`StoredFile::replaced`].
    async fn save(&self, key: &str, content: &[u8], content_type: &str) -> ApiResult<StoredFile>;

    /// Make a stored file retrievable by anyone holding its public URL
    async fn make_public(&self, file: &StoredFile) -> ApiResult<()>;

    /// Public URL of a stored file
    async fn public_url(&self, file: &StoredFile) -> ApiResult<String>;

    /// Remove a stored file, public or not. Removing a missing file is not an error.
    async fn delete(&self, file: &StoredFile) -> ApiResult<()>;
}
