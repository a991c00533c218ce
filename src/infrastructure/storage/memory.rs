use crate::domain::ports::file_storage::{FileStorage, StoredFile};
use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use crate::infrastructure::storage::public_url_for;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content: Vec<u8>,
    pub content_type: String,
    pub public: bool,
}

/// Process-local blob store. Contents are lost on restart and public URLs
/// are not served; intended for development and tests.
#[derive(Clone)]
pub struct InMemoryFileStorage {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    public_base_url: String,
}

impl InMemoryFileStorage {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            public_base_url: public_base_url.into(),
        }
    }

    /// Snapshot of the object stored under `key`
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn save(&self, key: &str, content: &[u8], content_type: &str) -> ApiResult<StoredFile> {
        let mut objects = self.objects.lock().await;
        let previous = objects.insert(
            key.to_string(),
            StoredObject {
                content: content.to_vec(),
                content_type: content_type.to_string(),
                public: false,
            },
        );

        // An overwritten public object stays reachable at its URL
        if previous.as_ref().is_some_and(|object| object.public) {
            if let Some(object) = objects.get_mut(key) {
                object.public = true;
            }
        }

        Ok(StoredFile {
            key: key.to_string(),
            content_type: content_type.to_string(),
            replaced: previous.is_some(),
        })
    }

    async fn make_public(&self, file: &StoredFile) -> ApiResult<()> {
        let mut objects = self.objects.lock().await;
        let object = objects
            .get_mut(&file.key)
            .ok_or_else(|| ApiError::NotFound(format!("File {} not found", file.key)))?;
        object.public = true;
        Ok(())
    }

    async fn public_url(&self, file: &StoredFile) -> ApiResult<String> {
        Ok(public_url_for(&self.public_base_url, &file.key))
    }

    async fn delete(&self, file: &StoredFile) -> ApiResult<()> {
        self.objects.lock().await.remove(&file.key);
        Ok(())
    }
}
