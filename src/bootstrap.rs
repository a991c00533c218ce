use crate::application::services::MessageService;
use crate::config::{Config, StorageBackend};
use crate::domain::ports::clock::Clock;
use crate::domain::ports::file_storage::FileStorage;
use crate::domain::ports::message_repository::MessageRepository;
use crate::infrastructure::http::middleware::AppState;
use crate::infrastructure::persistence::Database;
use crate::infrastructure::runtime::SystemClock;
use crate::infrastructure::storage::{InMemoryFileStorage, LocalFileStorage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Wire the collaborators selected by `config` into the router state
pub async fn build_app_state(db: Database, config: &Config) -> anyhow::Result<AppState> {
    let (storage, public_files_dir) = build_storage(config).await?;

    let message_service = MessageService::new(
        Arc::new(db) as Arc<dyn MessageRepository>,
        storage,
        Arc::new(SystemClock::new()) as Arc<dyn Clock>,
    )
    .with_call_timeout(Duration::from_secs(config.collaborator_timeout_secs));
    tracing::info!(
        timeout_secs = config.collaborator_timeout_secs,
        "Message service initialized"
    );

    Ok(AppState {
        message_service,
        public_files_dir,
        max_upload_bytes: config.max_upload_bytes,
    })
}

async fn build_storage(
    config: &Config,
) -> anyhow::Result<(Arc<dyn FileStorage>, Option<PathBuf>)> {
    match config.storage_backend {
        StorageBackend::Local => {
            let storage = LocalFileStorage::new(&config.storage_path, &config.public_base_url);
            storage.init().await?;
            let public_dir = storage.public_dir();
            tracing::info!(
                path = %config.storage_path,
                public_base_url = %config.public_base_url,
                "Local file storage initialized"
            );
            Ok((Arc::new(storage), Some(public_dir)))
        }
        StorageBackend::Memory => {
            tracing::warn!("In-memory file storage selected; uploads are lost on restart");
            Ok((
                Arc::new(InMemoryFileStorage::new(&config.public_base_url)),
                None,
            ))
        }
    }
}
