use crate::application::services::MessageService;
use std::path::PathBuf;

/// Shared router state. Every field is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub message_service: MessageService,
    /// Directory exposed under `/files` when the storage backend serves public blobs
    pub public_files_dir: Option<PathBuf>,
    /// Upper bound for a `POST /messages` body
    pub max_upload_bytes: usize,
}
