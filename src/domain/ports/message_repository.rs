use crate::domain::entities::{Message, NewMessage};
use crate::infrastructure::http::middleware::error::ApiResult;

/// Durable store for message records
#[async_trait::async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a new record and return the identifier the store assigned to it
    async fn create_message(&self, message: &NewMessage) -> ApiResult<String>;

    /// Every record, most recent `timestamp` first. Unbounded.
    async fn list_messages_by_recency(&self) -> ApiResult<Vec<Message>>;
}
