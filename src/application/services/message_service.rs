use crate::{
    domain::entities::{
        format_timestamp, storage_file_name, storage_key, AttachmentRef, Message,
        MessageSubmission, NewMessage, UploadedFile,
    },
    domain::ports::clock::Clock,
    domain::ports::file_storage::{FileStorage, StoredFile},
    domain::ports::message_repository::MessageRepository,
    infrastructure::http::middleware::error::{ApiError, ApiResult},
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for a single record store or blob store call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct MessageService {
    message_repo: Arc<dyn MessageRepository>,
    storage: Arc<dyn FileStorage>,
    clock: Arc<dyn Clock>,
    call_timeout: Duration,
}

impl MessageService {
    pub fn new(
        message_repo: Arc<dyn MessageRepository>,
        storage: Arc<dyn FileStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            message_repo,
            storage,
            clock,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Store the attachment (if any), then write the record. Returns the new record id.
    ///
    /// If a blob was stored and a later step fails, the blob is deleted once on a
    /// best-effort basis before the error is returned.
    pub async fn post_message(&self, submission: MessageSubmission) -> ApiResult<String> {
        let submitted_at = self.clock.now();
        let text = submission.normalized_text();

        let (stored, attachment) = match submission.file {
            Some(file) => {
                let (stored, attachment) = self.store_attachment(file, submitted_at).await?;
                (Some(stored), Some(attachment))
            }
            None => (None, None),
        };

        let result = self.write_record(text, attachment).await;

        match result {
            Ok(id) => {
                tracing::info!(
                    message_id = %id,
                    has_attachment = stored.is_some(),
                    "Message created"
                );
                metrics::counter!("postboard_messages_posted_total").increment(1);
                Ok(id)
            }
            Err(err) => {
                if let Some(stored) = stored {
                    self.discard(&stored).await;
                }
                Err(err)
            }
        }
    }

    /// All records most recent first, keeping those whose text or file name
    /// contains `search` case-insensitively. No search keeps everything.
    pub async fn list_messages(&self, search: Option<&str>) -> ApiResult<Vec<Message>> {
        let needle = search.unwrap_or_default().to_lowercase();

        let messages = self
            .bounded("list messages", self.message_repo.list_messages_by_recency())
            .await?;
        let total = messages.len();

        let matching: Vec<Message> = messages
            .into_iter()
            .filter(|message| message.matches_search(&needle))
            .collect();

        tracing::debug!(
            total,
            returned = matching.len(),
            search = %needle,
            "Messages listed"
        );
        metrics::histogram!("postboard_message_list_size").record(matching.len() as f64);

        Ok(matching)
    }

    async fn store_attachment(
        &self,
        file: UploadedFile,
        submitted_at: time::OffsetDateTime,
    ) -> ApiResult<(StoredFile, AttachmentRef)> {
        let file_name = storage_file_name(submitted_at, &file.original_name);
        let key = storage_key(&file_name);

        let stored = self
            .bounded(
                "save file",
                self.storage.save(&key, &file.content, &file.content_type),
            )
            .await?;

        let file_url = match self.publish(&stored).await {
            Ok(url) => url,
            Err(err) => {
                self.discard(&stored).await;
                return Err(err);
            }
        };

        tracing::debug!(key = %stored.key, file_url = %file_url, "Attachment published");

        let attachment = AttachmentRef {
            file_url,
            file_name,
            file_type: file.content_type,
        };

        Ok((stored, attachment))
    }

    async fn publish(&self, stored: &StoredFile) -> ApiResult<String> {
        self.bounded("make file public", self.storage.make_public(stored))
            .await?;
        self.bounded("get public url", self.storage.public_url(stored))
            .await
    }

    async fn write_record(
        &self,
        text: Option<String>,
        attachment: Option<AttachmentRef>,
    ) -> ApiResult<String> {
        let message = NewMessage {
            text,
            attachment,
            timestamp: format_timestamp(self.clock.now())?,
        };

        self.bounded("create message", self.message_repo.create_message(&message))
            .await
    }

    // Compensation for a failed submission. Never fails the caller.
    async fn discard(&self, stored: &StoredFile) {
        // The key was already taken, so the blob may back an existing record
        if stored.replaced {
            tracing::warn!(
                key = %stored.key,
                "Keeping overwritten file of failed submission"
            );
            return;
        }

        match self.bounded("delete file", self.storage.delete(stored)).await {
            Ok(()) => {
                tracing::info!(key = %stored.key, "Removed file of failed submission");
                metrics::counter!("postboard_attachment_cleanups_total").increment(1);
            }
            Err(err) => {
                tracing::warn!(
                    key = %stored.key,
                    error = %err,
                    "Failed to remove file of failed submission; it is orphaned"
                );
            }
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = ApiResult<T>>,
    ) -> ApiResult<T> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| {
                ApiError::Timeout(format!(
                    "{} did not complete within {:?}",
                    operation, self.call_timeout
                ))
            })?
    }
}
