use crate::domain::entities::{Message, NewMessage};
use crate::domain::ports::message_repository::MessageRepository;
use crate::infrastructure::http::middleware::error::ApiResult;
use crate::infrastructure::persistence::Database;
use sqlx::Row;

#[async_trait::async_trait]
impl MessageRepository for Database {
    async fn create_message(&self, message: &NewMessage) -> ApiResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let attachment = message.attachment.as_ref();

        sqlx::query(
            "INSERT INTO messages (id, text, file_url, file_name, file_type, timestamp)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(message.text.clone())
        .bind(attachment.map(|a| a.file_url.clone()))
        .bind(attachment.map(|a| a.file_name.clone()))
        .bind(attachment.map(|a| a.file_type.clone()))
        .bind(&message.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_messages_by_recency(&self) -> ApiResult<Vec<Message>> {
        // rowid breaks timestamp ties so repeated reads return the same order
        let rows = sqlx::query(
            "SELECT id, text, file_url, file_name, file_type, timestamp
             FROM messages
             ORDER BY timestamp DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            messages.push(Message {
                id: row.try_get("id")?,
                text: row.try_get("text")?,
                file_url: row.try_get("file_url")?,
                file_name: row.try_get("file_name")?,
                file_type: row.try_get("file_type")?,
                timestamp: row.try_get("timestamp")?,
            });
        }

        Ok(messages)
    }
}
