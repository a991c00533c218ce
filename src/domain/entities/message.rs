use serde::{Deserialize, Serialize};
use time::{macros::format_description, OffsetDateTime, UtcOffset};

use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};

/// Key prefix under which every attachment is stored
pub const UPLOAD_KEY_PREFIX: &str = "uploads";

/// Content type assumed for a file part that does not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Stored message record as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub timestamp: String, // UTC, fixed width, see format_timestamp
}

impl Message {
    /// Materialize a record from the fields that were written and the id the store assigned
    pub fn from_new(id: String, new: NewMessage) -> Self {
        let (file_url, file_name, file_type) = match new.attachment {
            Some(attachment) => (
                Some(attachment.file_url),
                Some(attachment.file_name),
                Some(attachment.file_type),
            ),
            None => (None, None, None),
        };

        Self {
            id,
            text: new.text,
            file_url,
            file_name,
            file_type,
            timestamp: new.timestamp,
        }
    }

    /// Case-insensitive substring match over `text` and `file_name`.
    ///
    /// `needle` must already be lowercased. An empty needle matches every record.
    pub fn matches_search(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }

        let text = self.text.as_deref().unwrap_or_default().to_lowercase();
        let file_name = self.file_name.as_deref().unwrap_or_default().to_lowercase();

        text.contains(needle) || file_name.contains(needle)
    }
}

/// Attachment fields of a record; present or absent as a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub file_url: String,
    pub file_name: String,
    pub file_type: String,
}

/// Record about to be written; the record store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub text: Option<String>,
    pub attachment: Option<AttachmentRef>,
    pub timestamp: String,
}

/// Binary part of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub content: Vec<u8>,
    pub original_name: String,
    pub content_type: String,
}

/// One client submission, validated at the HTTP boundary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageSubmission {
    pub text: Option<String>,
    pub file: Option<UploadedFile>,
}

impl MessageSubmission {
    /// Submitted text, with the empty string treated as absent
    pub fn normalized_text(&self) -> Option<String> {
        self.text.clone().filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMessageResponse {
    pub id: String,
}

/// Milliseconds since the Unix epoch
pub fn epoch_millis(at: OffsetDateTime) -> i128 {
    at.unix_timestamp_nanos() / 1_000_000
}

/// `<epoch-millis>_<original name>`, the name recorded for an attachment.
///
/// Path separators in the original name become `_` so the name is one key segment.
pub fn storage_file_name(submitted_at: OffsetDateTime, original_name: &str) -> String {
    format!(
        "{}_{}",
        epoch_millis(submitted_at),
        original_name.replace(&['/', '\\'][..], "_")
    )
}

/// Blob store key for an attachment name
pub fn storage_key(file_name: &str) -> String {
    format!("{}/{}", UPLOAD_KEY_PREFIX, file_name)
}

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ` in UTC.
///
/// Fixed width, so string order is chronological order.
pub fn format_timestamp(at: OffsetDateTime) -> ApiResult<String> {
    at.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .map_err(|e| ApiError::Internal(format!("Failed to format timestamp: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn message(text: Option<&str>, file_name: Option<&str>) -> Message {
        Message {
            id: "m1".to_string(),
            text: text.map(str::to_string),
            file_url: file_name.map(|name| format!("http://files/uploads/{}", name)),
            file_name: file_name.map(str::to_string),
            file_type: file_name.map(|_| "image/png".to_string()),
            timestamp: "2025-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_empty_needle_matches_everything() {
        assert!(message(None, None).matches_search(""));
        assert!(message(Some("hello"), None).matches_search(""));
    }

    #[test]
    fn test_matches_text_case_insensitively() {
        let msg = message(Some("Budget Report Q3"), None);
        assert!(msg.matches_search("budget"));
        assert!(msg.matches_search("report q3"));
        assert!(!msg.matches_search("zzz"));
    }

    #[test]
    fn test_matches_file_name() {
        let msg = message(None, Some("1700000000000_Invoice.PDF"));
        assert!(msg.matches_search("invoice.pdf"));
        assert!(msg.matches_search("1700000000000_"));
        assert!(!msg.matches_search("receipt"));
    }

    #[test]
    fn test_null_fields_never_match_non_empty_needle() {
        assert!(!message(None, None).matches_search("a"));
    }

    #[test]
    fn test_storage_file_name_uses_epoch_millis_and_single_underscore() {
        let at = datetime!(2023-11-14 22:13:20.123 UTC);
        assert_eq!(storage_file_name(at, "photo.png"), "1700000000123_photo.png");
        assert_eq!(storage_key("1700000000123_photo.png"), "uploads/1700000000123_photo.png");
    }

    #[test]
    fn test_storage_file_name_flattens_path_separators() {
        let at = datetime!(2023-11-14 22:13:20 UTC);
        let name = storage_file_name(at, "a/../b.png");
        assert_eq!(name, "1700000000000_a_.._b.png");
        assert_eq!(storage_key(&name), "uploads/1700000000000_a_.._b.png");
        assert_eq!(storage_file_name(at, r"C:\dir\c.txt"), "1700000000000_C:_dir_c.txt");
    }

    #[test]
    fn test_format_timestamp_is_fixed_width_utc() {
        let at = datetime!(2024-03-05 06:07:08.9 +02:00);
        assert_eq!(format_timestamp(at).unwrap(), "2024-03-05T04:07:08.900Z");

        let whole = datetime!(2024-03-05 06:07:08 UTC);
        assert_eq!(format_timestamp(whole).unwrap(), "2024-03-05T06:07:08.000Z");
    }

    #[test]
    fn test_from_new_spreads_attachment_fields() {
        let new = NewMessage {
            text: None,
            attachment: Some(AttachmentRef {
                file_url: "http://x/files/uploads/1_a.txt".to_string(),
                file_name: "1_a.txt".to_string(),
                file_type: "text/plain".to_string(),
            }),
            timestamp: "2025-01-01T00:00:00.000Z".to_string(),
        };

        let msg = Message::from_new("id-1".to_string(), new);
        assert_eq!(msg.file_name.as_deref(), Some("1_a.txt"));
        assert_eq!(msg.file_type.as_deref(), Some("text/plain"));
        assert_eq!(msg.file_url.as_deref(), Some("http://x/files/uploads/1_a.txt"));
    }

    #[test]
    fn test_message_serializes_camel_case_with_nulls() {
        let json = serde_json::to_value(message(Some("hi"), None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "m1",
                "text": "hi",
                "fileUrl": null,
                "fileName": null,
                "fileType": null,
                "timestamp": "2025-01-01T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn test_empty_text_is_absent() {
        let submission = MessageSubmission {
            text: Some(String::new()),
            file: None,
        };
        assert_eq!(submission.normalized_text(), None);
    }
}
