use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartError, rejection::QueryRejection, FromRequest, Multipart, Query,
        Request, State,
    },
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{
    domain::entities::{
        CreateMessageResponse, MessageSubmission, UploadedFile, DEFAULT_CONTENT_TYPE,
    },
    infrastructure::http::middleware::{
        ApiError, ApiResult, AppState, FETCH_FAILED, UPLOAD_FAILED,
    },
};

const TEXT_FIELD: &str = "text";
const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    pub search: Option<String>,
}

/// JSON body alternative to the multipart form; text only
#[derive(Debug, Deserialize)]
pub struct TextSubmission {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Multipart,
    Json,
    /// Missing or unrecognized content type; the body is not read
    Ignored,
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return BodyKind::Ignored;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "multipart/form-data" {
        BodyKind::Multipart
    } else if essence == "application/json" || essence.ends_with("+json") {
        BodyKind::Json
    } else {
        BodyKind::Ignored
    }
}

/// Post a message with optional text and an optional single file attachment
///
/// Accepts a multipart form, a JSON `{"text": ...}` body, or no body at all
/// (an empty submission). Every failure, including a malformed body, is
/// reported as the same generic upload error.
pub async fn create_message(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<impl IntoResponse> {
    let kind = body_kind(request.headers());
    let submission = match kind {
        BodyKind::Multipart => match Multipart::from_request(request, &state).await {
            Ok(multipart) => read_submission(multipart).await,
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        },
        BodyKind::Json => match Bytes::from_request(request, &state).await {
            Ok(body) => read_json_submission(&body),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        },
        BodyKind::Ignored => Ok(MessageSubmission::default()),
    }
    .map_err(upload_failed)?;

    let id = state
        .message_service
        .post_message(submission)
        .await
        .map_err(upload_failed)?;

    Ok(Json(CreateMessageResponse { id }))
}

/// List messages newest first, optionally filtered by `?search=`
pub async fn list_messages(
    State(state): State<AppState>,
    query: Result<Query<MessageListQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) =
        query.map_err(|rejection| fetch_failed(ApiError::BadRequest(rejection.body_text())))?;

    let messages = state
        .message_service
        .list_messages(query.search.as_deref())
        .await
        .map_err(fetch_failed)?;

    Ok(Json(messages))
}

/// Build a text-only submission from a JSON body. An empty body is an empty submission.
fn read_json_submission(body: &[u8]) -> ApiResult<MessageSubmission> {
    if body.is_empty() {
        return Ok(MessageSubmission::default());
    }

    let body: TextSubmission = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;

    Ok(MessageSubmission {
        text: body.text,
        file: None,
    })
}

/// Build a submission from the multipart form.
///
/// `text` takes the first text part. `file` takes the part named `file` that
/// carries a non-empty filename; a second one is rejected. Other parts are skipped.
pub async fn read_submission(mut multipart: Multipart) -> ApiResult<MessageSubmission> {
    let mut submission = MessageSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let has_file_name = field
            .file_name()
            .is_some_and(|file_name| !file_name.is_empty());

        match name.as_str() {
            FILE_FIELD if has_file_name => {
                if submission.file.is_some() {
                    return Err(ApiError::BadRequest(
                        "Only one file may be attached".to_string(),
                    ));
                }

                let original_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let content = field.bytes().await.map_err(multipart_error)?;

                submission.file = Some(UploadedFile {
                    content: content.to_vec(),
                    original_name,
                    content_type,
                });
            }
            TEXT_FIELD => {
                let text = field.text().await.map_err(multipart_error)?;
                if submission.text.is_none() {
                    submission.text = Some(text);
                }
            }
            _ => {}
        }
    }

    Ok(submission)
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart form: {}", err))
}

fn upload_failed(err: ApiError) -> ApiError {
    tracing::error!(error = %err, "Failed to upload message");
    metrics::counter!("postboard_message_post_failures_total").increment(1);
    ApiError::Internal(UPLOAD_FAILED.to_string())
}

fn fetch_failed(err: ApiError) -> ApiError {
    tracing::error!(error = %err, "Failed to fetch messages");
    metrics::counter!("postboard_message_list_failures_total").increment(1);
    ApiError::Internal(FETCH_FAILED.to_string())
}
