use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use postboard::application::services::MessageService;
use postboard::domain::ports::clock::Clock;
use postboard::domain::ports::file_storage::FileStorage;
use postboard::domain::ports::message_repository::MessageRepository;
use postboard::infrastructure::http::middleware::AppState;
use postboard::infrastructure::http::router::build_router;
use postboard::infrastructure::storage::{InMemoryFileStorage, LocalFileStorage};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

use super::test_db::setup_test_db;

pub const BOUNDARY: &str = "postboard-test-boundary";
pub const PUBLIC_BASE_URL: &str = "http://localhost:3000";

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn at(now: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance_millis(&self, millis: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::milliseconds(millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap()
    }
}

pub struct TestApp {
    pub router: Router,
    pub storage: InMemoryFileStorage,
    pub clock: Arc<ManualClock>,
}

/// 2023-11-14T22:13:20.000Z, epoch millis 1700000000000
pub fn start_time() -> OffsetDateTime {
    datetime!(2023-11-14 22:13:20 UTC)
}

pub async fn setup_test_app() -> TestApp {
    let db = setup_test_db().await;
    setup_test_app_with_repo(Arc::new(db)).await
}

pub async fn setup_test_app_with_repo(repo: Arc<dyn MessageRepository>) -> TestApp {
    let storage = InMemoryFileStorage::new(PUBLIC_BASE_URL);
    let clock = Arc::new(ManualClock::at(start_time()));

    let message_service = MessageService::new(
        repo,
        Arc::new(storage.clone()) as Arc<dyn FileStorage>,
        clock.clone() as Arc<dyn Clock>,
    );

    let router = build_router(AppState {
        message_service,
        public_files_dir: None,
        max_upload_bytes: 1024 * 1024,
    });

    TestApp {
        router,
        storage,
        clock,
    }
}

/// Router serving public blobs from a throwaway directory
pub struct LocalStorageTestApp {
    pub router: Router,
    pub storage: LocalFileStorage,
    pub dir: TempDir,
}

pub async fn setup_local_storage_app() -> LocalStorageTestApp {
    let db = setup_test_db().await;
    let dir = TempDir::new().unwrap();
    let storage = LocalFileStorage::new(dir.path(), PUBLIC_BASE_URL);
    storage.init().await.unwrap();

    let message_service = MessageService::new(
        Arc::new(db) as Arc<dyn MessageRepository>,
        Arc::new(storage.clone()) as Arc<dyn FileStorage>,
        Arc::new(ManualClock::at(start_time())) as Arc<dyn Clock>,
    );

    let router = build_router(AppState {
        message_service,
        public_files_dir: Some(storage.public_dir()),
        max_upload_bytes: 1024 * 1024,
    });

    LocalStorageTestApp {
        router,
        storage,
        dir,
    }
}

/// Run one request through the router, returning status and raw body
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn multipart_request(text: Option<&str>, file: Option<FilePart<'_>>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/messages")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(text, file)))
        .unwrap()
}

/// A file part: (filename, content type, bytes)
pub type FilePart<'a> = (&'a str, &'a str, &'a [u8]);

pub fn file<'a>(file_name: &'a str, content_type: &'a str, content: &'a [u8]) -> Option<FilePart<'a>> {
    Some((file_name, content_type, content))
}

pub fn multipart_body(text: Option<&str>, file: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some(text) = text {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n{}\r\n",
                BOUNDARY, text
            )
            .as_bytes(),
        );
    }

    if let Some((file_name, content_type, content)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

impl TestApp {
    pub async fn post_raw(
        &self,
        content_type: &str,
        body: Vec<u8>,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/messages")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();

        let (status, bytes) = send(&self.router, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// POST /messages without a Content-Type header or body
    pub async fn post_empty(&self) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/messages")
            .body(Body::empty())
            .unwrap();

        let (status, bytes) = send(&self.router, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    pub async fn post_message(
        &self,
        text: Option<&str>,
        file: Option<FilePart<'_>>,
    ) -> (StatusCode, serde_json::Value) {
        let (status, bytes) = send(&self.router, multipart_request(text, file)).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// GET /messages with a raw query string (without the leading `?`)
    pub async fn get_messages_raw(&self, query: &str) -> (StatusCode, Vec<u8>) {
        let uri = if query.is_empty() {
            "/messages".to_string()
        } else {
            format!("/messages?{}", query)
        };
        send(&self.router, get_request(&uri)).await
    }

    pub async fn get_messages(&self, query: &str) -> (StatusCode, serde_json::Value) {
        let (status, bytes) = self.get_messages_raw(query).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}
