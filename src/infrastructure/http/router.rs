use crate::infrastructure::http::controllers::messages;
use crate::infrastructure::http::middleware::AppState;
use crate::infrastructure::storage::PUBLIC_FILES_ROUTE;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route(
            "/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    // Public blobs of the local storage backend, read-only
    if let Some(dir) = state.public_files_dir.as_ref() {
        router = router.nest_service(PUBLIC_FILES_ROUTE, ServeDir::new(dir));
    }

    router
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
