use axum::Router;
use axum::Extension;
use axum::extract::DefaultBodyLimit;
use routes::predict::UploadLimit;
use state::AppState;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod error;
pub mod routes;
pub mod state;

pub use axum;
pub use routes::PredictResponse;

/// Upload limit of the web client.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn construct_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .merge(routes::predict::routes())
        .merge(routes::health::routes())
        .merge(routes::labels::routes())
        .with_state(state)
        .layer(Extension(UploadLimit(max_upload_bytes)))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
