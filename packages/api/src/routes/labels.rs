use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::{Router, routing::get};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppState> {
    Router::new().route("/labels", get(labels))
}

/// Labels in class index order, so clients can check them against the checkpoint.
#[derive(Serialize, Deserialize, Debug)]
pub struct LabelsResponse {
    pub labels: Vec<String>,
}

#[tracing::instrument(name = "GET /labels", skip(state))]
pub async fn labels(State(state): State<AppState>) -> Json<LabelsResponse> {
    Json(LabelsResponse {
        labels: state.service().catalog().labels().to_vec(),
    })
}
