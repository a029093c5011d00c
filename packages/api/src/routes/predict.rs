use crate::error::ApiError;
use crate::routes::PredictResponse;
use crate::state::AppState;
use crate::{bad_request, internal};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Extension, Multipart, State};
use axum::{Json, Router, routing::post};
use bytes::Bytes;
use std::time::Instant;

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";

/// Largest accepted `image` field, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

pub fn routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}

struct Upload {
    file_name: Option<String>,
    bytes: Bytes,
}

fn count_rejected() {
    metrics::counter!("predictions_total", "outcome" => "validation").increment(1);
}

#[tracing::instrument(name = "POST /predict", skip(state, multipart))]
pub async fn predict(
    State(state): State<AppState>,
    Extension(UploadLimit(limit)): Extension<UploadLimit>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let mut multipart = multipart.inspect_err(|_| count_rejected())?;
    let upload = read_image_field(&mut multipart, limit)
        .await
        .inspect_err(|_| count_rejected())?;
    let Some(upload) = upload else {
        count_rejected();
        return Err(bad_request!(
            "an image file is required in the `{}` field",
            IMAGE_FIELD
        ));
    };

    tracing::info!(
        file_name = upload.file_name.as_deref().unwrap_or("<unnamed>"),
        bytes = upload.bytes.len(),
        "Received image"
    );

    let started = Instant::now();
    let ctx = state.clone();
    let outcome = tokio::task::spawn_blocking(move || ctx.service().predict_bytes(&upload.bytes))
        .await
        .map_err(|e| internal!("prediction task failed: {}", e))?;
    metrics::histogram!("inference_duration_seconds").record(started.elapsed().as_secs_f64());

    match outcome {
        Ok(top3) => {
            metrics::counter!("predictions_total", "outcome" => "ok").increment(1);
            tracing::info!(
                result = ?top3,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Prediction complete"
            );
            Ok(Json(PredictResponse { top3 }))
        }
        Err(err) => {
            metrics::counter!("predictions_total", "outcome" => err.kind()).increment(1);
            tracing::warn!(kind = err.kind(), error = %err, "Prediction failed");
            Err(err.into())
        }
    }
}

/// First `image` field of the form; other fields are skipped.
async fn read_image_field(
    multipart: &mut Multipart,
    limit: usize,
) -> Result<Option<Upload>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await?;
        if bytes.len() > limit {
            return Err(ApiError::payload_too_large(format!(
                "image is {} bytes, the limit is {} bytes",
                bytes.len(),
                limit
            )));
        }
        return Ok(Some(Upload { file_name, bytes }));
    }

    Ok(None)
}
