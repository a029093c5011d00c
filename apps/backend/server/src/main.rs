#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use axum::{Router, routing::get};
use std::sync::Arc;
use style_predict::ServingContext;
use style_predict_api::construct_router;

mod config;
mod metrics;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    metrics::init_telemetry()?;

    tracing::info!("Starting Style Predict service");

    let config = config::Config::from_env()?;
    tracing::info!(
        model = %config.serving.model_path.display(),
        dataset = ?config.serving.dataset_path,
        labels = ?config.serving.labels_path,
        threshold = config.serving.threshold,
        "Loaded configuration"
    );

    let context = match ServingContext::load(&config.serving) {
        Ok(context) => context,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize the serving context");
            return Err(e.into());
        }
    };
    tracing::info!(
        model = %context.model_path().display(),
        providers = ?context.providers(),
        "Model ready"
    );

    let app = Router::new()
        .merge(construct_router(Arc::new(context), config.max_upload_bytes))
        .route("/metrics", get(metrics::handler));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
