//! # Serving Context
//! Everything a request needs, built once at startup and shared read-only.

use crate::catalog::LabelCatalog;
use crate::classifier::Classifier;
use crate::display::DisplayNames;
use crate::error::StartupError;
use crate::prediction::{PredictionPolicy, PredictionService};
use crate::preprocess::Preprocessor;
use std::path::PathBuf;
use std::sync::Arc;

/// Startup inputs of the serving context.
#[derive(Debug, Clone)]
pub struct ServingOptions {
    pub model_path: PathBuf,
    /// CSV with a `style` column.
    pub dataset_path: Option<PathBuf>,
    /// Persisted label order (JSON array).
    pub labels_path: Option<PathBuf>,
    pub threshold: f32,
    pub input_size: u32,
    pub intra_threads: Option<usize>,
    pub display_language: Option<String>,
    pub display_names_path: Option<PathBuf>,
}

pub struct ServingContext {
    service: PredictionService,
    model_path: PathBuf,
}

impl ServingContext {
    /// Load the ONNX checkpoint and resolve everything around it.
    #[cfg(feature = "onnx")]
    pub fn load(options: &ServingOptions) -> Result<Self, StartupError> {
        use crate::classifier::onnx::{OnnxClassifier, OnnxClassifierConfig};

        let mut config = OnnxClassifierConfig::new(&options.model_path);
        config.intra_threads = options.intra_threads;
        config.fallback_input_size = (options.input_size, options.input_size);

        let classifier = OnnxClassifier::load(&config)?;
        Self::with_classifier(Arc::new(classifier), options)
    }

    /// Build around an already loaded classifier.
    pub fn with_classifier(
        classifier: Arc<dyn Classifier>,
        options: &ServingOptions,
    ) -> Result<Self, StartupError> {
        let catalog = resolve_catalog(options, classifier.as_ref())?;
        let display = resolve_display_names(options)?;
        let policy = PredictionPolicy::with_threshold(options.threshold)?;

        let mut preprocessor = Preprocessor::square(options.input_size);
        if let Some((width, height)) = classifier.input_size() {
            if (width, height) != (preprocessor.width, preprocessor.height) {
                tracing::warn!(
                    configured = options.input_size,
                    model_width = width,
                    model_height = height,
                    "Configured input size differs from the model, using the model's"
                );
                preprocessor = preprocessor.with_size(width, height);
            }
        }

        let service = PredictionService::new(catalog, classifier, preprocessor, policy, display)?;

        tracing::info!(
            labels = service.catalog().len(),
            threshold = service.policy().threshold,
            input_width = service.preprocessor().width,
            input_height = service.preprocessor().height,
            "Serving context ready"
        );

        Ok(Self {
            service,
            model_path: options.model_path.clone(),
        })
    }

    pub fn service(&self) -> &PredictionService {
        &self.service
    }

    pub fn model_path(&self) -> &PathBuf {
        &self.model_path
    }

    pub fn providers(&self) -> Vec<String> {
        self.service.classifier().providers()
    }

    pub fn accelerated(&self) -> bool {
        self.service.classifier().accelerated()
    }
}

/// An explicit label order (sidecar file or model metadata) wins; the dataset
/// only derives one when nothing explicit exists. When both are present they
/// must agree exactly.
fn resolve_catalog(
    options: &ServingOptions,
    classifier: &dyn Classifier,
) -> Result<LabelCatalog, StartupError> {
    let explicit = match &options.labels_path {
        Some(path) => Some((
            LabelCatalog::from_json_path(path)?,
            path.display().to_string(),
        )),
        None => classifier
            .embedded_labels()
            .map(|labels| LabelCatalog::from_labels(labels).map(|c| (c, "model metadata".to_string())))
            .transpose()?,
    };

    let dataset = options
        .dataset_path
        .as_ref()
        .map(LabelCatalog::from_csv_path)
        .transpose()?;

    match (explicit, dataset) {
        (Some((explicit, source)), Some(dataset)) => {
            explicit.ensure_same_order(&dataset, &source)?;
            tracing::info!(source = %source, "Label order verified against dataset");
            Ok(explicit)
        }
        (Some((explicit, source)), None) => {
            tracing::info!(source = %source, "Using persisted label order");
            Ok(explicit)
        }
        (None, Some(dataset)) => {
            tracing::warn!(
                "Label order derived from the dataset; persist it next to the checkpoint to pin it"
            );
            Ok(dataset)
        }
        (None, None) => Err(StartupError::NoLabelSource),
    }
}

fn resolve_display_names(options: &ServingOptions) -> Result<DisplayNames, StartupError> {
    let mut names = match options.display_language.as_deref() {
        Some(language) => DisplayNames::builtin(language).unwrap_or_else(|| {
            tracing::warn!(language, "No built-in display names for language, labels pass through");
            DisplayNames::none()
        }),
        None => DisplayNames::none(),
    };

    if let Some(path) = &options.display_names_path {
        names = names.merge(DisplayNames::from_json_path(path)?);
    }

    Ok(names)
}
