//! # Prediction Service
//! decode → preprocess → forward → softmax → top-k → threshold → display names

use crate::catalog::LabelCatalog;
use crate::classifier::Classifier;
use crate::display::DisplayNames;
use crate::error::{PredictError, StartupError};
use crate::preprocess::Preprocessor;
use image::DynamicImage;
use ndarray::Array4;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Label of the single entry returned when no class clears the threshold.
pub const NO_MATCH_LABEL: &str = "no matching class";

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_THRESHOLD: f32 = 0.3;

/// Decimal digits kept in reported confidences.
const CONFIDENCE_DIGITS: i32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionPolicy {
    /// Minimum top-1 probability for the ranking to be reported.
    pub threshold: f32,
    pub top_k: usize,
}

impl Default for PredictionPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl PredictionPolicy {
    pub fn with_threshold(threshold: f32) -> Result<Self, StartupError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(StartupError::InvalidThreshold(threshold));
        }
        Ok(Self {
            threshold,
            ..Self::default()
        })
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Indices and values of the `k` largest probabilities, descending.
/// Equal probabilities keep the lower class index first.
pub fn top_k(probs: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked
}

/// Round half away from zero to four decimal digits.
pub fn round_confidence(p: f32) -> f32 {
    let scale = 10f64.powi(CONFIDENCE_DIGITS);
    ((p as f64 * scale).round() / scale) as f32
}

pub struct PredictionService {
    catalog: LabelCatalog,
    classifier: Arc<dyn Classifier>,
    preprocessor: Preprocessor,
    policy: PredictionPolicy,
    display: DisplayNames,
}

impl PredictionService {
    /// Fails when the classifier's output width does not match the catalog.
    pub fn new(
        catalog: LabelCatalog,
        classifier: Arc<dyn Classifier>,
        preprocessor: Preprocessor,
        policy: PredictionPolicy,
        display: DisplayNames,
    ) -> Result<Self, StartupError> {
        if classifier.num_classes() != catalog.len() {
            return Err(StartupError::DimensionMismatch {
                expected: catalog.len(),
                actual: classifier.num_classes(),
            });
        }

        Ok(Self {
            catalog,
            classifier,
            preprocessor,
            policy,
            display,
        })
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> &PredictionPolicy {
        &self.policy
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Decode an uploaded file and classify it.
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Vec<ScoredLabel>, PredictError> {
        let image = image::load_from_memory(bytes)?;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            "Decoded image"
        );
        self.predict_image(&image)
    }

    pub fn predict_image(&self, image: &DynamicImage) -> Result<Vec<ScoredLabel>, PredictError> {
        let batch = self.preprocessor.apply(image);
        self.predict_tensor(batch)
    }

    pub fn predict_tensor(&self, batch: Array4<f32>) -> Result<Vec<ScoredLabel>, PredictError> {
        let logits = self.classifier.logits(batch)?;
        if logits.len() != self.catalog.len() {
            return Err(PredictError::inference(format!(
                "classifier returned {} scores for {} labels",
                logits.len(),
                self.catalog.len()
            )));
        }
        if logits.iter().any(|l| !l.is_finite()) {
            return Err(PredictError::inference("classifier returned non-finite scores"));
        }

        self.rank(&softmax(&logits))
    }

    /// Apply top-k and the confidence threshold to a probability distribution.
    ///
    /// The threshold sees the unrounded top-1; only the reported confidence is
    /// rounded, so a sentinel may carry a value equal to the threshold.
    pub fn rank(&self, probs: &[f32]) -> Result<Vec<ScoredLabel>, PredictError> {
        let top = top_k(probs, self.policy.top_k);
        let Some(&(_, top1)) = top.first() else {
            return Err(PredictError::inference("empty probability distribution"));
        };

        if top1 < self.policy.threshold {
            return Ok(vec![ScoredLabel {
                label: NO_MATCH_LABEL.to_string(),
                confidence: round_confidence(top1),
            }]);
        }

        top.into_iter()
            .map(|(idx, p)| {
                let label = self.catalog.label(idx).ok_or_else(|| {
                    PredictError::inference(format!("class index {idx} has no label"))
                })?;
                Ok(ScoredLabel {
                    label: self.display.display(label).to_string(),
                    confidence: round_confidence(p),
                })
            })
            .collect()
    }
}
