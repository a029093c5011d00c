//! # ONNX Classifier
//! Loads the exported checkpoint (pretrained backbone with the final layer
//! resized to the label count) and runs forward inference.

use crate::classifier::Classifier;
use crate::classifier::execution_providers::{ExecutionProviderInfo, execution_providers};
use crate::error::{PredictError, StartupError};
use crate::preprocess::DEFAULT_INPUT_SIZE;
use ndarray::Array4;
use ort::inputs;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::PathBuf;

/// Custom metadata key holding the ordered label list as a JSON array.
pub const LABELS_METADATA_KEY: &str = "labels";

#[derive(Debug, Clone)]
pub struct OnnxClassifierConfig {
    pub model_path: PathBuf,
    /// Intra-op thread count; ONNX Runtime decides when unset.
    pub intra_threads: Option<usize>,
    /// Resolution used for the warm-up pass when the model input is dynamic.
    pub fallback_input_size: (u32, u32),
}

impl OnnxClassifierConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            intra_threads: None,
            fallback_input_size: (DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE),
        }
    }
}

pub struct OnnxClassifier {
    /// `Session::run` needs exclusive access.
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    input_size: Option<(u32, u32)>,
    num_classes: usize,
    embedded_labels: Option<Vec<String>>,
    ep_info: ExecutionProviderInfo,
}

impl OnnxClassifier {
    /// Build the session and verify it with a warm-up pass. The number of
    /// classes is taken from the warm-up output.
    pub fn load(config: &OnnxClassifierConfig) -> Result<Self, StartupError> {
        if !config.model_path.is_file() {
            return Err(StartupError::ModelNotFound(config.model_path.clone()));
        }

        let (eps, ep_info) = execution_providers();
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_execution_providers(eps)?;
        if let Some(threads) = config.intra_threads {
            builder = builder.with_intra_threads(threads)?;
        }
        let session = builder.commit_from_file(&config.model_path)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| StartupError::InvalidModel("model has no inputs".to_string()))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| StartupError::InvalidModel("model has no outputs".to_string()))?;
        let input_size = determine_input_size(&session);
        let embedded_labels = read_embedded_labels(&session)?;

        let mut classifier = Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            input_size,
            num_classes: 0,
            embedded_labels,
            ep_info,
        };

        let (width, height) = input_size.unwrap_or(config.fallback_input_size);
        let warm_up = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        let logits = classifier.logits(warm_up).map_err(StartupError::WarmUp)?;
        if logits.is_empty() {
            return Err(StartupError::InvalidModel(
                "model produced an empty output".to_string(),
            ));
        }
        classifier.num_classes = logits.len();

        tracing::info!(
            path = %config.model_path.display(),
            input = %classifier.input_name,
            output = %classifier.output_name,
            input_size = ?classifier.input_size,
            classes = classifier.num_classes,
            providers = ?classifier.ep_info.providers,
            embedded_labels = classifier.embedded_labels.is_some(),
            "Loaded ONNX classifier"
        );

        Ok(classifier)
    }

}

impl Classifier for OnnxClassifier {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn input_size(&self) -> Option<(u32, u32)> {
        self.input_size
    }

    fn embedded_labels(&self) -> Option<Vec<String>> {
        self.embedded_labels.clone()
    }

    fn logits(&self, batch: Array4<f32>) -> Result<Vec<f32>, PredictError> {
        let input = Tensor::from_array(batch)?;

        let mut session = self.session.lock();
        let outputs = session.run(inputs![self.input_name.as_str() => input])?;
        let output = outputs[self.output_name.as_str()].try_extract_array::<f32>()?;

        Ok(output.iter().copied().collect())
    }

    fn providers(&self) -> Vec<String> {
        self.ep_info.providers.clone()
    }

    fn accelerated(&self) -> bool {
        self.ep_info.accelerated
    }
}

fn determine_input_size(session: &Session) -> Option<(u32, u32)> {
    let dims = session.inputs.first()?.input_type.tensor_shape()?;
    input_size_from_dims(dims)
}

/// Static `(width, height)` of an NCHW input; `None` for dynamic dimensions.
fn input_size_from_dims(dims: &[i64]) -> Option<(u32, u32)> {
    let d = dims.len();
    if d < 2 {
        return None;
    }
    let (h, w) = (dims[d - 2], dims[d - 1]);
    if h > 0 && w > 0 {
        Some((w as u32, h as u32))
    } else {
        None
    }
}

fn read_embedded_labels(session: &Session) -> Result<Option<Vec<String>>, StartupError> {
    let metadata = session.metadata()?;
    metadata
        .custom(LABELS_METADATA_KEY)?
        .map(|raw| parse_embedded_labels(&raw))
        .transpose()
}

fn parse_embedded_labels(raw: &str) -> Result<Vec<String>, StartupError> {
    serde_json::from_str::<Vec<String>>(raw).map_err(|e| {
        StartupError::InvalidModel(format!(
            "`{LABELS_METADATA_KEY}` metadata is not a JSON string array: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("style-predict-onnx-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let config = OnnxClassifierConfig::new(Path::new("does/not/exist/model.onnx"));
        let err = OnnxClassifier::load(&config).err().unwrap();
        assert!(matches!(err, StartupError::ModelNotFound(p) if p.ends_with("model.onnx")));
    }

    #[test]
    fn test_corrupt_model_is_fatal() {
        let path = scratch_file("corrupt.onnx", b"this is not a protobuf graph");
        let err = OnnxClassifier::load(&OnnxClassifierConfig::new(&path)).err().unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, StartupError::Model(_)), "got {err:?}");
    }

    #[test]
    fn test_input_size_from_dims() {
        assert_eq!(input_size_from_dims(&[1, 3, 224, 224]), Some((224, 224)));
        assert_eq!(input_size_from_dims(&[1, 3, 240, 320]), Some((320, 240)));
        assert_eq!(input_size_from_dims(&[-1, 3, -1, -1]), None);
        assert_eq!(input_size_from_dims(&[1, 3, 224, -1]), None);
        assert_eq!(input_size_from_dims(&[224]), None);
        assert_eq!(input_size_from_dims(&[]), None);
    }

    #[test]
    fn test_parse_embedded_labels() {
        assert_eq!(
            parse_embedded_labels(r#"["Baroque","Cubism"]"#).unwrap(),
            vec!["Baroque".to_string(), "Cubism".to_string()]
        );
        assert!(matches!(
            parse_embedded_labels(r#"{"0":"Baroque"}"#),
            Err(StartupError::InvalidModel(_))
        ));
        assert!(matches!(
            parse_embedded_labels("Baroque,Cubism"),
            Err(StartupError::InvalidModel(_))
        ));
    }
}
