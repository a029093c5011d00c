use std::path::PathBuf;

/// Faults raised while building the serving context. All of them are fatal:
/// the process must not serve traffic with a partially loaded model.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to read dataset {}: {source}", .path.display())]
    Dataset {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("dataset {0} has no `style` column")]
    MissingStyleColumn(String),

    #[error("failed to read label list {}: {source}", .path.display())]
    LabelFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse label list {}: {source}", .path.display())]
    LabelParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("label catalog is empty")]
    EmptyCatalog,

    #[error("label `{0}` appears more than once")]
    DuplicateLabel(String),

    #[error("label order from {explicit} disagrees with the dataset at index {index}: `{expected}` vs `{found}`")]
    LabelMismatch {
        explicit: String,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("label count from {explicit} ({explicit_len}) differs from the dataset ({dataset_len})")]
    LabelCountMismatch {
        explicit: String,
        explicit_len: usize,
        dataset_len: usize,
    },

    #[error("no label source configured: need a dataset, a label list or labels embedded in the model")]
    NoLabelSource,

    #[error("failed to read display names {}: {source}", .path.display())]
    DisplayNames {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse display names {}: {source}", .path.display())]
    DisplayNamesParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[cfg(feature = "onnx")]
    #[error("failed to load model: {0}")]
    Model(#[from] ort::Error),

    #[error("model produces {actual} classes but the label catalog has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("warm-up inference failed: {0}")]
    WarmUp(#[source] PredictError),

    #[error("invalid confidence threshold {0}: must be within [0, 1]")]
    InvalidThreshold(f32),
}

/// Per-request faults. Each variant maps to exactly one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// The request is malformed, e.g. the `image` field is missing.
    #[error("{0}")]
    Validation(String),

    /// The uploaded bytes are not a decodable image.
    #[error("{0}")]
    Decode(#[from] image::ImageError),

    /// Preprocessing or forward inference failed.
    #[error("{0}")]
    Inference(String),
}

impl PredictError {
    pub fn inference(msg: impl Into<String>) -> Self {
        PredictError::Inference(msg.into())
    }

    /// Short machine readable kind, used for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Validation(_) => "validation",
            PredictError::Decode(_) => "decode",
            PredictError::Inference(_) => "inference",
        }
    }
}

#[cfg(feature = "onnx")]
impl From<ort::Error> for PredictError {
    fn from(err: ort::Error) -> Self {
        PredictError::Inference(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PredictError {
    fn from(err: ndarray::ShapeError) -> Self {
        PredictError::Inference(format!("tensor shape error: {err}"))
    }
}
