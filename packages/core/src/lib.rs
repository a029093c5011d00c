//! Style Predict core library
//!
//! Everything needed to turn an uploaded image into ranked art-style labels:
//! - Label catalog (dataset or persisted label order)
//! - Display name translation
//! - Classifier abstraction with an ONNX Runtime implementation
//! - Preprocessing into the network's input tensor
//! - Prediction service (softmax, top-k, confidence threshold)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use style_predict::{ServingContext, ServingOptions};
//!
//! let context = ServingContext::load(&options)?;
//! let top3 = context.service().predict_bytes(&bytes)?;
//! ```

pub mod catalog;
pub mod classifier;
pub mod context;
pub mod display;
pub mod error;
pub mod prediction;
pub mod preprocess;

pub use catalog::LabelCatalog;
pub use classifier::Classifier;
#[cfg(feature = "onnx")]
pub use classifier::onnx::{OnnxClassifier, OnnxClassifierConfig};
pub use context::{ServingContext, ServingOptions};
pub use display::DisplayNames;
pub use error::{PredictError, StartupError};
pub use prediction::{NO_MATCH_LABEL, PredictionPolicy, PredictionService, ScoredLabel};
pub use preprocess::Preprocessor;
