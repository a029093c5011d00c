use serde::{Deserialize, Serialize};
use style_predict::ScoredLabel;

pub mod health;
pub mod labels;
pub mod predict;

/// Body of a successful `POST /predict`.
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq)]
pub struct PredictResponse {
    pub top3: Vec<ScoredLabel>,
}
