use std::env;
use std::path::PathBuf;
use style_predict::ServingOptions;
use style_predict::preprocess::DEFAULT_INPUT_SIZE;
use style_predict::prediction::DEFAULT_THRESHOLD;
use style_predict_api::DEFAULT_MAX_UPLOAD_BYTES;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MODEL_PATH: &str = "model/efficientnet_b0_1500styles.onnx";
const DEFAULT_DATASET_PATH: &str = "model/balanced_data_1500.csv";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub max_upload_bytes: usize,
    pub serving: ServingOptions,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset, except
    /// `DATASET_PATH=""` which disables the dataset cross-check.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dataset_path = match lookup("DATASET_PATH") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(PathBuf::from(v)),
            None => Some(PathBuf::from(DEFAULT_DATASET_PATH)),
        };

        let threshold = parse_or(var("CONFIDENCE_THRESHOLD"), "CONFIDENCE_THRESHOLD", DEFAULT_THRESHOLD)?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidValue(format!(
                "CONFIDENCE_THRESHOLD: {threshold} is outside [0, 1]"
            )));
        }

        let input_size: u32 = parse_or(var("INPUT_SIZE"), "INPUT_SIZE", DEFAULT_INPUT_SIZE)?;
        if input_size == 0 {
            return Err(ConfigError::InvalidValue("INPUT_SIZE: must be positive".to_string()));
        }

        let intra_threads = var("INFERENCE_THREADS")
            .map(|v| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidValue(format!("INFERENCE_THREADS: {v}")))
            })
            .transpose()?;

        Ok(Config {
            port: parse_or(var("PORT"), "PORT", DEFAULT_PORT)?,
            max_upload_bytes: parse_or(
                var("MAX_UPLOAD_BYTES"),
                "MAX_UPLOAD_BYTES",
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            serving: ServingOptions {
                model_path: var("MODEL_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                dataset_path,
                labels_path: var("LABELS_PATH").map(PathBuf::from),
                threshold,
                input_size,
                intra_threads,
                display_language: var("DISPLAY_LANGUAGE"),
                display_names_path: var("DISPLAY_NAMES_PATH").map(PathBuf::from),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{key}: {v}"))),
        None => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(var) => write!(f, "Invalid value for: {}", var),
        }
    }
}

impl std::error::Error for ConfigError {}
