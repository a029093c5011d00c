//! # Label Catalog
//! Maps class indices produced by the classifier to style names and back.
//!
//! The index of a label is its position in the lexically sorted set of
//! distinct styles. That order must match the order the checkpoint's final
//! layer was trained with, so a persisted label list (see
//! [`LabelCatalog::from_json_path`]) is preferred over re-deriving it.

use crate::error::StartupError;
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

/// Column holding the style of each record.
pub const STYLE_COLUMN: &str = "style";

/// Replacement for null entries in the style column.
pub const UNKNOWN_STYLE: &str = "unknown";

/// Cell values treated as null, matching pandas' default `na_values`.
const NA_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalog {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelCatalog {
    /// Build from an explicit, already ordered label list.
    pub fn from_labels(labels: Vec<String>) -> Result<Self, StartupError> {
        if labels.is_empty() {
            return Err(StartupError::EmptyCatalog);
        }

        let mut index = HashMap::with_capacity(labels.len());
        for (idx, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), idx).is_some() {
                return Err(StartupError::DuplicateLabel(label.clone()));
            }
        }

        Ok(Self { labels, index })
    }

    /// Derive the catalog from the distinct values of a dataset's `style` column.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, StartupError> {
        let path = path.as_ref();
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|source| StartupError::Dataset {
                path: path.to_path_buf(),
                source,
            })?;

        let styles = collect_styles(reader, &path.display().to_string()).map_err(|e| match e {
            CollectError::Csv(source) => StartupError::Dataset {
                path: path.to_path_buf(),
                source,
            },
            CollectError::Startup(e) => e,
        })?;

        tracing::debug!(path = %path.display(), styles = styles.len(), "Derived labels from dataset");
        Self::from_sorted(styles)
    }

    /// Same as [`LabelCatalog::from_csv_path`] for an in-memory or streamed dataset.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, StartupError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let styles = collect_styles(reader, "<reader>").map_err(|e| match e {
            CollectError::Csv(source) => StartupError::Dataset {
                path: "<reader>".into(),
                source,
            },
            CollectError::Startup(e) => e,
        })?;

        Self::from_sorted(styles)
    }

    /// Load a persisted label order: a JSON array of strings where the
    /// position of each entry is its class index.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, StartupError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|source| StartupError::LabelFile {
            path: path.to_path_buf(),
            source,
        })?;
        let labels: Vec<String> =
            serde_json::from_slice(&raw).map_err(|source| StartupError::LabelParse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_labels(labels)
    }

    fn from_sorted(styles: BTreeSet<String>) -> Result<Self, StartupError> {
        Self::from_labels(styles.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a class index.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Class index of a label.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// All labels in class index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Fails unless `other` holds exactly the same labels in the same order.
    /// `source` names where `self` came from, for the error message.
    pub fn ensure_same_order(&self, other: &LabelCatalog, source: &str) -> Result<(), StartupError> {
        if self.len() != other.len() {
            return Err(StartupError::LabelCountMismatch {
                explicit: source.to_string(),
                explicit_len: self.len(),
                dataset_len: other.len(),
            });
        }

        for (index, (expected, found)) in self.labels.iter().zip(&other.labels).enumerate() {
            if expected != found {
                return Err(StartupError::LabelMismatch {
                    explicit: source.to_string(),
                    index,
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
        }

        Ok(())
    }
}

enum CollectError {
    Csv(csv::Error),
    Startup(StartupError),
}

fn collect_styles<R: Read>(
    mut reader: csv::Reader<R>,
    source: &str,
) -> Result<BTreeSet<String>, CollectError> {
    let headers = reader.byte_headers().map_err(CollectError::Csv)?.clone();
    let column = headers
        .iter()
        .position(|h| String::from_utf8_lossy(h) == STYLE_COLUMN)
        .ok_or_else(|| CollectError::Startup(StartupError::MissingStyleColumn(source.to_string())))?;

    let mut styles = BTreeSet::new();
    for record in reader.byte_records() {
        let record = record.map_err(CollectError::Csv)?;
        let style = record
            .get(column)
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .filter(|value| !is_na(value))
            .unwrap_or_else(|| UNKNOWN_STYLE.to_string());
        styles.insert(style);
    }

    Ok(styles)
}

fn is_na(value: &str) -> bool {
    NA_TOKENS.contains(&value)
}
