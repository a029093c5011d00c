//! Display-language names for style labels.

use crate::error::StartupError;
use std::collections::HashMap;
use std::path::Path;

/// Canonical style name to Korean display name.
const KOREAN: &[(&str, &str)] = &[
    ("Abstract Art", "추상 미술"),
    ("Abstract Expressionism", "추상 표현주의"),
    ("Art Deco", "아르 데코"),
    ("Art Informel", "앵포르멜"),
    ("Art Nouveau (Modern)", "아르 누보"),
    ("Baroque", "바로크"),
    ("Color Field Painting", "색면 회화"),
    ("Conceptual Art", "개념 미술"),
    ("Constructivism", "구성주의"),
    ("Cubism", "입체주의"),
    ("Dada", "다다이즘"),
    ("Early Renaissance", "초기 르네상스"),
    ("Expressionism", "표현주의"),
    ("Fauvism", "야수파"),
    ("High Renaissance", "전성기 르네상스"),
    ("Impressionism", "인상주의"),
    ("Mannerism (Late Renaissance)", "매너리즘"),
    ("Minimalism", "미니멀리즘"),
    ("Naive Art (Primitivism)", "나이브 아트"),
    ("Neoclassicism", "신고전주의"),
    ("Northern Renaissance", "북유럽 르네상스"),
    ("Op Art", "옵 아트"),
    ("Pointillism", "점묘법"),
    ("Pop Art", "팝 아트"),
    ("Post-Impressionism", "후기 인상주의"),
    ("Realism", "사실주의"),
    ("Rococo", "로코코"),
    ("Romanticism", "낭만주의"),
    ("Surrealism", "초현실주의"),
    ("Symbolism", "상징주의"),
    ("Ukiyo-e", "우키요에"),
    ("unknown", "알 수 없음"),
];

/// Optional translation table. Labels without an entry pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct DisplayNames {
    names: HashMap<String, String>,
}

impl DisplayNames {
    /// Identity mapping.
    pub fn none() -> Self {
        Self::default()
    }

    /// Built-in table for a language code, if one exists.
    pub fn builtin(language: &str) -> Option<Self> {
        match language.to_ascii_lowercase().as_str() {
            "ko" | "kor" | "korean" => Some(Self::from_pairs(KOREAN)),
            _ => None,
        }
    }

    /// Load a JSON object `{ "canonical": "display", ... }`.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, StartupError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|source| StartupError::DisplayNames {
            path: path.to_path_buf(),
            source,
        })?;
        let names: HashMap<String, String> =
            serde_json::from_slice(&raw).map_err(|source| StartupError::DisplayNamesParse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { names })
    }

    fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            names: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Entries of `other` take precedence.
    pub fn merge(mut self, other: DisplayNames) -> Self {
        self.names.extend(other.names);
        self
    }

    pub fn display<'a>(&'a self, label: &'a str) -> &'a str {
        self.names.get(label).map(String::as_str).unwrap_or(label)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through() {
        let names = DisplayNames::none();
        assert_eq!(names.display("Impressionism"), "Impressionism");
    }

    #[test]
    fn test_builtin_korean() {
        let names = DisplayNames::builtin("KO").unwrap();
        assert_eq!(names.display("Impressionism"), "인상주의");
        assert_eq!(names.display("Some New Style"), "Some New Style");
        assert!(DisplayNames::builtin("xx").is_none());
    }

    #[test]
    fn test_merge_overrides() {
        let base = DisplayNames::builtin("ko").unwrap();
        let custom = DisplayNames::from_pairs(&[("Impressionism", "인상파")]);
        let merged = base.merge(custom);
        assert_eq!(merged.display("Impressionism"), "인상파");
        assert_eq!(merged.display("Baroque"), "바로크");
    }
}
