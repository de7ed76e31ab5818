use crate::error::ConfigError;
use crate::preprocess::Normalization;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CLASS_NAMES: [&str; 6] =
    ["Battery", "Plastic", "E-Waste", "Organic", "Metal", "Glass"];

/// Model input size used when the artifact does not declare one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSize {
    pub height: u32,
    pub width: u32,
}

impl Default for InputSize {
    fn default() -> Self {
        Self {
            height: 224,
            width: 224,
        }
    }
}

impl std::str::FromStr for InputSize {
    type Err = String;

    /// Parses `HxW`, e.g. `224x224`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, w) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected HxW, got '{}'", s))?;
        let height: u32 = h.trim().parse().map_err(|_| format!("bad height '{}'", h))?;
        let width: u32 = w.trim().parse().map_err(|_| format!("bad width '{}'", w))?;
        if height == 0 || width == 0 {
            return Err("input size must be positive".to_string());
        }
        Ok(Self { height, width })
    }
}

/// Remote artifact repository settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub repo_id: String,
    #[serde(default = "default_remote_model_file")]
    pub model_file: String,
    #[serde(default = "default_remote_labels_file")]
    pub labels_file: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

/// Startup configuration of the inference pipeline, read once per process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Local model files tried in order
    #[serde(default = "default_model_candidates")]
    pub model_candidates: Vec<PathBuf>,
    /// Local label files tried in order
    #[serde(default = "default_label_candidates")]
    pub label_candidates: Vec<PathBuf>,
    /// Absent disables remote resolution
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default = "default_labels")]
    pub default_labels: Vec<String>,
    #[serde(default)]
    pub default_input_size: InputSize,
    #[serde(default)]
    pub normalization: Normalization,
}

fn default_model_candidates() -> Vec<PathBuf> {
    [
        "wastesense_model.onnx",
        "wastesense_model.tflite",
        "model.onnx",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

fn default_label_candidates() -> Vec<PathBuf> {
    ["labels.json", "labels.txt"]
        .into_iter()
        .map(PathBuf::from)
        .collect()
}

fn default_remote_model_file() -> String {
    "wastesense_model.onnx".to_string()
}

fn default_remote_labels_file() -> String {
    "labels.json".to_string()
}

fn default_labels() -> Vec<String> {
    DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_candidates: default_model_candidates(),
            label_candidates: default_label_candidates(),
            remote: None,
            default_labels: default_labels(),
            default_input_size: InputSize::default(),
            normalization: Normalization::default(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("WASTESENSE_MODEL_CANDIDATES") {
            let candidates = split_list(&v);
            if candidates.is_empty() {
                return Err(ConfigError::invalid(
                    "WASTESENSE_MODEL_CANDIDATES",
                    "at least one candidate is required",
                ));
            }
            config.model_candidates = candidates.into_iter().map(PathBuf::from).collect();
        }

        if let Some(v) = lookup("WASTESENSE_LABEL_CANDIDATES") {
            config.label_candidates = split_list(&v).into_iter().map(PathBuf::from).collect();
        }

        if let Some(repo_id) = lookup("WASTESENSE_MODEL_REPO").filter(|v| !v.trim().is_empty()) {
            config.remote = Some(RemoteConfig {
                repo_id: repo_id.trim().to_string(),
                model_file: lookup("WASTESENSE_REMOTE_MODEL_FILE")
                    .unwrap_or_else(default_remote_model_file),
                labels_file: lookup("WASTESENSE_REMOTE_LABELS_FILE")
                    .unwrap_or_else(default_remote_labels_file),
                token: lookup("WASTESENSE_HF_TOKEN"),
                cache_dir: lookup("WASTESENSE_HF_CACHE_DIR").map(PathBuf::from),
            });
        }

        if let Some(v) = lookup("WASTESENSE_DEFAULT_LABELS") {
            let labels = split_list(&v);
            if labels.is_empty() {
                return Err(ConfigError::invalid(
                    "WASTESENSE_DEFAULT_LABELS",
                    "at least one label is required",
                ));
            }
            config.default_labels = labels;
        }

        if let Some(v) = lookup("WASTESENSE_DEFAULT_INPUT_SIZE") {
            config.default_input_size = v
                .parse()
                .map_err(|e: String| ConfigError::invalid("WASTESENSE_DEFAULT_INPUT_SIZE", e))?;
        }

        if let Some(v) = lookup("WASTESENSE_NORMALIZATION") {
            config.normalization = v
                .parse()
                .map_err(|e: String| ConfigError::invalid("WASTESENSE_NORMALIZATION", e))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert!(config.remote.is_none());
        assert_eq!(config.default_input_size, InputSize { height: 224, width: 224 });
        assert_eq!(config.default_labels[0], "Battery");
        assert_eq!(config.default_labels.len(), 6);
    }

    #[test]
    fn test_remote_enabled_by_repo_id() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("WASTESENSE_MODEL_REPO", "org/wastewatcher"),
            ("WASTESENSE_REMOTE_MODEL_FILE", "classifier.tflite"),
        ]))
        .unwrap();
        let remote = config.remote.unwrap();
        assert_eq!(remote.repo_id, "org/wastewatcher");
        assert_eq!(remote.model_file, "classifier.tflite");
        assert_eq!(remote.labels_file, "labels.json");
        assert!(remote.token.is_none());
    }

    #[test]
    fn test_blank_repo_disables_remote() {
        let config =
            ServiceConfig::from_lookup(lookup(&[("WASTESENSE_MODEL_REPO", "  ")])).unwrap();
        assert!(config.remote.is_none());
    }

    #[test]
    fn test_candidate_lists() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("WASTESENSE_MODEL_CANDIDATES", "a.model, b.model"),
            ("WASTESENSE_DEFAULT_LABELS", "Paper,Cardboard"),
        ]))
        .unwrap();
        assert_eq!(
            config.model_candidates,
            vec![PathBuf::from("a.model"), PathBuf::from("b.model")]
        );
        assert_eq!(config.default_labels, vec!["Paper", "Cardboard"]);
    }

    #[test]
    fn test_invalid_values() {
        let err = ServiceConfig::from_lookup(lookup(&[(
            "WASTESENSE_DEFAULT_INPUT_SIZE",
            "224",
        )]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "WASTESENSE_DEFAULT_INPUT_SIZE",
                ..
            }
        ));

        assert!(
            ServiceConfig::from_lookup(lookup(&[("WASTESENSE_MODEL_CANDIDATES", " , ")])).is_err()
        );
        assert!(ServiceConfig::from_lookup(lookup(&[("WASTESENSE_NORMALIZATION", "zscore")])).is_err());
    }

    #[test]
    fn test_input_size_parse() {
        assert_eq!(
            "300x260".parse::<InputSize>().unwrap(),
            InputSize { height: 300, width: 260 }
        );
        assert!("0x224".parse::<InputSize>().is_err());
        assert!("axb".parse::<InputSize>().is_err());
    }
}
