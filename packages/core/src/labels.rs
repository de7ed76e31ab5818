use crate::resolution::{ArtifactSource, Resolution};
use serde::Serialize;
use std::borrow::Cow;
use std::path::Path;

/// Output index to class name, fixed after startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelBindings {
    labels: Vec<String>,
}

impl LabelBindings {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    /// Label for an output index, `class_<idx>` past the end of the list
    pub fn label_for(&self, idx: usize) -> Cow<'_, str> {
        match self.labels.get(idx) {
            Some(label) => Cow::Borrowed(label.as_str()),
            None => Cow::Owned(format!("class_{}", idx)),
        }
    }

    /// Parses a label file: one label per line for `.txt`, a JSON array otherwise
    pub fn parse(path: &Path, contents: &str) -> Result<Self, String> {
        let is_txt = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"));

        let labels: Vec<String> = if is_txt {
            contents
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect()
        } else {
            serde_json::from_str(contents).map_err(|e| e.to_string())?
        };

        if labels.is_empty() {
            return Err("label list is empty".to_string());
        }
        Ok(Self::new(labels))
    }

    /// Reads the resolved label file, falling back to `defaults` on absence or parse failure
    pub fn resolve(
        file: Option<(&Path, &ArtifactSource)>,
        defaults: &[String],
    ) -> Resolution<LabelBindings> {
        let fallback = || LabelBindings::new(defaults.to_vec());

        let Some((path, source)) = file else {
            tracing::warn!("No label file found, using default class names");
            return Resolution::fallback(fallback(), "no label file found");
        };

        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|contents| Self::parse(path, &contents));

        match parsed {
            Ok(labels) => {
                tracing::info!(
                    path = %path.display(),
                    count = labels.len(),
                    "Loaded class names"
                );
                Resolution::resolved(labels, source.clone())
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load label file, using default class names"
                );
                Resolution::fallback(
                    fallback(),
                    format!("failed to load {}: {}", path.display(), e),
                )
            }
        }
    }
}
