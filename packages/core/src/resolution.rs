//! Tagged outcome of a startup resolution step
//!
//! Every fallback chain (remote -> local model, label file -> defaults,
//! declared input shape -> default size) reports which branch it took so the
//! degradation stays observable on the health surface.

use serde::Serialize;
use std::fmt;

/// Where a resolved value came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactSource {
    /// Downloaded from a remote artifact store
    Remote { repo_id: String },
    /// Found on the local filesystem
    Local,
    /// Read from the loaded model itself
    Introspected,
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactSource::Remote { repo_id } => write!(f, "remote:{}", repo_id),
            ArtifactSource::Local => write!(f, "local"),
            ArtifactSource::Introspected => write!(f, "introspected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Resolved { value: T, source: ArtifactSource },
    Fallback { value: T, reason: String },
    Failed { reason: String },
}

impl<T> Resolution<T> {
    pub fn resolved(value: T, source: ArtifactSource) -> Self {
        Resolution::Resolved { value, source }
    }

    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Resolution::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Resolution::Failed {
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Resolution::Resolved { value, .. } | Resolution::Fallback { value, .. } => Some(value),
            Resolution::Failed { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Resolution::Resolved { value, .. } | Resolution::Fallback { value, .. } => Some(value),
            Resolution::Failed { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback { .. })
    }

    /// The tag without the payload, for status reporting
    pub fn describe(&self) -> String {
        match self {
            Resolution::Resolved { source, .. } => format!("resolved ({})", source),
            Resolution::Fallback { reason, .. } => format!("fallback ({})", reason),
            Resolution::Failed { reason } => format!("failed ({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_tags() {
        let remote: Resolution<u32> = Resolution::resolved(
            1,
            ArtifactSource::Remote {
                repo_id: "org/model".to_string(),
            },
        );
        assert_eq!(remote.describe(), "resolved (remote:org/model)");

        let fallback = Resolution::fallback(2, "labels.json not found");
        assert_eq!(fallback.describe(), "fallback (labels.json not found)");
        assert!(fallback.is_fallback());

        let failed: Resolution<u32> = Resolution::failed("nothing on disk");
        assert_eq!(failed.value(), None);
        assert_eq!(failed.describe(), "failed (nothing on disk)");
    }
}
