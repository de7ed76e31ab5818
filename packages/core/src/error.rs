//! Error types for the inference pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Invalid startup configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: &'static str, message: String },
}

impl ConfigError {
    pub fn invalid(var: &'static str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            var,
            message: message.into(),
        }
    }
}

/// Failure while fetching an artifact from a remote store
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Remote store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Failed to fetch {filename} from {repo_id}: {message}")]
    Fetch {
        repo_id: String,
        filename: String,
        message: String,
    },

    #[error("Fetched {filename} but {path} does not exist")]
    MissingDownload { filename: String, path: PathBuf },
}

/// Fatal errors that prevent the service from serving traffic
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("No model artifact could be resolved: {reason}")]
    NoModelArtifact { reason: String },

    #[error("Failed to load model from {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    #[error("Startup task failed: {0}")]
    Join(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The request payload is not a decodable image
#[derive(Error, Debug)]
pub enum ImageDecodeError {
    #[error("Empty image payload")]
    Empty,

    #[error("Invalid image payload: {0}")]
    Decode(#[from] image::ImageError),
}

/// The forward pass failed
#[derive(Error, Debug)]
#[error("Inference failed: {message}")]
pub struct InferenceError {
    pub message: String,
}

impl InferenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Per-request failure of the predict pipeline
#[derive(Error, Debug)]
pub enum PredictError {
    #[error(transparent)]
    ImageDecode(#[from] ImageDecodeError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictError {
    /// Whether the failure was caused by the caller's payload
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::ImageDecode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_error_classification() {
        let decode: PredictError = ImageDecodeError::Empty.into();
        assert!(decode.is_client_error());

        let inference: PredictError = InferenceError::new("shape mismatch").into();
        assert!(!inference.is_client_error());
        assert_eq!(inference.to_string(), "Inference failed: shape mismatch");
    }
}
