//! Process-wide inference state
//!
//! Built once at startup, then shared read-only by every request.

use crate::artifact::ArtifactResolver;
use crate::compose::{PredictionResult, compose};
use crate::config::{InputSize, ServiceConfig};
use crate::error::{ImageDecodeError, InferenceError, PredictError, StartupError};
use crate::impact::ImpactCatalog;
use crate::labels::LabelBindings;
use crate::model::{Classifier, ModelArtifact, load_model};
use crate::preprocess::{Normalization, Preprocessor};
use crate::resolution::{ArtifactSource, Resolution};
use ndarray::Array4;
use serde::Serialize;

/// How each startup resolution step ended, in display form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub model: String,
    pub labels: String,
    pub input_size: String,
}

impl Default for Provenance {
    fn default() -> Self {
        let direct = Resolution::resolved((), ArtifactSource::Local).describe();
        Self {
            model: direct.clone(),
            labels: direct.clone(),
            input_size: direct,
        }
    }
}

/// Read-only deployment snapshot served on the health endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub status: &'static str,
    pub model_loaded_from: String,
    /// `[height, width]`
    pub input_size: [u32; 2],
    pub classes: Vec<String>,
    pub num_outputs: usize,
    pub normalization: String,
    pub model_source: String,
    pub labels_source: String,
    pub input_size_source: String,
}

pub struct InferenceContext {
    artifact: ModelArtifact,
    classifier: Box<dyn Classifier>,
    labels: LabelBindings,
    catalog: ImpactCatalog,
    preprocessor: Preprocessor,
    provenance: Provenance,
}

impl InferenceContext {
    pub fn new(
        artifact: ModelArtifact,
        classifier: impl Classifier + 'static,
        labels: LabelBindings,
        normalization: Normalization,
    ) -> Self {
        let preprocessor = Preprocessor::new(artifact.input_size(), normalization);
        Self {
            artifact,
            classifier: Box::new(classifier),
            labels,
            catalog: ImpactCatalog::builtin(),
            preprocessor,
            provenance: Provenance::default(),
        }
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Resolves artifacts from the configured sources and loads the model
    pub async fn bootstrap(config: &ServiceConfig) -> Result<Self, StartupError> {
        Self::bootstrap_with(config, ArtifactResolver::from_config(config)).await
    }

    pub async fn bootstrap_with(
        config: &ServiceConfig,
        resolver: ArtifactResolver,
    ) -> Result<Self, StartupError> {
        let resolved = resolver.resolve().await;
        let model_provenance = resolved.model.describe();
        let model_path = match resolved.model {
            Resolution::Resolved { value, .. } | Resolution::Fallback { value, .. } => value,
            Resolution::Failed { reason } => return Err(StartupError::NoModelArtifact { reason }),
        };
        tracing::info!(path = %model_path.display(), source = %model_provenance, "Resolved model artifact");

        let labels = LabelBindings::resolve(
            resolved.labels.as_ref().map(|(p, s)| (p.as_path(), s)),
            &config.default_labels,
        );
        let labels_provenance = labels.describe();
        let labels = labels
            .into_value()
            .unwrap_or_else(|| LabelBindings::new(config.default_labels.clone()));

        let default_size = config.default_input_size;
        let fallback_outputs = labels.len();
        let loaded = tokio::task::spawn_blocking(move || {
            load_model(&model_path, default_size, fallback_outputs)
        })
        .await
        .map_err(|e| StartupError::Join(e.to_string()))??;

        if loaded.artifact.num_outputs != labels.len() {
            tracing::warn!(
                num_outputs = loaded.artifact.num_outputs,
                labels = labels.len(),
                "Label count does not match model outputs"
            );
        }

        let provenance = Provenance {
            model: model_provenance,
            labels: labels_provenance,
            input_size: loaded.input_size.describe(),
        };
        let context = Self::new(
            loaded.artifact,
            loaded.classifier,
            labels,
            config.normalization,
        )
        .with_provenance(provenance);

        let status = context.status();
        tracing::info!(
            model = %status.model_loaded_from,
            input_size = ?status.input_size,
            classes = ?status.classes,
            normalization = %status.normalization,
            "Inference context ready"
        );
        Ok(context)
    }

    pub fn input_size(&self) -> InputSize {
        self.preprocessor.input_size()
    }

    pub fn preprocess(&self, raw: &[u8]) -> Result<Array4<f32>, ImageDecodeError> {
        self.preprocessor.preprocess(raw)
    }

    pub fn infer(&self, tensor: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        self.classifier.infer(tensor)
    }

    pub fn compose(&self, probabilities: &[f32]) -> Result<PredictionResult, InferenceError> {
        compose(probabilities, &self.labels, &self.catalog)
            .ok_or_else(|| InferenceError::new("model produced an empty probability vector"))
    }

    /// Bytes in, response record out
    pub fn predict(&self, raw: &[u8]) -> Result<PredictionResult, PredictError> {
        let tensor = self.preprocess(raw)?;
        let probabilities = self.infer(&tensor)?;
        Ok(self.compose(&probabilities)?)
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: "ok",
            model_loaded_from: self.artifact.source_path.display().to_string(),
            input_size: [self.artifact.input_height, self.artifact.input_width],
            classes: self.labels.as_slice().to_vec(),
            num_outputs: self.artifact.num_outputs,
            normalization: self.preprocessor.normalization().to_string(),
            model_source: self.provenance.model.clone(),
            labels_source: self.provenance.labels.clone(),
            input_size_source: self.provenance.input_size.clone(),
        }
    }
}
