//! Model and label artifact resolution
//!
//! A configured remote repository is tried first. A model fetched from it
//! short-circuits the local candidates; otherwise the local candidates are
//! tried in order. Label files follow the same order but are optional.

use crate::config::{RemoteConfig, ServiceConfig};
use crate::error::ArtifactError;
use crate::resolution::{ArtifactSource, Resolution};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A store that materializes named artifacts from a repository onto local disk
#[async_trait]
pub trait RemoteArtifactStore: Send + Sync {
    async fn fetch(&self, repo_id: &str, filename: &str) -> Result<PathBuf, ArtifactError>;
}

/// Hugging Face Hub backed store, downloads land in the hub cache
pub struct HfHubStore {
    api: hf_hub::api::tokio::Api,
}

impl HfHubStore {
    pub fn new(remote: &RemoteConfig) -> Result<Self, ArtifactError> {
        let mut builder = hf_hub::api::tokio::ApiBuilder::new()
            .with_progress(false)
            .with_token(remote.token.clone());
        if let Some(dir) = &remote.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder
            .build()
            .map_err(|e| ArtifactError::StoreUnavailable(e.to_string()))?;
        Ok(Self { api })
    }
}

#[async_trait]
impl RemoteArtifactStore for HfHubStore {
    async fn fetch(&self, repo_id: &str, filename: &str) -> Result<PathBuf, ArtifactError> {
        self.api
            .model(repo_id.to_string())
            .get(filename)
            .await
            .map_err(|e| ArtifactError::Fetch {
                repo_id: repo_id.to_string(),
                filename: filename.to_string(),
                message: e.to_string(),
            })
    }
}

struct RemoteSource {
    repo_id: String,
    model_file: String,
    labels_file: String,
    store: Arc<dyn RemoteArtifactStore>,
}

/// Outcome of artifact resolution
#[derive(Debug)]
pub struct ResolvedArtifacts {
    pub model: Resolution<PathBuf>,
    /// Absent when neither the remote nor any local candidate has a label file
    pub labels: Option<(PathBuf, ArtifactSource)>,
}

pub struct ArtifactResolver {
    model_candidates: Vec<PathBuf>,
    label_candidates: Vec<PathBuf>,
    remote: Option<RemoteSource>,
}

impl ArtifactResolver {
    pub fn new(model_candidates: Vec<PathBuf>, label_candidates: Vec<PathBuf>) -> Self {
        Self {
            model_candidates,
            label_candidates,
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: &RemoteConfig, store: Arc<dyn RemoteArtifactStore>) -> Self {
        self.remote = Some(RemoteSource {
            repo_id: remote.repo_id.clone(),
            model_file: remote.model_file.clone(),
            labels_file: remote.labels_file.clone(),
            store,
        });
        self
    }

    /// Resolver for the configured sources, backed by the Hugging Face Hub when a repository is set
    pub fn from_config(config: &ServiceConfig) -> Self {
        let resolver = Self::new(
            config.model_candidates.clone(),
            config.label_candidates.clone(),
        );
        let Some(remote) = &config.remote else {
            return resolver;
        };
        match HfHubStore::new(remote) {
            Ok(store) => resolver.with_remote(remote, Arc::new(store)),
            Err(e) => {
                tracing::warn!(error = %e, "Remote artifact store disabled");
                resolver
            }
        }
    }

    pub async fn resolve(&self) -> ResolvedArtifacts {
        let mut remote_model = None;
        let mut remote_labels = None;

        if let Some(remote) = &self.remote {
            tracing::info!(repo_id = %remote.repo_id, "Fetching artifacts from remote repository");
            let source = ArtifactSource::Remote {
                repo_id: remote.repo_id.clone(),
            };

            match fetch_existing(remote, &remote.model_file).await {
                Ok(path) => remote_model = Some((path, source.clone())),
                Err(e) => tracing::warn!(error = %e, "Remote model fetch failed"),
            }
            match fetch_existing(remote, &remote.labels_file).await {
                Ok(path) => remote_labels = Some((path, source)),
                Err(e) => tracing::warn!(error = %e, "Remote label fetch failed"),
            }
        }

        let model = match remote_model {
            Some((path, source)) => Resolution::resolved(path, source),
            None => match first_existing(&self.model_candidates) {
                Some(path) => Resolution::resolved(path, ArtifactSource::Local),
                None => Resolution::failed(format!(
                    "none of the model candidates exist: {}",
                    display_list(&self.model_candidates)
                )),
            },
        };

        let labels = remote_labels.or_else(|| {
            first_existing(&self.label_candidates).map(|path| (path, ArtifactSource::Local))
        });

        ResolvedArtifacts { model, labels }
    }
}

async fn fetch_existing(remote: &RemoteSource, filename: &str) -> Result<PathBuf, ArtifactError> {
    let path = remote.store.fetch(&remote.repo_id, filename).await?;
    if path.is_file() {
        Ok(path)
    } else {
        Err(ArtifactError::MissingDownload {
            filename: filename.to_string(),
            path,
        })
    }
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_file()).cloned()
}

fn display_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// True for artifacts that should go through the TFLite frontend
pub fn is_tflite(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tflite"))
}
