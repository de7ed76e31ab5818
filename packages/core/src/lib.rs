//! WasteSense inference core
//!
//! Classifies an uploaded waste image and maps the predicted category to a
//! static table of environmental impact metadata.
//!
//! ```text
//! raw bytes -> Preprocessor -> tensor -> Classifier -> probabilities
//!           -> compose (LabelBindings + ImpactCatalog) -> PredictionResult
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wastesense::{InferenceContext, ServiceConfig};
//!
//! let config = ServiceConfig::from_env()?;
//! let context = InferenceContext::bootstrap(&config).await?;
//! let result = context.predict(&image_bytes)?;
//! ```

pub mod artifact;
pub mod compose;
pub mod config;
pub mod context;
pub mod error;
pub mod impact;
pub mod labels;
pub mod model;
pub mod preprocess;
pub mod resolution;

pub use artifact::{ArtifactResolver, HfHubStore, RemoteArtifactStore, ResolvedArtifacts};
pub use compose::{PredictionResult, argmax, compose};
pub use config::{DEFAULT_CLASS_NAMES, InputSize, RemoteConfig, ServiceConfig};
pub use context::{InferenceContext, Provenance, StatusSnapshot};
pub use error::{
    ArtifactError, ConfigError, ImageDecodeError, InferenceError, PredictError, StartupError,
};
pub use impact::{ImpactCatalog, ImpactRecord};
pub use labels::LabelBindings;
pub use model::{Classifier, ModelArtifact, TractClassifier, load_model};
pub use preprocess::{Normalization, Preprocessor};
pub use resolution::{ArtifactSource, Resolution};
