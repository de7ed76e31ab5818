//! Model loading, input-shape inference and the forward pass
//!
//! Artifacts are NHWC float classifiers. `.tflite` files load through the
//! TFLite frontend, anything else is treated as ONNX.

use crate::artifact::is_tflite;
use crate::config::InputSize;
use crate::error::{InferenceError, StartupError};
use crate::resolution::{ArtifactSource, Resolution};
use ndarray::Array4;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tract_onnx::prelude::*;

/// Identity and derived metadata of the loaded classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelArtifact {
    pub source_path: PathBuf,
    pub input_height: u32,
    pub input_width: u32,
    pub num_outputs: usize,
}

impl ModelArtifact {
    pub fn input_size(&self) -> InputSize {
        InputSize {
            height: self.input_height,
            width: self.input_width,
        }
    }
}

/// Runs a forward pass over a `(1, H, W, 3)` batch
///
/// Implementations must be deterministic for a fixed input.
pub trait Classifier: Send + Sync {
    fn infer(&self, tensor: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

/// Reads `(H, W)` from an NHWC shape whose dims 1 and 2 are known and positive
pub fn input_size_from_dims(dims: &[Option<usize>]) -> Option<InputSize> {
    if dims.len() < 3 {
        return None;
    }
    match (dims[1], dims[2]) {
        (Some(h), Some(w)) if h > 0 && w > 0 => Some(InputSize {
            height: u32::try_from(h).ok()?,
            width: u32::try_from(w).ok()?,
        }),
        _ => None,
    }
}

fn declared_dims(model: &TypedModel) -> TractResult<Vec<Option<usize>>> {
    let fact = model.input_fact(0)?;
    Ok(fact.shape.iter().map(concrete_dim).collect())
}

fn concrete_dim(dim: &TDim) -> Option<usize> {
    dim.to_i64().ok().and_then(|v| usize::try_from(v).ok())
}

/// Declared input size of the model, or `default` on any anomaly
pub fn infer_input_size(model: &TypedModel, default: InputSize) -> Resolution<InputSize> {
    match declared_dims(model) {
        Ok(dims) => match input_size_from_dims(&dims) {
            Some(size) => Resolution::resolved(size, ArtifactSource::Introspected),
            None => {
                tracing::warn!(?dims, "Input shape is not concrete, using default input size");
                Resolution::fallback(default, format!("input shape {:?} is not concrete", dims))
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Input shape introspection failed, using default input size");
            Resolution::fallback(default, format!("introspection failed: {}", e))
        }
    }
}

fn concrete_input(size: InputSize) -> TypedFact {
    f32::fact([1, size.height as usize, size.width as usize, 3])
}

/// Parses the artifact and pins its input to a single-image batch
fn load_typed(path: &Path, default_size: InputSize) -> TractResult<(TypedModel, Resolution<InputSize>)> {
    if is_tflite(path) {
        let model = tract_tflite::tflite().model_for_path(path)?;
        let input_size = infer_input_size(&model, default_size);
        let size = *input_size.value().unwrap_or(&default_size);
        let model = model.with_input_fact(0, concrete_input(size))?;
        return Ok((model, input_size));
    }

    let model = tract_onnx::onnx().model_for_path(path)?;
    // An untypeable graph still loads, pinned to the default size
    let input_size = match model.clone().into_typed() {
        Ok(typed) => infer_input_size(&typed, default_size),
        Err(e) => {
            tracing::warn!(error = %e, "Input shape introspection failed, using default input size");
            Resolution::fallback(default_size, format!("introspection failed: {}", e))
        }
    };
    let size = *input_size.value().unwrap_or(&default_size);
    let model = model
        .with_input_fact(0, concrete_input(size).into())?
        .into_typed()?;
    Ok((model, input_size))
}

/// Classifier backed by an optimized tract plan
pub struct TractClassifier {
    /// Forward passes are serialized through this lock
    plan: Mutex<TypedRunnableModel<TypedModel>>,
    num_outputs: Option<usize>,
}

impl TractClassifier {
    fn build(model: TypedModel) -> TractResult<Self> {
        let plan = model.into_optimized()?.into_runnable()?;
        let num_outputs = plan
            .model()
            .output_fact(0)
            .ok()
            .and_then(|f| f.shape.last().and_then(concrete_dim))
            .filter(|n| *n > 0);
        Ok(Self {
            plan: Mutex::new(plan),
            num_outputs,
        })
    }

    /// Output width declared by the optimized model, when concrete
    pub fn num_outputs(&self) -> Option<usize> {
        self.num_outputs
    }
}

impl Classifier for TractClassifier {
    fn infer(&self, tensor: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let data = tensor
            .as_slice()
            .ok_or_else(|| InferenceError::new("input tensor is not contiguous"))?;
        let input = Tensor::from_shape(tensor.shape(), data)
            .map_err(|e| InferenceError::new(format!("invalid input tensor: {}", e)))?;

        let plan = self
            .plan
            .lock()
            .map_err(|_| InferenceError::new("model lock poisoned"))?;
        let outputs = plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::new(format!("{:#}", e)))?;
        drop(plan);

        let first = outputs
            .first()
            .ok_or_else(|| InferenceError::new("model produced no outputs"))?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::new(format!("output is not f32: {}", e)))?;

        // Row 0 of the (1, N) batch
        Ok(view.iter().copied().collect())
    }
}

/// Loaded classifier together with how its metadata was resolved
pub struct LoadedModel {
    pub artifact: ModelArtifact,
    pub classifier: TractClassifier,
    pub input_size: Resolution<InputSize>,
}

/// Loads the artifact at `path`, inferring input size and output width
///
/// `fallback_outputs` is used when the model does not declare a concrete
/// output width.
pub fn load_model(
    path: &Path,
    default_size: InputSize,
    fallback_outputs: usize,
) -> Result<LoadedModel, StartupError> {
    let load_error = |e: TractError| StartupError::ModelLoad {
        path: path.to_path_buf(),
        message: format!("{:#}", e),
    };

    tracing::info!(path = %path.display(), "Loading model");
    let (model, input_size) = load_typed(path, default_size).map_err(load_error)?;
    let size = *input_size.value().unwrap_or(&default_size);

    let classifier = TractClassifier::build(model).map_err(load_error)?;
    let num_outputs = match classifier.num_outputs() {
        Some(n) => n,
        None => {
            tracing::warn!(
                fallback_outputs,
                "Output width is not concrete, assuming label count"
            );
            fallback_outputs
        }
    };

    tracing::info!(
        height = size.height,
        width = size.width,
        num_outputs,
        "Model loaded"
    );

    Ok(LoadedModel {
        artifact: ModelArtifact {
            source_path: path.to_path_buf(),
            input_height: size.height,
            input_width: size.width,
            num_outputs,
        },
        classifier,
        input_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_size_from_concrete_dims() {
        assert_eq!(
            input_size_from_dims(&[None, Some(300), Some(260), Some(3)]),
            Some(InputSize {
                height: 300,
                width: 260
            })
        );
        assert_eq!(
            input_size_from_dims(&[Some(1), Some(224), Some(224)]),
            Some(InputSize::default())
        );
    }

    #[test]
    fn test_concrete_dim() {
        assert_eq!(concrete_dim(&TDim::Val(224)), Some(224));
        assert_eq!(concrete_dim(&TDim::Val(-1)), None);
    }

    #[test]
    fn test_input_size_anomalies() {
        assert_eq!(input_size_from_dims(&[]), None);
        assert_eq!(input_size_from_dims(&[Some(1), Some(224)]), None);
        assert_eq!(input_size_from_dims(&[None, None, Some(224), Some(3)]), None);
        assert_eq!(input_size_from_dims(&[None, Some(0), Some(224), Some(3)]), None);
    }

    #[test]
    fn test_load_missing_file_is_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.onnx");
        let err = load_model(&path, InputSize::default(), 6).err().unwrap();
        assert!(matches!(err, StartupError::ModelLoad { .. }));
    }
}
