use crate::error::ApiError;
use crate::payload::{PayloadError, image_from_json};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{StatusCode, header::CONTENT_TYPE};
use axum::{Json, Router, routing::post};
use std::time::Instant;
use wastesense::PredictionResult;

pub fn routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}

#[tracing::instrument(name = "POST /predict", skip(state, request))]
pub async fn predict(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<PredictionResult>, ApiError> {
    let raw = read_image(request).await?;

    let start = Instant::now();
    let result = tokio::task::spawn_blocking(move || state.context.predict(&raw))
        .await
        .map_err(|e| ApiError::internal(format!("Prediction task failed: {}", e)))??;

    metrics::histogram!("inference_duration_seconds").record(start.elapsed().as_secs_f64());
    metrics::counter!("predictions_total", "waste_type" => result.waste_type.clone()).increment(1);

    Ok(Json(result))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

fn body_error(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(message)
    } else {
        ApiError::bad_request(message)
    }
}

/// Raw image bytes from a multipart `image` field or a base64 JSON body
async fn read_image(request: Request) -> Result<Vec<u8>, ApiError> {
    if is_multipart(&request) {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| body_error(e.status(), e.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| body_error(e.status(), e.body_text()))?
        {
            if field.name() == Some("image") {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| body_error(e.status(), e.body_text()))?;
                return Ok(data.to_vec());
            }
        }
        return Err(PayloadError::Missing.into());
    }

    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| body_error(e.status(), e.body_text()))?;
    Ok(image_from_json(&body)?)
}
