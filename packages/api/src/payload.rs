//! Image intake for `/predict`

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;
use thiserror::Error;

/// Standard alphabet, padding optional
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PayloadError {
    #[error("No image provided")]
    Missing,

    #[error("Invalid base64 image: {0}")]
    Base64(String),
}

#[derive(Deserialize)]
struct JsonImage {
    image: Option<String>,
}

/// Drops a `data:<mime>;base64,` header by splitting at the first comma
pub fn strip_data_url(encoded: &str) -> &str {
    match encoded.split_once(',') {
        Some((_, data)) => data,
        None => encoded,
    }
}

pub fn decode_base64_image(encoded: &str) -> Result<Vec<u8>, PayloadError> {
    let compact: String = strip_data_url(encoded)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(PayloadError::Missing);
    }
    LENIENT
        .decode(compact.as_bytes())
        .map_err(|e| PayloadError::Base64(e.to_string()))
}

/// Reads `{"image": "<base64>"}` from a body of any content type
///
/// A body that is not JSON, or has no `image` string, counts as missing.
pub fn image_from_json(body: &[u8]) -> Result<Vec<u8>, PayloadError> {
    let parsed: JsonImage = serde_json::from_slice(body).map_err(|_| PayloadError::Missing)?;
    match parsed.image {
        Some(encoded) => decode_base64_image(&encoded),
        None => Err(PayloadError::Missing),
    }
}
