//! Remote image generation.
//!
//! The [`ImageGenerator`] trait is the seam between the pipeline and the
//! network. [`GeminiClient`] is the production implementation; tests drive
//! the pipeline with a recording mock instead.
//!
//! | Piece | Role |
//! |---|---|
//! | [`prompt`] | color → localized instruction lookup |
//! | [`wire`] | `generateContent` request/response bodies |
//! | [`client`] | HTTP transport, status handling |
//! | [`extract_image`] | first-image-wins response parsing |

pub mod client;
pub mod prompt;
pub mod wire;

pub use client::GeminiClient;

use crate::credentials::Credentials;
use crate::types::{ColorChoice, EncodedImage};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use wire::GenerateContentResponse;

/// Cloneable so the pipeline can keep the error that failed a cycle while
/// also handing it to the caller.
#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("no API key configured: run `idphoto key set <key>` or build with APP_GEMINI_API_KEY")]
    MissingCredentials,
    #[error("request to the generation service failed: {0}")]
    Transport(#[source] Arc<reqwest::Error>),
    #[error("generation service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unreadable response from the generation service: {0}")]
    InvalidResponse(String),
    #[error("the generation service returned no image")]
    NoImageInResponse,
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(Arc::new(e))
    }
}

/// Something that can repaint a portrait's background.
///
/// Implementations must resolve credentials before doing any I/O and must
/// not retry.
pub trait ImageGenerator {
    fn generate(
        &self,
        image: &EncodedImage,
        color: ColorChoice,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<EncodedImage, GenerationError>>;
}

/// Pick the first inline image out of a response.
///
/// Text parts are logged and skipped. Parts after the first image are not
/// considered; if any of them are images, that is logged at debug level.
pub fn extract_image(response: &GenerateContentResponse) -> Result<EncodedImage, GenerationError> {
    let mut parts = response.parts();
    for part in parts.by_ref() {
        if let Some(text) = part.text.as_deref() {
            tracing::info!(text, "model replied with text");
        } else if let Some(inline) = &part.inline_data {
            let image = EncodedImage::from_base64(&inline.mime_type, &inline.data)
                .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
            let ignored = parts.filter(|p| p.inline_data.is_some()).count();
            if ignored > 0 {
                tracing::debug!(ignored, "additional image parts in response were ignored");
            }
            tracing::info!(mime = image.mime_type(), bytes = image.len(), "received image");
            return Ok(image);
        }
    }
    tracing::warn!(finish_reasons = ?response.finish_reasons(), "response carried no image");
    Err(GenerationError::NoImageInResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn text_only_response_has_no_image() {
        let r = response(json!({
            "candidates": [{ "content": { "parts": [{ "text": "I can't do that." }] } }]
        }));
        assert!(matches!(
            extract_image(&r),
            Err(GenerationError::NoImageInResponse)
        ));
    }

    #[test]
    fn empty_response_has_no_image() {
        let r = response(json!({}));
        assert!(matches!(
            extract_image(&r),
            Err(GenerationError::NoImageInResponse)
        ));
    }

    #[test]
    fn first_image_wins() {
        let r = response(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Here you go" },
                { "inlineData": { "mimeType": "image/png", "data": "AQID" } },
                { "inlineData": { "mimeType": "image/jpeg", "data": "BAUG" } }
            ]}}]
        }));
        let image = extract_image(&r).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.bytes(), &[1, 2, 3]);
        assert_eq!(image.to_data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn undecodable_payload_is_invalid_response() {
        let r = response(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "not base64!" } }
            ]}}]
        }));
        assert!(matches!(
            extract_image(&r),
            Err(GenerationError::InvalidResponse(_))
        ));
    }
}
