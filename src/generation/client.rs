//! HTTP client for the Gemini `generateContent` endpoint.
//!
//! One request per call, no retries. The API key travels only in the
//! `x-goog-api-key` header, never in the URL.

use super::prompt;
use super::wire::{
    Content, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Part,
};
use super::{GenerationError, ImageGenerator, extract_image};
use crate::config::ServiceConfig;
use crate::credentials::Credentials;
use crate::locale::Locale;
use crate::types::{ColorChoice, EncodedImage};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// The service must be allowed to answer with both text and images.
const RESPONSE_MODALITIES: [&str; 2] = ["Text", "Image"];

pub struct GeminiClient {
    http: Client,
    endpoint: String,
    model: String,
    locale: Locale,
}

impl GeminiClient {
    pub fn new(config: &ServiceConfig, locale: Locale) -> Result<Self, GenerationError> {
        Self::with_client_builder(Client::builder(), config, locale)
    }

    /// Like [`new`](Self::new), starting from a caller-prepared HTTP builder
    /// (proxy or TLS settings). User agent and timeout are applied on top.
    pub fn with_client_builder(
        builder: ClientBuilder,
        config: &ServiceConfig,
        locale: Locale,
    ) -> Result<Self, GenerationError> {
        let mut builder = builder.user_agent(concat!("idphoto/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            locale,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }

    /// Instruction text followed by the photo as inline data.
    pub fn build_request(&self, image: &EncodedImage, color: ColorChoice) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(prompt::instruction(color, self.locale)),
                    Part::inline(image.mime_type(), image.base64_payload()),
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: RESPONSE_MODALITIES.iter().map(|m| m.to_string()).collect(),
            },
        }
    }
}

/// Turn a non-2xx body into an `Api` error, preferring the API's own message.
fn api_error(status: u16, body: &str) -> GenerationError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| env.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        });
    GenerationError::Api { status, message }
}

impl ImageGenerator for GeminiClient {
    async fn generate(
        &self,
        image: &EncodedImage,
        color: ColorChoice,
        credentials: &Credentials,
    ) -> Result<EncodedImage, GenerationError> {
        let (key, source) = credentials.resolve_with_source()?;
        let body = self.build_request(image, color);

        tracing::debug!(
            model = %self.model,
            %color,
            key_source = ?source,
            mime = image.mime_type(),
            bytes = image.len(),
            "sending generation request"
        );

        let response = self
            .http
            .post(self.url())
            .header(API_KEY_HEADER, key.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let err = api_error(status.as_u16(), &text);
            tracing::warn!(error = %err, "generation request rejected");
            return Err(err);
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        extract_image(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::png_image;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client(endpoint: &str, locale: Locale) -> GeminiClient {
        let config = ServiceConfig {
            endpoint: endpoint.to_string(),
            ..ServiceConfig::default()
        };
        local_client(&config, locale)
    }

    /// Loopback test servers must not be routed through an ambient proxy.
    fn local_client(config: &ServiceConfig, locale: Locale) -> GeminiClient {
        GeminiClient::with_client_builder(Client::builder().no_proxy(), config, locale).unwrap()
    }

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(
        status_line: &'static str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 8192];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    #[test]
    fn url_joins_endpoint_and_model() {
        let c = client("https://example.test/", Locale::ZhCn);
        assert_eq!(
            c.url(),
            "https://example.test/v1beta/models/gemini-2.0-flash-exp-image-generation:generateContent"
        );
    }

    #[test]
    fn request_carries_instruction_and_bare_payload() {
        let c = client("https://example.test", Locale::ZhCn);
        let image = EncodedImage::new("image/jpeg", vec![1, 2, 3, 4]);
        let request = c.build_request(&image, ColorChoice::Red);

        let parts = &request.contents[0].parts;
        assert_eq!(parts.len(), 2);
        assert!(parts[0].text.as_deref().unwrap().contains("红色"));
        let inline = parts[1].inline_data.as_ref().unwrap();
        assert_eq!(inline.mime_type, "image/jpeg");
        assert_eq!(inline.data, "AQIDBA==");
        assert!(!inline.data.starts_with("data:"));
        assert_eq!(
            request.generation_config.response_modalities,
            vec!["Text", "Image"]
        );
    }

    #[test]
    fn instruction_follows_locale() {
        let c = client("https://example.test", Locale::En);
        let image = EncodedImage::new("image/png", vec![0]);
        let request = c.build_request(&image, ColorChoice::Blue);
        assert!(request.contents[0].parts[0].text.as_deref().unwrap().contains("blue"));
    }

    #[test]
    fn api_error_prefers_json_message() {
        let err = api_error(
            400,
            r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#,
        );
        assert!(matches!(
            err,
            GenerationError::Api { status: 400, ref message } if message == "API key not valid"
        ));
        let err = api_error(502, "  Bad Gateway  ");
        assert!(matches!(
            err,
            GenerationError::Api { status: 502, ref message } if message == "Bad Gateway"
        ));
        let err = api_error(500, "");
        assert!(matches!(
            err,
            GenerationError::Api { ref message, .. } if message == "empty response body"
        ));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        // Nothing listens on the discard port; a request would be a transport error.
        let c = client("http://127.0.0.1:9", Locale::ZhCn);
        let err = c
            .generate(&png_image(4, 4), ColorChoice::Red, &Credentials::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MissingCredentials));
    }

    #[tokio::test]
    async fn successful_round_trip_returns_first_image() {
        let generated = png_image(8, 8);
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Done." },
                { "inlineData": { "mimeType": "image/png", "data": generated.base64_payload() } }
            ]}}]
        })
        .to_string();
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", body).await;

        let c = client(&endpoint, Locale::ZhCn);
        let creds = Credentials::new(Some("user-key".into()), Some("default-key".into()));
        let result = c
            .generate(&png_image(4, 4), ColorChoice::Blue, &creds)
            .await
            .unwrap();
        assert_eq!(result, generated);

        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /v1beta/models/"), "{request}");
        assert!(lower.contains("user-agent: idphoto/"), "{request}");
        assert!(lower.contains("x-goog-api-key: user-key"), "{request}");
        assert!(!request.contains("key=user-key"));
        assert!(!request.contains("default-key"));
        assert!(request.contains("蓝色"));
    }

    #[tokio::test]
    async fn text_only_reply_is_no_image() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Sorry"}]}}]}"#.to_string();
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", body).await;

        let c = client(&endpoint, Locale::ZhCn);
        let creds = Credentials::new(Some("k".into()), None);
        let err = c
            .generate(&png_image(4, 4), ColorChoice::Red, &creds)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NoImageInResponse));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn http_error_status_is_api_error() {
        let body = r#"{"error":{"code":403,"message":"permission denied"}}"#.to_string();
        let (endpoint, server) = serve_once("HTTP/1.1 403 Forbidden", body).await;

        let c = client(&endpoint, Locale::ZhCn);
        let creds = Credentials::new(None, Some("k".into()));
        let err = c
            .generate(&png_image(4, 4), ColorChoice::Red, &creds)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Api { status: 403, ref message } if message == "permission denied"
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let c = client(&format!("http://{addr}"), Locale::ZhCn);
        let creds = Credentials::new(Some("k".into()), None);
        let err = c
            .generate(&png_image(4, 4), ColorChoice::Red, &creds)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
    }

    #[tokio::test]
    async fn configured_timeout_aborts_a_stalled_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept, then never answer.
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let config = ServiceConfig {
            endpoint: format!("http://{addr}"),
            timeout_secs: Some(1),
            ..ServiceConfig::default()
        };
        let c = local_client(&config, Locale::ZhCn);
        let creds = Credentials::new(Some("k".into()), None);
        let err = c
            .generate(&png_image(4, 4), ColorChoice::Red, &creds)
            .await
            .unwrap_err();
        assert!(
            matches!(err, GenerationError::Transport(ref e) if e.is_timeout()),
            "{err:?}"
        );
        server.abort();
    }
}
