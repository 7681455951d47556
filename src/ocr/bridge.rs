use std::time::Duration;

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Produces a document text annotation for an encoded raster image. The
/// returned value is the raw response, kept verbatim for persistence.
pub trait OcrClient {
    fn annotate(&self, image: &[u8]) -> Result<Value>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionConfig {
    pub api_key: String,
    pub endpoint: String,
    pub language_hints: Vec<String>,
    pub timeout: Duration,
}

impl VisionConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            language_hints: Vec::new(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_language_hints(mut self, hints: Vec<String>) -> Self {
        self.language_hints = hints;
        self
    }
}

/// Cloud Vision `DOCUMENT_TEXT_DETECTION` over the REST API.
#[derive(Debug, Clone)]
pub struct VisionClient {
    config: VisionConfig,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequest<'a> {
    requests: [ImageRequest<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageRequest<'a> {
    image: ImageContent,
    features: [Feature; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    image_context: Option<ImageContext<'a>>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext<'a> {
    language_hints: &'a [String],
}

#[derive(Deserialize)]
struct BatchResponse {
    #[serde(default)]
    responses: Vec<Value>,
}

impl VisionClient {
    pub fn new(config: VisionConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            anyhow::bail!("Cloud Vision API key is empty");
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    fn request_body<'a>(&'a self, image: &[u8]) -> BatchRequest<'a> {
        let image_context = (!self.config.language_hints.is_empty()).then(|| ImageContext {
            language_hints: &self.config.language_hints,
        });
        BatchRequest {
            requests: [ImageRequest {
                image: ImageContent {
                    content: general_purpose::STANDARD.encode(image),
                },
                features: [Feature {
                    kind: "DOCUMENT_TEXT_DETECTION",
                }],
                image_context,
            }],
        }
    }
}

impl OcrClient for VisionClient {
    fn annotate(&self, image: &[u8]) -> Result<Value> {
        info!(bytes = image.len(), endpoint = %self.config.endpoint, "requesting text annotation");
        let url = format!("{}?key={}", self.config.endpoint, self.config.api_key);
        let response = self
            .client
            .post(url)
            .json(&self.request_body(image))
            .send()
            .context("failed to call Cloud Vision API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            anyhow::bail!("Cloud Vision API error {status}: {body}");
        }

        let batch: BatchResponse = response
            .json()
            .context("failed to parse Cloud Vision response")?;
        let first = batch
            .responses
            .into_iter()
            .next()
            .context("Cloud Vision returned no responses")?;

        if let Some(error) = first.get("error") {
            anyhow::bail!("Cloud Vision rejected the image: {error}");
        }
        debug!("received text annotation");
        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key() {
        assert!(VisionClient::new(VisionConfig::new(String::new())).is_err());
    }

    #[test]
    fn request_body_matches_annotate_schema() {
        let config = VisionConfig::new("key".to_string()).with_language_hints(vec!["en".into()]);
        let client = VisionClient::new(config).unwrap();
        let body = serde_json::to_value(client.request_body(b"abc")).unwrap();
        let request = &body["requests"][0];
        assert_eq!(request["image"]["content"], "YWJj");
        assert_eq!(request["features"][0]["type"], "DOCUMENT_TEXT_DETECTION");
        assert_eq!(request["imageContext"]["languageHints"][0], "en");
    }
}
