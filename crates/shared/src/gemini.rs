use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ai::{GeneratedImage, ImageModel, TextModel};
use crate::error::NewsletterError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-002";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            max_retries: 2,
            retry_backoff: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: String,
    output_mime_type: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

/// Doubles `base` per attempt, saturating instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt))
}

/// An HTTP failure worth retrying, kept apart from permanent failures
#[derive(Debug)]
struct Retryable(anyhow::Error);

/// Client for the Google Generative Language API.
///
/// Retries with exponential backoff on rate limits, server errors and
/// network failures. Callers above this layer never retry.
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    async fn post_with_retry<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de> + Send,
    {
        let mut attempt = 0;
        loop {
            match self.try_post(url, body).await {
                Ok(Ok(parsed)) => return Ok(parsed),
                Ok(Err(Retryable(e))) if attempt < self.config.max_retries => {
                    let backoff = backoff_delay(self.config.retry_backoff, attempt);
                    let error = format!("{:#}", e);
                    tracing::warn!(
                        attempt = attempt + 1,
                        ?backoff,
                        %error,
                        "Gemini request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Ok(Err(Retryable(e))) => return Err(e),
                Err(e) => return Err(e),
            }
        }
    }

    /// Outer error: permanent failure. Inner error: retryable failure.
    async fn try_post<B, R>(&self, url: &str, body: &B) -> Result<std::result::Result<R, Retryable>>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de> + Send,
    {
        let response = match self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let err = anyhow::Error::new(e).context("Failed to send request to Gemini API");
                return Ok(Err(Retryable(err)));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            let err = anyhow::anyhow!("Gemini API error ({}): {}", status, error_text.trim());
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                return Ok(Err(Retryable(err)));
            }
            return Err(err);
        }

        let parsed = response
            .json::<R>()
            .await
            .context("Failed to parse Gemini API response")?;

        Ok(Ok(parsed))
    }

    async fn request_text(&self, prompt: &str, use_search: bool) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.text_model
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            tools: if use_search {
                vec![serde_json::json!({ "google_search": {} })]
            } else {
                Vec::new()
            },
        };

        tracing::debug!(
            model = %self.config.text_model,
            prompt_len = prompt.len(),
            use_search,
            "Requesting text generation"
        );

        let response: GenerateContentResponse = self.post_with_retry(&url, &request).await?;

        let text = response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            anyhow::bail!("Gemini API returned no text");
        }

        Ok(text)
    }

    async fn request_image(&self, prompt: &str) -> Result<GeneratedImage> {
        let url = format!(
            "{}/models/{}:predict",
            self.config.base_url.trim_end_matches('/'),
            self.config.image_model
        );

        let request = PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "16:9".to_string(),
                output_mime_type: "image/png".to_string(),
            },
        };

        tracing::debug!(model = %self.config.image_model, "Requesting image generation");

        let response: PredictResponse = self.post_with_retry(&url, &request).await?;

        let prediction = response
            .predictions
            .into_iter()
            .next()
            .context("Gemini API returned no image")?;
        let encoded = prediction
            .bytes_base64_encoded
            .context("Gemini API returned an image without data")?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .context("Gemini API returned invalid base64 image data")?;

        Ok(GeneratedImage {
            bytes,
            mime_type: prediction
                .mime_type
                .unwrap_or_else(|| "image/png".to_string()),
        })
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate_text(
        &self,
        prompt: &str,
        use_search: bool,
    ) -> Result<String, NewsletterError> {
        self.request_text(prompt, use_search)
            .await
            .map_err(|e| NewsletterError::transport(&e))
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, NewsletterError> {
        self.request_image(prompt)
            .await
            .map_err(|e| NewsletterError::transport(&e))
    }
}
