//! Anthropic Messages API client
//!
//! Sends a label image plus the extraction prompt to a Claude model and
//! returns the text of its reply.

use crate::backend::VisionBackend;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use core_pipeline::{ExtractionRequest, PipelineError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
/// Optional environment variable overriding the API base URL
pub const BASE_URL_VAR: &str = "ANTHROPIC_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Configuration for the Anthropic client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key sent as `x-api-key`
    pub api_key: String,
    /// Base URL without the `/v1/messages` path
    pub base_url: String,
    /// Value of the `anthropic-version` header
    pub api_version: String,
    /// Upper bound on reply length
    pub max_tokens: u32,
    /// Request timeout; `None` keeps the transport default
    pub timeout_secs: Option<u64>,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: None,
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> core_pipeline::Result<Self> {
        Self::from_vars(
            std::env::var(API_KEY_VAR).ok(),
            std::env::var(BASE_URL_VAR).ok(),
        )
    }

    /// Build config from already-read variable values
    pub fn from_vars(
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> core_pipeline::Result<Self> {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| PipelineError::MissingCredential(API_KEY_VAR.to_string()))?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = base_url.filter(|url| !url.trim().is_empty()) {
            config.base_url = base_url.trim().trim_end_matches('/').to_string();
        }
        Ok(config)
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

/// Anthropic API client
pub struct AnthropicClient {
    config: AnthropicConfig,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a new Anthropic client
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    /// Ask `model` about one image and return the concatenated reply text
    pub async fn describe_image(
        &self,
        model: &str,
        prompt: &str,
        media_type: &'static str,
        image_bytes: &[u8],
    ) -> Result<String> {
        let request = MessagesRequest {
            model,
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type,
                            data: general_purpose::STANDARD.encode(image_bytes),
                        },
                    },
                    ContentBlock::Text { text: prompt },
                ],
            }],
        };

        let response = self
            .client
            .post(self.config.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Anthropic API error ({}): {}",
                status,
                api_error_message(&error_text)
            );
        }

        let reply: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        if let Some(usage) = &reply.usage {
            info!(
                "{} used {} input / {} output tokens",
                model, usage.input_tokens, usage.output_tokens
            );
        }
        debug!("{} stop reason: {:?}", model, reply.stop_reason);

        reply.text().context("No text in Anthropic response")
    }
}

#[async_trait]
impl VisionBackend for AnthropicClient {
    async fn complete(&self, request: &ExtractionRequest<'_>) -> Result<String> {
        self.describe_image(
            &request.model.id,
            request.prompt,
            request.image.media_type.as_str(),
            &request.image.bytes,
        )
        .await
    }
}

/// Pull `error.message` out of an API error body, falling back to the body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Messages API request structure
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: String,
}

/// Messages API response structure
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

impl MessagesResponse {
    fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text.as_str()),
                ResponseBlock::Other => None,
            })
            .collect();

        (!texts.is_empty()).then(|| texts.join("\n"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
