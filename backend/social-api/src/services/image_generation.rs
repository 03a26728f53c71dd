/// Prompt-to-image generation through the DeepAI API
use crate::config::ImageGenerationSettings;
use crate::error::{AppError, Result};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;

const DEEPAI_API_BASE: &str = "https://api.deepai.org";
const GENERATOR_PATH: &str = "/api/cute-creature-generator";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct GeneratorResponse {
    output_url: String,
}

/// DeepAI client
#[derive(Clone)]
pub struct ImageGenerationClient {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
}

impl ImageGenerationClient {
    pub fn new(settings: &ImageGenerationSettings) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        if settings.api_key.trim().is_empty() {
            tracing::warn!("DEEPAI_API_KEY not set; image generation requests will be rejected");
        }

        Ok(Self {
            http_client,
            base_url: DEEPAI_API_BASE.to_string(),
            api_key: settings.api_key.trim().to_string(),
        })
    }

    /// Point the client at another API root (used against mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Generate an image for `prompt` and return its URL
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(prompt, "Generating image");

        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, GENERATOR_PATH))
            .header("api-key", &self.api_key)
            .form(&[("text", prompt)])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Image API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalService(format!(
                "API request failed with status code: {}",
                status.as_u16()
            )));
        }

        let parsed: GeneratorResponse = response.json().await.map_err(|e| {
            tracing::debug!("Image API returned an unexpected body: {}", e);
            AppError::ExternalService("API response parsing failed.".to_string())
        })?;

        Ok(parsed.output_url)
    }
}
