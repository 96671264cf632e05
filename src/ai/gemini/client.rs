use super::types::{GenerateContentRequest, GenerateContentResponse};
use crate::{Error, Result};
use reqwest::Client;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Transport for the single `generateContent` call this crate makes.
///
/// Holds the credential and per-request deadline; knows nothing about
/// strategies or candidates.
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    /// `model` may be given bare (`gemini-2.5-flash-image-preview`) or with
    /// its `models/` resource prefix.
    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        let model = model.strip_prefix("models/").unwrap_or(&model).to_string();

        Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Posts one generation request.
    ///
    /// A blank credential fails here, before any network I/O, so the caller
    /// sees it as a failed attempt rather than a startup error.
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        if self.api_key.trim().is_empty() {
            return Err(Error::MissingCredential(
                "GEMINI_API_KEY is not set".to_string(),
            ));
        }

        let response = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("generateContent request to {} failed: {}", self.model, e);
                e
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::error!("Gemini rejected generateContent (status {}): {}", status, body);
            return Err(Error::AiProvider(format!(
                "Gemini API error (status {}): {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Unparseable generateContent body: {}\nBody: {}", e, body);
            Error::AiProvider(format!("Failed to parse Gemini response: {}", e))
        })
    }
}
