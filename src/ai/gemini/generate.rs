use super::client::GeminiHttpClient;
use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};
use crate::ai::mime::detect_image_mime;
use crate::ai::{GenerationService, ModelRequest, PartOrder};
use crate::models::{Candidate, ImagePayload, ModelResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use std::time::Duration;

pub struct GeminiClient {
    http: GeminiHttpClient,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, model, timeout, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, model, timeout, client),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    pub fn model(&self) -> &str {
        self.http.model()
    }

    fn build_request(request: &ModelRequest) -> GenerateContentRequest {
        let prompt = Part::Text {
            text: request.prompt.clone(),
            thought: None,
        };
        let images = request.images.iter().map(|image| Part::InlineData {
            inline_data: InlineData {
                mime_type: Some(image.mime_type.clone()),
                data: image.to_base64(),
            },
        });

        let parts: Vec<Part> = match request.order {
            PartOrder::PromptFirst => std::iter::once(prompt).chain(images).collect(),
            PartOrder::ImagesFirst => images.chain(std::iter::once(prompt)).collect(),
        };

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GenerationConfig::default(),
        }
    }

    /// Flattens every part of every candidate into a typed [`Candidate`].
    fn into_model_response(response: GenerateContentResponse) -> Result<ModelResponse> {
        let mut candidates = Vec::new();

        for candidate in response.candidates {
            let Some(content) = candidate.content else {
                tracing::debug!(
                    "Gemini candidate without content (finish reason: {:?})",
                    candidate.finish_reason
                );
                candidates.push(Candidate::Empty);
                continue;
            };

            for part in content.parts {
                candidates.push(match part {
                    Part::InlineData { inline_data } if !inline_data.data.is_empty() => {
                        let bytes = base64::engine::general_purpose::STANDARD
                            .decode(&inline_data.data)
                            .map_err(|e| {
                                Error::AiProvider(format!(
                                    "Failed to decode Gemini base64 image: {}",
                                    e
                                ))
                            })?;
                        let mime_type = inline_data
                            .mime_type
                            .unwrap_or_else(|| detect_image_mime(&bytes).to_string());
                        tracing::debug!("Gemini returned image with mime_type: {}", mime_type);
                        Candidate::Image(ImagePayload::new(bytes, mime_type))
                    }
                    Part::Text {
                        thought: Some(true),
                        ..
                    } => Candidate::Empty,
                    Part::Text { text, .. } if !text.trim().is_empty() => Candidate::Text(text),
                    _ => Candidate::Empty,
                });
            }
        }

        Ok(ModelResponse::new(candidates))
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse> {
        tracing::debug!(
            "Sending generateContent to {} ({} image(s), {:?})",
            self.http.model(),
            request.images.len(),
            request.order
        );

        let body = Self::build_request(request);
        let response: GenerateContentResponse = self.http.generate_content(&body).await?;
        Self::into_model_response(response)
    }
}
