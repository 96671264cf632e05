//! Strategy orchestration
//!
//! Whether the remote model returns fresh pixels for a given phrasing is
//! unreliable, so each operation runs a finite, ordered list of
//! [`Strategy`] values and stops at the first one that produces an
//! acceptable image. Calls within one operation are strictly sequential.
//!
//! Stopping rule: the chain ends at the first accepted image or when the
//! list is exhausted. An exhausted chain yields a description built from
//! the latest text any attempt produced; with no text at all it yields the
//! last attempt's error, or [`Error::NoContent`].

use crate::ai::{GenerationService, ModelRequest, PartOrder};
use crate::classify::{classify, first_text};
use crate::echo::{is_echo, EchoComparison};
use crate::models::{Candidate, GenerationOutcome, ImagePayload};
use crate::{prompts, Error, Result};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The user's prompt as-is, no images.
    TextToImage,
    /// Emphatic edit instruction after the single image.
    Edit,
    /// More directive rewording of the edit instruction.
    EditRetry,
    /// Creative-combination prompt followed by image A then image B.
    CombinePromptFirst,
    /// Image A then image B followed by an edit-style instruction.
    CombineEditFirst,
    /// Images dropped; the model only sees a text description of the intent.
    CombineTextOnly,
}

pub const TEXT_TO_IMAGE_STRATEGIES: &[Strategy] = &[Strategy::TextToImage];
pub const EDIT_STRATEGIES: &[Strategy] = &[Strategy::Edit, Strategy::EditRetry];
pub const COMBINE_STRATEGIES: &[Strategy] = &[
    Strategy::CombinePromptFirst,
    Strategy::CombineEditFirst,
    Strategy::CombineTextOnly,
];

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::TextToImage => "text-to-image",
            Strategy::Edit => "edit",
            Strategy::EditRetry => "edit-retry",
            Strategy::CombinePromptFirst => "combine-prompt-first",
            Strategy::CombineEditFirst => "combine-edit-first",
            Strategy::CombineTextOnly => "combine-text-only",
        }
    }

    /// Only strategies that actually send the inputs can be echoed.
    pub fn guards_echo(self) -> bool {
        matches!(
            self,
            Strategy::CombinePromptFirst | Strategy::CombineEditFirst
        )
    }

    pub fn build_request(self, prompt: &str, images: &[ImagePayload]) -> ModelRequest {
        let render = |template: &str| prompts::render(template, &[("prompt", prompt)]);
        match self {
            Strategy::TextToImage => ModelRequest::text(prompt),
            Strategy::Edit => ModelRequest::with_images(
                render(prompts::EDIT),
                images.to_vec(),
                PartOrder::ImagesFirst,
            ),
            Strategy::EditRetry => ModelRequest::with_images(
                render(prompts::EDIT_RETRY),
                images.to_vec(),
                PartOrder::ImagesFirst,
            ),
            Strategy::CombinePromptFirst => ModelRequest::with_images(
                render(prompts::COMBINE_CREATIVE),
                images.to_vec(),
                PartOrder::PromptFirst,
            ),
            Strategy::CombineEditFirst => ModelRequest::with_images(
                render(prompts::COMBINE_EDIT),
                images.to_vec(),
                PartOrder::ImagesFirst,
            ),
            Strategy::CombineTextOnly => ModelRequest::text(render(prompts::COMBINE_TEXT_ONLY)),
        }
    }
}

/// Runs strategy chains against one remote capability.
pub struct Orchestrator<'a> {
    service: &'a dyn GenerationService,
    timeout: Duration,
    echo_comparison: EchoComparison,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        service: &'a dyn GenerationService,
        timeout: Duration,
        echo_comparison: EchoComparison,
    ) -> Self {
        Self {
            service,
            timeout,
            echo_comparison,
        }
    }

    pub async fn generate_from_text(&self, prompt: &str) -> Result<GenerationOutcome> {
        self.run_chain(TEXT_TO_IMAGE_STRATEGIES, prompt, &[], None)
            .await
    }

    pub async fn edit_image(&self, image: ImagePayload, prompt: &str) -> Result<GenerationOutcome> {
        self.run_chain(EDIT_STRATEGIES, prompt, &[image], Some(prompts::EDIT_ADVISORY))
            .await
    }

    pub async fn combine_images(
        &self,
        image_a: ImagePayload,
        image_b: ImagePayload,
        prompt: &str,
    ) -> Result<GenerationOutcome> {
        self.run_chain(
            COMBINE_STRATEGIES,
            prompt,
            &[image_a, image_b],
            Some(prompts::COMBINE_ADVISORY),
        )
        .await
    }

    async fn invoke_bounded(&self, request: &ModelRequest) -> Result<crate::models::ModelResponse> {
        tokio::time::timeout(self.timeout, self.service.invoke(request))
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
    }

    pub async fn run_chain(
        &self,
        strategies: &[Strategy],
        prompt: &str,
        images: &[ImagePayload],
        advisory: Option<&str>,
    ) -> Result<GenerationOutcome> {
        let mut texts: Vec<String> = Vec::new();
        let mut last_error: Option<Error> = None;

        for (index, strategy) in strategies.iter().enumerate() {
            info!(
                "Strategy {}/{} ({})",
                index + 1,
                strategies.len(),
                strategy.name()
            );

            let request = strategy.build_request(prompt, images);
            let response = match self.invoke_bounded(&request).await {
                Ok(response) => {
                    last_error = None;
                    response
                }
                Err(e) => {
                    warn!("Strategy {} failed: {}", strategy.name(), e);
                    last_error = Some(e);
                    continue;
                }
            };

            if let Some(text) = first_text(&response) {
                texts.push(text.to_string());
            }

            match classify(&response) {
                Candidate::Image(payload) => {
                    if strategy.guards_echo()
                        && is_echo(&payload.bytes, images, self.echo_comparison)
                    {
                        warn!(
                            "Strategy {} returned one of the input images, falling through",
                            strategy.name()
                        );
                        continue;
                    }
                    info!(
                        "Strategy {} produced a {} image ({} bytes)",
                        strategy.name(),
                        payload.mime_type,
                        payload.bytes.len()
                    );
                    return Ok(GenerationOutcome::Success { image: payload });
                }
                Candidate::Text(_) => {
                    info!("Strategy {} returned text only", strategy.name());
                }
                Candidate::Empty => {
                    info!("Strategy {} returned no content", strategy.name());
                }
            }
        }

        if let Some(text) = texts.pop() {
            return Ok(GenerationOutcome::Description {
                text,
                message: advisory.map(str::to_string),
            });
        }

        Err(last_error.unwrap_or_else(|| {
            Error::NoContent(format!(
                "no image or text after {} attempt(s)",
                strategies.len()
            ))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockGenerationClient;
    use crate::models::{ErrorCode, ModelResponse};
    use pretty_assertions::assert_eq;

    fn image(bytes: &[u8]) -> ImagePayload {
        ImagePayload::new(bytes.to_vec(), "image/png")
    }

    fn orchestrator(client: &MockGenerationClient) -> Orchestrator<'_> {
        Orchestrator::new(client, Duration::from_secs(5), EchoComparison::Bytes)
    }

    #[tokio::test]
    async fn test_text_to_image_success() {
        let client = MockGenerationClient::new().with_response(ModelResponse::new(vec![
            Candidate::Text("here you go".to_string()),
            Candidate::Image(image(b"bike")),
        ]));

        let outcome = orchestrator(&client)
            .generate_from_text("a red bicycle")
            .await
            .unwrap();

        assert_eq!(outcome, GenerationOutcome::Success { image: image(b"bike") });
        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "a red bicycle");
        assert!(requests[0].images.is_empty());
    }

    #[tokio::test]
    async fn test_text_to_image_description_has_no_advisory() {
        let client = MockGenerationClient::new().with_response(ModelResponse::text("a bicycle"));

        let outcome = orchestrator(&client).generate_from_text("bike").await.unwrap();

        assert_eq!(
            outcome,
            GenerationOutcome::Description {
                text: "a bicycle".to_string(),
                message: None
            }
        );
    }

    #[tokio::test]
    async fn test_text_to_image_empty_is_no_content() {
        let client = MockGenerationClient::new();

        let err = orchestrator(&client).generate_from_text("bike").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoContent);
    }

    #[tokio::test]
    async fn test_text_to_image_is_deterministic_against_deterministic_stub() {
        let make = || MockGenerationClient::new().with_response(ModelResponse::text("same"));

        let first = orchestrator(&make()).generate_from_text("p").await.unwrap();
        let second = orchestrator(&make()).generate_from_text("p").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_edit_retries_once_with_reworded_prompt() {
        let client = MockGenerationClient::new()
            .with_response(ModelResponse::text("I would brighten it"))
            .with_response(ModelResponse::image(image(b"bright")));

        let outcome = orchestrator(&client)
            .edit_image(image(b"dark"), "brighten")
            .await
            .unwrap();

        assert_eq!(outcome, GenerationOutcome::Success { image: image(b"bright") });

        let requests = client.get_requests();
        assert_eq!(requests.len(), 2);
        assert_ne!(requests[0].prompt, requests[1].prompt);
        assert_eq!(requests[0].images, requests[1].images);
        assert_eq!(requests[1].order, PartOrder::ImagesFirst);
    }

    #[tokio::test]
    async fn test_edit_falls_back_to_description_with_advisory() {
        let client = MockGenerationClient::new()
            .with_response(ModelResponse::text("first thoughts"))
            .with_response(ModelResponse::empty());

        let outcome = orchestrator(&client)
            .edit_image(image(b"dark"), "brighten")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            GenerationOutcome::Description {
                text: "first thoughts".to_string(),
                message: Some(prompts::EDIT_ADVISORY.to_string())
            }
        );
        assert_eq!(client.get_call_count(), 2);
    }

    #[tokio::test]
    async fn test_edit_remote_error_then_image() {
        let client = MockGenerationClient::new()
            .with_failure("503 unavailable")
            .with_response(ModelResponse::image(image(b"edited")));

        let outcome = orchestrator(&client)
            .edit_image(image(b"src"), "brighten")
            .await
            .unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_combine_echo_on_first_two_strategies_then_text_only_image() {
        let a = image(b"input-a");
        let b = image(b"input-b");
        let client = MockGenerationClient::new()
            .with_response(ModelResponse::image(a.clone()))
            .with_response(ModelResponse::image(a.clone()))
            .with_response(ModelResponse::image(image(b"fresh")));

        let outcome = orchestrator(&client)
            .combine_images(a.clone(), b.clone(), "merge them")
            .await
            .unwrap();

        assert_eq!(outcome, GenerationOutcome::Success { image: image(b"fresh") });

        let requests = client.get_requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].order, PartOrder::PromptFirst);
        assert_eq!(requests[0].images, vec![a.clone(), b.clone()]);
        assert_eq!(requests[1].order, PartOrder::ImagesFirst);
        assert_eq!(requests[1].images, vec![a, b]);
        assert!(requests[2].images.is_empty());
        assert!(requests[2].prompt.contains("merge them"));
    }

    #[tokio::test]
    async fn test_combine_stops_at_first_genuine_image() {
        let client = MockGenerationClient::new()
            .with_response(ModelResponse::image(image(b"new")));

        let outcome = orchestrator(&client)
            .combine_images(image(b"a"), image(b"b"), "merge")
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(client.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_combine_exhausted_prefers_latest_text() {
        let client = MockGenerationClient::new()
            .with_response(ModelResponse::text("first"))
            .with_response(ModelResponse::new(vec![
                Candidate::Text("second".to_string()),
                Candidate::Image(image(b"b")),
            ]))
            .with_response(ModelResponse::empty());

        let outcome = orchestrator(&client)
            .combine_images(image(b"a"), image(b"b"), "merge")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            GenerationOutcome::Description {
                text: "second".to_string(),
                message: Some(prompts::COMBINE_ADVISORY.to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_combine_all_errors_surfaces_last_error() {
        let client = MockGenerationClient::new()
            .with_failure("boom")
            .with_failure("boom")
            .with_failure("boom");

        let err = orchestrator(&client)
            .combine_images(image(b"a"), image(b"b"), "merge")
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::RemoteError);
        assert_eq!(client.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_timeout_moves_to_next_strategy() {
        let client = MockGenerationClient::new()
            .with_delayed_response(Duration::from_secs(60), ModelResponse::image(image(b"late")))
            .with_response(ModelResponse::image(image(b"on-time")));

        let orchestrator =
            Orchestrator::new(&client, Duration::from_millis(20), EchoComparison::Bytes);
        let outcome = orchestrator
            .combine_images(image(b"a"), image(b"b"), "merge")
            .await
            .unwrap();

        assert_eq!(outcome, GenerationOutcome::Success { image: image(b"on-time") });
    }

    #[tokio::test]
    async fn test_timeout_without_fallback_is_timeout() {
        let client = MockGenerationClient::new()
            .with_delayed_response(Duration::from_secs(60), ModelResponse::text("late"));

        let orchestrator =
            Orchestrator::new(&client, Duration::from_millis(20), EchoComparison::Bytes);
        let err = orchestrator.generate_from_text("bike").await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::Timeout);
        assert!(err.to_string().contains("20ms"), "{}", err);
    }

    #[test]
    fn test_only_image_bearing_combine_strategies_guard_echo() {
        let guarded: Vec<Strategy> = COMBINE_STRATEGIES
            .iter()
            .copied()
            .filter(|s| s.guards_echo())
            .collect();
        assert_eq!(
            guarded,
            vec![Strategy::CombinePromptFirst, Strategy::CombineEditFirst]
        );
        assert!(!Strategy::Edit.guards_echo());
    }
}
