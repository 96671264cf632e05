//! Operation facade: the three user-facing generation operations.
//!
//! Every lower-layer failure is converted here into
//! [`GenerationOutcome::Failure`]; nothing below this layer reaches the
//! caller as an error.

use crate::ai::{GeminiClient, GenerationService};
use crate::echo::EchoComparison;
use crate::image::{ImageNormalizer, ImageService, NormalizeOptions};
use crate::models::{validate_inputs, Config, GenerationOutcome, GenerationRequest, OperationKind};
use crate::orchestrator::Orchestrator;
use crate::Result;
use std::time::Duration;
use tracing::{error, info};

pub struct App {
    generator: Box<dyn GenerationService>,
    normalizer: Box<dyn ImageService>,
    timeout: Duration,
    echo_comparison: EchoComparison,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub generator: Box<dyn GenerationService>,
    pub normalizer: Box<dyn ImageService>,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(
        services: AppServices,
        timeout: Duration,
        echo_comparison: EchoComparison,
    ) -> Self {
        Self {
            generator: services.generator,
            normalizer: services.normalizer,
            timeout,
            echo_comparison,
        }
    }

    /// Construct an app backed by Gemini and the server-side normalizer.
    pub fn new(config: &Config) -> Self {
        info!("Image provider: Gemini (model: {})", config.gemini_model);

        let generator = GeminiClient::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.request_timeout,
        );
        let normalizer = ImageNormalizer::new(
            NormalizeOptions::server()
                .with_bounds(config.max_image_dimension, config.max_image_size_kb),
        );

        Self::with_services(
            AppServices {
                generator: Box::new(generator),
                normalizer: Box::new(normalizer),
            },
            config.request_timeout,
            config.echo_comparison,
        )
    }

    pub async fn generate_from_text(&self, prompt: &str) -> GenerationOutcome {
        self.run(OperationKind::TextToImage, prompt, &[]).await
    }

    pub async fn edit_image(&self, image: &[u8], prompt: &str) -> GenerationOutcome {
        self.run(OperationKind::Edit, prompt, &[image]).await
    }

    pub async fn combine_images(
        &self,
        image_a: &[u8],
        image_b: &[u8],
        prompt: &str,
    ) -> GenerationOutcome {
        self.run(OperationKind::Combine, prompt, &[image_a, image_b])
            .await
    }

    pub async fn execute(&self, request: &GenerationRequest) -> GenerationOutcome {
        let images: Vec<&[u8]> = request.images.iter().map(Vec::as_slice).collect();
        self.run(request.kind, &request.prompt, &images).await
    }

    async fn run(&self, kind: OperationKind, prompt: &str, images: &[&[u8]]) -> GenerationOutcome {
        info!("[{:?}] Starting operation with {} image(s)", kind, images.len());

        let outcome = match self.dispatch(kind, prompt, images).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("[{:?}] Operation failed: {}", kind, e);
                GenerationOutcome::from(e)
            }
        };

        match &outcome {
            GenerationOutcome::Success { image } => {
                info!("[{:?}] Returning {} image", kind, image.mime_type)
            }
            GenerationOutcome::Description { .. } => {
                info!("[{:?}] Returning text description", kind)
            }
            GenerationOutcome::Failure { code, .. } => info!("[{:?}] Returning {}", kind, code),
        }
        outcome
    }

    async fn dispatch(
        &self,
        kind: OperationKind,
        prompt: &str,
        images: &[&[u8]],
    ) -> Result<GenerationOutcome> {
        validate_inputs(kind, prompt, images.len())?;

        let orchestrator =
            Orchestrator::new(self.generator.as_ref(), self.timeout, self.echo_comparison);

        match (kind, images) {
            (OperationKind::TextToImage, []) => orchestrator.generate_from_text(prompt).await,
            (OperationKind::Edit, [image]) => {
                let image = self.normalizer.normalize(image).await?;
                orchestrator.edit_image(image, prompt).await
            }
            (OperationKind::Combine, [image_a, image_b]) => {
                let (image_a, image_b) = tokio::try_join!(
                    self.normalizer.normalize(image_a),
                    self.normalizer.normalize(image_b)
                )?;
                orchestrator.combine_images(image_a, image_b, prompt).await
            }
            _ => Err(crate::Error::Invariant(
                "image count validated but did not match operation".to_string(),
            )),
        }
    }
}
