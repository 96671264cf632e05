use image::GenericImageView;
use nanobanana_studio::{
    ai::{MockGenerationClient, PartOrder},
    app::{App, AppServices},
    echo::EchoComparison,
    image::{normalize, ImageNormalizer, MockImageNormalizer, NormalizeOptions},
    models::{
        Candidate, ErrorCode, GenerationOutcome, GenerationRequest, ImagePayload, ModelResponse,
    },
};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn build_app(generator: MockGenerationClient, normalizer: ImageNormalizer) -> App {
    App::with_services(
        AppServices {
            generator: Box::new(generator),
            normalizer: Box::new(normalizer),
        },
        Duration::from_secs(5),
        EchoComparison::Pixels,
    )
}

fn png_bytes(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, seed])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[tokio::test]
async fn test_text_to_image_returns_image_unchanged() {
    let generated = ImagePayload::new(vec![0x89, 0x50, 0x4E, 0x47, 0x01], "image/png");
    let generator =
        MockGenerationClient::new().with_response(ModelResponse::image(generated.clone()));
    let recorder = generator.clone();
    let app = build_app(generator, ImageNormalizer::default());

    let outcome = app.generate_from_text("a red bicycle").await;

    assert_eq!(outcome, GenerationOutcome::Success { image: generated });
    assert_eq!(recorder.get_call_count(), 1);
    assert_eq!(recorder.get_requests()[0].prompt, "a red bicycle");
}

#[tokio::test]
async fn test_edit_normalizes_large_input_and_uses_retry_image() {
    let retry_image = ImagePayload::new(b"edited-pixels".to_vec(), "image/png");
    let generator = MockGenerationClient::new()
        .with_response(ModelResponse::text("Here is how I would brighten it"))
        .with_response(ModelResponse::image(retry_image.clone()));
    let recorder = generator.clone();
    let app = build_app(generator, ImageNormalizer::new(NormalizeOptions::server()));

    let outcome = app.edit_image(&png_bytes(2000, 3000, 9), "brighten").await;

    assert_eq!(outcome, GenerationOutcome::Success { image: retry_image });

    let requests = recorder.get_requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.images.len(), 1);
        assert_eq!(request.order, PartOrder::ImagesFirst);
        let sent = &request.images[0];
        assert_eq!(sent.mime_type, "image/jpeg");
        assert!(sent.bytes.len() <= 800 * 1024);

        let (w, h) = image::load_from_memory(&sent.bytes).unwrap().dimensions();
        assert_eq!(w.max(h), 1024);
    }
}

#[tokio::test]
async fn test_combine_with_one_image_is_invalid_without_remote_call() {
    let generator = MockGenerationClient::new();
    let recorder = generator.clone();
    let app = build_app(generator, ImageNormalizer::default());

    let mut request = GenerationRequest::combine(png_bytes(8, 8, 1), png_bytes(8, 8, 2), "merge");
    request.images.truncate(1);
    let outcome = app.execute(&request).await;

    match outcome {
        GenerationOutcome::Failure { code, .. } => assert_eq!(code, ErrorCode::InvalidInput),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(recorder.get_call_count(), 0);
}

#[tokio::test]
async fn test_combine_falls_through_echoes_to_text_only_strategy() {
    let image_a = png_bytes(16, 16, 1);
    let echo = ImagePayload::new(image_a.clone(), "image/jpeg");
    let fresh = ImagePayload::new(png_bytes(16, 16, 200), "image/png");

    // The mock normalizer passes bytes through, so the stub can echo input A exactly.
    let generator = MockGenerationClient::new()
        .with_response(ModelResponse::image(echo.clone()))
        .with_response(ModelResponse::new(vec![
            Candidate::Text("I combined them".to_string()),
            Candidate::Image(echo),
        ]))
        .with_response(ModelResponse::image(fresh.clone()));
    let recorder = generator.clone();

    let app = App::with_services(
        AppServices {
            generator: Box::new(generator),
            normalizer: Box::new(MockImageNormalizer::new()),
        },
        Duration::from_secs(5),
        EchoComparison::Bytes,
    );

    let outcome = app
        .combine_images(&image_a, &png_bytes(16, 16, 2), "a cat wearing the hat")
        .await;

    assert_eq!(outcome, GenerationOutcome::Success { image: fresh });

    let requests = recorder.get_requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].order, PartOrder::PromptFirst);
    assert_eq!(requests[0].images.len(), 2);
    assert_eq!(requests[1].order, PartOrder::ImagesFirst);
    assert_eq!(requests[1].images.len(), 2);
    assert!(requests[2].images.is_empty());
}

#[tokio::test]
async fn test_combine_echo_detected_after_reencoding() {
    let image_a = png_bytes(32, 32, 5);

    // Same pixels as the normalized input A, but a different container.
    let sent_a = normalize(&image_a, &NormalizeOptions::server()).unwrap();
    let mut reencoded = Vec::new();
    image::load_from_memory(&sent_a.bytes)
        .unwrap()
        .write_to(&mut std::io::Cursor::new(&mut reencoded), image::ImageFormat::Png)
        .unwrap();
    assert_ne!(reencoded, sent_a.bytes);

    let generator = MockGenerationClient::new()
        .with_response(ModelResponse::image(ImagePayload::new(reencoded, "image/png")))
        .with_response(ModelResponse::text("only words"));
    let recorder = generator.clone();
    let app = build_app(generator, ImageNormalizer::default());

    let outcome = app
        .combine_images(&image_a, &png_bytes(32, 32, 6), "blend")
        .await;

    match outcome {
        GenerationOutcome::Description { text, message } => {
            assert_eq!(text, "only words");
            assert!(message.unwrap().contains("dedicated image-generation backend"));
        }
        other => panic!("expected description, got {:?}", other),
    }
    assert_eq!(recorder.get_call_count(), 3);
}

#[tokio::test]
async fn test_generate_twice_gives_same_classification() {
    let make_app = || {
        build_app(
            MockGenerationClient::new().with_response(ModelResponse::text("a sketch of a bicycle")),
            ImageNormalizer::default(),
        )
    };

    let first = make_app().generate_from_text("a red bicycle").await;
    let second = make_app().generate_from_text("a red bicycle").await;

    assert_eq!(first, second);
    assert!(matches!(first, GenerationOutcome::Description { message: None, .. }));
}

#[tokio::test]
async fn test_malformed_upload_is_decode_error() {
    let generator = MockGenerationClient::new();
    let recorder = generator.clone();
    let app = build_app(generator, ImageNormalizer::default());

    let outcome = app.edit_image(b"not really a jpeg", "brighten").await;

    match outcome {
        GenerationOutcome::Failure { code, .. } => assert_eq!(code, ErrorCode::DecodeError),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(recorder.get_call_count(), 0);
}
