use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use little_exif::metadata::Metadata;
use nanobanana_studio::app::App;
use nanobanana_studio::auth::{AuthGate, Session};
use nanobanana_studio::image::{compress_upload, NormalizeOptions};
use nanobanana_studio::models::{Config, GenerationOutcome, GenerationRequest};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "nanobanana-studio")]
#[command(about = "Generate, edit, and combine images with a generative model")]
struct CliArgs {
    /// Shared-secret password for the studio.
    #[arg(long, env = "STUDIO_PASSWORD", hide_env_values = true)]
    password: String,

    /// Directory for generated images (default: output/<date>_<uuid>).
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Print the outcome as JSON instead of writing files.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate an image from a text prompt.
    Generate {
        #[arg(value_parser = parse_prompt_arg)]
        prompt: String,
    },
    /// Edit a single image according to a prompt.
    Edit {
        image: PathBuf,
        #[arg(value_parser = parse_prompt_arg)]
        prompt: String,
    },
    /// Combine two images according to a prompt.
    Combine {
        image_a: PathBuf,
        image_b: PathBuf,
        #[arg(value_parser = parse_prompt_arg)]
        prompt: String,
    },
}

fn parse_prompt_arg(input: &str) -> std::result::Result<String, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Prompt must not be empty".to_string());
    }
    Ok(trimmed.to_string())
}

/// Reads an upload and applies the fast compression pass before it joins a request.
async fn read_image(path: &Path, options: NormalizeOptions) -> Result<Vec<u8>> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let compressed = compress_upload(raw, options)
        .await
        .with_context(|| format!("Failed to compress image {}", path.display()))?;
    Ok(compressed.bytes)
}

async fn build_request(command: Command, upload: NormalizeOptions) -> Result<GenerationRequest> {
    Ok(match command {
        Command::Generate { prompt } => GenerationRequest::text_to_image(prompt),
        Command::Edit { image, prompt } => {
            GenerationRequest::edit(read_image(&image, upload).await?, prompt)
        }
        Command::Combine {
            image_a,
            image_b,
            prompt,
        } => {
            let (a, b) = tokio::try_join!(
                read_image(&image_a, upload),
                read_image(&image_b, upload)
            )?;
            GenerationRequest::combine(a, b, prompt)
        }
    })
}

/// Returns a live session only when the password opened one.
fn authorize(gate: &AuthGate, password: &str) -> Option<Session> {
    let mut session = Session::new();
    gate.verify(password, &mut session);
    session.is_authenticated().then_some(session)
}

fn default_output_dir() -> PathBuf {
    let date = Local::now().format("%Y-%m-%d").to_string();
    PathBuf::from("output").join(format!("{}_{}", date, Uuid::new_v4()))
}

async fn write_outcome(outcome: &GenerationOutcome, output_dir: &Path) -> Result<()> {
    match outcome {
        GenerationOutcome::Success { image } => {
            tokio::fs::create_dir_all(output_dir).await?;
            let path = output_dir.join(format!("{}.{}", Uuid::new_v4(), image.extension()));
            tokio::fs::write(&path, &image.bytes).await?;
            // Strip EXIF so provider metadata does not leak into saved results
            if let Err(e) = Metadata::file_clear_metadata(&path) {
                warn!("Failed to strip EXIF from {}: {}", path.display(), e);
            }
            info!("Saved image to {}", path.display());
            println!("{}", path.display());
        }
        GenerationOutcome::Description { text, message } => {
            println!("{}", text);
            if let Some(message) = message {
                eprintln!("Note: {}", message);
            }
        }
        GenerationOutcome::Failure { code, message } => {
            eprintln!("{}: {}", code, message);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nanobanana_studio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let gate = AuthGate::new(config.app_password.clone())?;
    if authorize(&gate, &args.password).is_none() {
        error!("Incorrect password");
        std::process::exit(1);
    }

    let app = App::new(&config);
    let upload = NormalizeOptions::client()
        .with_bounds(config.max_image_dimension, config.max_image_size_kb);
    let request = build_request(args.command, upload).await?;
    let outcome = app.execute(&request).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        let output_dir = args.output_dir.unwrap_or_else(default_output_dir);
        write_outcome(&outcome, &output_dir).await?;
    }

    if matches!(outcome, GenerationOutcome::Failure { .. }) {
        std::process::exit(1);
    }
    Ok(())
}
