//! Image generation orchestration on top of a remote generative model.
//!
//! Normalizes uploaded images, builds model-specific prompts, classifies
//! heterogeneous model responses, and walks ordered fallback strategies
//! until the model returns a genuinely new image or a usable description.

pub mod ai;
pub mod app;
pub mod auth;
pub mod classify;
pub mod echo;
pub mod error;
pub mod image;
pub mod models;
pub mod orchestrator;
pub mod prompts;

pub use error::{Error, Result};
