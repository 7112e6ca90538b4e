//! Ember Gen - ranked-fallback image generation
//!
//! Provides a pluggable provider framework for generating images via
//! remote APIs (Stability, Hugging Face, Replicate) or a local model,
//! with an orchestrator that tries providers in rank order and degrades
//! to a guaranteed placeholder when every real backend fails.

pub mod config;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod store;

pub use config::{EmberConfig, GenerationConfig};
pub use orchestrator::Orchestrator;
pub use provider::{
    AttemptFailure, FailureReason, GeneratedImage, ImageProvider, ImageRequest, ImageResult,
    ProviderStatus, ResolvedParams, Resolution, RECOMMENDED_RESOLUTION, SUPPORTED_RESOLUTIONS,
};
pub use providers::local::{LocalModel, LocalProvider};
pub use store::{ArtifactStore, FsStore, MemoryStore};
