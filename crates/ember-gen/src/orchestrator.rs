//! Ranked-fallback orchestration
//!
//! Drives one generation request across the provider chain in strict rank
//! order: unavailable providers are skipped, failing providers are
//! recorded and passed over, the first success wins. When every real
//! provider has been exhausted the placeholder synthesizes a result, so a
//! well-formed request always comes back with exactly one image. Only
//! input validation errors cross this boundary.

use crate::config::{EmberConfig, GenerationConfig};
use crate::provider::{
    AttemptFailure, GeneratedImage, ImageProvider, ImageRequest, ImageResult, ProviderStatus,
};
use crate::providers::placeholder::PlaceholderProvider;
use crate::providers::provider_chain;
use crate::store::{ArtifactStore, FsStore};
use base64::prelude::*;
use ember_core::{ContentHash, EmberError, Result};
use std::time::{Duration, Instant};

/// Orchestrator owning the ranked provider chain and the artifact store
pub struct Orchestrator {
    providers: Vec<Box<dyn ImageProvider>>,
    placeholder: PlaceholderProvider,
    store: Box<dyn ArtifactStore>,
    generation: GenerationConfig,
}

impl Orchestrator {
    /// Create an orchestrator over an explicit provider chain.
    /// Providers are re-sorted by ascending rank; ties keep their
    /// given order.
    pub fn new(providers: Vec<Box<dyn ImageProvider>>, store: Box<dyn ArtifactStore>) -> Self {
        let mut providers = providers;
        providers.sort_by_key(|p| p.rank());
        Self {
            providers,
            placeholder: PlaceholderProvider::new(),
            store,
            generation: GenerationConfig::default(),
        }
    }

    /// Build the default chain and filesystem store from config
    pub fn from_config(config: &EmberConfig) -> Self {
        let store = Box::new(FsStore::new(config.output_dir()));
        let mut orchestrator = Self::new(provider_chain(config), store);
        orchestrator.generation = config.generation.clone();
        orchestrator
    }

    /// Override the generation defaults applied to unset request fields
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Toggle the inline base64 copy attached to results
    pub fn with_inline_base64(mut self, inline: bool) -> Self {
        self.generation.inline_base64 = inline;
        self
    }

    /// Names of the chain providers in trial order (diagnostics)
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Run one generation request through the fallback chain.
    ///
    /// Returns exactly one result plus the failures of every available
    /// provider that was tried before the one that succeeded, in trial
    /// order. The only error this returns for a provider-side problem is
    /// never: exhaustion degrades to the placeholder instead.
    pub fn orchestrate(
        &self,
        request: &ImageRequest,
    ) -> Result<(ImageResult, Vec<AttemptFailure>)> {
        if request.prompt.trim().is_empty() {
            return Err(EmberError::ValidationError(
                "Prompt must not be empty".to_string(),
            ));
        }
        let resolution = request.resolution()?;
        let request = self.effective_request(request);

        let mut failures: Vec<AttemptFailure> = Vec::new();

        for provider in &self.providers {
            if provider.status() != ProviderStatus::Available {
                // Expected steady state, not an error
                continue;
            }

            let start = Instant::now();
            match provider.generate(&request, resolution) {
                Ok(image) => {
                    let result = self.finish(provider.name(), image, start.elapsed())?;
                    return Ok((result, failures));
                }
                Err(reason) => {
                    failures.push(AttemptFailure {
                        provider: provider.name().to_string(),
                        reason,
                    });
                }
            }
        }

        // Every real provider skipped or failed: degrade, never raise
        let start = Instant::now();
        let image = self
            .placeholder
            .synthesize(resolution)
            .map_err(|reason| EmberError::GenerationError(reason.to_string()))?;
        let result = self.finish(self.placeholder.name(), image, start.elapsed())?;
        Ok((result, failures))
    }

    /// Fill unset request fields from the configured generation defaults
    fn effective_request(&self, request: &ImageRequest) -> ImageRequest {
        let mut request = request.clone();
        if request.steps.is_none() {
            request.steps = Some(self.generation.default_steps);
        }
        if request.guidance_scale.is_none() {
            request.guidance_scale = Some(self.generation.default_guidance_scale);
        }
        if request.negative_prompt.is_none() {
            request.negative_prompt = self.generation.default_negative_prompt.clone();
        }
        request
    }

    /// Persist the winning attempt and assemble the final result
    fn finish(
        &self,
        provider: &str,
        image: GeneratedImage,
        elapsed: Duration,
    ) -> Result<ImageResult> {
        let stem = format!("ember_{}_{}", provider, timestamp_compact());
        let path = self.store.store(&stem, &image.bytes)?;

        let content_hash = ContentHash::from_bytes(&image.bytes).to_prefixed_hex();

        let mut metadata = image.params.to_metadata();
        metadata.insert("timestamp".to_string(), now_iso8601());

        let image_base64 = if self.generation.inline_base64 {
            Some(BASE64_STANDARD.encode(&image.bytes))
        } else {
            None
        };

        Ok(ImageResult {
            image_path: path.to_string_lossy().to_string(),
            image_base64,
            provider: provider.to_string(),
            duration_secs: elapsed.as_secs_f64(),
            content_hash: Some(content_hash),
            metadata,
        })
    }
}

/// Civil date/time breakdown of the current UTC instant
fn now_civil() -> (i64, u32, u32, u64, u64, u64) {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = dur.as_secs();
    let days = secs / 86400;
    let time_secs = secs % 86400;
    let hours = time_secs / 3600;
    let mins = (time_secs % 3600) / 60;
    let s = time_secs % 60;

    let mut year = 1970i64;
    let mut remaining_days = days as i64;
    loop {
        let days_in_year = if is_leap(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }
    let month_days = [
        31,
        if is_leap(year) { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    let mut month = 0u32;
    for (i, &md) in month_days.iter().enumerate() {
        if remaining_days < md as i64 {
            month = i as u32;
            break;
        }
        remaining_days -= md as i64;
    }

    (year, month + 1, remaining_days as u32 + 1, hours, mins, s)
}

fn is_leap(year: i64) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Compact timestamp used in artifact file stems (e.g. 20240101_120000)
fn timestamp_compact() -> String {
    let (y, m, d, h, min, s) = now_civil();
    format!("{:04}{:02}{:02}_{:02}{:02}{:02}", y, m, d, h, min, s)
}

/// ISO 8601 UTC timestamp recorded in result metadata
fn now_iso8601() -> String {
    let (y, m, d, h, min, s) = now_civil();
    format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z", y, m, d, h, min, s)
}
