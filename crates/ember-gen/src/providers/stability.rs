//! Stability AI text-to-image provider
//!
//! Highest-ranked backend: fast and high quality, but requires a paid API
//! key. The v1 generation endpoint returns a JSON envelope with
//! base64-encoded artifacts.

use crate::config::EmberConfig;
use crate::provider::*;
use base64::prelude::*;
use std::time::Duration;

const DEFAULT_STABILITY_URL: &str =
    "https://api.stability.ai/v1/generation/stable-diffusion-v1-6/text-to-image";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RANK: u32 = 0;
const MODEL_NAME: &str = "stability-ai-v1.6";

/// Stability AI provider for remote image generation
pub struct StabilityProvider {
    api_key: Option<String>,
    api_url: String,
    rank: u32,
}

impl StabilityProvider {
    /// Create a new StabilityProvider from config. Construction never
    /// fails; a missing key surfaces through `status()` instead.
    pub fn from_config(config: &EmberConfig) -> Self {
        Self {
            api_key: config.api_key("stability").map(|k| k.to_string()),
            api_url: config
                .api_url("stability")
                .unwrap_or(DEFAULT_STABILITY_URL)
                .to_string(),
            rank: config.rank("stability").unwrap_or(DEFAULT_RANK),
        }
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .build();
    config.into()
}

/// Build the Stability v1 request payload from the common request shape
pub fn build_stability_payload(
    request: &ImageRequest,
    resolution: Resolution,
) -> serde_json::Value {
    let mut text_prompts = vec![serde_json::json!({ "text": request.prompt })];
    if let Some(negative) = &request.negative_prompt {
        text_prompts.push(serde_json::json!({ "text": negative, "weight": -1.0 }));
    }

    let mut payload = serde_json::json!({
        "text_prompts": text_prompts,
        "cfg_scale": request.guidance_scale.unwrap_or(DEFAULT_GUIDANCE_SCALE),
        "steps": request.steps.unwrap_or(DEFAULT_STEPS),
        "width": resolution.width,
        "height": resolution.height,
    });

    if let Some(seed) = request.seed {
        payload["seed"] = serde_json::json!(seed);
    }

    payload
}

/// Extract and decode the first artifact from a Stability response
pub fn parse_stability_response(
    response: &serde_json::Value,
) -> std::result::Result<Vec<u8>, FailureReason> {
    let encoded = response
        .get("artifacts")
        .and_then(|a| a.as_array())
        .and_then(|arr| arr.first())
        .and_then(|artifact| artifact.get("base64"))
        .and_then(|b| b.as_str())
        .ok_or_else(|| {
            FailureReason::MalformedResponse("no artifacts[0].base64 in response".to_string())
        })?;

    BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| FailureReason::MalformedResponse(format!("invalid base64 artifact: {}", e)))
}

impl ImageProvider for StabilityProvider {
    fn name(&self) -> &str {
        "stability"
    }

    fn rank(&self) -> u32 {
        self.rank
    }

    fn status(&self) -> ProviderStatus {
        match &self.api_key {
            Some(key) if !key.is_empty() => ProviderStatus::Available,
            _ => ProviderStatus::NoApiKey,
        }
    }

    fn generate(
        &self,
        request: &ImageRequest,
        resolution: Resolution,
    ) -> std::result::Result<GeneratedImage, FailureReason> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| FailureReason::NotAvailable("no API key configured".to_string()))?;

        let payload = build_stability_payload(request, resolution);

        let agent = build_agent();
        let mut response = agent
            .post(&self.api_url)
            .header("Authorization", &format!("Bearer {}", api_key))
            .header("Accept", "application/json")
            .send_json(&payload)
            .map_err(FailureReason::from)?;

        let body: serde_json::Value = response
            .body_mut()
            .read_json()
            .map_err(|e| FailureReason::MalformedResponse(e.to_string()))?;

        let bytes = parse_stability_response(&body)?;

        Ok(GeneratedImage {
            bytes,
            params: ResolvedParams {
                width: resolution.width,
                height: resolution.height,
                steps: request.steps.unwrap_or(DEFAULT_STEPS),
                guidance_scale: request.guidance_scale.unwrap_or(DEFAULT_GUIDANCE_SCALE),
                seed: request.seed,
                model: MODEL_NAME.to_string(),
            },
        })
    }
}
