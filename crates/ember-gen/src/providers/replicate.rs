//! Replicate prediction provider
//!
//! Lowest-ranked remote backend. Replicate runs predictions
//! asynchronously: a POST creates the prediction, then status is polled
//! until it succeeds or fails, and the output image is downloaded from the
//! URL the final status carries. The whole attempt stays bounded by the
//! poll budget.

use crate::config::EmberConfig;
use crate::provider::*;
use crate::providers::huggingface::decode_image_bytes;
use std::time::Duration;

const DEFAULT_REPLICATE_URL: &str = "https://api.replicate.com/v1/predictions";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const POLL_INTERVAL_SECS: u64 = 2;
const MAX_POLL_ATTEMPTS: u32 = 30;
const DEFAULT_RANK: u32 = 2;
const MODEL_NAME: &str = "replicate-sd";

/// Pinned model version for stable-diffusion on Replicate
const MODEL_VERSION: &str = "db21e45d3f7023abc2a46ee38a23973f6dce16bb082a930b0c49861f96d1e5bf";

/// Replicate provider for remote image generation
pub struct ReplicateProvider {
    api_key: Option<String>,
    api_url: String,
    rank: u32,
}

/// Outcome of one prediction status poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionStatus {
    Processing,
    Succeeded { output_url: String },
    Failed(String),
}

impl ReplicateProvider {
    /// Create a new ReplicateProvider from config. Construction never
    /// fails; a missing key surfaces through `status()` instead.
    pub fn from_config(config: &EmberConfig) -> Self {
        Self {
            api_key: config.api_key("replicate").map(|k| k.to_string()),
            api_url: config
                .api_url("replicate")
                .unwrap_or(DEFAULT_REPLICATE_URL)
                .to_string(),
            rank: config.rank("replicate").unwrap_or(DEFAULT_RANK),
        }
    }

    /// Create a prediction and return its ID
    fn submit(
        &self,
        api_key: &str,
        request: &ImageRequest,
        resolution: Resolution,
    ) -> std::result::Result<String, FailureReason> {
        let payload = build_replicate_payload(request, resolution);

        let agent = build_agent();
        let mut response = agent
            .post(&self.api_url)
            .header("Authorization", &format!("Token {}", api_key))
            .header("Content-Type", "application/json")
            .send_json(&payload)
            .map_err(FailureReason::from)?;

        let body: serde_json::Value = response
            .body_mut()
            .read_json()
            .map_err(|e| FailureReason::MalformedResponse(e.to_string()))?;

        body.get("id")
            .and_then(|id| id.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                FailureReason::MalformedResponse("no prediction id in response".to_string())
            })
    }

    /// Poll one prediction until it settles or the poll budget runs out
    fn wait_for_prediction(
        &self,
        api_key: &str,
        prediction_id: &str,
    ) -> std::result::Result<String, FailureReason> {
        let url = format!("{}/{}", self.api_url, prediction_id);

        for _ in 0..MAX_POLL_ATTEMPTS {
            let agent = build_agent();
            let mut response = agent
                .get(&url)
                .header("Authorization", &format!("Token {}", api_key))
                .call()
                .map_err(FailureReason::from)?;

            let body: serde_json::Value = response
                .body_mut()
                .read_json()
                .map_err(|e| FailureReason::MalformedResponse(e.to_string()))?;

            match parse_prediction_status(&body)? {
                PredictionStatus::Succeeded { output_url } => return Ok(output_url),
                PredictionStatus::Failed(msg) => return Err(FailureReason::ModelError(msg)),
                PredictionStatus::Processing => {
                    std::thread::sleep(Duration::from_secs(POLL_INTERVAL_SECS));
                }
            }
        }

        Err(FailureReason::Timeout)
    }

    /// Download the finished output image
    fn download_output(&self, url: &str) -> std::result::Result<Vec<u8>, FailureReason> {
        let agent = build_agent();
        let response = agent.get(url).call().map_err(FailureReason::from)?;

        let mut bytes = Vec::new();
        let mut reader = response.into_body().into_reader();
        std::io::Read::read_to_end(&mut reader, &mut bytes)
            .map_err(|e| FailureReason::Network(format!("failed to read image data: {}", e)))?;
        Ok(bytes)
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .build();
    config.into()
}

/// Build the prediction-create payload from the common request shape
pub fn build_replicate_payload(
    request: &ImageRequest,
    resolution: Resolution,
) -> serde_json::Value {
    let mut input = serde_json::json!({
        "prompt": request.prompt,
        "width": resolution.width,
        "height": resolution.height,
        "num_inference_steps": request.steps.unwrap_or(DEFAULT_STEPS),
        "guidance_scale": request.guidance_scale.unwrap_or(DEFAULT_GUIDANCE_SCALE),
    });

    if let Some(negative) = &request.negative_prompt {
        input["negative_prompt"] = serde_json::json!(negative);
    }
    if let Some(seed) = request.seed {
        input["seed"] = serde_json::json!(seed);
    }

    serde_json::json!({
        "version": MODEL_VERSION,
        "input": input,
    })
}

/// Interpret a prediction status body
pub fn parse_prediction_status(
    body: &serde_json::Value,
) -> std::result::Result<PredictionStatus, FailureReason> {
    let status = body
        .get("status")
        .and_then(|s| s.as_str())
        .ok_or_else(|| FailureReason::MalformedResponse("no status in response".to_string()))?;

    match status {
        "succeeded" => {
            let output_url = body
                .get("output")
                .and_then(|o| o.as_array())
                .and_then(|arr| arr.first())
                .and_then(|u| u.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    FailureReason::MalformedResponse("no output URL in response".to_string())
                })?;
            Ok(PredictionStatus::Succeeded { output_url })
        }
        "failed" | "canceled" => {
            let msg = body
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("prediction failed")
                .to_string();
            Ok(PredictionStatus::Failed(msg))
        }
        _ => Ok(PredictionStatus::Processing),
    }
}

impl ImageProvider for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
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
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| FailureReason::NotAvailable("no API key configured".to_string()))?;

        let prediction_id = self.submit(&api_key, request, resolution)?;
        let output_url = self.wait_for_prediction(&api_key, &prediction_id)?;
        let raw = self.download_output(&output_url)?;
        let (bytes, width, height) = decode_image_bytes(&raw)?;

        Ok(GeneratedImage {
            bytes,
            params: ResolvedParams {
                width,
                height,
                steps: request.steps.unwrap_or(DEFAULT_STEPS),
                guidance_scale: request.guidance_scale.unwrap_or(DEFAULT_GUIDANCE_SCALE),
                seed: request.seed,
                model: MODEL_NAME.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_payload() {
        let mut request = ImageRequest::new("a robot");
        request.seed = Some(7);
        let payload = build_replicate_payload(&request, Resolution::new(512, 512));

        assert_eq!(payload["version"], MODEL_VERSION);
        assert_eq!(payload["input"]["prompt"], "a robot");
        assert_eq!(payload["input"]["width"], 512);
        assert_eq!(payload["input"]["num_inference_steps"], 20);
        assert_eq!(payload["input"]["seed"], 7);
        assert_eq!(
            payload["input"]["negative_prompt"],
            "blurry, low quality, distorted"
        );
    }

    #[test]
    fn test_parse_status_succeeded() {
        let body = serde_json::json!({
            "id": "abc123",
            "status": "succeeded",
            "output": ["https://replicate.delivery/out.png"]
        });
        let status = parse_prediction_status(&body).unwrap();
        assert_eq!(
            status,
            PredictionStatus::Succeeded {
                output_url: "https://replicate.delivery/out.png".to_string()
            }
        );
    }

    #[test]
    fn test_parse_status_failed() {
        let body = serde_json::json!({
            "status": "failed",
            "error": "NSFW content detected"
        });
        let status = parse_prediction_status(&body).unwrap();
        assert_eq!(
            status,
            PredictionStatus::Failed("NSFW content detected".to_string())
        );
    }

    #[test]
    fn test_parse_status_processing() {
        let body = serde_json::json!({ "status": "starting" });
        assert_eq!(
            parse_prediction_status(&body).unwrap(),
            PredictionStatus::Processing
        );
    }

    #[test]
    fn test_parse_status_succeeded_without_output() {
        let body = serde_json::json!({ "status": "succeeded" });
        assert!(parse_prediction_status(&body).is_err());
    }

    #[test]
    fn test_status_without_key() {
        let provider = ReplicateProvider::from_config(&EmberConfig::default());
        assert_eq!(provider.status(), ProviderStatus::NoApiKey);
        assert_eq!(provider.rank(), 2);
    }
}
