//! Image provider trait and request/result types

use ember_core::{EmberError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default inference step count when the request leaves it unset
pub const DEFAULT_STEPS: u32 = 20;

/// Default guidance scale when the request leaves it unset
pub const DEFAULT_GUIDANCE_SCALE: f64 = 7.5;

/// Resolutions the backends are known to handle well
pub const SUPPORTED_RESOLUTIONS: &[&str] = &[
    "512x512", "768x768", "1024x1024", "512x768", "768x512", "1024x768", "768x1024",
];

/// Recommended default resolution
pub const RECOMMENDED_RESOLUTION: &str = "1024x1024";

/// A parsed, validated image resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse a "WxH" token into two positive integers
    pub fn parse(token: &str) -> Result<Self> {
        let mut parts = token.splitn(2, 'x');
        let width = parts.next().unwrap_or("");
        let height = parts.next().ok_or_else(|| {
            EmberError::ValidationError(format!(
                "Invalid resolution '{}': expected WxH (e.g. 1024x1024)",
                token
            ))
        })?;

        let width: u32 = width.trim().parse().map_err(|_| {
            EmberError::ValidationError(format!("Invalid resolution width in '{}'", token))
        })?;
        let height: u32 = height.trim().parse().map_err(|_| {
            EmberError::ValidationError(format!("Invalid resolution height in '{}'", token))
        })?;

        if width == 0 || height == 0 {
            return Err(EmberError::ValidationError(format!(
                "Resolution '{}' must have positive width and height",
                token
            )));
        }

        Ok(Self { width, height })
    }
}

impl FromStr for Resolution {
    type Err = EmberError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A request to generate one image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Text prompt describing the image
    pub prompt: String,
    /// Resolution as a "WxH" token; validated before any provider runs
    #[serde(default = "default_resolution")]
    pub resolution: String,
    /// Inference step count (provider default when unset)
    #[serde(default)]
    pub steps: Option<u32>,
    /// Guidance scale (provider default when unset)
    #[serde(default)]
    pub guidance_scale: Option<f64>,
    /// Seed for reproducibility; backends may pick one when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Things the image should not contain
    #[serde(default = "default_negative_prompt")]
    pub negative_prompt: Option<String>,
}

fn default_resolution() -> String {
    RECOMMENDED_RESOLUTION.to_string()
}

fn default_negative_prompt() -> Option<String> {
    Some("blurry, low quality, distorted".to_string())
}

impl ImageRequest {
    /// Create a request with defaults for everything but the prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            resolution: default_resolution(),
            steps: None,
            guidance_scale: None,
            seed: None,
            negative_prompt: default_negative_prompt(),
        }
    }

    /// Parse and validate the resolution token
    pub fn resolution(&self) -> Result<Resolution> {
        Resolution::parse(&self.resolution)
    }
}

/// The effective parameters a provider actually used for one attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedParams {
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance_scale: f64,
    pub seed: Option<u64>,
    /// Backend model identifier (e.g. "stability-ai-v1.6")
    pub model: String,
}

impl ResolvedParams {
    /// Flatten into provenance metadata attached to the final result
    pub fn to_metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert("width".to_string(), self.width.to_string());
        metadata.insert("height".to_string(), self.height.to_string());
        metadata.insert("steps".to_string(), self.steps.to_string());
        metadata.insert(
            "guidance_scale".to_string(),
            self.guidance_scale.to_string(),
        );
        if let Some(seed) = self.seed {
            metadata.insert("seed".to_string(), seed.to_string());
        }
        metadata.insert("model".to_string(), self.model.clone());
        metadata
    }
}

/// In-memory outcome of one successful provider attempt.
///
/// Providers produce bytes; the orchestrator owns persistence and
/// result assembly.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Encoded PNG bytes
    pub bytes: Vec<u8>,
    /// Parameters the provider actually used
    pub params: ResolvedParams,
}

/// The final product of one orchestration call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    /// Absolute path to the stored artifact
    pub image_path: String,
    /// Inline base64 copy of the artifact bytes
    #[serde(default)]
    pub image_base64: Option<String>,
    /// Name of the provider that produced the image
    pub provider: String,
    /// Wall-clock duration of the successful attempt, in seconds
    pub duration_secs: f64,
    /// Content hash of the artifact (sha256:...)
    #[serde(default)]
    pub content_hash: Option<String>,
    /// Provenance metadata echoing the effective request parameters
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Why one provider attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("timeout")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("model error: {0}")]
    ModelError(String),

    /// Returned when `generate` is invoked on a provider whose
    /// preconditions are not met. The orchestrator never triggers this
    /// (it checks `status()` first); direct callers can.
    #[error("not available: {0}")]
    NotAvailable(String),
}

impl From<ureq::Error> for FailureReason {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(code) => FailureReason::HttpStatus(code),
            ureq::Error::Timeout(_) => FailureReason::Timeout,
            other => FailureReason::Network(other.to_string()),
        }
    }
}

/// One unsuccessful provider attempt, kept for diagnostics only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub provider: String,
    pub reason: FailureReason,
}

/// Status returned by a provider precondition check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Available,
    Unavailable(String),
    NoApiKey,
}

/// Trait implemented by each image generation backend
/// (Stability, HuggingFace, Replicate, local model, placeholder).
pub trait ImageProvider: Send + Sync {
    /// Provider name (e.g. "stability", "huggingface")
    fn name(&self) -> &str;

    /// Trial order within the fallback chain; lower ranks are tried first
    fn rank(&self) -> u32;

    /// Check local preconditions (credential configured, model loaded).
    /// Must be pure: no network I/O, no side effects.
    fn status(&self) -> ProviderStatus;

    /// Perform exactly one generation attempt. May block on network or
    /// model I/O, bounded by the provider's timeout. No internal retry;
    /// the fallback chain handles recovery.
    fn generate(
        &self,
        request: &ImageRequest,
        resolution: Resolution,
    ) -> std::result::Result<GeneratedImage, FailureReason>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parse() {
        let r = Resolution::parse("512x512").unwrap();
        assert_eq!(r.width, 512);
        assert_eq!(r.height, 512);

        let r = Resolution::parse("1024x768").unwrap();
        assert_eq!(r.width, 1024);
        assert_eq!(r.height, 768);
    }

    #[test]
    fn test_resolution_parse_rejects_garbage() {
        assert!(Resolution::parse("bad").is_err());
        assert!(Resolution::parse("").is_err());
        assert!(Resolution::parse("512").is_err());
        assert!(Resolution::parse("x512").is_err());
        assert!(Resolution::parse("512x").is_err());
        assert!(Resolution::parse("-1x512").is_err());
        assert!(Resolution::parse("512x512x512").is_err());
    }

    #[test]
    fn test_resolution_parse_rejects_zero() {
        assert!(Resolution::parse("0x0").is_err());
        assert!(Resolution::parse("0x512").is_err());
        assert!(Resolution::parse("512x0").is_err());
    }

    #[test]
    fn test_resolution_display_roundtrip() {
        let r = Resolution::new(768, 1024);
        let parsed: Resolution = r.to_string().parse().unwrap();
        assert_eq!(parsed, r);
    }

    #[test]
    fn test_request_defaults() {
        let request = ImageRequest::new("a robot");
        assert_eq!(request.resolution, "1024x1024");
        assert_eq!(request.steps, None);
        assert_eq!(
            request.negative_prompt.as_deref(),
            Some("blurry, low quality, distorted")
        );
    }

    #[test]
    fn test_request_deserialize_minimal() {
        let request: ImageRequest =
            serde_json::from_str(r#"{"prompt": "a robot"}"#).unwrap();
        assert_eq!(request.prompt, "a robot");
        assert_eq!(request.resolution, "1024x1024");
        assert!(request.negative_prompt.is_some());
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(FailureReason::HttpStatus(500).to_string(), "HTTP 500");
        assert_eq!(FailureReason::Timeout.to_string(), "timeout");
        assert_eq!(
            FailureReason::MalformedResponse("no artifacts".to_string()).to_string(),
            "malformed response: no artifacts"
        );
    }

    #[test]
    fn test_resolved_params_metadata() {
        let params = ResolvedParams {
            width: 512,
            height: 768,
            steps: 20,
            guidance_scale: 7.5,
            seed: Some(42),
            model: "stability-ai-v1.6".to_string(),
        };
        let metadata = params.to_metadata();
        assert_eq!(metadata.get("width").map(String::as_str), Some("512"));
        assert_eq!(metadata.get("height").map(String::as_str), Some("768"));
        assert_eq!(metadata.get("seed").map(String::as_str), Some("42"));
        assert_eq!(
            metadata.get("model").map(String::as_str),
            Some("stability-ai-v1.6")
        );
    }

    #[test]
    fn test_resolved_params_metadata_omits_absent_seed() {
        let params = ResolvedParams {
            width: 512,
            height: 512,
            steps: 20,
            guidance_scale: 7.5,
            seed: None,
            model: "test".to_string(),
        };
        assert!(!params.to_metadata().contains_key("seed"));
    }
}
