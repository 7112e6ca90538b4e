//! Hugging Face Inference API provider
//!
//! Mid-ranked backend. The hosted inference endpoint takes a bare prompt
//! and answers with raw image bytes (no JSON envelope), so the response is
//! decoded to confirm it really is an image and re-encoded as PNG.

use crate::config::EmberConfig;
use crate::provider::*;
use std::io::Cursor;
use std::time::Duration;

const DEFAULT_HUGGINGFACE_URL: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-2-1";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RANK: u32 = 1;
const MODEL_NAME: &str = "huggingface-sd-2.1";

/// Hugging Face provider for remote image generation
pub struct HuggingFaceProvider {
    api_key: Option<String>,
    api_url: String,
    rank: u32,
}

impl HuggingFaceProvider {
    /// Create a new HuggingFaceProvider from config. Construction never
    /// fails; a missing key surfaces through `status()` instead.
    pub fn from_config(config: &EmberConfig) -> Self {
        Self {
            api_key: config.api_key("huggingface").map(|k| k.to_string()),
            api_url: config
                .api_url("huggingface")
                .unwrap_or(DEFAULT_HUGGINGFACE_URL)
                .to_string(),
            rank: config.rank("huggingface").unwrap_or(DEFAULT_RANK),
        }
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .build();
    config.into()
}

/// Validate raw response bytes as an image and normalize to PNG.
/// Returns the PNG bytes plus the actual decoded dimensions.
pub fn decode_image_bytes(
    raw: &[u8],
) -> std::result::Result<(Vec<u8>, u32, u32), FailureReason> {
    let decoded = image::load_from_memory(raw)
        .map_err(|e| FailureReason::MalformedResponse(format!("not an image: {}", e)))?;

    let (width, height) = (decoded.width(), decoded.height());

    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| FailureReason::MalformedResponse(format!("PNG re-encode failed: {}", e)))?;

    Ok((png, width, height))
}

impl ImageProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
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
        _resolution: Resolution,
    ) -> std::result::Result<GeneratedImage, FailureReason> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| FailureReason::NotAvailable("no API key configured".to_string()))?;

        let payload = serde_json::json!({ "inputs": request.prompt });

        let agent = build_agent();
        let response = agent
            .post(&self.api_url)
            .header("Authorization", &format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .send_json(&payload)
            .map_err(FailureReason::from)?;

        let mut raw = Vec::new();
        let mut reader = response.into_body().into_reader();
        std::io::Read::read_to_end(&mut reader, &mut raw)
            .map_err(|e| FailureReason::Network(format!("failed to read image data: {}", e)))?;

        // The hosted endpoint picks its own output size; the decoded
        // dimensions are the resolved ones, not the requested ones.
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

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 100, 50]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_image_bytes_valid_png() {
        let raw = sample_png(24, 16);
        let (png, width, height) = decode_image_bytes(&raw).unwrap();
        assert_eq!(width, 24);
        assert_eq!(height, 16);

        let roundtrip = image::load_from_memory(&png).unwrap();
        assert_eq!(roundtrip.width(), 24);
    }

    #[test]
    fn test_decode_image_bytes_normalizes_jpeg() {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]));
        let mut jpeg = Vec::new();
        img.write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        let (png, width, height) = decode_image_bytes(&jpeg).unwrap();
        assert_eq!((width, height), (8, 8));
        // PNG magic
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_decode_image_bytes_rejects_non_image() {
        let err = decode_image_bytes(b"{\"error\": \"model loading\"}").unwrap_err();
        assert!(matches!(err, FailureReason::MalformedResponse(_)));
    }

    #[test]
    fn test_status_without_key() {
        let provider = HuggingFaceProvider::from_config(&EmberConfig::default());
        assert_eq!(provider.status(), ProviderStatus::NoApiKey);
        assert_eq!(provider.rank(), 1);
    }
}
