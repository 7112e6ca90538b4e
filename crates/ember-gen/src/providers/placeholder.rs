//! Placeholder provider
//!
//! Synthesizes a solid light-blue PNG at the requested resolution without
//! any network calls. Exists purely to back the orchestrator's guarantee
//! that every well-formed request produces an image-shaped result.

use crate::provider::*;
use std::io::Cursor;

/// Solid fill color for placeholder images (light blue)
const PLACEHOLDER_COLOR: [u8; 3] = [173, 216, 230];

/// A provider that always succeeds with a synthesized placeholder image
#[derive(Default)]
pub struct PlaceholderProvider;

impl PlaceholderProvider {
    pub fn new() -> Self {
        Self
    }

    /// Encode a solid-fill PNG matching the requested resolution
    pub fn synthesize(
        &self,
        resolution: Resolution,
    ) -> std::result::Result<GeneratedImage, FailureReason> {
        let img = image::RgbImage::from_pixel(
            resolution.width,
            resolution.height,
            image::Rgb(PLACEHOLDER_COLOR),
        );

        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| FailureReason::ModelError(format!("Failed to encode PNG: {}", e)))?;

        Ok(GeneratedImage {
            bytes,
            params: ResolvedParams {
                width: resolution.width,
                height: resolution.height,
                steps: 0,
                guidance_scale: 0.0,
                seed: None,
                model: "placeholder".to_string(),
            },
        })
    }
}

impl ImageProvider for PlaceholderProvider {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn rank(&self) -> u32 {
        // Last resort only; never competes with real providers
        u32::MAX
    }

    fn status(&self) -> ProviderStatus {
        ProviderStatus::Available
    }

    fn generate(
        &self,
        _request: &ImageRequest,
        resolution: Resolution,
    ) -> std::result::Result<GeneratedImage, FailureReason> {
        self.synthesize(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_always_available() {
        let provider = PlaceholderProvider::new();
        assert_eq!(provider.status(), ProviderStatus::Available);
        assert_eq!(provider.name(), "placeholder");
    }

    #[test]
    fn test_placeholder_matches_requested_resolution() {
        let provider = PlaceholderProvider::new();
        let request = ImageRequest::new("a robot");

        let image = provider
            .generate(&request, Resolution::new(512, 512))
            .unwrap();

        let decoded = image::load_from_memory(&image.bytes).unwrap();
        assert_eq!(decoded.width(), 512);
        assert_eq!(decoded.height(), 512);
        assert_eq!(image.params.width, 512);
        assert_eq!(image.params.model, "placeholder");
    }

    #[test]
    fn test_placeholder_solid_fill() {
        let provider = PlaceholderProvider::new();
        let image = provider.synthesize(Resolution::new(16, 16)).unwrap();

        let decoded = image::load_from_memory(&image.bytes).unwrap().to_rgb8();
        for pixel in decoded.pixels() {
            assert_eq!(pixel.0, PLACEHOLDER_COLOR);
        }
    }

    #[test]
    fn test_placeholder_non_square() {
        let provider = PlaceholderProvider::new();
        let image = provider.synthesize(Resolution::new(768, 512)).unwrap();

        let decoded = image::load_from_memory(&image.bytes).unwrap();
        assert_eq!(decoded.width(), 768);
        assert_eq!(decoded.height(), 512);
    }
}
