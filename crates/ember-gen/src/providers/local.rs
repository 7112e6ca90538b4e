//! Local model provider
//!
//! Wraps a co-located diffusion model behind a trait seam. The model is
//! loaded once at process start and handed to the provider at
//! construction; there is no lazy loading mid-request. Inference is
//! serialized through a mutex because the underlying model is not assumed
//! safe for concurrent use.

use crate::provider::*;
use std::sync::Mutex;

const DEFAULT_RANK: u32 = 3;

/// An in-process image generation model.
///
/// `infer` is handed the effective resolution and the original request and
/// must return encoded PNG bytes. Implementations that honor `seed` should
/// be byte-deterministic for a fixed seed.
pub trait LocalModel: Send {
    /// Model identifier recorded in result provenance
    fn model_name(&self) -> &str;

    /// Run one synchronous inference. The orchestrator cannot cancel a
    /// blocked call, so implementations must bound their own runtime
    /// (120s is a generous ceiling for local diffusion).
    fn infer(
        &mut self,
        request: &ImageRequest,
        resolution: Resolution,
    ) -> std::result::Result<Vec<u8>, String>;
}

/// Provider wrapping an exclusively-owned local model
pub struct LocalProvider {
    model: Option<Mutex<Box<dyn LocalModel>>>,
    rank: u32,
}

impl LocalProvider {
    /// Create a provider owning a loaded model
    pub fn new(model: Box<dyn LocalModel>) -> Self {
        Self {
            model: Some(Mutex::new(model)),
            rank: DEFAULT_RANK,
        }
    }

    /// Create a provider for a process where no model could be loaded.
    /// It reports `Unavailable` and is skipped by the orchestrator.
    pub fn unloaded() -> Self {
        Self {
            model: None,
            rank: DEFAULT_RANK,
        }
    }

    /// Override the trial rank
    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = rank;
        self
    }
}

impl ImageProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn rank(&self) -> u32 {
        self.rank
    }

    fn status(&self) -> ProviderStatus {
        match self.model {
            Some(_) => ProviderStatus::Available,
            None => ProviderStatus::Unavailable("no local model loaded".to_string()),
        }
    }

    fn generate(
        &self,
        request: &ImageRequest,
        resolution: Resolution,
    ) -> std::result::Result<GeneratedImage, FailureReason> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| FailureReason::NotAvailable("no local model loaded".to_string()))?;

        let mut model = model
            .lock()
            .map_err(|_| FailureReason::ModelError("model lock poisoned".to_string()))?;

        let bytes = model
            .infer(request, resolution)
            .map_err(FailureReason::ModelError)?;
        let model_name = model.model_name().to_string();
        drop(model);

        Ok(GeneratedImage {
            bytes,
            params: ResolvedParams {
                width: resolution.width,
                height: resolution.height,
                steps: request.steps.unwrap_or(DEFAULT_STEPS),
                guidance_scale: request.guidance_scale.unwrap_or(DEFAULT_GUIDANCE_SCALE),
                seed: request.seed,
                model: model_name,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Deterministic test model: solid fill derived from the seed
    struct SeededModel;

    impl LocalModel for SeededModel {
        fn model_name(&self) -> &str {
            "seeded-test-model"
        }

        fn infer(
            &mut self,
            request: &ImageRequest,
            resolution: Resolution,
        ) -> std::result::Result<Vec<u8>, String> {
            let seed = request.seed.unwrap_or(0);
            let color = image::Rgb([
                (seed & 0xFF) as u8,
                ((seed >> 8) & 0xFF) as u8,
                ((seed >> 16) & 0xFF) as u8,
            ]);
            let img =
                image::RgbImage::from_pixel(resolution.width, resolution.height, color);
            let mut bytes = Vec::new();
            img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
                .map_err(|e| e.to_string())?;
            Ok(bytes)
        }
    }

    struct BrokenModel;

    impl LocalModel for BrokenModel {
        fn model_name(&self) -> &str {
            "broken"
        }

        fn infer(
            &mut self,
            _request: &ImageRequest,
            _resolution: Resolution,
        ) -> std::result::Result<Vec<u8>, String> {
            Err("CUDA out of memory".to_string())
        }
    }

    #[test]
    fn test_unloaded_is_unavailable() {
        let provider = LocalProvider::unloaded();
        assert!(matches!(
            provider.status(),
            ProviderStatus::Unavailable(_)
        ));
    }

    #[test]
    fn test_loaded_is_available() {
        let provider = LocalProvider::new(Box::new(SeededModel));
        assert_eq!(provider.status(), ProviderStatus::Available);
        assert_eq!(provider.rank(), 3);
    }

    #[test]
    fn test_same_seed_is_byte_identical() {
        let provider = LocalProvider::new(Box::new(SeededModel));
        let mut request = ImageRequest::new("a robot");
        request.resolution = "1024x1024".to_string();
        request.seed = Some(42);
        let resolution = request.resolution().unwrap();

        let first = provider.generate(&request, resolution).unwrap();
        let second = provider.generate(&request, resolution).unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn test_different_seed_differs() {
        let provider = LocalProvider::new(Box::new(SeededModel));
        let mut request = ImageRequest::new("a robot");
        request.seed = Some(1);
        let resolution = Resolution::new(32, 32);

        let first = provider.generate(&request, resolution).unwrap();
        request.seed = Some(2);
        let second = provider.generate(&request, resolution).unwrap();
        assert_ne!(first.bytes, second.bytes);
    }

    #[test]
    fn test_model_error_is_reported() {
        let provider = LocalProvider::new(Box::new(BrokenModel));
        let request = ImageRequest::new("a robot");

        let err = provider
            .generate(&request, Resolution::new(64, 64))
            .unwrap_err();
        assert_eq!(
            err,
            FailureReason::ModelError("CUDA out of memory".to_string())
        );
    }

    #[test]
    fn test_provenance_names_the_model() {
        let provider = LocalProvider::new(Box::new(SeededModel));
        let request = ImageRequest::new("a robot");

        let image = provider
            .generate(&request, Resolution::new(16, 16))
            .unwrap();
        assert_eq!(image.params.model, "seeded-test-model");
    }
}
