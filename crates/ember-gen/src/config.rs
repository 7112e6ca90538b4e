//! Layered configuration system
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `EMBER_{PROVIDER}_API_KEY`
//! 2. Project-local: `.ember/config.toml`
//! 3. Global: `~/.ember/config.toml`

use ember_core::{EmberError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Provider-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Trial order override; lower ranks are tried first
    #[serde(default)]
    pub rank: Option<u32>,
}

fn default_true() -> bool {
    true
}

/// Generation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Directory generated artifacts are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Attach an inline base64 copy of the artifact to results
    #[serde(default = "default_true")]
    pub inline_base64: bool,
    /// Step count applied to requests that leave it unset
    #[serde(default = "default_steps")]
    pub default_steps: u32,
    /// Guidance scale applied to requests that leave it unset
    #[serde(default = "default_guidance_scale")]
    pub default_guidance_scale: f64,
    /// Negative prompt applied to requests that leave it unset
    #[serde(default = "default_negative_prompt")]
    pub default_negative_prompt: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            inline_base64: true,
            default_steps: default_steps(),
            default_guidance_scale: default_guidance_scale(),
            default_negative_prompt: default_negative_prompt(),
        }
    }
}

fn default_output_dir() -> String {
    "generated_images".to_string()
}

fn default_steps() -> u32 {
    crate::provider::DEFAULT_STEPS
}

fn default_guidance_scale() -> f64 {
    crate::provider::DEFAULT_GUIDANCE_SCALE
}

fn default_negative_prompt() -> Option<String> {
    Some("blurry, low quality, distorted".to_string())
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmberConfigFile {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Resolved configuration with environment variable overrides applied
#[derive(Debug, Clone, Default)]
pub struct EmberConfig {
    pub providers: HashMap<String, ProviderConfig>,
    pub generation: GenerationConfig,
}

impl EmberConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = EmberConfigFile::default();

        // Layer 1: Global config (~/.ember/config.toml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                Self::merge_into(&mut config, global);
            }
        }

        // Layer 2: Project-local config (.ember/config.toml)
        let local_path = PathBuf::from(".ember/config.toml");
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            Self::merge_into(&mut config, local);
        }

        // Layer 3: Environment variable overrides
        Self::apply_env_overrides(&mut config);

        Ok(EmberConfig {
            providers: config.providers,
            generation: config.generation,
        })
    }

    /// Load config from a specific file path only (for testing)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        Self::apply_env_overrides(&mut config);
        Ok(EmberConfig {
            providers: config.providers,
            generation: config.generation,
        })
    }

    /// Get API key for a provider
    pub fn api_key(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.api_key.as_deref())
    }

    /// Get API URL for a provider (or its default)
    pub fn api_url(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.api_url.as_deref())
    }

    /// Check if a provider is enabled
    pub fn is_enabled(&self, provider_name: &str) -> bool {
        self.providers
            .get(provider_name)
            .map(|p| p.enabled)
            .unwrap_or(true)
    }

    /// Get the configured rank override for a provider
    pub fn rank(&self, provider_name: &str) -> Option<u32> {
        self.providers.get(provider_name).and_then(|p| p.rank)
    }

    /// Directory generated artifacts are written to
    pub fn output_dir(&self) -> &str {
        &self.generation.output_dir
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".ember").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<EmberConfigFile> {
        let content = std::fs::read_to_string(path)?;
        let config: EmberConfigFile = toml::from_str(&content).map_err(|e| {
            EmberError::ConfigError(format!("Failed to parse config {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    fn merge_into(base: &mut EmberConfigFile, overlay: EmberConfigFile) {
        for (name, provider) in overlay.providers {
            let entry = base.providers.entry(name).or_default();
            if provider.api_key.is_some() {
                entry.api_key = provider.api_key;
            }
            if provider.api_url.is_some() {
                entry.api_url = provider.api_url;
            }
            if provider.rank.is_some() {
                entry.rank = provider.rank;
            }
            entry.enabled = provider.enabled;
        }

        if overlay.generation.output_dir != default_output_dir() {
            base.generation.output_dir = overlay.generation.output_dir;
        }
        if overlay.generation.default_steps != default_steps() {
            base.generation.default_steps = overlay.generation.default_steps;
        }
        if overlay.generation.default_guidance_scale != default_guidance_scale() {
            base.generation.default_guidance_scale = overlay.generation.default_guidance_scale;
        }
        if overlay.generation.default_negative_prompt != default_negative_prompt() {
            base.generation.default_negative_prompt = overlay.generation.default_negative_prompt;
        }
        base.generation.inline_base64 = overlay.generation.inline_base64;
    }

    fn apply_env_overrides(config: &mut EmberConfigFile) {
        let provider_names = ["stability", "huggingface", "replicate"];
        for name in &provider_names {
            let env_key = format!("EMBER_{}_API_KEY", name.to_uppercase());
            if let Ok(key) = std::env::var(&env_key) {
                let entry = config.providers.entry(name.to_string()).or_default();
                entry.api_key = Some(key);
            }
        }
    }
}
