//! Provider registry
//!
//! Maps provider names to concrete implementations and builds the ranked
//! fallback chain.

pub mod huggingface;
pub mod local;
pub mod placeholder;
pub mod replicate;
pub mod stability;

use crate::config::EmberConfig;
use crate::provider::ImageProvider;
use ember_core::{EmberError, Result};

/// Create a provider by name with configuration
pub fn create_provider(name: &str, config: &EmberConfig) -> Result<Box<dyn ImageProvider>> {
    match name {
        "stability" => Ok(Box::new(stability::StabilityProvider::from_config(config))),
        "huggingface" => Ok(Box::new(huggingface::HuggingFaceProvider::from_config(
            config,
        ))),
        "replicate" => Ok(Box::new(replicate::ReplicateProvider::from_config(config))),
        "local" => Ok(Box::new(local::LocalProvider::unloaded())),
        "placeholder" => Ok(Box::new(placeholder::PlaceholderProvider::new())),
        _ => Err(EmberError::ConfigError(format!(
            "Unknown provider '{}'. Available: stability, huggingface, replicate, local, placeholder",
            name
        ))),
    }
}

/// List all known provider names
pub fn available_providers() -> Vec<&'static str> {
    vec!["stability", "huggingface", "replicate", "local", "placeholder"]
}

/// Build the fallback chain from config: every enabled real provider,
/// sorted by ascending rank. The placeholder is not part of the chain;
/// the orchestrator holds it separately as the exhaustion backstop.
///
/// The local provider enters the chain unloaded (and therefore skipped);
/// embedders with an in-process model construct the chain themselves.
pub fn provider_chain(config: &EmberConfig) -> Vec<Box<dyn ImageProvider>> {
    let mut chain: Vec<Box<dyn ImageProvider>> = Vec::new();

    for name in ["stability", "huggingface", "replicate", "local"] {
        if !config.is_enabled(name) {
            continue;
        }
        // All chain members construct infallibly
        if let Ok(provider) = create_provider(name, config) {
            chain.push(provider);
        }
    }

    chain.sort_by_key(|p| p.rank());
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_unknown_provider() {
        let config = EmberConfig::default();
        assert!(create_provider("midjourney", &config).is_err());
    }

    #[test]
    fn test_create_known_providers() {
        let config = EmberConfig::default();
        for name in available_providers() {
            let provider = create_provider(name, &config).unwrap();
            assert_eq!(provider.name(), name);
        }
    }

    #[test]
    fn test_chain_default_order() {
        let config = EmberConfig::default();
        let chain = provider_chain(&config);

        let names: Vec<&str> = chain.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["stability", "huggingface", "replicate", "local"]);
    }

    #[test]
    fn test_chain_respects_rank_overrides() {
        let config_str = r#"
[providers.huggingface]
rank = 0

[providers.stability]
rank = 5
"#;
        let file: crate::config::EmberConfigFile = toml::from_str(config_str).unwrap();
        let config = EmberConfig {
            providers: file.providers,
            generation: file.generation,
        };

        let chain = provider_chain(&config);
        let names: Vec<&str> = chain.iter().map(|p| p.name()).collect();
        assert_eq!(names[0], "huggingface");
        assert_eq!(names.last(), Some(&"stability"));
    }

    #[test]
    fn test_chain_excludes_disabled() {
        let config_str = r#"
[providers.replicate]
enabled = false
"#;
        let file: crate::config::EmberConfigFile = toml::from_str(config_str).unwrap();
        let config = EmberConfig {
            providers: file.providers,
            generation: file.generation,
        };

        let chain = provider_chain(&config);
        assert!(chain.iter().all(|p| p.name() != "replicate"));
    }
}
