//! Provider listing commands

use anyhow::Result;
use ember_gen::providers::{available_providers, create_provider};
use ember_gen::{EmberConfig, ProviderStatus, RECOMMENDED_RESOLUTION, SUPPORTED_RESOLUTIONS};

pub fn run() -> Result<()> {
    let config = EmberConfig::load()?;

    println!("{:<14} {:>6}  {}", "PROVIDER", "RANK", "STATUS");
    for name in available_providers() {
        let provider = create_provider(name, &config)?;
        let status = match provider.status() {
            ProviderStatus::Available => "available".to_string(),
            ProviderStatus::NoApiKey => "no API key".to_string(),
            ProviderStatus::Unavailable(reason) => format!("unavailable ({})", reason),
        };
        let rank = if provider.rank() == u32::MAX {
            "last".to_string()
        } else {
            provider.rank().to_string()
        };
        println!("{:<14} {:>6}  {}", provider.name(), rank, status);
    }

    Ok(())
}

pub fn run_resolutions() -> Result<()> {
    for resolution in SUPPORTED_RESOLUTIONS {
        if *resolution == RECOMMENDED_RESOLUTION {
            println!("{} (recommended)", resolution);
        } else {
            println!("{}", resolution);
        }
    }
    Ok(())
}
