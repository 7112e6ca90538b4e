//! Generate command

use anyhow::Result;
use ember_gen::providers::{create_provider, provider_chain};
use ember_gen::store::FsStore;
use ember_gen::{EmberConfig, ImageRequest, Orchestrator};

pub struct GenerateArgs {
    pub prompt: String,
    pub resolution: String,
    pub steps: Option<u32>,
    pub guidance_scale: Option<f64>,
    pub seed: Option<u64>,
    pub negative_prompt: Option<String>,
    pub provider: Option<String>,
    pub output: Option<String>,
    pub json: bool,
}

pub fn run(args: GenerateArgs) -> Result<()> {
    let config = EmberConfig::load()?;

    let mut request = ImageRequest::new(&args.prompt);
    request.resolution = args.resolution;
    request.steps = args.steps;
    request.guidance_scale = args.guidance_scale;
    request.seed = args.seed;
    // Unset fields pick up the [generation] defaults in the orchestrator
    request.negative_prompt = args.negative_prompt;

    let output_dir = args
        .output
        .unwrap_or_else(|| config.output_dir().to_string());
    let store = Box::new(FsStore::new(&output_dir));

    // --provider narrows the chain to one backend; the placeholder still
    // backs it, and the result's provider field discloses which ran.
    let chain = match &args.provider {
        Some(name) => vec![create_provider(name, &config)?],
        None => provider_chain(&config),
    };

    let orchestrator = Orchestrator::new(chain, store).with_generation(config.generation.clone());

    let (result, failures) = orchestrator.orchestrate(&request)?;

    if args.json {
        for failure in &failures {
            eprintln!("{} failed: {}", failure.provider, failure.reason);
        }
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    for failure in &failures {
        println!("  {} failed: {}", failure.provider, failure.reason);
    }

    println!(
        "Generated via {} ({:.1}s)",
        result.provider, result.duration_secs
    );
    println!("  {}", result.image_path);
    if let Some(hash) = &result.content_hash {
        println!("  {}", hash);
    }
    if result.provider == "placeholder" {
        println!("  (placeholder image: every real provider was skipped or failed)");
    }

    Ok(())
}
