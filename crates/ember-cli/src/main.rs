//! Ember CLI - Command-line interface for the Ember generation service

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{generate, providers};

#[derive(Parser)]
#[command(name = "ember")]
#[command(about = "Image generation with ranked provider fallback", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image from a text prompt
    Generate {
        /// Text prompt describing the image
        prompt: String,

        /// Resolution as WxH
        #[arg(long, default_value = "1024x1024")]
        resolution: String,

        /// Inference step count
        #[arg(long)]
        steps: Option<u32>,

        /// Guidance scale
        #[arg(long)]
        guidance_scale: Option<f64>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Negative prompt (things the image should not contain)
        #[arg(long)]
        negative_prompt: Option<String>,

        /// Use a single named provider instead of the full fallback chain
        #[arg(long)]
        provider: Option<String>,

        /// Output directory (defaults to the configured one)
        #[arg(long)]
        output: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured providers with rank and availability
    Providers,

    /// List supported resolutions
    Resolutions,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            prompt,
            resolution,
            steps,
            guidance_scale,
            seed,
            negative_prompt,
            provider,
            output,
            json,
        } => generate::run(generate::GenerateArgs {
            prompt,
            resolution,
            steps,
            guidance_scale,
            seed,
            negative_prompt,
            provider,
            output,
            json,
        }),
        Commands::Providers => providers::run(),
        Commands::Resolutions => providers::run_resolutions(),
    }
}
