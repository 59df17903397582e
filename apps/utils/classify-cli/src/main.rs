//! Classify one or more produce images without starting the HTTP service.
//!
//! Resource paths come from the same `PRODUCE_*` variables as the service and
//! can be overridden per flag. `-` reads the image from stdin.

use clap::Parser;
use produce_scale::{PredictionResult, ResourceConfig, ResourceManager, WeightsView};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "classify-cli")]
#[command(about = "Classify produce images and look up reference weights")]
struct Args {
    /// ONNX model file
    #[arg(long)]
    model: Option<PathBuf>,

    /// Label table (CSV with a `label` column)
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Reference weights (`;`-separated name/min/avg/max)
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Print one JSON object per image instead of text
    #[arg(long)]
    json: bool,

    /// Images to classify, `-` for stdin
    #[arg(required = true)]
    images: Vec<String>,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    image: &'a str,
    label: &'a str,
    confidence: f32,
    weights: WeightsView,
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let manager = ResourceManager::new(resource_config(&args));
    if let Err(e) = manager.initialize() {
        tracing::error!("Failed to load resources: {}", e);
        return ExitCode::FAILURE;
    }

    let mut failed = 0usize;
    for image in &args.images {
        let outcome = read_image(image)
            .map_err(|e| e.to_string())
            .and_then(|bytes| manager.classify(&bytes).map_err(|e| e.to_string()));

        match outcome {
            Ok(result) if args.json => print_json(image, &result),
            Ok(result) => print_text(image, &result, args.images.len() > 1),
            Err(e) => {
                tracing::error!(image = %image, "Classification failed: {}", e);
                failed += 1;
            }
        }
    }

    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn resource_config(args: &Args) -> ResourceConfig {
    let mut config = ResourceConfig::from_env();
    if let Some(model) = &args.model {
        config.model_path = model.clone();
    }
    if let Some(labels) = &args.labels {
        config.labels_path = labels.clone();
    }
    if let Some(weights) = &args.weights {
        config.weights_path = weights.clone();
    }
    config
}

fn read_image(source: &str) -> std::io::Result<Vec<u8>> {
    if source == "-" {
        let mut bytes = Vec::new();
        std::io::stdin().lock().read_to_end(&mut bytes)?;
        Ok(bytes)
    } else {
        std::fs::read(source)
    }
}

fn print_text(image: &str, result: &PredictionResult, with_name: bool) {
    if with_name {
        println!("{}:", image);
    }
    println!("1x {} ({:.2}%)", result.label, result.confidence);
    match &result.weights {
        Some(w) => println!("Weight: min {} / avg {} / max {}", w.min, w.avg, w.max),
        None => println!("No reference weight data for {}", result.label),
    }
}

fn print_json(image: &str, result: &PredictionResult) {
    let line = JsonLine {
        image,
        label: &result.label,
        confidence: result.confidence,
        weights: result.weights_view(),
    };
    match serde_json::to_string(&line) {
        Ok(s) => println!("{}", s),
        Err(e) => tracing::error!("Failed to serialize result: {}", e),
    }
}
