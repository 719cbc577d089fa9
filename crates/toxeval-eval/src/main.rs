//! toxeval
//!
//! Evaluates a trained toxicity classifier checkpoint on a labeled test set
//! and writes `<checkpoint>.results.json` and `<checkpoint>.submission.csv`.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use toxeval_classifiers::CUDA_VISIBLE_DEVICES;
use toxeval_core::CATEGORIES;
use toxeval_eval::{load_model, run_evaluation, write_outputs, EvalConfig, Overrides};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "toxeval")]
#[command(about = "Evaluate a toxic-comment classifier checkpoint", long_about = None)]
struct Cli {
    /// Run configuration (JSON or YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// Trained checkpoint (.ckpt, .pt, .bin or .safetensors)
    #[arg(long, alias = "ckpt")]
    checkpoint: PathBuf,

    /// Device to evaluate on; scopes CUDA_VISIBLE_DEVICES when given
    #[arg(short, long)]
    device: Option<String>,

    /// Test CSV, replacing the one in the config
    #[arg(short = 't', long = "test-csv", alias = "test_csv")]
    test_csv: Option<PathBuf>,

    /// Records per batch, replacing the config value
    #[arg(long)]
    batch_size: Option<usize>,

    /// Input-preparation workers, replacing the config value
    #[arg(long)]
    num_workers: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Must happen before the runtime starts threads and before any device exists
    if let Some(device) = &cli.device {
        std::env::set_var(CUDA_VISIBLE_DEVICES, device);
        info!("{}={}", CUDA_VISIBLE_DEVICES, device);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    info!("Starting toxeval");

    let mut config = EvalConfig::from_file(&cli.config)?;
    config.apply_overrides(&Overrides {
        test_csv: cli.test_csv.clone(),
        device: cli.device.clone(),
        batch_size: cli.batch_size,
        num_workers: cli.num_workers,
    });
    config.validate()?;
    info!("Configuration loaded successfully");
    info!("Run: {}", config.name);
    info!("Dataset: {}", config.dataset.kind);

    let device_spec = config.device()?;
    let device = device_spec.create()?;
    info!("Device: {}", device_spec);

    let (model, encoder) = load_model(&config, &cli.checkpoint, &device)?;
    let result = run_evaluation(&model, Arc::new(encoder), &config).await?;

    for (category, auc) in CATEGORIES.iter().zip(&result.auc_scores) {
        info!("AUC {:<14} {:.4}", category, auc);
    }
    info!("Mean AUC: {:.4}", result.mean_auc);

    let paths = write_outputs(&result, &cli.checkpoint)?;
    info!(
        "Outputs written: {} and {}",
        paths.results.display(),
        paths.submission.display()
    );
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("toxeval=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("toxeval=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
