use std::process::ExitCode;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use semseg_rs::{Config, ImageProcessor};

fn main() -> ExitCode {
    let config = Config::parse();

    let log_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("semseg_rs={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run(config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every image was segmented.
fn run(config: Config) -> Result<bool> {
    ensure!(
        config.model_path.exists(),
        "Model path does not exist: {}",
        config.model_path.display()
    );
    ensure!(
        config.input.exists(),
        "Input path does not exist: {}",
        config.input.display()
    );

    let processor = ImageProcessor::with_onnx_model(config).context("Failed to load model")?;
    let summary = processor.process().context("Failed to process images")?;

    for path in &summary.written {
        println!("{}", path.display());
    }
    for (path, message) in &summary.failed {
        eprintln!("{}: {}", path.display(), message);
    }

    Ok(summary.failed.is_empty())
}
