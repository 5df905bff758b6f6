use anyhow::Result;
use clap::{Parser, Subcommand};
use price_forecaster::config::{Config, DEFAULT_CONFIG_PATH};
use price_forecaster::forecast::ForecastEngine;
use price_forecaster::telemetry::init_tracing;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "price-forecaster")]
#[command(about = "Train and run a next-hour electricity price model", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fit scalers and model, report held-out metrics, save artifacts
    Train(DataArgs),
    /// Predict the price for the latest row with saved artifacts
    Predict(DataArgs),
}

#[derive(clap::Args)]
struct DataArgs {
    /// Override the input CSV path
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Override the target price column
    #[arg(short, long)]
    target: Option<String>,
}

impl DataArgs {
    fn apply(self, cfg: &mut Config) -> Result<()> {
        if let Some(data) = self.data {
            cfg.data.path = data;
        }
        if let Some(target) = self.target {
            cfg.data.target_column = target;
        }
        cfg.validate().map_err(anyhow::Error::msg)
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut cfg = Config::load_from(&cli.config)?;

    match cli.command {
        Command::Train(args) => {
            args.apply(&mut cfg)?;
            let report = ForecastEngine::new(cfg).train()?;
            info!(
                model_id = %report.model_id,
                rmse = report.metrics.rmse,
                predictions = %report.predictions_path.display(),
                "training finished"
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Predict(args) => {
            args.apply(&mut cfg)?;
            let forecast = ForecastEngine::new(cfg).predict()?;
            println!("{}", serde_json::to_string_pretty(&forecast)?);
        }
    }

    Ok(())
}
