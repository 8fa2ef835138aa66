mod app_config;

use std::{error::Error, path::PathBuf};

use app_config::AppConfig;
use clap::{Parser, Subcommand};
use maize::{
  capabilities::Capabilities,
  model::{TrainingParams, DEFAULT_SEED},
  subcommands::{self, DEFAULT_PORT},
  utils,
};
use tracing::debug;

const DEFAULT_DATA: &str = "Food_Prices_Kenya.csv";

#[derive(Parser)]
#[command(version, about = "Kenya maize price prediction")]
struct Cli {
  /// YAML file with default settings
  #[arg(long, global = true, value_name = "PATH")]
  config: Option<PathBuf>,
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the dashboard
  Serve {
    /// Price dataset (CSV)
    #[arg(short, long, value_name = "PATH")]
    data: Option<PathBuf>,
    #[arg(short, long)]
    port: Option<u16>,
  },
  /// Train and evaluate once, printing a summary
  Train {
    #[arg(short, long, value_name = "PATH")]
    data: Option<PathBuf>,
    #[arg(short, long, value_name = "INT")]
    seed: Option<u64>,
  },
  /// Predict the price for one region and month
  Predict {
    #[arg(short, long, value_name = "PATH")]
    data: Option<PathBuf>,
    #[arg(long)]
    region: String,
    #[arg(long)]
    year: i32,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: u32,
  },
}

impl Command {
  fn overrides(&self) -> AppConfig {
    match self {
      Command::Serve { data, port } => AppConfig {
        data: data.clone(),
        port: *port,
        ..AppConfig::default()
      },
      Command::Train { data, seed } => AppConfig {
        data: data.clone(),
        seed: *seed,
        ..AppConfig::default()
      },
      Command::Predict { data, .. } => AppConfig {
        data: data.clone(),
        ..AppConfig::default()
      },
    }
  }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
  utils::init_logging()?;
  let args = Cli::parse();

  let file_config = match &args.config {
    Some(path) => AppConfig::from_file(path)?,
    None => AppConfig::default(),
  };
  let config = file_config.merge(args.command.overrides());
  debug!(?config, "effective configuration");

  let caps = Capabilities::detect().restrict(config.training, config.charts);
  caps.report();
  let data = config.data.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA));
  let params = TrainingParams::default().with_seed(config.seed.unwrap_or(DEFAULT_SEED));

  match args.command {
    Command::Serve { .. } => {
      let app = subcommands::Server::new(data, config.port.unwrap_or(DEFAULT_PORT), caps, params);
      app.run().await?;
    }
    Command::Train { .. } => {
      subcommands::Train::new(data, caps, params).run()?;
    }
    Command::Predict {
      region, year, month, ..
    } => {
      subcommands::Predict::new(data, caps, params, region, year, month).run()?;
    }
  }
  Ok(())
}
