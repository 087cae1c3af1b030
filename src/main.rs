use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use oscprint::config::DashConfig;
use oscprint::tui::runner;

#[derive(Parser)]
#[command(name = "oscprint", about = "Live terminal dashboard for OSC messages.")]
struct Cli {
    /// UDP port to listen on
    port: Option<u16>,

    /// Width of the label column
    #[arg(long)]
    label_width: Option<usize>,

    /// Keep rows in arrival order
    #[arg(long)]
    no_sort: bool,

    /// Default fader bar width
    #[arg(long)]
    fader_width: Option<usize>,

    /// Write logs to this file (the terminal is taken by the board)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Config file (defaults to ~/.oscprint/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply(self, mut config: DashConfig) -> DashConfig {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(width) = self.label_width {
            config.label_width = width;
        }
        if self.no_sort {
            config.autosort = false;
        }
        if let Some(width) = self.fader_width {
            config.fader_width = width;
        }
        if self.log.is_some() {
            config.log_file = self.log;
        }
        config
    }
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("oscprint=info".parse()?),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => DashConfig::load_from(path)?,
        None => DashConfig::load()?,
    };
    let config = cli.apply(config);

    if let Some(path) = &config.log_file {
        init_logging(path)?;
    }

    info!(port = config.port, "oscprint starting");
    runner::run(config).await
}
