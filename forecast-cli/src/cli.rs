use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forecast_core::{
    ChartRenderer, Config, DiskCache, HtmlRenderer, build_forecast, transport_from_config,
};
use std::{fs, path::PathBuf};
use tracing::info;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Hourly temperature and humidity forecast chart")]
pub struct Cli {
    /// Read configuration from this file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the forecast, render the chart and open it (the default).
    Show {
        /// Write the HTML chart here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Only write the file, don't open a browser.
        #[arg(long)]
        no_open: bool,
    },

    /// Remove all cached API responses.
    ClearCache,

    /// Print the path of the configuration file.
    ConfigPath,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn run(self, config: Config) -> Result<()> {
        let command = self.command.unwrap_or(Command::Show { output: None, no_open: false });

        match command {
            Command::Show { output, no_open } => show(config, output, no_open).await,
            Command::ClearCache => {
                let cache = DiskCache::open(config.cache_dir()?, config.cache_ttl())?;
                let removed = cache.clear()?;
                println!("Removed {removed} cached response(s) from {}", cache.dir().display());
                Ok(())
            }
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

async fn show(mut config: Config, output: Option<PathBuf>, no_open: bool) -> Result<()> {
    if let Some(path) = output {
        config.chart.output = Some(path);
    }
    if no_open {
        config.chart.open = false;
    }

    let transport = transport_from_config(&config)?;
    let figure = build_forecast(&config, transport.as_ref()).await?;

    let html = HtmlRenderer::new(config.chart.width, config.chart.height).render(&figure)?;

    let path = config.output_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    fs::write(&path, html)
        .with_context(|| format!("Failed to write chart: {}", path.display()))?;
    info!(path = %path.display(), "chart written");

    if config.chart.open {
        open::that(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    } else {
        println!("{}", path.display());
    }

    Ok(())
}
