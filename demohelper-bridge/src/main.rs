//! DemoHelper
//!
//! Connects to the game's netcon console and records POV demos with your own
//! voice in them.
//!
//! # Usage
//!
//! ```bash
//! demohelper
//! demohelper --config path/to/config.toml
//! ```
//!
//! Launch the game with `-netconport 2121` (or whatever `[game] netcon_port`
//! says), then type `echo dh rec` in the console to start recording.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use demohelper_bridge::{app, util};
use demohelper_core::Config;
use demohelper_core::config::default_config_path;

#[derive(Parser)]
#[command(name = "demohelper")]
#[command(author, version, about = "DemoHelper - POV demo recording through the game console")]
struct Args {
    /// Config file to use instead of the platform default
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    util::install_panic_hook();

    let path = match args.config {
        Some(path) => path,
        None => default_config_path()
            .context("could not determine the platform config directory; pass --config")?,
    };

    let config = match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            util::init_tracing(None);
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };
    util::init_tracing(Some(&config.internals.log_level));
    tracing::info!("Loaded config from {}", path.display());

    app::run(config).await.inspect_err(|e| tracing::error!("{:#}", e))
}
