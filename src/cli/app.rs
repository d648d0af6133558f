use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_config, load_local_env_overrides, LoadedConfig};
use crate::metrics;

pub async fn run() -> Result<()> {
    load_local_env_overrides();
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_format)?;
    metrics::register_metrics();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("PROMPTCAST_GIT_HASH"),
        "Starting promptcast"
    );

    let LoadedConfig { config, path } = load_config(cli.config.as_ref()).await?;
    let ctx = CliContext::new(config, path, cli.browser.clone());

    let result = dispatch(&cli, &ctx).await;

    if cli.print_metrics {
        match metrics::render() {
            Ok(text) => eprintln!("{text}"),
            Err(err) => error!(?err, "failed to render metrics"),
        }
    }

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
