use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::RelayConfig;

const LOCAL_ENV: &str = "config/local.env";
const LOCAL_CONFIG: &str = "config/promptcast.yaml";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Human,
    Json,
}

/// Exports `KEY=value` lines from `config/local.env` unless the variable
/// is already set.
pub fn load_local_env_overrides() {
    let path = Path::new(LOCAL_ENV);
    if !path.exists() {
        return;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            for (key, value) in parse_env_lines(&contents) {
                if env::var(&key).is_ok() {
                    continue;
                }
                env::set_var(key, value);
            }
            info!(path = %path.display(), "Loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

fn parse_env_lines(contents: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            warn!(line = idx + 1, "invalid local.env entry; skipping");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        entries.push((key.to_string(), unquote(value.trim())));
    }
    entries
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1]
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\t", "\t")
    } else if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

/// Logs go to stderr so structured command output on stdout stays parseable.
pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let human = (format == LogFormat::Human).then(|| fmt::layer().with_writer(std::io::stderr));
    let json = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(human)
        .with(json)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}

pub struct LoadedConfig {
    pub config: RelayConfig,
    /// Where the configuration came from, or would have come from.
    pub path: PathBuf,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let (path, explicit) = match config_path {
        Some(path) => (path.clone(), true),
        None => (default_config_path()?, false),
    };

    if path.exists() {
        let config = RelayConfig::load(&path).await?;
        info!(path = %path.display(), menus = config.menus.len(), "Loaded configuration");
        Ok(LoadedConfig { config, path })
    } else if explicit {
        bail!("Config file not found: {}", path.display())
    } else {
        warn!("Config file not found, using defaults: {}", path.display());
        Ok(LoadedConfig {
            config: RelayConfig::default(),
            path,
        })
    }
}

/// Priority: ./config/promptcast.yaml > <config dir>/promptcast/config.yaml
fn default_config_path() -> Result<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Ok(local);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("promptcast");
    path.push("config.yaml");
    Ok(path)
}
