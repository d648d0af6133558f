use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cdp_adapter::{event_bus, CdpAdapter, CdpConfig};
use tracing::info;

use super::env::BrowserArgs;
use crate::config::RelayConfig;

const EVENT_BUS_CAPACITY: usize = 512;

pub struct CliContext {
    config: Arc<RelayConfig>,
    config_path: PathBuf,
    browser: BrowserArgs,
}

impl CliContext {
    pub fn new(config: RelayConfig, config_path: PathBuf, browser: BrowserArgs) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            browser,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Launch options: adapter defaults, then the `browser` section, then flags.
    pub fn cdp_config(&self) -> CdpConfig {
        let mut cfg = CdpConfig::default();
        self.config.browser.apply(&mut cfg);
        if let Some(path) = &self.browser.chrome_path {
            cfg.executable = path.clone();
        }
        if self.browser.headful {
            cfg.headless = false;
        }
        if let Some(ws) = &self.browser.ws_url {
            cfg.websocket_url = Some(ws.clone());
        }
        cfg
    }

    /// Starts a browser connection; the caller owns its shutdown.
    pub async fn launch_browser(&self) -> Result<Arc<CdpAdapter>> {
        let cfg = self.cdp_config();
        let (bus, _rx) = event_bus(EVENT_BUS_CAPACITY);
        let adapter = Arc::new(CdpAdapter::new(cfg, bus));
        if adapter.mode().is_stub() {
            bail!("no Chrome/Chromium available; set PROMPTCAST_CHROME or pass --chrome-path/--ws-url");
        }
        Arc::clone(&adapter)
            .start()
            .await
            .context("failed to start browser connection")?;
        info!(mode = adapter.mode().as_str(), "browser connection ready");
        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrowserSection;

    #[test]
    fn flags_override_config_file() {
        let config = RelayConfig {
            browser: BrowserSection {
                chrome_path: Some(PathBuf::from("/from/config")),
                headless: Some(true),
                ..BrowserSection::default()
            },
            ..RelayConfig::default()
        };
        let ctx = CliContext::new(
            config,
            PathBuf::from("promptcast.yaml"),
            BrowserArgs {
                chrome_path: Some(PathBuf::from("/from/flag")),
                headful: true,
                ws_url: None,
            },
        );
        let cfg = ctx.cdp_config();
        assert_eq!(cfg.executable, PathBuf::from("/from/flag"));
        assert!(!cfg.headless);
        assert!(cfg.websocket_url.is_none());
    }
}
