//! Relay configuration
//!
//! One YAML document: global settings, menus with their actions, pipeline
//! timings and browser options. Loading never mutates the file.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use cdp_adapter::CdpConfig;
use delivery_flow::{
    has_modifier, normalize_shortcut, Catalog, DeliveryTimings, DestinationIdentity,
    GlobalSettings, MenuDescriptor,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("configuration has {} problem(s):\n  - {}", .0.len(), .0.join("\n  - "))]
    Invalid(Vec<String>),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserSection {
    /// Chrome/Chromium binary; detected when unset.
    pub chrome_path: Option<PathBuf>,
    /// Profile directory the assistant is signed in with.
    pub profile_dir: Option<PathBuf>,
    pub headless: Option<bool>,
    /// DevTools websocket of an already running browser.
    pub ws_url: Option<String>,
}

impl BrowserSection {
    pub fn apply(&self, cfg: &mut CdpConfig) {
        if let Some(chrome) = &self.chrome_path {
            cfg.executable = chrome.clone();
        }
        if let Some(dir) = &self.profile_dir {
            cfg.user_data_dir = dir.clone();
        }
        if let Some(headless) = self.headless {
            cfg.headless = headless;
        }
        if let Some(ws) = &self.ws_url {
            cfg.websocket_url = Some(ws.clone());
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    pub global: GlobalSettings,
    pub menus: Vec<MenuDescriptor>,
    pub timings: DeliveryTimings,
    pub browser: BrowserSection,
}

impl RelayConfig {
    pub fn from_yaml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml(path, &content)
    }

    pub fn catalog(&self) -> Catalog {
        Catalog {
            global: self.global.clone(),
            menus: self.menus.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// Every problem found, in document order.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.global.title_match.trim().is_empty() {
            problems.push("global.title_match is required".to_string());
        }

        let mut menu_ids = HashSet::new();
        // canonical shortcut -> where it is bound
        let mut bindings: HashMap<String, Vec<String>> = HashMap::new();

        for (index, menu) in self.menus.iter().enumerate() {
            let at = format!("menus[{index}] ({})", menu.id);
            if !valid_id(&menu.id) {
                problems.push(format!("{at}: id must use letters, digits, '-' or '_' only"));
            }
            if !menu_ids.insert(menu.id.as_str()) {
                problems.push(format!("{at}: duplicate menu id"));
            }
            if menu.name.trim().is_empty() {
                problems.push(format!("{at}: name is required"));
            }
            if let Err(err) = DestinationIdentity::new(
                &menu.destination_address,
                self.global.title_match.clone(),
                menu.address_patterns.clone(),
            ) {
                problems.push(format!("{at}: {err}"));
            }
            if menu.address_patterns.iter().any(|p| p.trim().is_empty()) {
                problems.push(format!("{at}: address patterns must not be empty"));
            }
            if let Some(shortcut) = menu.run_all_shortcut.as_deref().filter(|s| !s.trim().is_empty()) {
                check_shortcut(&mut problems, &at, "run_all_shortcut", shortcut);
                if menu.run_all_enabled {
                    bind(&mut bindings, shortcut, format!("{} run-all", menu.id));
                }
            }

            let mut action_ids = HashSet::new();
            for (position, action) in menu.actions.iter().enumerate() {
                let at = format!("{at} actions[{position}] ({})", action.id);
                if !valid_id(&action.id) {
                    problems.push(format!("{at}: id must use letters, digits, '-' or '_' only"));
                }
                if !action_ids.insert(action.id.as_str()) {
                    problems.push(format!("{at}: duplicate action id"));
                }
                if action.title.trim().is_empty() {
                    problems.push(format!("{at}: title is required"));
                }
                if action.prompt_template.trim().is_empty() {
                    problems.push(format!("{at}: prompt_template is required"));
                }
                if let Some(shortcut) = action.shortcut.as_deref().filter(|s| !s.trim().is_empty()) {
                    check_shortcut(&mut problems, &at, "shortcut", shortcut);
                    if action.enabled {
                        bind(&mut bindings, shortcut, format!("{}/{}", menu.id, action.id));
                    }
                }
            }
        }

        let mut conflicts: Vec<_> = bindings.into_iter().filter(|(_, at)| at.len() > 1).collect();
        conflicts.sort();
        for (shortcut, at) in conflicts {
            problems.push(format!("shortcut {shortcut} is bound more than once: {}", at.join(", ")));
        }

        problems.extend(self.timings.problems());
        problems
    }
}

fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_shortcut(problems: &mut Vec<String>, at: &str, field: &str, shortcut: &str) {
    if !has_modifier(shortcut) {
        problems.push(format!(
            "{at}: {field} '{shortcut}' needs at least one of Ctrl, Alt, Shift or Meta plus a key"
        ));
    }
}

fn bind(bindings: &mut HashMap<String, Vec<String>>, shortcut: &str, at: String) {
    if let Some(canonical) = normalize_shortcut(shortcut) {
        bindings.entry(canonical).or_default().push(at);
    }
}
