//! Chromium DevTools Protocol adapter for promptcast.
//!
//! The adapter owns a single browser connection, tracks page targets and
//! their flattened sessions, and turns target lifecycle traffic into
//! [`events::RawEvent`]s on a broadcast bus. Higher layers only talk to
//! [`adapter::CdpAdapter`]; the wire lives behind [`transport::CdpTransport`].

use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};
use tokio::sync::broadcast;
use which::which;

pub mod ids {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    /// Unique identifier for the browser instance managed by the adapter.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct BrowserId(pub Uuid);

    /// Unique identifier for a page/tab.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct PageId(pub Uuid);

    /// Adapter-side handle for an attached CDP session.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct SessionId(pub Uuid);

    impl BrowserId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    impl PageId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    impl SessionId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    impl std::fmt::Display for PageId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }
}

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
    pub enum AdapterErrorKind {
        #[error("command timed out")]
        NavTimeout,
        #[error("cdp i/o failure")]
        CdpIo,
        /// The browser answered with a protocol-level error response.
        #[error("cdp protocol error")]
        Protocol,
        #[error("target not found")]
        TargetNotFound,
        #[error("target closed")]
        TargetClosed,
        #[error("script evaluation failed")]
        ScriptFailed,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
        pub data: Option<serde_json::Value>,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
                data: None,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }

        pub fn with_data(mut self, data: serde_json::Value) -> Self {
            self.data = Some(data);
            self
        }

        /// True when the page behind the call no longer exists. Timeouts,
        /// i/o hiccups and a destroyed execution context do not count.
        pub fn is_target_gone(&self) -> bool {
            match self.kind {
                AdapterErrorKind::TargetClosed | AdapterErrorKind::TargetNotFound => true,
                AdapterErrorKind::Protocol => self.hint.as_deref().is_some_and(|hint| {
                    TARGET_GONE_REPLIES.iter().any(|reply| hint.contains(reply))
                }),
                _ => false,
            }
        }
    }

    const TARGET_GONE_REPLIES: [&str; 3] = [
        "No target with given id",
        "Session with given id not found",
        "Target closed",
    ];

}

pub mod events {
    use super::ids::PageId;
    use serde::{Deserialize, Serialize};

    /// Raw events emitted by the adapter.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub enum RawEvent {
        PageOpened {
            page: PageId,
            url: String,
            ts: u64,
        },
        PageNavigated {
            page: PageId,
            url: String,
            ts: u64,
        },
        PageTitleChanged {
            page: PageId,
            title: String,
            ts: u64,
        },
        PageClosed {
            page: PageId,
            ts: u64,
        },
        Error {
            page: Option<PageId>,
            message: String,
        },
    }

    impl RawEvent {
        pub fn page(&self) -> Option<PageId> {
            match self {
                RawEvent::PageOpened { page, .. }
                | RawEvent::PageNavigated { page, .. }
                | RawEvent::PageTitleChanged { page, .. }
                | RawEvent::PageClosed { page, .. } => Some(*page),
                RawEvent::Error { page, .. } => *page,
            }
        }
    }
}

pub mod config {
    use crate::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::{
        env,
        path::{Path, PathBuf},
    };

    /// Configuration for launching or attaching to the browser.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CdpConfig {
        pub executable: PathBuf,
        pub user_data_dir: PathBuf,
        pub headless: bool,
        pub default_deadline_ms: u64,
        pub retry_backoff_ms: u64,
        /// Attach to an already running browser instead of launching one.
        pub websocket_url: Option<String>,
        pub heartbeat_interval_ms: u64,
        pub attach_timeout_ms: u64,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: default_chrome_path(),
                user_data_dir: default_profile_dir(),
                headless: resolve_headless_default(),
                default_deadline_ms: 30_000,
                retry_backoff_ms: 250,
                websocket_url: None,
                heartbeat_interval_ms: 15_000,
                attach_timeout_ms: 5_000,
            }
        }
    }

    fn resolve_headless_default() -> bool {
        match env::var("PROMPTCAST_HEADLESS") {
            Ok(value) => {
                let lower = value.to_ascii_lowercase();
                !matches!(lower.as_str(), "0" | "false" | "no" | "off")
            }
            // Assistant sites need a signed-in visible profile.
            Err(_) => false,
        }
    }

    fn default_chrome_path() -> PathBuf {
        detect_chrome_executable().unwrap_or_default()
    }

    fn default_profile_dir() -> PathBuf {
        if let Ok(path) = env::var("PROMPTCAST_CHROME_PROFILE") {
            return PathBuf::from(path);
        }

        Path::new("./.promptcast-profile").into()
    }
}

/// Bus type used to fan adapter events out to subscribers.
pub type EventBus = broadcast::Sender<RawEvent>;

pub fn event_bus(capacity: usize) -> (EventBus, broadcast::Receiver<RawEvent>) {
    broadcast::channel(capacity)
}

/// Public view of a page target as reported by the browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub page: PageId,
    pub target_id: String,
    pub url: String,
    pub title: String,
}

fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("PROMPTCAST_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    let skip_defaults = env::var("PROMPTCAST_SKIP_OS_PATHS")
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);

    if !skip_defaults {
        for candidate in os_specific_chrome_paths() {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(any(target_os = "macos", target_os = "linux", target_os = "freebsd"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd"
    )))]
    {
        &["chrome"]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let mut paths = Vec::new();
        for key in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(value) = env::var(key) {
                let root = PathBuf::from(value.trim());
                paths.push(root.join("Google/Chrome/Application/chrome.exe"));
                paths.push(root.join("Chromium/Application/chrome.exe"));
            }
        }
        paths
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd"
    )))]
    {
        Vec::new()
    }
}

/// Whether the adapter is wired to a real browser or running without one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdapterMode {
    Real,
    Stub,
}

impl AdapterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterMode::Real => "real",
            AdapterMode::Stub => "stub",
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self, AdapterMode::Stub)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ChromeMode {
    Auto,
    ForceReal,
    ForceStub,
}

fn chrome_mode() -> ChromeMode {
    match env::var("PROMPTCAST_USE_REAL_CHROME")
        .unwrap_or_default()
        .to_ascii_lowercase()
        .as_str()
    {
        "1" | "true" | "yes" | "on" => ChromeMode::ForceReal,
        "0" | "false" | "no" | "off" => ChromeMode::ForceStub,
        _ => ChromeMode::Auto,
    }
}

fn resolve_chrome_path(cfg: &config::CdpConfig) -> Option<PathBuf> {
    if !cfg.executable.as_os_str().is_empty() && cfg.executable.exists() {
        return Some(cfg.executable.clone());
    }
    detect_chrome_executable()
}

pub mod adapter;
pub mod metrics;
pub mod registry;
pub mod transport;
mod util;

pub use adapter::CdpAdapter;
pub use config::CdpConfig;
pub use error::{AdapterError, AdapterErrorKind};
pub use events::RawEvent;
pub use ids::{BrowserId, PageId, SessionId};
pub use transport::{ChromiumTransport, CommandTarget, CdpTransport, NoopTransport, TransportEvent};
