//! Promptcast
//!
//! Routes selected text to a chat assistant tab: configuration, CLI and
//! metrics glue around the `delivery-flow` pipeline.

pub mod cli;
pub mod config;
pub mod metrics;

pub use config::{BrowserSection, ConfigError, RelayConfig};
