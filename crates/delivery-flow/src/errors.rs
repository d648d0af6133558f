//! Delivery flow error types

use cdp_adapter::AdapterError;
use thiserror::Error;

/// Why a destination session could not be made ready.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The title never matched inside the readiness window.
    #[error("session not ready after {0}ms")]
    Timeout(u64),

    /// The tab went away while we were waiting on it.
    #[error("session closed before it became ready")]
    Closed,

    /// The browser host refused a tab operation.
    #[error("tab host error: {0}")]
    Host(String),
}

impl SessionError {
    /// Timeouts and closures are recoverable by opening a brand-new tab.
    pub fn wants_fallback(&self) -> bool {
        matches!(self, SessionError::Timeout(_) | SessionError::Closed)
    }
}

impl From<AdapterError> for SessionError {
    fn from(err: AdapterError) -> Self {
        SessionError::Host(err.to_string())
    }
}

/// Trigger rejected before any browser work happened.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("selected text is empty")]
    EmptySelection,

    #[error("unknown menu '{0}'")]
    UnknownMenu(String),

    #[error("unknown action '{action}' in menu '{menu}'")]
    UnknownAction { menu: String, action: String },

    #[error("action '{0}' is disabled")]
    ActionDisabled(String),

    #[error("no enabled action is bound to '{0}'")]
    UnknownShortcut(String),

    #[error("run-all is not enabled for menu '{0}'")]
    RunAllDisabled(String),

    #[error("menu '{0}' has no enabled actions")]
    NoActions(String),

    #[error("invalid destination address '{address}': {reason}")]
    InvalidDestination { address: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::AdapterErrorKind;

    #[test]
    fn only_timeouts_and_closures_fall_back() {
        assert!(SessionError::Timeout(20_000).wants_fallback());
        assert!(SessionError::Closed.wants_fallback());
        let host: SessionError = AdapterError::new(AdapterErrorKind::CdpIo).into();
        assert!(!host.wants_fallback());
    }
}
