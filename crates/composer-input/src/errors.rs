use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    /// The key belongs to an older snapshot than the page currently holds.
    #[error("node key is stale")]
    Stale,
    #[error("node is no longer attached to the document")]
    Detached,
    #[error("page script failed: {0}")]
    Script(String),
    /// The page is still there but did not answer this time, e.g. a timeout
    /// or a navigation tearing down the execution context.
    #[error("page did not answer: {0}")]
    Transient(String),
    #[error("page unreachable: {0}")]
    Transport(String),
}

impl PageError {
    /// The document cannot be reached at all, as opposed to one script or
    /// node misbehaving.
    pub fn is_page_lost(&self) -> bool {
        matches!(self, PageError::Transport(_))
    }
}

impl From<AdapterError> for PageError {
    fn from(err: AdapterError) -> Self {
        if err.is_target_gone() {
            return PageError::Transport(err.to_string());
        }
        match err.kind {
            AdapterErrorKind::ScriptFailed => {
                PageError::Script(err.hint.unwrap_or_else(|| err.kind.to_string()))
            }
            _ => PageError::Transient(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_lose_the_page() {
        let closed: PageError = AdapterError::new(AdapterErrorKind::TargetClosed).into();
        assert!(closed.is_page_lost());
        let missing: PageError = AdapterError::new(AdapterErrorKind::TargetNotFound).into();
        assert!(missing.is_page_lost());
        let thrown: PageError = AdapterError::new(AdapterErrorKind::ScriptFailed)
            .with_hint("TypeError")
            .into();
        assert_eq!(thrown, PageError::Script("TypeError".into()));
        assert!(!thrown.is_page_lost());
        assert!(!PageError::Stale.is_page_lost());
    }

    #[test]
    fn timeouts_and_navigation_churn_are_transient() {
        let timeout: PageError = AdapterError::new(AdapterErrorKind::NavTimeout)
            .retriable(true)
            .into();
        assert!(matches!(timeout, PageError::Transient(_)));
        assert!(!timeout.is_page_lost());

        let reloading: PageError = AdapterError::new(AdapterErrorKind::Protocol)
            .with_hint("cdp error -32000: Execution context was destroyed.")
            .into();
        assert!(matches!(reloading, PageError::Transient(_)));
        assert!(!reloading.is_page_lost());

        let io: PageError = AdapterError::new(AdapterErrorKind::CdpIo).retriable(true).into();
        assert!(!io.is_page_lost());

        let detached: PageError = AdapterError::new(AdapterErrorKind::Protocol)
            .with_hint("cdp error -32001: Session with given id not found.")
            .into();
        assert!(detached.is_page_lost());
    }
}
