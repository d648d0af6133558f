//! The browser seen as a set of tabs
//!
//! Sessions, readiness and delivery only ever need these operations, so
//! everything above this trait runs unchanged against a live browser or an
//! in-memory host.

use std::sync::Arc;

use async_trait::async_trait;
use cdp_adapter::PageId;
use composer_input::PagePort;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::errors::SessionError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TabInfo {
    pub page: PageId,
    pub address: String,
    pub title: String,
}

/// Tab update notifications. Delivery is not guaranteed for every change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TabEvent {
    TitleChanged { page: PageId, title: String },
    Navigated { page: PageId, address: String },
    Closed { page: PageId },
}

impl TabEvent {
    pub fn page(&self) -> PageId {
        match self {
            TabEvent::TitleChanged { page, .. }
            | TabEvent::Navigated { page, .. }
            | TabEvent::Closed { page } => *page,
        }
    }
}

/// Reference to one ready destination tab.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SessionHandle {
    page: PageId,
}

impl SessionHandle {
    pub fn new(page: PageId) -> Self {
        Self { page }
    }

    pub fn page(&self) -> PageId {
        self.page
    }
}

#[async_trait]
pub trait TabHost: Send + Sync {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>, SessionError>;

    /// Opens a new foreground tab at `address`.
    async fn open_tab(&self, address: &str) -> Result<PageId, SessionError>;

    async fn focus_tab(&self, page: PageId) -> Result<(), SessionError>;

    async fn navigate_tab(&self, page: PageId, address: &str) -> Result<(), SessionError>;

    /// `None` once the tab no longer exists.
    async fn tab_info(&self, page: PageId) -> Result<Option<TabInfo>, SessionError>;

    fn subscribe(&self) -> broadcast::Receiver<TabEvent>;

    fn page_port(&self, page: PageId) -> Arc<dyn PagePort>;
}
