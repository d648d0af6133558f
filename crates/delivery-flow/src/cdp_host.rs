//! [`TabHost`] backed by the CDP adapter.

use std::sync::Arc;

use async_trait::async_trait;
use cdp_adapter::{CdpAdapter, PageId, PageSummary, RawEvent};
use composer_input::{CdpPagePort, PagePort};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::SessionError;
use crate::host::{TabEvent, TabHost, TabInfo};

const TAB_EVENT_CAPACITY: usize = 256;

pub struct CdpTabHost {
    adapter: Arc<CdpAdapter>,
    events: broadcast::Sender<TabEvent>,
    forwarder: JoinHandle<()>,
}

impl CdpTabHost {
    /// Must be called inside a tokio runtime; spawns the event forwarder.
    pub fn new(adapter: Arc<CdpAdapter>) -> Self {
        let (events, _) = broadcast::channel(TAB_EVENT_CAPACITY);
        let forwarder = tokio::spawn(forward_events(adapter.subscribe(), events.clone()));
        Self {
            adapter,
            events,
            forwarder,
        }
    }

    pub fn adapter(&self) -> &Arc<CdpAdapter> {
        &self.adapter
    }
}

impl Drop for CdpTabHost {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

async fn forward_events(mut raw: broadcast::Receiver<RawEvent>, events: broadcast::Sender<TabEvent>) {
    loop {
        match raw.recv().await {
            Ok(event) => {
                if let Some(event) = translate(event) {
                    // No subscribers is fine; nobody is waiting on a tab.
                    let _ = events.send(event);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "tab event forwarder lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("adapter event bus closed");
                break;
            }
        }
    }
}

fn translate(event: RawEvent) -> Option<TabEvent> {
    match event {
        RawEvent::PageTitleChanged { page, title, .. } => Some(TabEvent::TitleChanged { page, title }),
        RawEvent::PageNavigated { page, url, .. } => Some(TabEvent::Navigated { page, address: url }),
        RawEvent::PageClosed { page, .. } => Some(TabEvent::Closed { page }),
        RawEvent::PageOpened { .. } => None,
        RawEvent::Error { page, message } => {
            debug!(?page, %message, "adapter error event");
            None
        }
    }
}

fn tab_info(summary: PageSummary) -> TabInfo {
    TabInfo {
        page: summary.page,
        address: summary.url,
        title: summary.title,
    }
}

#[async_trait]
impl TabHost for CdpTabHost {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>, SessionError> {
        Ok(self.adapter.pages().await?.into_iter().map(tab_info).collect())
    }

    async fn open_tab(&self, address: &str) -> Result<PageId, SessionError> {
        let page = self.adapter.create_page(address).await?;
        if let Err(err) = self.adapter.activate_page(page).await {
            debug!(page = %page, ?err, "new tab could not be brought forward");
        }
        Ok(page)
    }

    async fn focus_tab(&self, page: PageId) -> Result<(), SessionError> {
        Ok(self.adapter.activate_page(page).await?)
    }

    async fn navigate_tab(&self, page: PageId, address: &str) -> Result<(), SessionError> {
        Ok(self.adapter.navigate(page, address).await?)
    }

    async fn tab_info(&self, page: PageId) -> Result<Option<TabInfo>, SessionError> {
        Ok(self.adapter.page_info(page).await?.map(tab_info))
    }

    fn subscribe(&self) -> broadcast::Receiver<TabEvent> {
        self.events.subscribe()
    }

    fn page_port(&self, page: PageId) -> Arc<dyn PagePort> {
        Arc::new(CdpPagePort::new(Arc::clone(&self.adapter), page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_events_map_to_tab_events() {
        let page = PageId::new();
        assert_eq!(
            translate(RawEvent::PageTitleChanged {
                page,
                title: "Coach".into(),
                ts: 1
            }),
            Some(TabEvent::TitleChanged {
                page,
                title: "Coach".into()
            })
        );
        assert_eq!(
            translate(RawEvent::PageClosed { page, ts: 2 }),
            Some(TabEvent::Closed { page })
        );
        assert_eq!(
            translate(RawEvent::PageOpened {
                page,
                url: "about:blank".into(),
                ts: 0
            }),
            None
        );
    }
}
