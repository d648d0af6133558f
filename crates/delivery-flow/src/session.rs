//! Session Orchestrator
//!
//! Finds or opens the destination tab and waits for its readiness signal:
//! the tab title containing the destination's title match.

use std::sync::Arc;

use cdp_adapter::PageId;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::destination::DestinationIdentity;
use crate::errors::SessionError;
use crate::guard::DedupGuard;
use crate::host::{SessionHandle, TabEvent, TabHost};
use crate::metrics;
use crate::policy::DeliveryTimings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Signal {
    Ready,
    Closed,
}

pub struct SessionOrchestrator {
    host: Arc<dyn TabHost>,
    guard: Arc<DedupGuard>,
    readiness_timeout: Duration,
    poll_interval: Duration,
    document_watch: JoinHandle<()>,
}

impl SessionOrchestrator {
    /// Must be called inside a tokio runtime; the orchestrator keeps a task
    /// that resets the guard whenever a tab loads a new document.
    pub fn new(host: Arc<dyn TabHost>, timings: &DeliveryTimings) -> Self {
        let guard = Arc::new(DedupGuard::new(timings.debounce_window()));
        let document_watch = tokio::spawn(forget_replaced_documents(
            host.subscribe(),
            Arc::clone(&guard),
        ));
        Self {
            host,
            guard,
            readiness_timeout: timings.readiness_timeout(),
            poll_interval: timings.readiness_poll(),
            document_watch,
        }
    }

    pub fn host(&self) -> &Arc<dyn TabHost> {
        &self.host
    }

    /// Dedup state for every page this orchestrator manages.
    pub fn guard(&self) -> &Arc<DedupGuard> {
        &self.guard
    }

    /// Reuses a matching tab unless a fresh conversation is wanted; otherwise
    /// opens one and waits for it to become ready.
    pub async fn resolve_session(
        &self,
        destination: &DestinationIdentity,
        want_fresh: bool,
    ) -> Result<SessionHandle, SessionError> {
        if !want_fresh {
            if let Some(page) = self.find_existing(destination).await? {
                if let Err(err) = self.host.focus_tab(page).await {
                    warn!(page = %page, %err, "could not focus existing session");
                }
                info!(page = %page, "reusing existing session");
                metrics::record_session("reused");
                return Ok(SessionHandle::new(page));
            }
        }
        self.open_session(destination).await
    }

    /// Always opens a new tab.
    pub async fn open_session(
        &self,
        destination: &DestinationIdentity,
    ) -> Result<SessionHandle, SessionError> {
        let page = self.open_tab(destination).await?;
        self.await_ready(page, destination).await
    }

    /// Opens a new tab at a fresh address without waiting on it.
    pub async fn open_tab(&self, destination: &DestinationIdentity) -> Result<PageId, SessionError> {
        let address = destination.fresh_address();
        let page = self.host.open_tab(&address).await?;
        self.guard.clear(page);
        debug!(page = %page, %address, "opened destination tab");
        Ok(page)
    }

    /// Navigates `page` and forgets its dedup state with the old document.
    pub async fn navigate(&self, page: PageId, address: &str) -> Result<(), SessionError> {
        self.host.navigate_tab(page, address).await?;
        self.guard.clear(page);
        Ok(())
    }

    async fn find_existing(
        &self,
        destination: &DestinationIdentity,
    ) -> Result<Option<PageId>, SessionError> {
        let tabs = self.host.list_tabs().await?;
        Ok(tabs
            .into_iter()
            .find(|tab| destination.matches_address(&tab.address) && destination.title_matches(&tab.title))
            .map(|tab| tab.page))
    }

    /// Races an event watcher against a poller; whichever sees the title
    /// first wins and both are torn down before returning.
    pub async fn await_ready(
        &self,
        page: PageId,
        destination: &DestinationIdentity,
    ) -> Result<SessionHandle, SessionError> {
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(2);
        // Subscribe before the first poll so no title change slips between.
        let events = self.host.subscribe();

        let watcher = tokio::spawn(watch_events(
            events,
            page,
            destination.clone(),
            tx.clone(),
            cancel.clone(),
        ));
        let poller = tokio::spawn(poll_title(
            Arc::clone(&self.host),
            page,
            destination.clone(),
            self.poll_interval,
            tx,
            cancel.clone(),
        ));

        let signal = timeout(self.readiness_timeout, rx.recv()).await;
        cancel.cancel();
        for task in [watcher, poller] {
            if let Err(err) = task.await {
                warn!(page = %page, ?err, "readiness task failed");
            }
        }

        match signal {
            Ok(Some(Signal::Ready)) => {
                info!(page = %page, "session ready");
                metrics::record_session("opened");
                Ok(SessionHandle::new(page))
            }
            Ok(Some(Signal::Closed)) | Ok(None) => {
                warn!(page = %page, "session closed while waiting");
                metrics::record_session("closed");
                Err(SessionError::Closed)
            }
            Err(_) => {
                let waited = self.readiness_timeout.as_millis() as u64;
                warn!(page = %page, waited_ms = waited, "session readiness timed out");
                metrics::record_session("timeout");
                Err(SessionError::Timeout(waited))
            }
        }
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        self.document_watch.abort();
    }
}

/// Navigations the host starts on its own (reloads, link clicks) replace
/// the document just like `navigate` does.
async fn forget_replaced_documents(mut events: broadcast::Receiver<TabEvent>, guard: Arc<DedupGuard>) {
    loop {
        match events.recv().await {
            Ok(TabEvent::Navigated { page, address }) => {
                debug!(page = %page, %address, "document replaced, dedup state cleared");
                guard.clear(page);
            }
            Ok(TabEvent::Closed { page }) => guard.clear(page),
            Ok(TabEvent::TitleChanged { .. }) => {}
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "tab events dropped, dedup state may be stale");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn watch_events(
    mut events: broadcast::Receiver<TabEvent>,
    page: PageId,
    destination: DestinationIdentity,
    signals: mpsc::Sender<Signal>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return,
            event = events.recv() => event,
        };
        let signal = match event {
            Ok(TabEvent::TitleChanged { page: p, title }) if p == page => {
                destination.title_matches(&title).then_some(Signal::Ready)
            }
            Ok(TabEvent::Closed { page: p }) if p == page => Some(Signal::Closed),
            Ok(_) => None,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "readiness watcher lagged; poller covers the gap");
                None
            }
            Err(broadcast::error::RecvError::Closed) => {
                // Host stopped publishing; leave readiness to the poller.
                cancel.cancelled().await;
                return;
            }
        };
        if let Some(signal) = signal {
            let _ = signals.send(signal).await;
            return;
        }
    }
}

async fn poll_title(
    host: Arc<dyn TabHost>,
    page: PageId,
    destination: DestinationIdentity,
    interval: Duration,
    signals: mpsc::Sender<Signal>,
    cancel: CancellationToken,
) {
    loop {
        let signal = tokio::select! {
            _ = cancel.cancelled() => return,
            info = host.tab_info(page) => match info {
                Ok(Some(tab)) if destination.title_matches(&tab.title) => Some(Signal::Ready),
                Ok(Some(_)) => None,
                Ok(None) => Some(Signal::Closed),
                Err(err) => {
                    debug!(page = %page, %err, "title poll failed");
                    None
                }
            },
        };
        if let Some(signal) = signal {
            let _ = signals.send(signal).await;
            return;
        }
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = sleep(interval) => {}
        }
    }
}
