//! Retry/Dedup Coordinator
//!
//! Attempt #1 is awaited and decides the result. A failed attempt #1
//! schedules attempt #2 with the same request id; nothing waits on it for
//! the result. Sessions that never become ready get one fallback tab.

use std::sync::Arc;

use cdp_adapter::PageId;
use parking_lot::Mutex;
use promptcast_core_types::{DeliveryRequest, RequestId};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::automaton::{InjectionAutomaton, InjectionReport, InjectionState, Injector};
use crate::destination::DestinationIdentity;
use crate::errors::SessionError;
use crate::host::SessionHandle;
use crate::metrics;
use crate::policy::DeliveryTimings;
use crate::session::SessionOrchestrator;

/// Pre-filled prompt left in the tab when the page could not be driven.
pub const PAGE_LOST_PROMPT: &str = "Could not auto-insert text. Please paste below.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPath {
    /// Delivered (or attempted) on the resolved session.
    Session,
    /// The session never became ready; a brand-new tab got one attempt.
    Fallback,
    /// No tab could be obtained at all.
    Unreached,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub label: String,
    pub request_id: RequestId,
    pub success: bool,
    pub path: DeliveryPath,
    pub page: Option<PageId>,
    pub state: Option<InjectionState>,
    pub backstop_scheduled: bool,
}

pub struct DeliveryCoordinator {
    sessions: Arc<SessionOrchestrator>,
    injector: Arc<dyn Injector>,
    timings: DeliveryTimings,
    backstops: Mutex<Vec<JoinHandle<()>>>,
}

impl DeliveryCoordinator {
    pub fn new(
        sessions: Arc<SessionOrchestrator>,
        injector: Arc<dyn Injector>,
        timings: DeliveryTimings,
    ) -> Self {
        Self {
            sessions,
            injector,
            timings,
            backstops: Mutex::new(Vec::new()),
        }
    }

    /// Coordinator driving an [`InjectionAutomaton`] that shares the
    /// orchestrator's dedup guard.
    pub fn with_automaton(sessions: Arc<SessionOrchestrator>, timings: DeliveryTimings) -> Self {
        let automaton = InjectionAutomaton::new(Arc::clone(sessions.guard()), timings.clone());
        Self::new(sessions, Arc::new(automaton), timings)
    }

    pub fn sessions(&self) -> &Arc<SessionOrchestrator> {
        &self.sessions
    }

    pub fn timings(&self) -> &DeliveryTimings {
        &self.timings
    }

    /// True iff attempt #1 inserted or submitted.
    pub async fn deliver(
        &self,
        session: SessionHandle,
        text: &str,
        auto_submit: bool,
        label: &str,
    ) -> bool {
        let request = DeliveryRequest::new(text, auto_submit, label);
        let (first, _) = self.attempt_pair(session, &request).await;
        first.outcome.is_success()
    }

    /// Resolves the destination session, then delivers on it. Falls back to
    /// a brand-new tab when the session cannot be made ready.
    pub async fn deliver_to(
        &self,
        destination: &DestinationIdentity,
        text: &str,
        auto_submit: bool,
        want_fresh: bool,
        label: &str,
    ) -> DeliveryReport {
        match self.sessions.resolve_session(destination, want_fresh).await {
            Ok(session) => self.deliver_on(session, destination, text, auto_submit, label).await,
            Err(err) if err.wants_fallback() => {
                self.fallback(destination, text, auto_submit, label, err).await
            }
            Err(err) => {
                warn!(%label, %err, "destination unreachable");
                metrics::record_delivery("unreached");
                DeliveryReport {
                    label: label.to_string(),
                    request_id: RequestId::new(),
                    success: false,
                    path: DeliveryPath::Unreached,
                    page: None,
                    state: None,
                    backstop_scheduled: false,
                }
            }
        }
    }

    /// [`deliver`](Self::deliver) on a ready session, with the pre-filled
    /// prompt hand-off when the page cannot be driven.
    pub async fn deliver_on(
        &self,
        session: SessionHandle,
        destination: &DestinationIdentity,
        text: &str,
        auto_submit: bool,
        label: &str,
    ) -> DeliveryReport {
        let request = DeliveryRequest::new(text, auto_submit, label);
        let (first, backstop_scheduled) = self.attempt_pair(session, &request).await;
        if first.state == InjectionState::PageUnavailable {
            self.hand_off(session, destination).await;
        }
        DeliveryReport {
            label: request.label,
            request_id: request.request_id,
            success: first.outcome.is_success(),
            path: DeliveryPath::Session,
            page: Some(session.page()),
            state: Some(first.state),
            backstop_scheduled,
        }
    }

    /// Waits for every scheduled attempt #2 to finish.
    pub async fn settle(&self) {
        let pending = std::mem::take(&mut *self.backstops.lock());
        for handle in pending {
            if let Err(err) = handle.await {
                warn!(?err, "backstop attempt failed to run");
            }
        }
    }

    pub fn pending_backstops(&self) -> usize {
        self.backstops
            .lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    async fn attempt_pair(
        &self,
        session: SessionHandle,
        request: &DeliveryRequest,
    ) -> (InjectionReport, bool) {
        let port = self.sessions.host().page_port(session.page());
        let first = self
            .injector
            .inject(&*port, session, &request.relabeled(format!("{}#1", request.label)))
            .await;

        if first.outcome.is_success() {
            metrics::record_delivery("delivered");
            return (first, false);
        }
        if first.state == InjectionState::PageUnavailable {
            // The tab is handed to the user instead; a second attempt would
            // type over the hand-off prompt.
            metrics::record_delivery("page_lost");
            return (first, false);
        }
        metrics::record_delivery("failed");
        self.schedule_backstop(session, request.relabeled(format!("{}#2", request.label)));
        (first, true)
    }

    fn schedule_backstop(&self, session: SessionHandle, request: DeliveryRequest) {
        metrics::record_backstop();
        let injector = Arc::clone(&self.injector);
        let host = Arc::clone(self.sessions.host());
        let delay = self.timings.retry_delay();
        debug!(label = %request.label, request = %request.request_id, ?delay, "scheduling backstop attempt");
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            let port = host.page_port(session.page());
            let report = injector.inject(&*port, session, &request).await;
            debug!(label = %request.label, state = report.state.as_str(), "backstop attempt finished");
        });
        let mut backstops = self.backstops.lock();
        backstops.retain(|handle| !handle.is_finished());
        backstops.push(handle);
    }

    async fn fallback(
        &self,
        destination: &DestinationIdentity,
        text: &str,
        auto_submit: bool,
        label: &str,
        cause: SessionError,
    ) -> DeliveryReport {
        warn!(%label, %cause, "session not ready, opening fallback tab");
        let request = DeliveryRequest::new(text, auto_submit, format!("{label}#fallback"));
        let mut report = DeliveryReport {
            label: label.to_string(),
            request_id: request.request_id.clone(),
            success: false,
            path: DeliveryPath::Fallback,
            page: None,
            state: None,
            backstop_scheduled: false,
        };

        let page = match self.sessions.open_tab(destination).await {
            Ok(page) => page,
            Err(err) => {
                warn!(%label, %err, "fallback tab could not be opened");
                metrics::record_delivery("unreached");
                report.path = DeliveryPath::Unreached;
                return report;
            }
        };
        sleep(self.timings.fallback_delay()).await;

        let session = SessionHandle::new(page);
        let port = self.sessions.host().page_port(page);
        let attempt = self.injector.inject(&*port, session, &request).await;
        report.page = Some(page);
        report.state = Some(attempt.state);
        report.success = attempt.outcome.is_success();
        metrics::record_delivery(if report.success {
            "fallback_delivered"
        } else {
            "fallback_failed"
        });
        info!(%label, success = report.success, "fallback attempt finished");
        report
    }

    async fn hand_off(&self, session: SessionHandle, destination: &DestinationIdentity) {
        let address = destination.prefill_address(PAGE_LOST_PROMPT);
        match self.sessions.navigate(session.page(), &address).await {
            Ok(()) => info!(page = %session.page(), "page lost, left a paste prompt"),
            Err(err) => warn!(page = %session.page(), %err, "paste prompt navigation failed"),
        }
    }
}
