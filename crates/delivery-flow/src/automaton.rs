//! Injection Automaton
//!
//! One invocation takes one request through
//! `Searching -> Found -> Inserted -> (SubmitRequested) -> Done`, or ends in
//! `GivenUp`, `DuplicateSkipped` or `PageUnavailable`.

use std::sync::Arc;

use async_trait::async_trait;
use composer_input::{insert, submit, PageError, PagePort, SubmitOutcome, SubmitPolicy};
use composer_locator::TargetResolver;
use promptcast_core_types::{DeliveryOutcome, DeliveryRequest};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::guard::{DedupGuard, GuardVerdict};
use crate::host::SessionHandle;
use crate::metrics;
use crate::policy::DeliveryTimings;

/// The only user-facing failure signal the automaton raises itself.
pub const MANUAL_PASTE_NOTICE: &str = "Could not auto-insert text. Please paste manually.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InjectionState {
    Searching,
    Found,
    Inserted,
    SubmitRequested,
    Done,
    GivenUp,
    DuplicateSkipped,
    /// The document could not be driven at all.
    PageUnavailable,
}

impl InjectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InjectionState::Searching => "searching",
            InjectionState::Found => "found",
            InjectionState::Inserted => "inserted",
            InjectionState::SubmitRequested => "submit_requested",
            InjectionState::Done => "done",
            InjectionState::GivenUp => "given_up",
            InjectionState::DuplicateSkipped => "duplicate_skipped",
            InjectionState::PageUnavailable => "page_unavailable",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InjectionState::Done
                | InjectionState::GivenUp
                | InjectionState::DuplicateSkipped
                | InjectionState::PageUnavailable
        )
    }
}

/// Exactly one per automaton invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InjectionReport {
    pub outcome: DeliveryOutcome,
    pub state: InjectionState,
    pub tries: u32,
    pub strategy: Option<String>,
    pub submit: Option<SubmitOutcome>,
}

impl InjectionReport {
    fn terminal(state: InjectionState, outcome: DeliveryOutcome, tries: u32) -> Self {
        Self {
            outcome,
            state,
            tries,
            strategy: None,
            submit: None,
        }
    }
}

#[async_trait]
pub trait Injector: Send + Sync {
    async fn inject(
        &self,
        page: &dyn PagePort,
        session: SessionHandle,
        request: &DeliveryRequest,
    ) -> InjectionReport;
}

pub struct InjectionAutomaton {
    resolver: TargetResolver,
    guard: Arc<DedupGuard>,
    timings: DeliveryTimings,
    submit_policy: SubmitPolicy,
}

impl InjectionAutomaton {
    pub fn new(guard: Arc<DedupGuard>, timings: DeliveryTimings) -> Self {
        Self {
            resolver: TargetResolver::default(),
            submit_policy: timings.submit_policy(),
            guard,
            timings,
        }
    }

    pub fn with_resolver(mut self, resolver: TargetResolver) -> Self {
        self.submit_policy.resolver = resolver.clone();
        self.resolver = resolver;
        self
    }

    async fn give_up(&self, page: &dyn PagePort, request: &DeliveryRequest, tries: u32) -> InjectionReport {
        warn!(label = %request.label, request = %request.request_id, tries, "composer never appeared");
        if let Err(err) = page.show_notice(MANUAL_PASTE_NOTICE).await {
            warn!(%err, "manual paste notice could not be shown");
        }
        InjectionReport::terminal(InjectionState::GivenUp, DeliveryOutcome::failed(), tries)
    }
}

fn page_unavailable(request: &DeliveryRequest, err: &PageError, tries: u32) -> InjectionReport {
    warn!(label = %request.label, request = %request.request_id, %err, "page unavailable");
    InjectionReport::terminal(InjectionState::PageUnavailable, DeliveryOutcome::failed(), tries)
}

#[async_trait]
impl Injector for InjectionAutomaton {
    async fn inject(
        &self,
        page: &dyn PagePort,
        session: SessionHandle,
        request: &DeliveryRequest,
    ) -> InjectionReport {
        let report = self.run(page, session, request).await;
        metrics::record_injection(report.state.as_str());
        info!(
            label = %request.label,
            request = %request.request_id,
            state = report.state.as_str(),
            tries = report.tries,
            outcome = %report.outcome,
            "injection finished"
        );
        report
    }
}

impl InjectionAutomaton {
    async fn run(
        &self,
        page: &dyn PagePort,
        session: SessionHandle,
        request: &DeliveryRequest,
    ) -> InjectionReport {
        if self.guard.check_and_record(session.page(), &request.request_id) == GuardVerdict::Duplicate {
            return InjectionReport::terminal(
                InjectionState::DuplicateSkipped,
                DeliveryOutcome::skipped(),
                0,
            );
        }

        let max_tries = self.timings.search_max_tries.max(1);
        let mut tries = 0;
        let (insertion, strategy) = loop {
            tries += 1;
            match page.snapshot().await {
                Ok(snapshot) => {
                    if let Some(resolution) = self.resolver.find_target(&snapshot) {
                        debug!(
                            label = %request.label,
                            state = InjectionState::Found.as_str(),
                            strategy = %resolution.strategy,
                            tries,
                            "composer found"
                        );
                        match insert(page, &snapshot, resolution.target, &request.text).await {
                            Ok(insertion) => break (insertion, resolution.strategy),
                            Err(err) if err.is_page_lost() => {
                                return page_unavailable(request, &err, tries)
                            }
                            Err(err) => debug!(%err, "insertion raced a page update, searching again"),
                        }
                    }
                }
                Err(err) if err.is_page_lost() => return page_unavailable(request, &err, tries),
                Err(err) => debug!(%err, "snapshot failed, searching again"),
            }
            if tries >= max_tries {
                return self.give_up(page, request, tries).await;
            }
            sleep(self.timings.search_interval()).await;
        };
        debug!(
            label = %request.label,
            state = InjectionState::Inserted.as_str(),
            technique = ?insertion.technique,
            "text inserted"
        );

        let mut report = InjectionReport {
            outcome: DeliveryOutcome::delivered(request.auto_submit),
            state: InjectionState::Done,
            tries,
            strategy: Some(strategy),
            submit: None,
        };
        if request.auto_submit {
            debug!(label = %request.label, state = InjectionState::SubmitRequested.as_str(), "submitting");
            sleep(self.timings.pre_submit_delay()).await;
            match submit(page, insertion.written_to, &self.submit_policy).await {
                Ok(outcome) => report.submit = Some(outcome),
                // Inserted text stands even when the send step fails.
                Err(err) => warn!(label = %request.label, %err, "submit failed"),
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::PageId;
    use composer_input::fake::{FakePage, PageCall};
    use page_structure::SnapshotBuilder;
    use pretty_assertions::assert_eq;
    use tokio::time::{Duration, Instant};

    fn automaton() -> InjectionAutomaton {
        let timings = DeliveryTimings::default();
        InjectionAutomaton::new(Arc::new(DedupGuard::new(timings.debounce_window())), timings)
    }

    fn chat_page() -> (FakePage, page_structure::NodeKey) {
        let mut b = SnapshotBuilder::new();
        let form = b.element(b.body(), "form");
        let editor = b.rich_editor(form);
        b.attr(editor, "role", "textbox").attr(editor, "data-testid", "composer");
        let send = b.element(form, "button");
        b.attr(send, "data-testid", "send-button");
        (FakePage::new(b.build()), editor)
    }

    #[tokio::test(start_paused = true)]
    async fn fit_match_scenario_reaches_done() {
        let (page, editor) = chat_page();
        let session = SessionHandle::new(PageId::new());
        let request = DeliveryRequest::new("Fit Match: Senior Engineer role at Acme", true, "attempt#1");

        let report = automaton().inject(&page, session, &request).await;
        assert_eq!(report.state, InjectionState::Done);
        assert_eq!(report.outcome, DeliveryOutcome::delivered(true));
        assert_eq!(report.strategy.as_deref(), Some("form-editable-textbox-composer"));
        assert!(report.submit.as_ref().unwrap().submitted());
        assert_eq!(
            page.text_of(editor).as_deref(),
            Some("Fit Match: Senior Engineer role at Acme")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_composer_gives_up_after_ceiling_with_one_notice() {
        let page = FakePage::new(SnapshotBuilder::new().build());
        let started = Instant::now();
        let request = DeliveryRequest::new("x", true, "attempt#1");

        let report = automaton()
            .inject(&page, SessionHandle::new(PageId::new()), &request)
            .await;
        assert_eq!(report.state, InjectionState::GivenUp);
        assert_eq!(report.tries, 40);
        assert_eq!(report.outcome, DeliveryOutcome::failed());
        assert_eq!(page.snapshots_taken(), 40);
        assert_eq!(started.elapsed(), Duration::from_millis(39 * 200));
        assert_eq!(page.notices(), vec![MANUAL_PASTE_NOTICE.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn composer_that_hydrates_late_is_found() {
        let empty = SnapshotBuilder::new().build();
        let (hydrated, editor) = {
            let mut b = SnapshotBuilder::new();
            let editor = b.rich_editor(b.body());
            (b.build(), editor)
        };
        let page = FakePage::with_sequence(vec![empty.clone(), empty.clone(), empty, hydrated]);
        let request = DeliveryRequest::new("hello", false, "attempt#1");

        let report = automaton()
            .inject(&page, SessionHandle::new(PageId::new()), &request)
            .await;
        assert_eq!(report.state, InjectionState::Done);
        assert_eq!(report.tries, 4);
        assert_eq!(report.outcome, DeliveryOutcome::delivered(false));
        assert_eq!(page.submissions(), 0);
        assert_eq!(page.text_of(editor).as_deref(), Some("hello"));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_request_is_skipped_once_admitted() {
        let (page, _) = chat_page();
        let automaton = automaton();
        let session = SessionHandle::new(PageId::new());
        let request = DeliveryRequest::new("x", false, "attempt#1");

        let first = automaton.inject(&page, session, &request).await;
        let second = automaton
            .inject(&page, session, &request.relabeled("attempt#2"))
            .await;
        let third = automaton.inject(&page, session, &request).await;
        assert!(first.outcome.is_success());
        assert_eq!(second.state, InjectionState::DuplicateSkipped);
        assert_eq!(second.outcome, DeliveryOutcome::skipped());
        assert_eq!(third.state, InjectionState::DuplicateSkipped);
        let inserts = page
            .calls()
            .iter()
            .filter(|call| matches!(call, PageCall::ExecInsertText(..)))
            .count();
        assert_eq!(inserts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshots_failing_during_navigation_keep_searching() {
        let (page, editor) = chat_page();
        page.fail_next_snapshots(3);
        let request = DeliveryRequest::new("after reload", false, "attempt#1");

        let report = automaton()
            .inject(&page, SessionHandle::new(PageId::new()), &request)
            .await;
        assert_eq!(report.state, InjectionState::Done);
        assert_eq!(report.tries, 4);
        assert_eq!(page.snapshots_taken(), 4);
        assert!(page.notices().is_empty());
        assert_eq!(page.text_of(editor).as_deref(), Some("after reload"));
    }

    #[tokio::test(start_paused = true)]
    async fn lost_page_ends_without_notice() {
        let (page, _) = chat_page();
        page.lose_page();
        let request = DeliveryRequest::new("x", true, "attempt#1");

        let report = automaton()
            .inject(&page, SessionHandle::new(PageId::new()), &request)
            .await;
        assert_eq!(report.state, InjectionState::PageUnavailable);
        assert_eq!(report.tries, 1);
        assert!(!report.outcome.is_success());
        assert!(page.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_editor_is_never_selected() {
        let mut b = SnapshotBuilder::new();
        let form = b.element(b.body(), "form");
        let wrapper = b.element(form, "div");
        b.attr(wrapper, "aria-hidden", "true");
        let editor = b.rich_editor(wrapper);
        b.attr(editor, "role", "textbox").attr(editor, "data-testid", "composer");
        let page = FakePage::new(b.build());
        let request = DeliveryRequest::new("x", false, "attempt#1");

        let report = automaton()
            .inject(&page, SessionHandle::new(PageId::new()), &request)
            .await;
        assert_eq!(report.state, InjectionState::GivenUp);
        assert_eq!(page.text_of(editor), None);
    }
}
