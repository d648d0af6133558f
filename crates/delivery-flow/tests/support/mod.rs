#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::PageId;
use composer_input::fake::FakePage;
use composer_input::PagePort;
use delivery_flow::{
    InjectionReport, InjectionState, Injector, SessionError, SessionHandle, TabEvent, TabHost,
    TabInfo,
};
use page_structure::{DomSnapshot, NodeKey, SnapshotBuilder};
use parking_lot::Mutex;
use promptcast_core_types::{DeliveryOutcome, DeliveryRequest, RequestId};
use tokio::sync::broadcast;
use tokio::time::{sleep, Instant};

pub const READY_TITLE: &str = "ChatGPT - Job Match Coach";

/// How a newly opened tab reports that it has hydrated.
#[derive(Clone, Copy, Debug)]
pub enum Readiness {
    /// Title changes and an update event is published.
    Both(Duration),
    /// Only the update event carries the title; reads still see the old one.
    EventOnly(Duration),
    /// The title changes silently.
    PollOnly(Duration),
    Never,
    ClosesAfter(Duration),
}

struct Tab {
    info: TabInfo,
    open: bool,
}

#[derive(Default)]
struct HostState {
    tabs: Vec<Tab>,
    plans: VecDeque<(Readiness, Arc<FakePage>)>,
    pages: HashMap<PageId, Arc<FakePage>>,
    opened: Vec<String>,
    opened_ids: Vec<PageId>,
    focused: Vec<PageId>,
    navigations: Vec<(PageId, String)>,
    info_reads: usize,
}

pub struct FakeTabHost {
    state: Arc<Mutex<HostState>>,
    events: broadcast::Sender<TabEvent>,
}

impl FakeTabHost {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            state: Arc::new(Mutex::new(HostState::default())),
            events,
        })
    }

    /// Next `open_tab` hydrates like `readiness` and serves `page`.
    pub fn plan_tab(&self, readiness: Readiness, page: Arc<FakePage>) {
        self.state.lock().plans.push_back((readiness, page));
    }

    pub fn add_existing(&self, address: &str, title: &str, page: Arc<FakePage>) -> PageId {
        let id = PageId::new();
        let mut state = self.state.lock();
        state.tabs.push(Tab {
            info: TabInfo {
                page: id,
                address: address.into(),
                title: title.into(),
            },
            open: true,
        });
        state.pages.insert(id, page);
        id
    }

    /// The tab loads `address` on its own, without `navigate_tab`.
    pub fn navigate_from_page(&self, page: PageId, address: &str) {
        if let Some(tab) = self.state.lock().tabs.iter_mut().find(|tab| tab.info.page == page) {
            tab.info.address = address.into();
        }
        let _ = self.events.send(TabEvent::Navigated {
            page,
            address: address.into(),
        });
    }

    pub fn opened(&self) -> Vec<String> {
        self.state.lock().opened.clone()
    }

    pub fn focused(&self) -> Vec<PageId> {
        self.state.lock().focused.clone()
    }

    pub fn navigations(&self) -> Vec<(PageId, String)> {
        self.state.lock().navigations.clone()
    }

    pub fn info_reads(&self) -> usize {
        self.state.lock().info_reads
    }

    pub fn page(&self, id: PageId) -> Arc<FakePage> {
        self.state.lock().pages[&id].clone()
    }

    pub fn opened_pages(&self) -> Vec<PageId> {
        self.state.lock().opened_ids.clone()
    }
}

fn set_title(state: &Mutex<HostState>, page: PageId, title: &str) {
    if let Some(tab) = state.lock().tabs.iter_mut().find(|t| t.info.page == page) {
        tab.info.title = title.to_string();
    }
}

#[async_trait]
impl TabHost for FakeTabHost {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>, SessionError> {
        Ok(self
            .state
            .lock()
            .tabs
            .iter()
            .filter(|t| t.open)
            .map(|t| t.info.clone())
            .collect())
    }

    async fn open_tab(&self, address: &str) -> Result<PageId, SessionError> {
        let page = PageId::new();
        let readiness = {
            let mut state = self.state.lock();
            let plan = state
                .plans
                .pop_front()
                .unwrap_or_else(|| (Readiness::Both(Duration::from_millis(500)), Arc::new(chat_page().0)));
            state.opened.push(address.to_string());
            state.opened_ids.push(page);
            state.tabs.push(Tab {
                info: TabInfo {
                    page,
                    address: address.to_string(),
                    title: "Loading".into(),
                },
                open: true,
            });
            state.pages.insert(page, plan.1);
            plan.0
        };

        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        tokio::spawn(async move {
            match readiness {
                Readiness::Both(after) => {
                    sleep(after).await;
                    set_title(&state, page, READY_TITLE);
                    let _ = events.send(TabEvent::TitleChanged {
                        page,
                        title: READY_TITLE.into(),
                    });
                }
                Readiness::EventOnly(after) => {
                    sleep(after).await;
                    let _ = events.send(TabEvent::TitleChanged {
                        page,
                        title: READY_TITLE.into(),
                    });
                }
                Readiness::PollOnly(after) => {
                    sleep(after).await;
                    set_title(&state, page, READY_TITLE);
                }
                Readiness::Never => {}
                Readiness::ClosesAfter(after) => {
                    sleep(after).await;
                    if let Some(tab) = state.lock().tabs.iter_mut().find(|t| t.info.page == page) {
                        tab.open = false;
                    }
                    let _ = events.send(TabEvent::Closed { page });
                }
            }
        });
        Ok(page)
    }

    async fn focus_tab(&self, page: PageId) -> Result<(), SessionError> {
        self.state.lock().focused.push(page);
        Ok(())
    }

    async fn navigate_tab(&self, page: PageId, address: &str) -> Result<(), SessionError> {
        self.state.lock().navigations.push((page, address.to_string()));
        Ok(())
    }

    async fn tab_info(&self, page: PageId) -> Result<Option<TabInfo>, SessionError> {
        let mut state = self.state.lock();
        state.info_reads += 1;
        Ok(state
            .tabs
            .iter()
            .find(|t| t.info.page == page && t.open)
            .map(|t| t.info.clone()))
    }

    fn subscribe(&self) -> broadcast::Receiver<TabEvent> {
        self.events.subscribe()
    }

    fn page_port(&self, page: PageId) -> Arc<dyn PagePort> {
        let fake = self
            .state
            .lock()
            .pages
            .get(&page)
            .cloned()
            .unwrap_or_else(|| Arc::new(FakePage::new(DomSnapshot::default())));
        fake
    }
}

/// A hydrated chat page: composer in a form plus an enabled send button.
pub fn chat_page() -> (FakePage, NodeKey) {
    let mut b = SnapshotBuilder::new();
    let form = b.element(b.body(), "form");
    let editor = b.rich_editor(form);
    b.attr(editor, "role", "textbox").attr(editor, "data-testid", "composer");
    let send = b.element(form, "button");
    b.attr(send, "data-testid", "send-button");
    (FakePage::new(b.build()), editor)
}

#[derive(Clone, Debug)]
pub struct Invocation {
    pub label: String,
    pub request_id: RequestId,
    pub page: PageId,
    pub at: Instant,
}

/// Injector that replays scripted outcomes and records every call.
pub struct ScriptedInjector {
    outcomes: Mutex<VecDeque<DeliveryOutcome>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedInjector {
    pub fn new(outcomes: Vec<DeliveryOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Injector for ScriptedInjector {
    async fn inject(
        &self,
        _page: &dyn PagePort,
        session: SessionHandle,
        request: &DeliveryRequest,
    ) -> InjectionReport {
        self.calls.lock().push(Invocation {
            label: request.label.clone(),
            request_id: request.request_id.clone(),
            page: session.page(),
            at: Instant::now(),
        });
        let outcome = self
            .outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(DeliveryOutcome::failed);
        let state = if outcome.is_success() {
            InjectionState::Done
        } else {
            InjectionState::GivenUp
        };
        InjectionReport {
            outcome,
            state,
            tries: 1,
            strategy: None,
            submit: None,
        }
    }
}
