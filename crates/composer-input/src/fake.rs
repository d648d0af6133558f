//! In-memory [`PagePort`] for exercising the delivery pipeline without a
//! browser. Snapshots can be scripted per call to model a page that
//! hydrates over time.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use page_structure::{closest_form, DomSnapshot, NodeKey};
use parking_lot::Mutex;

use crate::errors::PageError;
use crate::ports::PagePort;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageCall {
    FocusAtEnd(NodeKey),
    ExecInsertText(NodeKey, String),
    ReplaceContent(NodeKey, String),
    SetValue(NodeKey, String),
    DispatchChange(NodeKey),
    IsActionable(NodeKey),
    Activate(NodeKey),
    PressEnter(NodeKey),
    SubmitForm(NodeKey),
    Notice(String),
}

#[derive(Default)]
struct FakeState {
    upcoming: VecDeque<DomSnapshot>,
    current: DomSnapshot,
    snapshots_taken: usize,
    calls: Vec<PageCall>,
    texts: HashMap<NodeKey, String>,
    exec_unsupported: bool,
    enter_fails: bool,
    lost: bool,
    failing_snapshots: usize,
    disabled_checks: HashMap<NodeKey, usize>,
}

pub struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(snapshot: DomSnapshot) -> Self {
        Self {
            state: Mutex::new(FakeState {
                current: snapshot,
                ..FakeState::default()
            }),
        }
    }

    /// Each `snapshot()` call takes the next entry; the last one sticks.
    pub fn with_sequence(sequence: Vec<DomSnapshot>) -> Self {
        let page = Self::new(DomSnapshot::default());
        {
            let mut state = page.state.lock();
            state.upcoming = sequence.into();
            if let Some(first) = state.upcoming.front().cloned() {
                state.current = first;
            }
        }
        page
    }

    /// Current document without counting as a page snapshot.
    pub fn snapshot_now(&self) -> DomSnapshot {
        self.state.lock().current.clone()
    }

    pub fn set_exec_command_supported(&self, supported: bool) {
        self.state.lock().exec_unsupported = !supported;
    }

    pub fn set_enter_fails(&self, fails: bool) {
        self.state.lock().enter_fails = fails;
    }

    /// `key` reports not actionable for the next `checks` polls.
    pub fn set_disabled_checks(&self, key: NodeKey, checks: usize) {
        self.state.lock().disabled_checks.insert(key, checks);
    }

    /// The next `count` snapshots fail the way a page mid-navigation does.
    pub fn fail_next_snapshots(&self, count: usize) {
        self.state.lock().failing_snapshots = count;
    }

    /// Every later call fails as if the tab had gone away.
    pub fn lose_page(&self) {
        self.state.lock().lost = true;
    }

    pub fn calls(&self) -> Vec<PageCall> {
        self.state.lock().calls.clone()
    }

    pub fn snapshots_taken(&self) -> usize {
        self.state.lock().snapshots_taken
    }

    pub fn notices(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                PageCall::Notice(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Text written to `key` by any insertion technique.
    pub fn text_of(&self, key: NodeKey) -> Option<String> {
        self.state.lock().texts.get(&key).cloned()
    }

    pub fn submissions(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    PageCall::Activate(_) | PageCall::PressEnter(_) | PageCall::SubmitForm(_)
                )
            })
            .count()
    }

    fn guard(&self, key: Option<NodeKey>) -> Result<parking_lot::MutexGuard<'_, FakeState>, PageError> {
        let state = self.state.lock();
        if state.lost {
            return Err(PageError::Transport("target closed".into()));
        }
        if let Some(key) = key {
            match state.current.node(key) {
                None => return Err(PageError::Stale),
                Some(node) if !node.connected => return Err(PageError::Detached),
                Some(_) => {}
            }
        }
        Ok(state)
    }
}

#[async_trait]
impl PagePort for FakePage {
    async fn snapshot(&self) -> Result<DomSnapshot, PageError> {
        let mut state = self.guard(None)?;
        state.snapshots_taken += 1;
        if state.failing_snapshots > 0 {
            state.failing_snapshots -= 1;
            return Err(PageError::Transient(
                "cdp protocol error: Execution context was destroyed.".into(),
            ));
        }
        if let Some(next) = state.upcoming.pop_front() {
            state.current = next;
        }
        Ok(state.current.clone())
    }

    async fn focus_at_end(&self, key: NodeKey) -> Result<(), PageError> {
        self.guard(Some(key))?.calls.push(PageCall::FocusAtEnd(key));
        Ok(())
    }

    async fn exec_insert_text(&self, key: NodeKey, text: &str) -> Result<bool, PageError> {
        let mut state = self.guard(Some(key))?;
        state.calls.push(PageCall::ExecInsertText(key, text.to_string()));
        if state.exec_unsupported {
            return Ok(false);
        }
        state.texts.entry(key).or_default().push_str(text);
        Ok(true)
    }

    async fn replace_text_content(&self, key: NodeKey, text: &str) -> Result<(), PageError> {
        let mut state = self.guard(Some(key))?;
        state.calls.push(PageCall::ReplaceContent(key, text.to_string()));
        state.texts.insert(key, text.to_string());
        Ok(())
    }

    async fn set_native_value(&self, key: NodeKey, text: &str) -> Result<(), PageError> {
        let mut state = self.guard(Some(key))?;
        state.calls.push(PageCall::SetValue(key, text.to_string()));
        state.texts.insert(key, text.to_string());
        Ok(())
    }

    async fn dispatch_change_events(&self, key: NodeKey) -> Result<(), PageError> {
        self.guard(Some(key))?.calls.push(PageCall::DispatchChange(key));
        Ok(())
    }

    async fn is_actionable(&self, key: NodeKey) -> Result<bool, PageError> {
        let mut state = self.guard(Some(key))?;
        state.calls.push(PageCall::IsActionable(key));
        match state.disabled_checks.get_mut(&key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    async fn activate(&self, key: NodeKey) -> Result<(), PageError> {
        self.guard(Some(key))?.calls.push(PageCall::Activate(key));
        Ok(())
    }

    async fn press_enter(&self, key: NodeKey) -> Result<(), PageError> {
        let mut state = self.guard(Some(key))?;
        state.calls.push(PageCall::PressEnter(key));
        if state.enter_fails {
            return Err(PageError::Script("KeyboardEvent is not a constructor".into()));
        }
        Ok(())
    }

    async fn submit_enclosing_form(&self, key: NodeKey) -> Result<bool, PageError> {
        let mut state = self.guard(Some(key))?;
        state.calls.push(PageCall::SubmitForm(key));
        Ok(closest_form(&state.current, key).is_some())
    }

    async fn show_notice(&self, message: &str) -> Result<(), PageError> {
        self.guard(None)?.calls.push(PageCall::Notice(message.to_string()));
        Ok(())
    }
}
