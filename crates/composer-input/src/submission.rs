//! Submission Trigger

use std::time::Duration;

use composer_locator::{EditableTarget, TargetResolver};
use page_structure::{deep_query, is_visible, send_patterns, DomSnapshot, ElementPattern, NodeKey};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::errors::PageError;
use crate::ports::PagePort;

#[derive(Clone, Debug)]
pub struct SubmitPolicy {
    pub patterns: Vec<ElementPattern>,
    /// Finds the composer again in the snapshot taken before submitting.
    pub resolver: TargetResolver,
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl Default for SubmitPolicy {
    fn default() -> Self {
        Self {
            patterns: send_patterns(),
            resolver: TargetResolver::default(),
            poll_interval: Duration::from_millis(200),
            max_wait: Duration::from_millis(2_000),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "via")]
pub enum SubmitOutcome {
    Affordance { key: NodeKey, strategy: String },
    EnterKey,
    FormSubmit,
    NotSubmitted,
}

impl SubmitOutcome {
    pub fn submitted(&self) -> bool {
        !matches!(self, SubmitOutcome::NotSubmitted)
    }
}

/// Presses the page's send control for the text just written to `target`.
///
/// Falls back to Enter on the target when no control becomes actionable in
/// time, and to the enclosing form's submit when Enter cannot be dispatched.
pub async fn submit(
    page: &dyn PagePort,
    target: EditableTarget,
    policy: &SubmitPolicy,
) -> Result<SubmitOutcome, PageError> {
    let snapshot = page.snapshot().await?;
    if let Some((key, strategy)) = find_affordance(&snapshot, &policy.patterns) {
        if wait_actionable(page, key, policy).await? {
            match page.activate(key).await {
                Ok(()) => {
                    debug!(key = %key, strategy = %strategy, "send affordance activated");
                    return Ok(SubmitOutcome::Affordance { key, strategy });
                }
                Err(err) if err.is_page_lost() => return Err(err),
                Err(err) => warn!(?err, "send affordance activation failed"),
            }
        } else {
            debug!(key = %key, "send affordance never became actionable");
        }
    }

    let target_key = rekey_target(&snapshot, target, &policy.resolver);
    match page.press_enter(target_key).await {
        Ok(()) => Ok(SubmitOutcome::EnterKey),
        Err(err) if err.is_page_lost() => Err(err),
        Err(err) => {
            debug!(?err, "synthetic Enter failed, submitting form");
            if page.submit_enclosing_form(target_key).await? {
                Ok(SubmitOutcome::FormSubmit)
            } else {
                Ok(SubmitOutcome::NotSubmitted)
            }
        }
    }
}

fn find_affordance(snapshot: &DomSnapshot, patterns: &[ElementPattern]) -> Option<(NodeKey, String)> {
    patterns.iter().find_map(|pattern| {
        deep_query(snapshot, pattern)
            .into_iter()
            .find(|key| is_visible(snapshot, *key))
            .map(|key| (key, pattern.name.clone()))
    })
}

async fn wait_actionable(
    page: &dyn PagePort,
    key: NodeKey,
    policy: &SubmitPolicy,
) -> Result<bool, PageError> {
    let deadline = Instant::now() + policy.max_wait;
    loop {
        if page.is_actionable(key).await? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        sleep(policy.poll_interval).await;
    }
}

/// Keys are only valid for the snapshot they came from, so the composer is
/// resolved again; the old key is the last resort.
fn rekey_target(snapshot: &DomSnapshot, target: EditableTarget, resolver: &TargetResolver) -> NodeKey {
    match resolver.find_target(snapshot) {
        Some(resolution) => resolution.target.key(),
        None => {
            debug!(key = %target.key(), "composer not resolved again, reusing written key");
            target.key()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakePage, PageCall};
    use page_structure::SnapshotBuilder;

    fn page_with_send(disabled_checks: usize) -> (FakePage, NodeKey, NodeKey) {
        let mut b = SnapshotBuilder::new();
        let form = b.element(b.body(), "form");
        let editor = b.rich_editor(form);
        let send = b.element(form, "button");
        b.attr(send, "data-testid", "send-button");
        let page = FakePage::new(b.build());
        page.set_disabled_checks(send, disabled_checks);
        (page, editor, send)
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_send_to_enable() {
        let (page, editor, send) = page_with_send(3);
        let started = Instant::now();
        let outcome = submit(&page, EditableTarget::RichEditable(editor), &SubmitPolicy::default())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Affordance {
                key: send,
                strategy: "send-button-testid".into()
            }
        );
        assert_eq!(started.elapsed(), Duration::from_millis(600));
        assert!(page.calls().contains(&PageCall::Activate(send)));
    }

    #[tokio::test(start_paused = true)]
    async fn never_enabled_send_falls_back_to_enter() {
        let (page, editor, send) = page_with_send(usize::MAX);
        let outcome = submit(&page, EditableTarget::RichEditable(editor), &SubmitPolicy::default())
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::EnterKey);
        let checks = page
            .calls()
            .iter()
            .filter(|call| **call == PageCall::IsActionable(send))
            .count();
        assert_eq!(checks, 11);
        assert!(!page.calls().contains(&PageCall::Activate(send)));
    }

    #[tokio::test(start_paused = true)]
    async fn enter_failure_submits_form() {
        let mut b = SnapshotBuilder::new();
        let form = b.element(b.body(), "form");
        let area = b.element(form, "textarea");
        let page = FakePage::new(b.build());
        page.set_enter_fails(true);

        let outcome = submit(&page, EditableTarget::PlainField(area), &SubmitPolicy::default())
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::FormSubmit);
        assert!(outcome.submitted());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_left_to_try_is_not_submitted() {
        let mut b = SnapshotBuilder::new();
        let editor = b.rich_editor(b.body());
        let page = FakePage::new(b.build());
        page.set_enter_fails(true);

        let outcome = submit(&page, EditableTarget::RichEditable(editor), &SubmitPolicy::default())
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::NotSubmitted);
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_send_button_is_ignored() {
        let mut b = SnapshotBuilder::new();
        let editor = b.rich_editor(b.body());
        let send = b.element(b.body(), "button");
        b.attr(send, "aria-label", "Send").size(send, 0.0, 0.0);
        let page = FakePage::new(b.build());

        let outcome = submit(&page, EditableTarget::RichEditable(editor), &SubmitPolicy::default())
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::EnterKey);
        assert!(page.calls().contains(&PageCall::PressEnter(editor)));
    }

    #[tokio::test(start_paused = true)]
    async fn enter_follows_composer_after_page_reorders() {
        let (written, stale_key) = {
            let mut b = SnapshotBuilder::new();
            let form = b.element(b.body(), "form");
            let composer = b.rich_editor(form);
            b.attr(composer, "role", "textbox").attr(composer, "data-testid", "composer");
            (b.build(), composer)
        };
        let (reordered, decoy, composer) = {
            let mut b = SnapshotBuilder::new();
            let form = b.element(b.body(), "form");
            let decoy = b.rich_editor(form);
            let composer = b.rich_editor(form);
            b.attr(composer, "role", "textbox").attr(composer, "data-testid", "composer");
            (b.build(), decoy, composer)
        };
        assert_eq!(stale_key, decoy);
        let page = FakePage::with_sequence(vec![reordered]);
        assert!(EditableTarget::classify(&written, stale_key).is_some());

        let outcome = submit(&page, EditableTarget::RichEditable(stale_key), &SubmitPolicy::default())
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::EnterKey);
        assert!(page.calls().contains(&PageCall::PressEnter(composer)));
        assert!(!page.calls().contains(&PageCall::PressEnter(decoy)));
    }
}
