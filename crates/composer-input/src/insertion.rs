//! Insertion Engine

use composer_locator::{nearest_visible_rich_editable, EditableTarget};
use page_structure::{is_visible, DomSnapshot, NodeKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PageError;
use crate::ports::PagePort;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertTechnique {
    InsertTextCommand,
    ContentReplace,
    NativeSetter,
}

/// What was written where. The target may differ from the one requested
/// when a hidden field was swapped for a visible editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Insertion {
    pub written_to: EditableTarget,
    pub technique: InsertTechnique,
}

/// Writes `text` into `target` using the technique its kind calls for.
///
/// Insertion is best-effort: any resolved target counts as written. Errors
/// are only returned when the page itself could not be driven.
pub async fn insert(
    page: &dyn PagePort,
    snapshot: &DomSnapshot,
    target: EditableTarget,
    text: &str,
) -> Result<Insertion, PageError> {
    match target {
        EditableTarget::RichEditable(key) => insert_rich(page, key, text).await,
        EditableTarget::PlainField(key) => {
            if !is_visible(snapshot, key) {
                if let Some(editor) = nearest_visible_rich_editable(snapshot, key) {
                    debug!(field = %key, editor = %editor, "field hidden, writing to nearby editor");
                    return insert_rich(page, editor, text).await;
                }
            }
            page.set_native_value(key, text).await?;
            page.dispatch_change_events(key).await?;
            Ok(Insertion {
                written_to: target,
                technique: InsertTechnique::NativeSetter,
            })
        }
    }
}

async fn insert_rich(page: &dyn PagePort, key: NodeKey, text: &str) -> Result<Insertion, PageError> {
    page.focus_at_end(key).await?;
    let technique = match page.exec_insert_text(key, text).await {
        Ok(true) => InsertTechnique::InsertTextCommand,
        Ok(false) => {
            page.replace_text_content(key, text).await?;
            InsertTechnique::ContentReplace
        }
        Err(err) if err.is_page_lost() => return Err(err),
        Err(err) => {
            debug!(?err, "insert-text command failed, replacing content");
            page.replace_text_content(key, text).await?;
            InsertTechnique::ContentReplace
        }
    };
    page.dispatch_change_events(key).await?;
    Ok(Insertion {
        written_to: EditableTarget::RichEditable(key),
        technique,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakePage, PageCall};
    use page_structure::SnapshotBuilder;

    #[tokio::test]
    async fn rich_editor_uses_insert_command_then_notifies() {
        let mut b = SnapshotBuilder::new();
        let editor = b.rich_editor(b.body());
        let page = FakePage::new(b.build());
        let snapshot = page.snapshot_now();

        let done = insert(&page, &snapshot, EditableTarget::RichEditable(editor), "hi")
            .await
            .unwrap();
        assert_eq!(done.technique, InsertTechnique::InsertTextCommand);
        assert_eq!(
            page.calls(),
            vec![
                PageCall::FocusAtEnd(editor),
                PageCall::ExecInsertText(editor, "hi".into()),
                PageCall::DispatchChange(editor),
            ]
        );
    }

    #[tokio::test]
    async fn missing_insert_command_falls_back_to_content_replace() {
        let mut b = SnapshotBuilder::new();
        let editor = b.rich_editor(b.body());
        let page = FakePage::new(b.build());
        page.set_exec_command_supported(false);
        let snapshot = page.snapshot_now();

        let done = insert(&page, &snapshot, EditableTarget::RichEditable(editor), "hi")
            .await
            .unwrap();
        assert_eq!(done.technique, InsertTechnique::ContentReplace);
        assert!(page.calls().contains(&PageCall::ReplaceContent(editor, "hi".into())));
        assert_eq!(page.text_of(editor).as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn hidden_field_is_swapped_for_visible_editor() {
        let mut b = SnapshotBuilder::new();
        let form = b.element(b.body(), "form");
        let shim = b.element(form, "textarea");
        b.display(shim, "none");
        let editor = b.rich_editor(form);
        let page = FakePage::new(b.build());
        let snapshot = page.snapshot_now();

        let done = insert(&page, &snapshot, EditableTarget::PlainField(shim), "hello")
            .await
            .unwrap();
        assert_eq!(done.written_to, EditableTarget::RichEditable(editor));
        assert_eq!(page.text_of(shim), None);
    }

    #[tokio::test]
    async fn visible_field_uses_native_setter() {
        let mut b = SnapshotBuilder::new();
        let area = b.element(b.body(), "textarea");
        let page = FakePage::new(b.build());
        let snapshot = page.snapshot_now();

        let done = insert(&page, &snapshot, EditableTarget::PlainField(area), "x")
            .await
            .unwrap();
        assert_eq!(done.technique, InsertTechnique::NativeSetter);
        assert_eq!(
            page.calls(),
            vec![PageCall::SetValue(area, "x".into()), PageCall::DispatchChange(area)]
        );
    }

    #[tokio::test]
    async fn lost_page_is_reported() {
        let mut b = SnapshotBuilder::new();
        let editor = b.rich_editor(b.body());
        let page = FakePage::new(b.build());
        let snapshot = page.snapshot_now();
        page.lose_page();

        let err = insert(&page, &snapshot, EditableTarget::RichEditable(editor), "x")
            .await
            .unwrap_err();
        assert!(err.is_page_lost());
    }
}
