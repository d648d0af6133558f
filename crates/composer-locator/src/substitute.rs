use page_structure::{closest_form, deep_query, is_visible, is_within, DomSnapshot, ElementPattern, NodeKey};

/// First visible rich editor in the same form as `from`, or anywhere in the
/// document when `from` is not inside a form.
pub fn nearest_visible_rich_editable(snapshot: &DomSnapshot, from: NodeKey) -> Option<NodeKey> {
    let form = closest_form(snapshot, from);
    let editors = deep_query(snapshot, &ElementPattern::new("rich-editable").editable());
    editors
        .into_iter()
        .filter(|key| form.map(|form| is_within(snapshot, *key, form)).unwrap_or(true))
        .find(|key| is_visible(snapshot, *key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_structure::SnapshotBuilder;

    #[test]
    fn prefers_editor_in_same_form() {
        let mut b = SnapshotBuilder::new();
        let stray = b.rich_editor(b.body());
        let form = b.element(b.body(), "form");
        let shim = b.element(form, "textarea");
        let editor = b.rich_editor(form);
        let snapshot = b.build();

        assert_eq!(nearest_visible_rich_editable(&snapshot, shim), Some(editor));
        assert_ne!(Some(stray), nearest_visible_rich_editable(&snapshot, shim));
    }

    #[test]
    fn falls_back_to_document_without_form() {
        let mut b = SnapshotBuilder::new();
        let shim = b.element(b.body(), "textarea");
        let hidden = b.rich_editor(b.body());
        b.visibility(hidden, "hidden");
        let visible = b.rich_editor(b.body());
        let snapshot = b.build();

        assert_eq!(nearest_visible_rich_editable(&snapshot, shim), Some(visible));
    }

    #[test]
    fn form_without_visible_editor_yields_none() {
        let mut b = SnapshotBuilder::new();
        b.rich_editor(b.body());
        let form = b.element(b.body(), "form");
        let shim = b.element(form, "textarea");
        let snapshot = b.build();

        assert_eq!(nearest_visible_rich_editable(&snapshot, shim), None);
    }
}
