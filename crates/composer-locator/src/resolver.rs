//! Composer resolution over an ordered pattern chain

use page_structure::{composer_patterns, deep_query, is_visible, DomSnapshot, ElementPattern};
use tracing::debug;

use crate::substitute::nearest_visible_rich_editable;
use crate::types::{EditableTarget, Resolution};

/// Walks its patterns from most to least specific and returns the first
/// usable target. Absence is a normal result while the page hydrates.
#[derive(Clone, Debug)]
pub struct TargetResolver {
    patterns: Vec<ElementPattern>,
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new(composer_patterns())
    }
}

impl TargetResolver {
    pub fn new(patterns: Vec<ElementPattern>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[ElementPattern] {
        &self.patterns
    }

    pub fn find_target(&self, snapshot: &DomSnapshot) -> Option<Resolution> {
        for pattern in &self.patterns {
            let hits = deep_query(snapshot, pattern);
            if hits.is_empty() {
                debug!(strategy = %pattern.name, "no match");
                continue;
            }

            let visible = hits
                .iter()
                .copied()
                .filter(|key| is_visible(snapshot, *key))
                .find_map(|key| EditableTarget::classify(snapshot, key));
            if let Some(target) = visible {
                debug!(strategy = %pattern.name, key = %target.key(), kind = target.kind(), "matched visible");
                return Some(Resolution {
                    target,
                    strategy: pattern.name.clone(),
                    substituted: false,
                });
            }

            let hidden_field = hits
                .iter()
                .copied()
                .find(|key| snapshot.node(*key).map(|n| n.is_plain_field()).unwrap_or(false));
            match hidden_field.and_then(|field| nearest_visible_rich_editable(snapshot, field)) {
                Some(editor) => {
                    debug!(strategy = %pattern.name, key = %editor, "using visible editor near hidden field");
                    return Some(Resolution {
                        target: EditableTarget::RichEditable(editor),
                        strategy: pattern.name.clone(),
                        substituted: true,
                    });
                }
                None => debug!(strategy = %pattern.name, hits = hits.len(), "matched but hidden"),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_structure::SnapshotBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn prefers_most_specific_visible_pattern() {
        let mut b = SnapshotBuilder::new();
        let form = b.element(b.body(), "form");
        let generic = b.rich_editor(form);
        let textbox = b.rich_editor(form);
        b.attr(textbox, "role", "textbox");
        let snapshot = b.build();

        let resolution = TargetResolver::default().find_target(&snapshot).unwrap();
        assert_eq!(resolution.target, EditableTarget::RichEditable(textbox));
        assert_eq!(resolution.strategy, "form-editable-textbox");
        assert_ne!(resolution.target.key(), generic);
    }

    #[test]
    fn hidden_top_pattern_is_skipped() {
        let mut b = SnapshotBuilder::new();
        let form = b.element(b.body(), "form");
        let hidden = b.rich_editor(form);
        b.attr(hidden, "role", "textbox").display(hidden, "none");
        let zero = b.rich_editor(form);
        b.attr(zero, "data-testid", "composer").size(zero, 0.0, 0.0);
        let area = b.element(b.body(), "textarea");
        let snapshot = b.build();

        let resolution = TargetResolver::default().find_target(&snapshot).unwrap();
        assert_eq!(resolution.target, EditableTarget::PlainField(area));
        assert_eq!(resolution.strategy, "textarea");
    }

    #[test]
    fn hidden_textarea_substitutes_visible_editor_in_form() {
        let mut b = SnapshotBuilder::new();
        let form = b.element(b.body(), "form");
        let shim = b.element(form, "textarea");
        b.display(shim, "none");
        let editor = b.element(form, "p");
        b.attr(editor, "contenteditable", "");
        let snapshot = b.build();

        let resolution = TargetResolver::default().find_target(&snapshot).unwrap();
        // "form-editable" matches the editor before textareas are tried.
        assert_eq!(resolution.strategy, "form-editable");
        assert!(!resolution.substituted);

        let textareas_only = TargetResolver::new(
            composer_patterns()
                .into_iter()
                .filter(|p| p.name.contains("textarea"))
                .collect(),
        );
        let resolution = textareas_only.find_target(&snapshot).unwrap();
        assert_eq!(resolution.target, EditableTarget::RichEditable(editor));
        assert!(resolution.substituted);
    }

    #[test]
    fn empty_document_resolves_nothing() {
        let snapshot = SnapshotBuilder::new().build();
        assert!(TargetResolver::default().find_target(&snapshot).is_none());
    }

    #[test]
    fn shadow_hosted_editor_is_found() {
        let mut b = SnapshotBuilder::new();
        let host = b.element(b.body(), "chat-composer");
        let editor = b.shadow_element(host, "div");
        b.attr(editor, "contenteditable", "true").attr(editor, "role", "textbox");
        let snapshot = b.build();

        let resolution = TargetResolver::default().find_target(&snapshot).unwrap();
        assert_eq!(resolution.target, EditableTarget::RichEditable(editor));
        assert_eq!(resolution.strategy, "editable-textbox");
    }
}
