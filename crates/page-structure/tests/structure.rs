use page_structure::{
    composer_patterns, deep_query, is_visible, send_patterns, DomSnapshot, NodeKey,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn node(tag: &str, parent: Option<u32>, children: &[u32], attrs: serde_json::Value) -> serde_json::Value {
    json!({
        "tag": tag,
        "attrs": attrs,
        "parent": parent,
        "host": null,
        "children": children,
        "shadow": [],
        "style": { "display": "block", "visibility": "visible", "opacity": 1 },
        "rect": { "width": 300, "height": 40 },
        "connected": true
    })
}

/// A chat page keeping a hidden textarea shim next to the real editor.
fn chat_page() -> DomSnapshot {
    let mut hidden_shim = node("TEXTAREA", Some(2), &[], json!({ "name": "prompt" }));
    hidden_shim["style"]["display"] = json!("none");
    let payload = json!({
        "nodes": [
            node("HTML", None, &[1], json!({})),
            node("BODY", Some(0), &[2], json!({})),
            node("FORM", Some(1), &[3, 4, 5], json!({})),
            hidden_shim,
            node("DIV", Some(2), &[], json!({ "contenteditable": "true", "id": "prompt-textarea" })),
            node("BUTTON", Some(2), &[], json!({ "data-testid": "send-button", "aria-label": "Send prompt" })),
        ],
        "roots": [0]
    });
    DomSnapshot::from_value(payload).expect("valid snapshot")
}

#[test]
fn first_matching_composer_pattern_is_form_editable() {
    let snapshot = chat_page();
    let hit = composer_patterns().into_iter().find_map(|pattern| {
        deep_query(&snapshot, &pattern)
            .into_iter()
            .find(|key| is_visible(&snapshot, *key))
            .map(|key| (pattern.name, key))
    });
    assert_eq!(hit, Some(("form-editable".to_string(), NodeKey(4))));
}

#[test]
fn hidden_shim_matches_structurally_but_is_not_visible() {
    let snapshot = chat_page();
    let textarea = composer_patterns()
        .into_iter()
        .find(|p| p.name == "form-textarea")
        .unwrap();
    let hits = deep_query(&snapshot, &textarea);
    assert_eq!(hits, vec![NodeKey(3)]);
    assert!(!is_visible(&snapshot, NodeKey(3)));
}

#[test]
fn send_button_found_by_test_id() {
    let snapshot = chat_page();
    let first = send_patterns()
        .into_iter()
        .find_map(|p| deep_query(&snapshot, &p).into_iter().next());
    assert_eq!(first, Some(NodeKey(5)));
}
