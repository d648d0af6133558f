//! Keyboard shortcut strings
//!
//! Canonical form is `Ctrl`, `Alt`, `Shift`, `Meta` in that order followed
//! by the key, joined with `+`. Single-character keys are upper-cased.

use crate::descriptors::{ActionDescriptor, Catalog, MenuDescriptor};

const MODIFIERS: [&str; 4] = ["Ctrl", "Alt", "Shift", "Meta"];

fn modifier_slot(token: &str) -> Option<usize> {
    match token.to_ascii_lowercase().as_str() {
        "ctrl" | "control" => Some(0),
        "alt" | "option" => Some(1),
        "shift" => Some(2),
        "meta" | "cmd" | "command" | "super" => Some(3),
        _ => None,
    }
}

/// Canonical form of `raw`, or `None` when it names no key.
pub fn normalize_shortcut(raw: &str) -> Option<String> {
    let mut held = [false; 4];
    let mut key: Option<String> = None;
    for token in raw.split('+').map(str::trim).filter(|t| !t.is_empty()) {
        match modifier_slot(token) {
            Some(slot) => held[slot] = true,
            None => {
                key = Some(if token.chars().count() == 1 {
                    token.to_uppercase()
                } else {
                    token.to_string()
                })
            }
        }
    }
    // A trailing "+" is the plus key itself.
    if key.is_none() && raw.trim_end().ends_with("++") {
        key = Some("+".to_string());
    }
    let key = key?;
    let mut parts: Vec<&str> = MODIFIERS
        .iter()
        .zip(held)
        .filter_map(|(name, on)| on.then_some(*name))
        .collect();
    parts.push(&key);
    Some(parts.join("+"))
}

/// Whether `raw` carries at least one modifier and a key.
pub fn has_modifier(raw: &str) -> bool {
    normalize_shortcut(raw)
        .map(|canonical| canonical.contains('+'))
        .unwrap_or(false)
}

/// What a shortcut is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShortcutTarget<'a> {
    Action {
        menu: &'a MenuDescriptor,
        action: &'a ActionDescriptor,
    },
    RunAll {
        menu: &'a MenuDescriptor,
    },
}

/// Finds the enabled binding for `keys`, optionally within one menu.
pub fn find_shortcut<'a>(
    catalog: &'a Catalog,
    keys: &str,
    menu_id: Option<&str>,
) -> Option<ShortcutTarget<'a>> {
    let wanted = normalize_shortcut(keys)?;
    let bound = |candidate: &Option<String>| {
        candidate
            .as_deref()
            .and_then(normalize_shortcut)
            .map(|canonical| canonical == wanted)
            .unwrap_or(false)
    };
    catalog
        .menus
        .iter()
        .filter(|menu| menu_id.map(|id| menu.id == id).unwrap_or(true))
        .find_map(|menu| {
            if let Some(action) = menu.enabled_actions().into_iter().find(|a| bound(&a.shortcut)) {
                return Some(ShortcutTarget::Action { menu, action });
            }
            (menu.run_all_enabled && bound(&menu.run_all_shortcut))
                .then_some(ShortcutTarget::RunAll { menu })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::GlobalSettings;

    #[test]
    fn modifiers_are_reordered_and_key_uppercased() {
        assert_eq!(normalize_shortcut("shift+alt+j").as_deref(), Some("Alt+Shift+J"));
        assert_eq!(normalize_shortcut("Meta + Ctrl + Enter").as_deref(), Some("Ctrl+Meta+Enter"));
        assert_eq!(normalize_shortcut("Ctrl++").as_deref(), Some("Ctrl++"));
        assert_eq!(normalize_shortcut("Alt+Shift"), None);
    }

    #[test]
    fn bare_keys_have_no_modifier() {
        assert!(!has_modifier("J"));
        assert!(has_modifier("Alt+J"));
        assert!(!has_modifier(""));
    }

    fn catalog() -> Catalog {
        let action = |id: &str, shortcut: &str, enabled: bool| ActionDescriptor {
            id: id.into(),
            title: id.into(),
            prompt_template: format!("{id}:"),
            shortcut: Some(shortcut.into()),
            enabled,
            order: 0,
        };
        Catalog {
            global: GlobalSettings::default(),
            menus: vec![MenuDescriptor {
                id: "jobs".into(),
                name: "Jobs".into(),
                destination_address: "https://chatgpt.com/".into(),
                auto_submit: true,
                run_all_enabled: true,
                run_all_shortcut: Some("Alt+Shift+A".into()),
                address_patterns: Vec::new(),
                actions: vec![
                    action("fitMatch", "Alt+Shift+J", true),
                    action("jobSummary", "Alt+Shift+S", false),
                ],
            }],
        }
    }

    #[test]
    fn lookup_uses_enabled_bindings_only() {
        let catalog = catalog();
        match find_shortcut(&catalog, "alt+shift+j", None) {
            Some(ShortcutTarget::Action { action, .. }) => assert_eq!(action.id, "fitMatch"),
            other => panic!("unexpected binding {other:?}"),
        }
        assert!(find_shortcut(&catalog, "Alt+Shift+S", None).is_none());
        assert!(matches!(
            find_shortcut(&catalog, "Shift+Alt+A", Some("jobs")),
            Some(ShortcutTarget::RunAll { .. })
        ));
        assert!(find_shortcut(&catalog, "Alt+Shift+J", Some("other")).is_none());
    }
}
