use tracing::trace;

use crate::pattern::ElementPattern;
use crate::snapshot::{DomSnapshot, NodeKey};

/// All elements matching `pattern`, including those inside nested shadow
/// roots. Matches of a tree scope come before those of the shadow roots it
/// hosts; within a scope they are in document order.
pub fn deep_query(snapshot: &DomSnapshot, pattern: &ElementPattern) -> Vec<NodeKey> {
    let mut visited = vec![false; snapshot.len()];
    let mut matches = Vec::new();
    let mut scopes: Vec<Vec<NodeKey>> = vec![snapshot.roots().to_vec()];

    while let Some(scope) = scopes.pop() {
        let mut hosts = Vec::new();
        let mut stack: Vec<NodeKey> = scope.into_iter().rev().collect();
        while let Some(key) = stack.pop() {
            let Some(seen) = visited.get_mut(key.index()) else {
                continue;
            };
            if *seen {
                continue;
            }
            *seen = true;
            let Some(node) = snapshot.node(key) else {
                continue;
            };
            if pattern.matches(snapshot, key) {
                matches.push(key);
            }
            if !node.shadow_children.is_empty() {
                hosts.push(node.shadow_children.clone());
            }
            stack.extend(node.children.iter().rev().copied());
        }
        scopes.extend(hosts.into_iter().rev());
    }

    trace!(pattern = %pattern.name, hits = matches.len(), "deep query");
    matches
}

/// Nearest `<form>` at or above `key` without leaving its tree scope.
pub fn closest_form(snapshot: &DomSnapshot, key: NodeKey) -> Option<NodeKey> {
    let mut current = Some(key);
    let mut steps = 0usize;
    while let Some(k) = current {
        if steps > snapshot.len() {
            return None;
        }
        steps += 1;
        let node = snapshot.node(k)?;
        if node.is_tag("FORM") {
            return Some(k);
        }
        current = node.parent;
    }
    None
}

/// True if `ancestor` is `key` or one of its light-DOM ancestors.
pub fn is_within(snapshot: &DomSnapshot, key: NodeKey, ancestor: NodeKey) -> bool {
    let mut current = Some(key);
    let mut steps = 0usize;
    while let Some(k) = current {
        if k == ancestor {
            return true;
        }
        if steps > snapshot.len() {
            return false;
        }
        steps += 1;
        current = snapshot.node(k).and_then(|node| node.parent);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SnapshotBuilder;

    #[test]
    fn light_matches_precede_shadow_matches() {
        let mut b = SnapshotBuilder::new();
        let host = b.element(b.body(), "chat-shell");
        let shadow_area = b.shadow_element(host, "textarea");
        let light_area = b.element(b.body(), "textarea");
        let nested_host = b.shadow_element(host, "inner-shell");
        let nested_area = b.shadow_element(nested_host, "textarea");
        let snapshot = b.build();

        let hits = deep_query(&snapshot, &ElementPattern::new("t").tag("textarea"));
        assert_eq!(hits, vec![light_area, shadow_area, nested_area]);
    }

    #[test]
    fn closest_form_stays_in_tree_scope() {
        let mut b = SnapshotBuilder::new();
        let form = b.element(b.body(), "form");
        let host = b.element(form, "x-editor");
        let inner = b.shadow_element(host, "textarea");
        let direct = b.element(form, "textarea");
        let snapshot = b.build();

        assert_eq!(closest_form(&snapshot, direct), Some(form));
        assert_eq!(closest_form(&snapshot, inner), None);
        assert!(is_within(&snapshot, direct, form));
        assert!(!is_within(&snapshot, inner, form));
    }
}
