use serde::{Deserialize, Serialize};

use crate::snapshot::{DomSnapshot, NodeKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityIssue {
    Missing,
    Detached,
    DisplayNone,
    VisibilityHidden,
    OpacityZero,
    ZeroArea,
    AriaHidden,
}

impl VisibilityIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityIssue::Missing => "missing",
            VisibilityIssue::Detached => "detached",
            VisibilityIssue::DisplayNone => "display_none",
            VisibilityIssue::VisibilityHidden => "visibility_hidden",
            VisibilityIssue::OpacityZero => "opacity_zero",
            VisibilityIssue::ZeroArea => "zero_area",
            VisibilityIssue::AriaHidden => "aria_hidden",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisibilityReport {
    pub ok: bool,
    pub issues: Vec<VisibilityIssue>,
}

/// Judges whether a user could see `key`. Every failing check is reported,
/// not just the first.
pub fn judge_visible(snapshot: &DomSnapshot, key: NodeKey) -> VisibilityReport {
    let Some(node) = snapshot.node(key) else {
        return VisibilityReport {
            ok: false,
            issues: vec![VisibilityIssue::Missing],
        };
    };

    let mut issues = Vec::new();
    if !node.connected {
        issues.push(VisibilityIssue::Detached);
    }
    if node.style.display == "none" {
        issues.push(VisibilityIssue::DisplayNone);
    }
    if node.style.visibility == "hidden" {
        issues.push(VisibilityIssue::VisibilityHidden);
    }
    if node.style.opacity == 0.0 {
        issues.push(VisibilityIssue::OpacityZero);
    }
    if node.rect.width == 0.0 || node.rect.height == 0.0 {
        issues.push(VisibilityIssue::ZeroArea);
    }
    if aria_hidden_in_chain(snapshot, key) {
        issues.push(VisibilityIssue::AriaHidden);
    }

    VisibilityReport {
        ok: issues.is_empty(),
        issues,
    }
}

pub fn is_visible(snapshot: &DomSnapshot, key: NodeKey) -> bool {
    judge_visible(snapshot, key).ok
}

// Walks parents and shadow hosts; the document element itself is exempt.
fn aria_hidden_in_chain(snapshot: &DomSnapshot, key: NodeKey) -> bool {
    let mut current = Some(key);
    let mut steps = 0usize;
    while let Some(k) = current {
        if steps > snapshot.len() || snapshot.is_root(k) {
            break;
        }
        steps += 1;
        let Some(node) = snapshot.node(k) else {
            break;
        };
        if node.attr("aria-hidden") == Some("true") {
            return true;
        }
        current = node.composed_parent();
    }
    false
}
