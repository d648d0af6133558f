//! Structural element patterns, the typed stand-in for CSS selectors.

use serde::{Deserialize, Serialize};

use crate::query::closest_form;
use crate::snapshot::{DomNode, DomSnapshot, NodeKey};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrMatch {
    Equals { name: String, value: String },
    Prefix { name: String, prefix: String },
    ContainsIgnoreCase { name: String, needle: String },
    Present { name: String },
    RichEditable,
}

impl AttrMatch {
    fn test(&self, node: &DomNode) -> bool {
        match self {
            AttrMatch::Equals { name, value } => node.attr(name) == Some(value.as_str()),
            AttrMatch::Prefix { name, prefix } => node
                .attr(name)
                .map(|v| v.starts_with(prefix.as_str()))
                .unwrap_or(false),
            AttrMatch::ContainsIgnoreCase { name, needle } => node
                .attr(name)
                .map(|v| v.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            AttrMatch::Present { name } => node.attr(name).is_some(),
            AttrMatch::RichEditable => node.is_rich_editable(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementPattern {
    pub name: String,
    pub tag: Option<String>,
    pub attrs: Vec<AttrMatch>,
    /// Requires an enclosing `<form>` ancestor in the same tree scope.
    pub within_form: bool,
}

impl ElementPattern {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: None,
            attrs: Vec::new(),
            within_form: false,
        }
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_ascii_uppercase());
        self
    }

    pub fn editable(mut self) -> Self {
        self.attrs.push(AttrMatch::RichEditable);
        self
    }

    pub fn attr_eq(mut self, name: &str, value: &str) -> Self {
        self.attrs.push(AttrMatch::Equals {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn attr_prefix(mut self, name: &str, prefix: &str) -> Self {
        self.attrs.push(AttrMatch::Prefix {
            name: name.into(),
            prefix: prefix.into(),
        });
        self
    }

    pub fn attr_contains(mut self, name: &str, needle: &str) -> Self {
        self.attrs.push(AttrMatch::ContainsIgnoreCase {
            name: name.into(),
            needle: needle.into(),
        });
        self
    }

    pub fn in_form(mut self) -> Self {
        self.within_form = true;
        self
    }

    pub fn matches(&self, snapshot: &DomSnapshot, key: NodeKey) -> bool {
        let Some(node) = snapshot.node(key) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !node.is_tag(tag) {
                return false;
            }
        }
        if !self.attrs.iter().all(|m| m.test(node)) {
            return false;
        }
        if self.within_form {
            let ancestor_form = node.parent.and_then(|parent| closest_form(snapshot, parent));
            if ancestor_form.is_none() {
                return false;
            }
        }
        true
    }
}

/// Composer candidates, most specific first.
pub fn composer_patterns() -> Vec<ElementPattern> {
    vec![
        ElementPattern::new("form-editable-textbox-composer")
            .tag("div")
            .editable()
            .attr_eq("role", "textbox")
            .attr_prefix("data-testid", "composer")
            .in_form(),
        ElementPattern::new("form-editable-composer")
            .tag("div")
            .editable()
            .attr_prefix("data-testid", "composer")
            .in_form(),
        ElementPattern::new("form-editable-textbox")
            .tag("div")
            .editable()
            .attr_eq("role", "textbox")
            .in_form(),
        ElementPattern::new("editable-composer")
            .tag("div")
            .editable()
            .attr_prefix("data-testid", "composer"),
        ElementPattern::new("editable-textbox")
            .tag("div")
            .editable()
            .attr_eq("role", "textbox"),
        ElementPattern::new("form-editable").editable().in_form(),
        ElementPattern::new("editable").editable(),
        ElementPattern::new("form-textarea").tag("textarea").in_form(),
        ElementPattern::new("textarea").tag("textarea"),
    ]
}

/// Send affordances, most specific first.
pub fn send_patterns() -> Vec<ElementPattern> {
    vec![
        ElementPattern::new("send-button-testid").attr_eq("data-testid", "send-button"),
        ElementPattern::new("send-testid").attr_contains("data-testid", "send"),
        ElementPattern::new("send-aria-label")
            .tag("button")
            .attr_contains("aria-label", "send"),
        ElementPattern::new("submit-button")
            .tag("button")
            .attr_eq("type", "submit"),
        ElementPattern::new("submit-input")
            .tag("input")
            .attr_eq("type", "submit"),
    ]
}
