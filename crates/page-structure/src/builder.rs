//! Programmatic snapshot construction for in-memory pages.

use std::collections::BTreeMap;

use crate::snapshot::{ComputedStyle, DomNode, DomSnapshot, NodeKey, Rect};

/// Builds a [`DomSnapshot`] starting from `<html><body>`. New elements are
/// visible and 120x24 unless adjusted.
#[derive(Clone, Debug)]
pub struct SnapshotBuilder {
    nodes: Vec<DomNode>,
    roots: Vec<NodeKey>,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        };
        let html = builder.push("HTML", None, None);
        builder.roots.push(html);
        builder.push("BODY", Some(html), None);
        builder
    }

    pub fn root(&self) -> NodeKey {
        NodeKey(0)
    }

    pub fn body(&self) -> NodeKey {
        NodeKey(1)
    }

    fn push(&mut self, tag: &str, parent: Option<NodeKey>, host: Option<NodeKey>) -> NodeKey {
        let key = NodeKey(self.nodes.len() as u32);
        self.nodes.push(DomNode {
            key,
            tag: tag.to_ascii_uppercase(),
            attributes: BTreeMap::new(),
            parent,
            host,
            children: Vec::new(),
            shadow_children: Vec::new(),
            style: ComputedStyle::default(),
            rect: Rect {
                width: 120.0,
                height: 24.0,
            },
            connected: true,
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(key);
        } else if let Some(host) = host {
            self.nodes[host.index()].shadow_children.push(key);
        }
        key
    }

    /// Appends a light-DOM child of `parent`.
    pub fn element(&mut self, parent: NodeKey, tag: &str) -> NodeKey {
        self.push(tag, Some(parent), None)
    }

    /// Appends a top-level child to the open shadow root hosted by `host`.
    pub fn shadow_element(&mut self, host: NodeKey, tag: &str) -> NodeKey {
        self.push(tag, None, Some(host))
    }

    pub fn attr(&mut self, key: NodeKey, name: &str, value: &str) -> &mut Self {
        self.nodes[key.index()]
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn display(&mut self, key: NodeKey, value: &str) -> &mut Self {
        self.nodes[key.index()].style.display = value.to_string();
        self
    }

    pub fn visibility(&mut self, key: NodeKey, value: &str) -> &mut Self {
        self.nodes[key.index()].style.visibility = value.to_string();
        self
    }

    pub fn opacity(&mut self, key: NodeKey, value: f64) -> &mut Self {
        self.nodes[key.index()].style.opacity = value;
        self
    }

    pub fn size(&mut self, key: NodeKey, width: f64, height: f64) -> &mut Self {
        self.nodes[key.index()].rect = Rect { width, height };
        self
    }

    pub fn detached(&mut self, key: NodeKey) -> &mut Self {
        self.nodes[key.index()].connected = false;
        self
    }

    /// Shorthand for a `<div contenteditable="true">` child of `parent`.
    pub fn rich_editor(&mut self, parent: NodeKey) -> NodeKey {
        let key = self.element(parent, "div");
        self.attr(key, "contenteditable", "true");
        key
    }

    pub fn build(&self) -> DomSnapshot {
        DomSnapshot::assembled(self.nodes.clone(), self.roots.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_children_hang_off_their_host() {
        let mut b = SnapshotBuilder::new();
        let host = b.element(b.body(), "chat-app");
        let inner = b.shadow_element(host, "textarea");
        let snapshot = b.build();

        let node = snapshot.node(inner).unwrap();
        assert_eq!(node.parent, None);
        assert_eq!(node.host, Some(host));
        assert_eq!(snapshot.node(host).unwrap().shadow_children, vec![inner]);
        assert!(snapshot.node(inner).unwrap().is_plain_field());
    }
}
