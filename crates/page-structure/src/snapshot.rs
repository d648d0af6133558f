use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StructureError;

/// Global the snapshot script stores its element registry under.
pub const NODE_REGISTRY: &str = "__promptcastNodes";

/// Captures the element tree of the current document, descending into open
/// shadow roots, and leaves the visited elements in `window.__promptcastNodes`
/// so later scripts can address them by key. Iterative so deep trees cannot
/// overflow the page's call stack.
pub const SNAPSHOT_SCRIPT: &str = r#"(() => {
  const registry = [];
  const nodes = [];
  const roots = [];
  const stack = [];
  const pushScope = (list, parent, host) => {
    for (let i = list.length - 1; i >= 0; i--) stack.push([list[i], parent, host]);
  };
  if (document.documentElement) pushScope([document.documentElement], null, null);
  while (stack.length) {
    const [el, parent, host] = stack.pop();
    const key = registry.length;
    registry.push(el);
    const cs = getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    const opacity = parseFloat(cs.opacity);
    const attrs = {};
    for (const a of Array.from(el.attributes)) attrs[a.name] = a.value;
    nodes.push({
      tag: el.tagName,
      attrs,
      parent,
      host,
      children: [],
      shadow: [],
      style: { display: cs.display, visibility: cs.visibility, opacity: Number.isFinite(opacity) ? opacity : 1 },
      rect: { width: rect.width, height: rect.height },
      connected: el.isConnected,
    });
    if (parent !== null) nodes[parent].children.push(key);
    else if (host !== null) nodes[host].shadow.push(key);
    else roots.push(key);
    if (el.shadowRoot) pushScope(Array.from(el.shadowRoot.children), null, key);
    pushScope(Array.from(el.children), key, null);
  }
  window.__promptcastNodes = registry;
  return { nodes, roots };
})()"#;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(pub u32);

impl NodeKey {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".into(),
            visibility: "visible".into(),
            opacity: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomNode {
    #[serde(skip)]
    pub key: NodeKey,
    /// Upper-case tag name as reported by `Element.tagName`.
    pub tag: String,
    #[serde(rename = "attrs", default)]
    pub attributes: BTreeMap<String, String>,
    /// Parent element within the same tree scope.
    pub parent: Option<NodeKey>,
    /// Shadow host, set only for the top-level children of a shadow root.
    pub host: Option<NodeKey>,
    #[serde(default)]
    pub children: Vec<NodeKey>,
    #[serde(rename = "shadow", default)]
    pub shadow_children: Vec<NodeKey>,
    #[serde(default)]
    pub style: ComputedStyle,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default = "connected_default")]
    pub connected: bool,
}

fn connected_default() -> bool {
    true
}

impl DomNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// `contenteditable` set to `true` or present without a value.
    pub fn is_rich_editable(&self) -> bool {
        matches!(self.attr("contenteditable"), Some(v) if v.is_empty() || v.eq_ignore_ascii_case("true"))
    }

    /// Single-value text inputs: textareas and text-like `<input>` elements.
    pub fn is_plain_field(&self) -> bool {
        if self.is_tag("TEXTAREA") {
            return true;
        }
        if !self.is_tag("INPUT") {
            return false;
        }
        let kind = self.attr("type").unwrap_or("text").to_ascii_lowercase();
        matches!(kind.as_str(), "" | "text" | "search")
    }

    /// Next element up the ancestor chain, crossing out of shadow roots.
    pub fn composed_parent(&self) -> Option<NodeKey> {
        self.parent.or(self.host)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DomSnapshot {
    nodes: Vec<DomNode>,
    roots: Vec<NodeKey>,
}

impl DomSnapshot {
    /// Parses the value returned by [`SNAPSHOT_SCRIPT`].
    pub fn from_value(value: Value) -> Result<Self, StructureError> {
        let mut snapshot: DomSnapshot = serde_json::from_value(value)?;
        snapshot.reindex()?;
        Ok(snapshot)
    }

    /// Keys and references are already consistent.
    pub(crate) fn assembled(nodes: Vec<DomNode>, roots: Vec<NodeKey>) -> Self {
        DomSnapshot { nodes, roots }
    }

    fn reindex(&mut self) -> Result<(), StructureError> {
        let len = self.nodes.len();
        let check = |key: NodeKey| {
            if key.index() < len {
                Ok(())
            } else {
                Err(StructureError::DanglingKey { key: key.0, len })
            }
        };
        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.key = NodeKey(index as u32);
        }
        for node in &self.nodes {
            for key in node
                .parent
                .iter()
                .chain(node.host.iter())
                .chain(node.children.iter())
                .chain(node.shadow_children.iter())
            {
                check(*key)?;
            }
        }
        for key in &self.roots {
            check(*key)?;
        }
        Ok(())
    }

    pub fn node(&self, key: NodeKey) -> Option<&DomNode> {
        self.nodes.get(key.index())
    }

    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_root(&self, key: NodeKey) -> bool {
        self.roots.contains(&key)
    }
}
