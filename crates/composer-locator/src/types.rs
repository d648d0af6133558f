use page_structure::{DomSnapshot, NodeKey};
use serde::{Deserialize, Serialize};

/// Where a prompt is written, tagged by the technique insertion must use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditableTarget {
    /// Free-form editing host (`contenteditable`).
    RichEditable(NodeKey),
    /// Single-value text field (`<textarea>`, text `<input>`).
    PlainField(NodeKey),
}

impl EditableTarget {
    pub fn key(&self) -> NodeKey {
        match self {
            EditableTarget::RichEditable(key) | EditableTarget::PlainField(key) => *key,
        }
    }

    /// Tags `key` by what the element supports, or `None` if it is not editable.
    pub fn classify(snapshot: &DomSnapshot, key: NodeKey) -> Option<Self> {
        let node = snapshot.node(key)?;
        if node.is_rich_editable() {
            Some(EditableTarget::RichEditable(key))
        } else if node.is_plain_field() {
            Some(EditableTarget::PlainField(key))
        } else {
            None
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EditableTarget::RichEditable(_) => "rich_editable",
            EditableTarget::PlainField(_) => "plain_field",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub target: EditableTarget,
    /// Name of the pattern that produced the target.
    pub strategy: String,
    /// The pattern only matched a hidden plain field and a nearby visible
    /// rich editor was taken instead.
    pub substituted: bool,
}
