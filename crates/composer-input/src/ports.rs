use async_trait::async_trait;
use page_structure::{DomSnapshot, NodeKey};

use crate::errors::PageError;

/// Page operations the insertion and submission steps need. Node keys refer
/// to the most recent [`PagePort::snapshot`].
#[async_trait]
pub trait PagePort: Send + Sync {
    /// Captures the document and re-keys the page-side node registry.
    async fn snapshot(&self) -> Result<DomSnapshot, PageError>;

    /// Focuses the node and collapses the selection to the end of its content.
    async fn focus_at_end(&self, key: NodeKey) -> Result<(), PageError>;

    /// Runs the platform insert-text command; `false` if it is missing or
    /// reported failure.
    async fn exec_insert_text(&self, key: NodeKey, text: &str) -> Result<bool, PageError>;

    async fn replace_text_content(&self, key: NodeKey, text: &str) -> Result<(), PageError>;

    /// Focuses a text field and assigns its value through the prototype setter.
    async fn set_native_value(&self, key: NodeKey, text: &str) -> Result<(), PageError>;

    /// Fires bubbling `input` and `change` events.
    async fn dispatch_change_events(&self, key: NodeKey) -> Result<(), PageError>;

    /// Not disabled and not `aria-disabled`.
    async fn is_actionable(&self, key: NodeKey) -> Result<bool, PageError>;

    async fn activate(&self, key: NodeKey) -> Result<(), PageError>;

    /// Dispatches keydown and keyup for Enter.
    async fn press_enter(&self, key: NodeKey) -> Result<(), PageError>;

    /// Submits the node's form; `false` when there is none.
    async fn submit_enclosing_form(&self, key: NodeKey) -> Result<bool, PageError>;

    /// Shows a blocking message to the user without blocking the caller.
    async fn show_notice(&self, message: &str) -> Result<(), PageError>;
}
