//! [`PagePort`] over a live tab: every operation is one `Runtime.evaluate`
//! against the node registry left by the latest snapshot.

use std::sync::Arc;

use async_trait::async_trait;
use cdp_adapter::{CdpAdapter, PageId};
use page_structure::{DomSnapshot, NodeKey, NODE_REGISTRY, SNAPSHOT_SCRIPT};
use serde_json::Value;
use tracing::trace;

use crate::errors::PageError;
use crate::ports::PagePort;

const FOCUS_AT_END: &str = r#"el.focus();
    const sel = window.getSelection && window.getSelection();
    if (sel) {
      const range = document.createRange();
      range.selectNodeContents(el);
      range.collapse(false);
      sel.removeAllRanges();
      sel.addRange(range);
    }
    return true;"#;

const DISPATCH_CHANGE: &str = r#"el.dispatchEvent(new InputEvent("input", { bubbles: true }));
    el.dispatchEvent(new Event("change", { bubbles: true }));
    return true;"#;

const IS_ACTIONABLE: &str =
    r#"return !el.disabled && el.getAttribute("aria-disabled") !== "true";"#;

const ACTIVATE: &str = "el.click(); return true;";

const PRESS_ENTER: &str = r#"const init = { key: "Enter", code: "Enter", keyCode: 13, which: 13, bubbles: true, cancelable: true };
    el.dispatchEvent(new KeyboardEvent("keydown", init));
    el.dispatchEvent(new KeyboardEvent("keyup", init));
    return true;"#;

const SUBMIT_FORM: &str = r#"const form = el.closest && el.closest("form");
    if (!form) return false;
    if (typeof form.requestSubmit === "function") form.requestSubmit(); else form.submit();
    return true;"#;

#[derive(Clone)]
pub struct CdpPagePort {
    adapter: Arc<CdpAdapter>,
    page: PageId,
}

impl CdpPagePort {
    pub fn new(adapter: Arc<CdpAdapter>, page: PageId) -> Self {
        Self { adapter, page }
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    async fn on_node(&self, key: NodeKey, body: &str) -> Result<Value, PageError> {
        let script = element_script(key, body);
        trace!(page = %self.page, node = %key, "page script");
        let reply = self.adapter.evaluate_script(self.page, &script).await?;
        match reply.get("status").and_then(Value::as_str) {
            Some("ok") => Ok(reply.get("value").cloned().unwrap_or(Value::Null)),
            Some("stale") => Err(PageError::Stale),
            Some("detached") => Err(PageError::Detached),
            _ => Err(PageError::Script(format!("unexpected reply {reply}"))),
        }
    }

    async fn on_node_bool(&self, key: NodeKey, body: &str) -> Result<bool, PageError> {
        Ok(self.on_node(key, body).await?.as_bool().unwrap_or(false))
    }
}

/// Wraps `body` so it runs with `el` bound to the registered node.
fn element_script(key: NodeKey, body: &str) -> String {
    format!(
        r#"(() => {{
  const el = (window.{NODE_REGISTRY} || [])[{index}];
  if (!el) return {{ status: "stale" }};
  if (!el.isConnected) return {{ status: "detached" }};
  const run = () => {{
    {body}
  }};
  const value = run();
  return {{ status: "ok", value: value === undefined ? null : value }};
}})()"#,
        index = key.0
    )
}

fn js_string(text: &str) -> String {
    // JSON string literals are valid JavaScript string literals.
    Value::String(text.to_string()).to_string()
}

#[async_trait]
impl PagePort for CdpPagePort {
    async fn snapshot(&self) -> Result<DomSnapshot, PageError> {
        let value = self.adapter.evaluate_script(self.page, SNAPSHOT_SCRIPT).await?;
        DomSnapshot::from_value(value).map_err(|err| PageError::Script(err.to_string()))
    }

    async fn focus_at_end(&self, key: NodeKey) -> Result<(), PageError> {
        self.on_node(key, FOCUS_AT_END).await.map(|_| ())
    }

    async fn exec_insert_text(&self, key: NodeKey, text: &str) -> Result<bool, PageError> {
        let body = format!(
            r#"try {{
      return typeof document.execCommand === "function" && document.execCommand("insertText", false, {text}) === true;
    }} catch (err) {{
      return false;
    }}"#,
            text = js_string(text)
        );
        self.on_node_bool(key, &body).await
    }

    async fn replace_text_content(&self, key: NodeKey, text: &str) -> Result<(), PageError> {
        let body = format!("el.textContent = {}; return true;", js_string(text));
        self.on_node(key, &body).await.map(|_| ())
    }

    async fn set_native_value(&self, key: NodeKey, text: &str) -> Result<(), PageError> {
        let body = format!(
            r#"el.focus();
    const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
    const desc = Object.getOwnPropertyDescriptor(proto, "value");
    if (desc && desc.set) desc.set.call(el, {text}); else el.value = {text};
    return true;"#,
            text = js_string(text)
        );
        self.on_node(key, &body).await.map(|_| ())
    }

    async fn dispatch_change_events(&self, key: NodeKey) -> Result<(), PageError> {
        self.on_node(key, DISPATCH_CHANGE).await.map(|_| ())
    }

    async fn is_actionable(&self, key: NodeKey) -> Result<bool, PageError> {
        self.on_node_bool(key, IS_ACTIONABLE).await
    }

    async fn activate(&self, key: NodeKey) -> Result<(), PageError> {
        self.on_node(key, ACTIVATE).await.map(|_| ())
    }

    async fn press_enter(&self, key: NodeKey) -> Result<(), PageError> {
        self.on_node(key, PRESS_ENTER).await.map(|_| ())
    }

    async fn submit_enclosing_form(&self, key: NodeKey) -> Result<bool, PageError> {
        self.on_node_bool(key, SUBMIT_FORM).await
    }

    async fn show_notice(&self, message: &str) -> Result<(), PageError> {
        // Deferred so the evaluation returns before alert() blocks the page.
        let script = format!("setTimeout(() => alert({}), 0); true", js_string(message));
        self.adapter.evaluate_script(self.page, &script).await?;
        Ok(())
    }
}
