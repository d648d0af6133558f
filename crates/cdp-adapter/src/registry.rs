//! Page registry: adapter page ids mapped to browser targets and sessions.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::ids::{PageId, SessionId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetContext {
    pub session_id: SessionId,
    pub target_id: String,
    pub cdp_session: Option<String>,
    pub url: String,
    pub title: String,
}

#[derive(Default)]
pub struct Registry {
    pages: DashMap<PageId, TargetContext>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_page(&self, page: PageId, target_id: String, url: String, title: String) {
        self.pages.insert(
            page,
            TargetContext {
                session_id: SessionId::new(),
                target_id,
                cdp_session: None,
                url,
                title,
            },
        );
    }

    pub fn remove_page(&self, page: &PageId) -> Option<TargetContext> {
        self.pages.remove(page).map(|(_, ctx)| ctx)
    }

    pub fn get(&self, page: &PageId) -> Option<TargetContext> {
        self.pages.get(page).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, page: &PageId) -> bool {
        self.pages.contains_key(page)
    }

    pub fn iter(&self) -> Vec<(PageId, TargetContext)> {
        self.pages
            .iter()
            .map(|kv| (*kv.key(), kv.value().clone()))
            .collect()
    }

    /// Records a new url; returns true if it differs from the previous one.
    pub fn set_url(&self, page: &PageId, url: &str) -> bool {
        match self.pages.get_mut(page) {
            Some(mut entry) if entry.url != url => {
                entry.url = url.to_string();
                true
            }
            _ => false,
        }
    }

    /// Records a new title; returns true if it differs from the previous one.
    pub fn set_title(&self, page: &PageId, title: &str) -> bool {
        match self.pages.get_mut(page) {
            Some(mut entry) if entry.title != title => {
                entry.title = title.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn set_cdp_session(&self, page: &PageId, session: String) {
        if let Some(mut entry) = self.pages.get_mut(page) {
            entry.cdp_session = Some(session);
        }
    }

    pub fn clear_cdp_session(&self, page: &PageId) {
        if let Some(mut entry) = self.pages.get_mut(page) {
            entry.cdp_session = None;
        }
    }

    pub fn get_cdp_session(&self, page: &PageId) -> Option<String> {
        self.pages
            .get(page)
            .and_then(|entry| entry.cdp_session.clone())
    }

    pub fn clear(&self) {
        self.pages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_updates_report_changes_only() {
        let registry = Registry::new();
        let page = PageId::new();
        registry.insert_page(page, "t-1".into(), "about:blank".into(), String::new());
        assert!(registry.set_title(&page, "Chat"));
        assert!(!registry.set_title(&page, "Chat"));
        assert!(!registry.set_title(&PageId::new(), "Chat"));
        assert_eq!(registry.get(&page).unwrap().title, "Chat");
    }
}
