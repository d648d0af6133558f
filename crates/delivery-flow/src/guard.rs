//! Duplicate-delivery guard
//!
//! One entry per destination page. A request is admitted unless the same
//! request id was admitted on that page inside the debounce window.

use std::time::Duration;

use cdp_adapter::PageId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use promptcast_core_types::RequestId;
use tokio::time::Instant;
use tracing::debug;

#[derive(Clone, Debug)]
struct Admitted {
    request_id: RequestId,
    at: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardVerdict {
    Admit,
    Duplicate,
}

#[derive(Debug)]
pub struct DedupGuard {
    window: Duration,
    entries: DashMap<PageId, Admitted>,
}

impl DedupGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: DashMap::new(),
        }
    }

    /// Checks and records in one step, so two attempts racing on the same
    /// page cannot both be admitted.
    pub fn check_and_record(&self, page: PageId, request_id: &RequestId) -> GuardVerdict {
        let now = Instant::now();
        self.entries
            .retain(|_, admitted| now.duration_since(admitted.at) < self.window);
        match self.entries.entry(page) {
            Entry::Occupied(occupied) if occupied.get().request_id == *request_id => {
                debug!(page = %page, request = %request_id, "duplicate delivery suppressed");
                GuardVerdict::Duplicate
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(Admitted {
                    request_id: request_id.clone(),
                    at: now,
                });
                GuardVerdict::Admit
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Admitted {
                    request_id: request_id.clone(),
                    at: now,
                });
                GuardVerdict::Admit
            }
        }
    }

    /// Forget the page; called whenever its document is replaced.
    pub fn clear(&self, page: PageId) {
        self.entries.remove(&page);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn same_request_inside_window_is_duplicate() {
        let guard = DedupGuard::new(Duration::from_secs(10));
        let page = PageId::new();
        let id = RequestId::new();
        assert_eq!(guard.check_and_record(page, &id), GuardVerdict::Admit);
        tokio::time::advance(Duration::from_millis(1_200)).await;
        assert_eq!(guard.check_and_record(page, &id), GuardVerdict::Duplicate);
    }

    #[tokio::test(start_paused = true)]
    async fn window_expiry_readmits() {
        let guard = DedupGuard::new(Duration::from_secs(10));
        let page = PageId::new();
        let id = RequestId::new();
        guard.check_and_record(page, &id);
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(guard.check_and_record(page, &id), GuardVerdict::Admit);
    }

    #[tokio::test(start_paused = true)]
    async fn other_ids_and_pages_are_independent() {
        let guard = DedupGuard::new(Duration::from_secs(10));
        let (a, b) = (PageId::new(), PageId::new());
        let id = RequestId::new();
        guard.check_and_record(a, &id);
        assert_eq!(guard.check_and_record(b, &id), GuardVerdict::Admit);
        assert_eq!(guard.check_and_record(a, &RequestId::new()), GuardVerdict::Admit);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_readmits_after_document_replacement() {
        let guard = DedupGuard::new(Duration::from_secs(10));
        let page = PageId::new();
        let id = RequestId::new();
        guard.check_and_record(page, &id);
        guard.clear(page);
        assert!(guard.is_empty());
        assert_eq!(guard.check_and_record(page, &id), GuardVerdict::Admit);
    }
}
