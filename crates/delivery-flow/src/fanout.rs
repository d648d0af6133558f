//! Fan-out Orchestrator
//!
//! Delivers one selection through several actions at once, each into its
//! own fresh destination tab. Branches never affect each other.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::coordinator::{DeliveryCoordinator, DeliveryReport};
use crate::destination::DestinationIdentity;
use crate::metrics;

/// One action's share of a fan-out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Branch {
    pub label: String,
    pub text: String,
    pub auto_submit: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BranchReport {
    pub label: String,
    /// `None` when the branch was dropped before delivery.
    pub delivery: Option<DeliveryReport>,
    pub dropped_reason: Option<String>,
}

impl BranchReport {
    pub fn delivered(&self) -> bool {
        self.delivery.as_ref().map(|d| d.success).unwrap_or(false)
    }
}

pub struct FanOut {
    coordinator: Arc<DeliveryCoordinator>,
}

impl FanOut {
    pub fn new(coordinator: Arc<DeliveryCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Tabs are opened in branch order; readiness and delivery then proceed
    /// concurrently. Branches whose tab fails are dropped with a warning.
    pub async fn deliver_all(
        &self,
        destination: &DestinationIdentity,
        branches: Vec<Branch>,
    ) -> Vec<BranchReport> {
        let sessions = self.coordinator.sessions();

        let mut opened = Vec::with_capacity(branches.len());
        for branch in branches {
            let page = sessions.open_tab(destination).await;
            opened.push((branch, page));
        }

        let ready = join_all(opened.into_iter().map(|(branch, page)| async move {
            let session = match page {
                Ok(page) => sessions.await_ready(page, destination).await,
                Err(err) => Err(err),
            };
            (branch, session)
        }))
        .await;

        let deliveries = ready.into_iter().map(|(branch, session)| async move {
            match session {
                Ok(session) => {
                    let delivery = self
                        .coordinator
                        .deliver_on(session, destination, &branch.text, branch.auto_submit, &branch.label)
                        .await;
                    BranchReport {
                        label: branch.label,
                        delivery: Some(delivery),
                        dropped_reason: None,
                    }
                }
                Err(err) => {
                    warn!(label = %branch.label, %err, "dropping fan-out branch");
                    BranchReport {
                        label: branch.label,
                        delivery: None,
                        dropped_reason: Some(err.to_string()),
                    }
                }
            }
        });
        let reports = join_all(deliveries).await;

        for report in &reports {
            metrics::record_branch(match (&report.delivery, report.delivered()) {
                (None, _) => "dropped",
                (Some(_), true) => "delivered",
                (Some(_), false) => "failed",
            });
        }
        let delivered = reports.iter().filter(|r| r.delivered()).count();
        info!(branches = reports.len(), delivered, "fan-out finished");
        reports
    }
}
