//! Inbound triggers: a selector plus the user's selected text, routed to a
//! single delivery or a fan-out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::coordinator::{DeliveryCoordinator, DeliveryReport};
use crate::descriptors::{ActionDescriptor, Catalog, MenuDescriptor};
use crate::destination::DestinationIdentity;
use crate::errors::TriggerError;
use crate::fanout::{Branch, BranchReport, FanOut};
use crate::prompt::compose_prompt;
use crate::shortcut::{find_shortcut, ShortcutTarget};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerSelector {
    Action { menu: String, action: String },
    Shortcut { keys: String, menu: Option<String> },
    RunAll { menu: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub selector: TriggerSelector,
    pub selected_text: String,
}

/// A trigger resolved against the catalog, before any browser work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TriggerPlan {
    Single {
        destination: DestinationIdentity,
        branch: Branch,
        want_fresh: bool,
    },
    RunAll {
        destination: DestinationIdentity,
        branches: Vec<Branch>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerOutcome {
    Single(DeliveryReport),
    RunAll { branches: Vec<BranchReport> },
}

impl TriggerOutcome {
    pub fn any_delivered(&self) -> bool {
        match self {
            TriggerOutcome::Single(report) => report.success,
            TriggerOutcome::RunAll { branches } => branches.iter().any(BranchReport::delivered),
        }
    }
}

fn branch(menu: &MenuDescriptor, action: &ActionDescriptor, selection: &str) -> Result<Branch, TriggerError> {
    Ok(Branch {
        label: action.id.clone(),
        text: compose_prompt(&action.prompt_template, selection)?,
        auto_submit: menu.auto_submit,
    })
}

fn single(catalog: &Catalog, menu: &MenuDescriptor, action: &ActionDescriptor, selection: &str) -> Result<TriggerPlan, TriggerError> {
    if !action.enabled {
        return Err(TriggerError::ActionDisabled(action.id.clone()));
    }
    Ok(TriggerPlan::Single {
        branch: branch(menu, action, selection)?,
        destination: menu.destination(&catalog.global)?,
        want_fresh: catalog.global.clear_context,
    })
}

fn run_all(catalog: &Catalog, menu: &MenuDescriptor, selection: &str) -> Result<TriggerPlan, TriggerError> {
    if !menu.run_all_enabled {
        return Err(TriggerError::RunAllDisabled(menu.id.clone()));
    }
    let actions = menu.enabled_actions();
    if actions.is_empty() {
        return Err(TriggerError::NoActions(menu.id.clone()));
    }
    let branches = actions
        .into_iter()
        .map(|action| branch(menu, action, selection))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TriggerPlan::RunAll {
        destination: menu.destination(&catalog.global)?,
        branches,
    })
}

/// Resolves `request` without touching the browser. An empty selection is
/// rejected first.
pub fn plan(catalog: &Catalog, request: &TriggerRequest) -> Result<TriggerPlan, TriggerError> {
    if request.selected_text.trim().is_empty() {
        return Err(TriggerError::EmptySelection);
    }
    let menu_named = |id: &str| catalog.menu(id).ok_or_else(|| TriggerError::UnknownMenu(id.to_string()));
    match &request.selector {
        TriggerSelector::Action { menu, action } => {
            let menu = menu_named(menu.as_str())?;
            let action = menu.action(action).ok_or_else(|| TriggerError::UnknownAction {
                menu: menu.id.clone(),
                action: action.clone(),
            })?;
            single(catalog, menu, action, &request.selected_text)
        }
        TriggerSelector::RunAll { menu } => run_all(catalog, menu_named(menu.as_str())?, &request.selected_text),
        TriggerSelector::Shortcut { keys, menu } => {
            if let Some(id) = menu {
                menu_named(id.as_str())?;
            }
            match find_shortcut(catalog, keys, menu.as_deref()) {
                Some(ShortcutTarget::Action { menu, action }) => {
                    single(catalog, menu, action, &request.selected_text)
                }
                Some(ShortcutTarget::RunAll { menu }) => run_all(catalog, menu, &request.selected_text),
                None => Err(TriggerError::UnknownShortcut(keys.clone())),
            }
        }
    }
}

/// Executes planned triggers.
pub struct Dispatcher {
    catalog: Catalog,
    coordinator: Arc<DeliveryCoordinator>,
    fanout: FanOut,
}

impl Dispatcher {
    pub fn new(catalog: Catalog, coordinator: Arc<DeliveryCoordinator>) -> Self {
        let fanout = FanOut::new(Arc::clone(&coordinator));
        Self {
            catalog,
            coordinator,
            fanout,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn coordinator(&self) -> &Arc<DeliveryCoordinator> {
        &self.coordinator
    }

    pub async fn dispatch(&self, request: &TriggerRequest) -> Result<TriggerOutcome, TriggerError> {
        match plan(&self.catalog, request)? {
            TriggerPlan::Single {
                destination,
                branch,
                want_fresh,
            } => {
                info!(label = %branch.label, destination = destination.address(), "delivering");
                let report = self
                    .coordinator
                    .deliver_to(&destination, &branch.text, branch.auto_submit, want_fresh, &branch.label)
                    .await;
                Ok(TriggerOutcome::Single(report))
            }
            TriggerPlan::RunAll { destination, branches } => {
                info!(branches = branches.len(), destination = destination.address(), "running all actions");
                let branches = self.fanout.deliver_all(&destination, branches).await;
                Ok(TriggerOutcome::RunAll { branches })
            }
        }
    }
}
