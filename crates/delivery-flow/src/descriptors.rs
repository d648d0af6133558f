//! Menu and action descriptors supplied by configuration.

use serde::{Deserialize, Serialize};

use crate::destination::DestinationIdentity;
use crate::errors::TriggerError;

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionDescriptor {
    pub id: String,
    pub title: String,
    pub prompt_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub order: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MenuDescriptor {
    pub id: String,
    pub name: String,
    pub destination_address: String,
    #[serde(default = "default_true")]
    pub auto_submit: bool,
    #[serde(default)]
    pub run_all_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_all_shortcut: Option<String>,
    /// Extra address globs that also count as this destination.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address_patterns: Vec<String>,
    #[serde(default)]
    pub actions: Vec<ActionDescriptor>,
}

impl MenuDescriptor {
    pub fn destination(&self, global: &GlobalSettings) -> Result<DestinationIdentity, TriggerError> {
        DestinationIdentity::new(
            &self.destination_address,
            global.title_match.clone(),
            self.address_patterns.clone(),
        )
    }

    pub fn action(&self, id: &str) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|action| action.id == id)
    }

    /// Enabled actions in display order; ties keep their listed order.
    pub fn enabled_actions(&self) -> Vec<&ActionDescriptor> {
        let mut actions: Vec<&ActionDescriptor> =
            self.actions.iter().filter(|action| action.enabled).collect();
        actions.sort_by_key(|action| action.order);
        actions
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalSettings {
    /// Substring the destination tab's title contains once it is ready.
    pub title_match: String,
    /// Start every delivery in a brand-new conversation.
    pub clear_context: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            title_match: "ChatGPT".to_string(),
            clear_context: true,
        }
    }
}

/// Everything a trigger can address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub global: GlobalSettings,
    #[serde(default)]
    pub menus: Vec<MenuDescriptor>,
}

impl Catalog {
    pub fn menu(&self, id: &str) -> Option<&MenuDescriptor> {
        self.menus.iter().find(|menu| menu.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(id: &str, order: i64, enabled: bool) -> ActionDescriptor {
        ActionDescriptor {
            id: id.into(),
            title: id.into(),
            prompt_template: format!("{id}:"),
            shortcut: None,
            enabled,
            order,
        }
    }

    #[test]
    fn enabled_actions_follow_order() {
        let menu = MenuDescriptor {
            id: "jobs".into(),
            name: "Jobs".into(),
            destination_address: "https://chatgpt.com/".into(),
            auto_submit: true,
            run_all_enabled: true,
            run_all_shortcut: None,
            address_patterns: Vec::new(),
            actions: vec![action("c", 3, true), action("a", 1, true), action("b", 2, false)],
        };
        let ids: Vec<&str> = menu.enabled_actions().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert!(menu.action("b").is_some());
    }
}
