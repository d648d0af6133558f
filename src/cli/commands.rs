use clap::Subcommand;

use super::deliver::{DeliverArgs, RunAllArgs, ShortcutArgs};

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Send selected text through one menu action
    Deliver(DeliverArgs),

    /// Send selected text through the action bound to a keyboard shortcut
    Shortcut(ShortcutArgs),

    /// Send selected text through every enabled action of a menu, one tab each
    RunAll(RunAllArgs),

    /// List configured menus and their actions
    Menus,

    /// Validate the configuration and report every problem
    CheckConfig,
}
