use anyhow::Result;
use delivery_flow::MenuDescriptor;

use super::context::CliContext;
use super::output::{emit, OutputFormat};

pub fn cmd_menus(ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let menus = &ctx.config().menus;
    emit(output, menus, || render_menus(menus))
}

fn render_menus(menus: &[MenuDescriptor]) -> String {
    if menus.is_empty() {
        return "No menus configured".to_string();
    }
    let mut out = Vec::new();
    for menu in menus {
        let mut header = format!("{} ({}) -> {}", menu.name, menu.id, menu.destination_address);
        if menu.run_all_enabled {
            header.push_str(" [run-all");
            if let Some(keys) = &menu.run_all_shortcut {
                header.push_str(&format!(" {keys}"));
            }
            header.push(']');
        }
        out.push(header);
        let enabled: Vec<&str> = menu.enabled_actions().iter().map(|a| a.id.as_str()).collect();
        for action in &menu.actions {
            let status = if enabled.contains(&action.id.as_str()) {
                ""
            } else {
                " (disabled)"
            };
            let keys = action
                .shortcut
                .as_deref()
                .map(|k| format!("  {k}"))
                .unwrap_or_default();
            out.push(format!("  {:<16} {}{keys}{status}", action.id, action.title));
        }
    }
    out.join("\n")
}
