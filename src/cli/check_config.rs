use anyhow::{bail, Result};
use serde::Serialize;

use super::context::CliContext;
use super::output::{emit, OutputFormat};

#[derive(Debug, Serialize)]
struct ConfigReport {
    path: String,
    valid: bool,
    menus: usize,
    actions: usize,
    problems: Vec<String>,
}

pub fn cmd_check_config(ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let config = ctx.config();
    let problems = config.problems();
    let report = ConfigReport {
        path: ctx.config_path().display().to_string(),
        valid: problems.is_empty(),
        menus: config.menus.len(),
        actions: config.menus.iter().map(|m| m.actions.len()).sum(),
        problems,
    };

    emit(output, &report, || {
        if report.valid {
            format!(
                "Configuration {} is valid ({} menus, {} actions)",
                report.path, report.menus, report.actions
            )
        } else {
            let mut text = format!("Configuration {} has problems:", report.path);
            for problem in &report.problems {
                text.push_str("\n  - ");
                text.push_str(problem);
            }
            text
        }
    })?;

    if !report.valid {
        bail!("{} configuration problem(s)", report.problems.len());
    }
    Ok(())
}
