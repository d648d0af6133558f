use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use delivery_flow::{
    plan, BranchReport, CdpTabHost, DeliveryCoordinator, DeliveryReport, Dispatcher,
    SessionOrchestrator, TabHost, TriggerOutcome, TriggerRequest, TriggerSelector,
};
use tokio::io::AsyncReadExt;
use tracing::info;

use super::context::CliContext;
use super::output::{emit, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct SelectionArgs {
    /// Selected text to deliver
    #[arg(long, conflicts_with = "text_file")]
    pub text: Option<String>,

    /// Read the selected text from a file
    #[arg(long, value_name = "FILE")]
    pub text_file: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct DeliverArgs {
    /// Menu id
    #[arg(long)]
    pub menu: String,

    /// Action id within the menu
    #[arg(long)]
    pub action: String,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[derive(Args, Clone, Debug)]
pub struct ShortcutArgs {
    /// Key combination, e.g. "Alt+Shift+J"
    #[arg(long)]
    pub keys: String,

    /// Only consider bindings of this menu
    #[arg(long)]
    pub menu: Option<String>,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[derive(Args, Clone, Debug)]
pub struct RunAllArgs {
    /// Menu id
    #[arg(long)]
    pub menu: String,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

pub async fn cmd_deliver(args: DeliverArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let selector = TriggerSelector::Action {
        menu: args.menu,
        action: args.action,
    };
    run_trigger(selector, &args.selection, ctx, output).await
}

pub async fn cmd_shortcut(args: ShortcutArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let selector = TriggerSelector::Shortcut {
        keys: args.keys,
        menu: args.menu,
    };
    run_trigger(selector, &args.selection, ctx, output).await
}

pub async fn cmd_run_all(args: RunAllArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let selector = TriggerSelector::RunAll { menu: args.menu };
    run_trigger(selector, &args.selection, ctx, output).await
}

async fn run_trigger(
    selector: TriggerSelector,
    selection: &SelectionArgs,
    ctx: &CliContext,
    output: OutputFormat,
) -> Result<()> {
    let config = ctx.config();
    config
        .validate()
        .with_context(|| format!("invalid configuration {}", ctx.config_path().display()))?;

    let request = TriggerRequest {
        selector,
        selected_text: read_selection(selection).await?,
    };
    let catalog = config.catalog();
    // Routing errors surface before a browser is started.
    plan(&catalog, &request)?;

    let adapter = ctx.launch_browser().await?;
    let host: Arc<dyn TabHost> = Arc::new(CdpTabHost::new(Arc::clone(&adapter)));
    let sessions = Arc::new(SessionOrchestrator::new(host, &config.timings));
    let coordinator = Arc::new(DeliveryCoordinator::with_automaton(
        sessions,
        config.timings.clone(),
    ));
    let dispatcher = Dispatcher::new(catalog, Arc::clone(&coordinator));

    let outcome = dispatcher.dispatch(&request).await;
    if coordinator.pending_backstops() > 0 {
        info!(
            pending = coordinator.pending_backstops(),
            "waiting for second attempts"
        );
    }
    coordinator.settle().await;
    adapter.shutdown().await;

    let outcome = outcome?;
    emit(output, &outcome, || describe(&outcome))?;
    if !outcome.any_delivered() {
        bail!("first attempt did not deliver; second-attempt results are in the log");
    }
    Ok(())
}

async fn read_selection(selection: &SelectionArgs) -> Result<String> {
    if let Some(text) = &selection.text {
        return Ok(text.clone());
    }
    if let Some(path) = &selection.text_file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()));
    }
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("reading selected text from stdin")?;
    Ok(text)
}

fn describe(outcome: &TriggerOutcome) -> String {
    match outcome {
        TriggerOutcome::Single(report) => describe_report(report),
        TriggerOutcome::RunAll { branches } => branches
            .iter()
            .map(describe_branch)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn describe_report(report: &DeliveryReport) -> String {
    let state = report.state.map(|s| s.as_str()).unwrap_or("-");
    let mut line = format!(
        "{} {} via {:?} (state {state}, request {})",
        report.label,
        if report.success { "delivered" } else { "not delivered" },
        report.path,
        report.request_id,
    );
    if report.backstop_scheduled {
        line.push_str("; second attempt was scheduled");
    }
    line
}

fn describe_branch(branch: &BranchReport) -> String {
    match (&branch.delivery, &branch.dropped_reason) {
        (Some(report), _) => describe_report(report),
        (None, Some(reason)) => format!("{} dropped: {reason}", branch.label),
        (None, None) => format!("{} dropped", branch.label),
    }
}
