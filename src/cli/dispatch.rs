use anyhow::Result;

use super::check_config::cmd_check_config;
use super::commands::Commands;
use super::context::CliContext;
use super::deliver::{cmd_deliver, cmd_run_all, cmd_shortcut};
use super::env::CliArgs;
use super::menus::cmd_menus;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Deliver(args) => cmd_deliver(args, ctx, cli.output).await,
        Commands::Shortcut(args) => cmd_shortcut(args, ctx, cli.output).await,
        Commands::RunAll(args) => cmd_run_all(args, ctx, cli.output).await,
        Commands::Menus => cmd_menus(ctx, cli.output),
        Commands::CheckConfig => cmd_check_config(ctx, cli.output),
    }
}
