mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = commands::load(cli.config, cli.project, cli.region)?;

    match cli.command {
        Command::Run { cases, all, output } => commands::run(config, cases, all, output).await,
        Command::Vars { case } => commands::vars(config, case),
        Command::Inspect { template } => commands::inspect(config, template).await,
        Command::Destroy { case, yes } => commands::destroy(config, case, yes).await,
    }
}
