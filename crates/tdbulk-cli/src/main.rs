//! tdbulk CLI - Main entry point

use clap::Parser;
use std::process;
use tdbulk_cli::commands::{self, Context};
use tdbulk_cli::{Cli, Commands, FileConfig, SessionCommand};
use tdbulk_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use tracing::error;

#[tokio::main]
async fn main() {
    // Pick up TD_API_KEY and friends from a local .env
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Debug to console when verbose, warnings only otherwise
    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        })
        .output(LogOutput::Console)
        .log_file_prefix("tdbulk")
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::from_env_over(log_config.clone()).unwrap_or(log_config);

    // The CLI works without logging
    let _ = init_logging(&log_config);

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

async fn execute_command(cli: &Cli) -> tdbulk_cli::Result<()> {
    let config = FileConfig::load(cli.config.as_deref())?;
    let cancel = tdbulk_cli::signal::cancel_on_shutdown();
    let ctx = Context::new(config, cli.server_url.clone(), cancel);

    match &cli.command {
        Commands::Import(args) => commands::import::run(&ctx, args).await,
        Commands::Session { command } => match command {
            SessionCommand::Show { name, json } => commands::session::show(&ctx, name, *json).await,
            SessionCommand::Complete { name, priority } => {
                commands::session::complete(&ctx, name, *priority).await
            },
            SessionCommand::Delete { name } => commands::session::delete(&ctx, name).await,
        },
        Commands::Databases { json } => commands::databases::run(&ctx, *json).await,
    }
}
