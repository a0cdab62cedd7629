//! `tdbulk session` command implementations

use super::Context;
use crate::error::{CliError, Result};
use crate::progress::create_spinner;
use colored::Colorize;
use tdbulk_client::BulkImportSession;
use tdbulk_ingest::SessionController;

fn controller(ctx: &Context) -> Result<SessionController> {
    let client = ctx.client()?;
    let controller = match &ctx.config.import {
        Some(import) => SessionController::from_config(client, import),
        None => SessionController::new(client),
    };
    Ok(controller)
}

pub async fn show(ctx: &Context, name: &str, json: bool) -> Result<()> {
    let session = controller(ctx)?.show_session(name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        print_session(&session);
    }
    Ok(())
}

/// Resume a session from whatever state the server reports
pub async fn complete(ctx: &Context, name: &str, priority: i32) -> Result<()> {
    if !(-2..=2).contains(&priority) {
        return Err(CliError::config(format!(
            "priority must be between -2 and 2, got {}",
            priority
        )));
    }

    let controller = controller(ctx)?;
    let spinner = create_spinner(&format!("Completing session {}...", name), false);
    let result = controller.complete_session(name, priority).await;
    spinner.finish_and_clear();
    let session = result?;

    println!("{} {}", "Committed".green().bold(), session.name);
    println!("  Valid records:  {}", session.valid_records());
    if session.error_records() > 0 {
        println!(
            "  Error records:  {}",
            session.error_records().to_string().red()
        );
    }
    Ok(())
}

pub async fn delete(ctx: &Context, name: &str) -> Result<()> {
    if controller(ctx)?.delete_session(name).await? {
        println!("{} {}", "Deleted session".green(), name);
    } else {
        println!("Session {} does not exist.", name);
    }
    Ok(())
}

fn print_session(session: &BulkImportSession) {
    println!("{}", session.name.cyan().bold());
    println!("  Destination:    {}.{}", session.database, session.table);
    println!("  Status:         {}", session.status);
    println!("  Upload frozen:  {}", session.upload_frozen);
    if let Some(job_id) = &session.job_id {
        println!("  Job:            {}", job_id);
    }
    if let Some(valid) = session.valid_records {
        println!("  Valid records:  {}", valid);
    }
    if let Some(errors) = session.error_records {
        println!("  Error records:  {}", errors);
    }
}
