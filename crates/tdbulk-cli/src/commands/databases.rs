//! `tdbulk databases` command implementation

use super::Context;
use crate::error::Result;
use colored::Colorize;

pub async fn run(ctx: &Context, json: bool) -> Result<()> {
    let databases = ctx.client()?.list_databases().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&databases)?);
        return Ok(());
    }

    if databases.is_empty() {
        println!("No databases found.");
        return Ok(());
    }

    println!("{}", "Databases:".cyan().bold());
    for db in &databases {
        match db.count {
            Some(count) => println!("  {} ({} rows)", db.name.green(), count),
            None => println!("  {}", db.name.green()),
        }
    }
    Ok(())
}
