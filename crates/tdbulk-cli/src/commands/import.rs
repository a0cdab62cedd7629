//! `tdbulk import` command implementation

use super::Context;
use crate::error::Result;
use crate::progress::{create_spinner, format_bytes};
use crate::source::JsonLinesSource;
use crate::ImportArgs;
use colored::Colorize;
use tdbulk_ingest::{BulkImport, ImportReport};
use tracing::info;

pub async fn run(ctx: &Context, args: &ImportArgs) -> Result<()> {
    let schema = ctx.config.schema()?;
    let import = ctx.config.import_config(args)?;
    let client = ctx.client()?;

    let mut source = JsonLinesSource::open(&args.input, schema)?;
    info!(
        input = %args.input.display(),
        database = %import.database,
        table = %import.table,
        "Importing"
    );

    let spinner = create_spinner(
        &format!("Importing into {}.{}...", import.database, import.table),
        args.json,
    );
    let result = BulkImport::new(client, import)?.run(&mut source).await;
    spinner.finish_and_clear();
    let report = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ImportReport) {
    println!(
        "{} {}.{}",
        "Imported into".green().bold(),
        report.database,
        report.table
    );
    println!("  Session:        {}", report.session);
    if report.uploaded {
        println!("  Rows read:      {}", report.rows_read);
        if report.rows_skipped > 0 {
            println!(
                "  Rows skipped:   {}",
                report.rows_skipped.to_string().yellow()
            );
        }
        println!(
            "  Parts:          {} ({})",
            report.parts,
            format_bytes(report.bytes_uploaded)
        );
    } else {
        println!("  Upload:         skipped (session resumed)");
    }
    println!("  Valid records:  {}", report.valid_records);
    if report.error_records > 0 {
        println!(
            "  Error records:  {}",
            report.error_records.to_string().red()
        );
    }
    if let Some(job_id) = &report.job_id {
        println!("  Job:            {}", job_id);
    }
    println!("  Elapsed:        {:.1}s", report.elapsed_ms as f64 / 1000.0);
}
