//! `canon ingest` command implementation.

use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use serde::Serialize;

use super::display::print_json;
use super::Context;

#[derive(Serialize)]
struct IngestResult<'a> {
    path: &'a PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a canon::IngestReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run the ingest command.
///
/// Every file is attempted. The exit code is that of the last failure, or
/// success when all files were ingested.
pub fn run(ctx: &Context, files: &[PathBuf]) -> Result<ExitCode, canon::Error> {
    let canon = ctx.open()?;
    let results = canon.ingest_many(files);

    let mut exit_code = 0u8;
    for (_, result) in &results {
        if let Err(e) = result {
            exit_code = e.exit_code();
        }
    }

    if ctx.json {
        let rows: Vec<IngestResult<'_>> = results
            .iter()
            .map(|(path, result)| IngestResult {
                path,
                report: result.as_ref().ok(),
                error: result.as_ref().err().map(ToString::to_string),
            })
            .collect();
        print_json(&rows)?;
        return Ok(ExitCode::from(exit_code));
    }

    for (path, result) in &results {
        match result {
            Ok(report) => {
                println!(
                    "{} {} {} {}",
                    "Ingested".green().bold(),
                    path.display(),
                    format!("v{}", report.version_number).cyan(),
                    format!("({} components)", report.component_count).dimmed(),
                );
                println!("  {}: {}", "Drift".dimmed(), report.drift);
                if report.missing_segments > 0 {
                    println!(
                        "  {}: {} components stored without source text",
                        "Warning".yellow().bold(),
                        report.missing_segments
                    );
                }
            }
            Err(e) => {
                println!("{} {}: {e}", "Failed".red().bold(), path.display());
                let mut source = std::error::Error::source(e);
                while let Some(cause) = source {
                    println!("  {}: {cause}", "caused by".dimmed());
                    source = std::error::Error::source(cause);
                }
            }
        }
    }

    Ok(ExitCode::from(exit_code))
}
