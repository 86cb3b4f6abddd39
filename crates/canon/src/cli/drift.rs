//! `canon drift` command implementation.

use std::path::Path;
use std::process::ExitCode;

use colored::Colorize;
use serde::Serialize;

use super::display::{change_marker, print_json, severity_label};
use super::Context;

#[derive(Serialize)]
struct DriftOutput {
    version_number: u32,
    summary: canon::DriftSummary,
    events: Vec<canon::DriftEvent>,
}

/// Run the drift command.
///
/// Detection is re-run for the selected version before listing its events;
/// detection is idempotent so this never duplicates rows.
pub fn run(ctx: &Context, file: &Path, version: Option<u32>) -> Result<ExitCode, canon::Error> {
    let canon = ctx.open()?;

    let version_number = match version {
        Some(n) => n,
        None => canon
            .list_versions(file)?
            .last()
            .map(|v| v.version_number)
            .ok_or_else(|| canon::Error::UnknownFile(file.display().to_string()))?,
    };
    let summary = canon.detect_drift(file, Some(version_number))?;
    let events = canon.list_drift_events(file, Some(version_number))?;

    if ctx.json {
        print_json(&DriftOutput {
            version_number,
            summary,
            events,
        })?;
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{} {} v{}: {}",
        "Drift".cyan().bold(),
        file.display(),
        version_number,
        summary
    );
    if events.is_empty() {
        println!("  {}", "no changes".dimmed());
    }
    for event in &events {
        println!(
            "  {} {} {} [{}]",
            change_marker(event.kind),
            event.qualified_name.white().bold(),
            event.category.as_str(),
            severity_label(event.severity),
        );
    }

    Ok(ExitCode::SUCCESS)
}
