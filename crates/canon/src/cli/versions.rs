//! `canon versions` command implementation.

use std::path::Path;
use std::process::ExitCode;

use colored::Colorize;

use super::display::{format_timestamp, print_json, short_hash};
use super::Context;

/// Run the versions command.
pub fn run(ctx: &Context, file: &Path) -> Result<ExitCode, canon::Error> {
    let canon = ctx.open()?;
    let versions = canon.list_versions(file)?;

    if ctx.json {
        print_json(&versions)?;
        return Ok(ExitCode::SUCCESS);
    }

    if versions.is_empty() {
        println!("{} has not been ingested", file.display());
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {}", "Versions of".cyan().bold(), file.display());
    for v in &versions {
        println!(
            "  {} {} {} {}",
            format!("v{}", v.version_number).white().bold(),
            format_timestamp(v.created_at).dimmed(),
            short_hash(&v.raw_hash),
            format!("{} components", v.component_count).dimmed(),
        );
        println!("      {}", v.change_summary);
    }

    Ok(ExitCode::SUCCESS)
}
