//! `canon history` command implementation.

use std::path::Path;
use std::process::ExitCode;

use colored::Colorize;

use super::display::{change_marker, format_timestamp, print_json, short_hash};
use super::Context;

/// Run the history command.
pub fn run(ctx: &Context, file: &Path, qualified_name: &str) -> Result<ExitCode, canon::Error> {
    let canon = ctx.open()?;
    let history = canon.component_history(file, qualified_name)?;

    if ctx.json {
        print_json(&history)?;
        return Ok(ExitCode::SUCCESS);
    }

    if history.is_empty() {
        println!(
            "{} never appeared in {}",
            qualified_name.white().bold(),
            file.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{} {} in {}",
        "History of".cyan().bold(),
        qualified_name.white().bold(),
        file.display()
    );
    for h in &history {
        println!(
            "  {} v{} {} committed {} at {}",
            change_marker(h.change),
            h.version_number,
            h.resolution.as_str().dimmed(),
            short_hash(&h.committed_hash),
            format_timestamp(h.committed_at).dimmed(),
        );
    }

    Ok(ExitCode::SUCCESS)
}
