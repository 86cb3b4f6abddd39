//! `canon verify` command implementation.

use std::path::Path;
use std::process::ExitCode;

use colored::Colorize;

use super::display::{print_json, short_hash};
use super::Context;

/// Run the verify command. Exits with 1 when the rebuild does not match.
pub fn run(ctx: &Context, file: &Path) -> Result<ExitCode, canon::Error> {
    let canon = ctx.open()?;
    let outcome = canon.verify(file)?;

    if ctx.json {
        print_json(&outcome)?;
    } else {
        let status = if outcome.matched {
            outcome.status.to_string().green().bold()
        } else {
            outcome.status.to_string().red().bold()
        };
        println!("{status} {} v{}", file.display(), outcome.version_number);
        println!(
            "  {}: {} ({})",
            "Raw".dimmed(),
            short_hash(&outcome.raw_hash),
            if outcome.raw_match { "match" } else { "differs" }
        );
        match &outcome.tree_hash {
            Some(hash) => println!(
                "  {}: {} ({})",
                "Tree".dimmed(),
                short_hash(hash),
                if outcome.tree_match { "match" } else { "differs" }
            ),
            None => println!("  {}: rebuilt source does not parse", "Tree".dimmed()),
        }
    }

    Ok(if outcome.matched {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
