//! `canon components` command implementation.

use std::path::Path;
use std::process::ExitCode;

use colored::Colorize;

use super::display::{print_json, short_hash};
use super::Context;

/// Run the components command.
pub fn run(ctx: &Context, file: &Path, version: Option<u32>) -> Result<ExitCode, canon::Error> {
    let canon = ctx.open()?;
    let mut components = canon.list_components_at(file, version)?;

    if ctx.json {
        print_json(&components)?;
        return Ok(ExitCode::SUCCESS);
    }

    // Source order reads better than tree order.
    components.sort_by_key(|c| (c.start_line, c.depth));

    println!(
        "{} {} ({} components)",
        "Components of".cyan().bold(),
        file.display(),
        components.len()
    );
    for c in &components {
        let indent = "  ".repeat(c.depth as usize + 1);
        println!(
            "{indent}{} {} {} {}",
            c.kind.as_str().dimmed(),
            c.qualified_name.white().bold(),
            format!("L{}-{}", c.start_line, c.end_line).dimmed(),
            short_hash(&c.committed_hash).dimmed(),
        );
        if let Some(signature) = &c.signature {
            println!("{indent}  {}", signature.dimmed());
        }
    }

    Ok(ExitCode::SUCCESS)
}
