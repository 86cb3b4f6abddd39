//! `canon stats` command implementation.

use std::process::ExitCode;

use colored::Colorize;
use serde::Serialize;

use canon::{ComponentKind, DatabaseStats};

use super::display::print_json;
use super::Context;

#[derive(Serialize)]
struct StatsOutput<'a> {
    database: String,
    size_bytes: Option<u64>,
    #[serde(flatten)]
    stats: &'a DatabaseStats,
}

/// Run the stats command.
pub fn run(ctx: &Context) -> Result<ExitCode, canon::Error> {
    let canon = ctx.open()?;

    // Get database size
    let db_path = canon.db_path();
    let db_size = match std::fs::metadata(db_path) {
        Ok(meta) => Some(meta.len()),
        Err(e) => {
            tracing::debug!(
                path = %db_path.display(),
                error = %e,
                "Failed to get database file size"
            );
            None
        }
    };

    let stats = canon.get_stats()?;

    if ctx.json {
        print_json(&StatsOutput {
            database: db_path.display().to_string(),
            size_bytes: db_size,
            stats: &stats,
        })?;
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "Canon Store Statistics".cyan().bold());
    println!();
    println!(
        "  {}: {} ({})",
        "Database".white().bold(),
        db_path.display(),
        db_size.map_or_else(|| "size unknown".to_string(), format_size)
    );
    println!();

    println!(
        "  {}: {}",
        "Files".white().bold(),
        stats.file_count.to_string().green()
    );
    println!(
        "  {}: {}",
        "Versions".white().bold(),
        stats.version_count.to_string().green()
    );

    let live: usize = stats.live_components_by_kind.values().sum();
    println!(
        "  {}: {} live, {} stored",
        "Components".white().bold(),
        live.to_string().green(),
        stats.component_rows
    );
    // Sort by count descending, then by kind for deterministic output
    let mut kind_counts: Vec<(&ComponentKind, &usize)> =
        stats.live_components_by_kind.iter().collect();
    kind_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (kind, count) in kind_counts {
        println!("    {}: {}", kind.as_str().dimmed(), count);
    }
    println!();

    println!(
        "  {}: {}",
        "Drift events".white().bold(),
        stats.drift_event_count.to_string().green()
    );
    println!(
        "  {}: {} ({} failed)",
        "Equivalence proofs".white().bold(),
        stats.proof_count.to_string().green(),
        if stats.failed_proof_count > 0 {
            stats.failed_proof_count.to_string().red()
        } else {
            stats.failed_proof_count.to_string().normal()
        }
    );

    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(512, "512 B")]
    #[case(2048, "2.0 KB")]
    #[case(3 * 1024 * 1024, "3.0 MB")]
    fn format_size_picks_unit(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_size(bytes), expected);
    }
}
