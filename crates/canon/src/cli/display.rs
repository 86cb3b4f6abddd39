//! Common display utilities for CLI commands.

use chrono::DateTime;
use colored::{ColoredString, Colorize};
use serde::Serialize;

use canon::{ChangeKind, Severity};

/// Number of hash characters shown in tables.
const SHORT_HASH: usize = 12;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), canon::Error> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| canon::Error::Internal(format!("failed to serialize output: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Render a unix-nanosecond timestamp as UTC.
pub fn format_timestamp(nanos: i64) -> String {
    DateTime::from_timestamp_nanos(nanos)
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

/// Leading characters of a hex digest.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..SHORT_HASH).unwrap_or(hash)
}

/// Severity label colored by tier.
pub fn severity_label(severity: Severity) -> ColoredString {
    let label = severity.as_str();
    match severity {
        Severity::High => label.red().bold(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.normal(),
        Severity::Info => label.dimmed(),
    }
}

/// One-character marker for a change kind.
pub fn change_marker(kind: ChangeKind) -> ColoredString {
    match kind {
        ChangeKind::Added => "+".green().bold(),
        ChangeKind::Removed => "-".red().bold(),
        ChangeKind::Modified => "~".yellow().bold(),
        ChangeKind::Unchanged => "=".dimmed(),
    }
}
